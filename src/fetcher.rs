// Counter fetcher: one bulk walk over the counter columns per cycle.
// Rows pair with the port table by explicit index, or by walk position.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FetchError, WalkFault};
use crate::models::{PortCounters, PortId, PortTable};
use crate::snmp_repo::{TableWalker, WalkItem};

/// Counters gathered in one cycle.
///
/// `counters` may cover only part of the table when the walk aborted;
/// `aborted` then holds the fault that ended it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fetched {
    pub counters: BTreeMap<PortId, PortCounters>,
    pub aborted: Option<WalkFault>,
}

pub struct CounterFetcher {
    walker: Arc<dyn TableWalker>,
    table: Arc<PortTable>,
    oids: Arc<[String]>,
    timeout: Option<Duration>,
}

impl CounterFetcher {
    /// `oids` are the inbound and outbound counter columns, in that order.
    pub fn new(
        walker: Arc<dyn TableWalker>,
        table: Arc<PortTable>,
        oids: Vec<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            walker,
            table,
            oids: oids.into(),
            timeout,
        }
    }

    pub fn table(&self) -> &Arc<PortTable> {
        &self.table
    }

    /// Runs the walk on the blocking pool, bounded by the configured timeout.
    ///
    /// On timeout the blocking walk is left to finish on its own; its result
    /// is dropped.
    pub async fn fetch(&self) -> Result<Fetched, FetchError> {
        let walker = self.walker.clone();
        let table = self.table.clone();
        let oids = self.oids.clone();
        let task = tokio::task::spawn_blocking(move || {
            collect_counters(walker.walk(&oids), &table, &oids)
        });

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| FetchError::Timeout(limit))?,
            None => task.await,
        };
        joined.map_err(|e| FetchError::Join(e.to_string()))?
    }
}

/// Interprets walk rows as counters for the ports of `table`.
///
/// `oids` must name exactly the inbound and outbound columns. A fault on
/// the first row fails the fetch; a later fault keeps the rows
/// read so far. Rows for ports outside the table are skipped unparsed.
pub fn collect_counters(
    rows: impl Iterator<Item = WalkItem>,
    table: &PortTable,
    oids: &[String],
) -> Result<Fetched, FetchError> {
    let [in_oid, out_oid] = oids else {
        return Err(FetchError::CounterColumns(oids.len()));
    };
    let mut fetched = Fetched::default();
    for (pos, item) in rows.enumerate() {
        let row = match item {
            Ok(row) => row,
            Err(fault) if pos == 0 => return Err(FetchError::Walk(fault)),
            Err(fault) => {
                tracing::warn!(
                    error = %fault,
                    operation = "fetch_counters",
                    rows_read = pos,
                    "counter walk aborted; unread ports keep previous values"
                );
                fetched.aborted = Some(fault);
                break;
            }
        };

        let id = match row.index {
            Some(id) => id,
            None => match table.row_order().get(pos) {
                Some(&id) => id,
                None => break,
            },
        };
        if !table.contains(id) {
            continue;
        }

        let [in_raw, out_raw] = row.values.as_slice() else {
            return Err(FetchError::ColumnCount {
                expected: oids.len(),
                got: row.values.len(),
            });
        };
        let in_packets = parse_counter(in_oid, in_raw)?;
        let out_packets = parse_counter(out_oid, out_raw)?;
        fetched
            .counters
            .insert(id, PortCounters::new(in_packets, out_packets));
    }
    Ok(fetched)
}

fn parse_counter(column: &str, raw: &str) -> Result<u64, FetchError> {
    raw.trim().parse::<u64>().map_err(|_| FetchError::Parse {
        column: column.to_string(),
        value: raw.to_string(),
    })
}
