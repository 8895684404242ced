// Shared test helpers: scripted table walker, port tables, row builders

#![allow(dead_code)]

use snmp_counters::error::WalkFault;
use snmp_counters::models::{PortId, PortTable};
use snmp_counters::snmp_repo::{TableRow, TableWalker, WalkItem};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub const IN_OID: &str = "ifInUcastPkts";
pub const OUT_OID: &str = "ifOutUcastPkts";

pub fn oids() -> Vec<String> {
    vec![IN_OID.to_string(), OUT_OID.to_string()]
}

/// Replays canned walks, one per call, keyed by the requested column set.
/// An exhausted script yields an empty walk.
#[derive(Default)]
pub struct ScriptedWalker {
    scripts: Mutex<HashMap<Vec<String>, VecDeque<Vec<WalkItem>>>>,
    calls: AtomicUsize,
    started: Mutex<Vec<Instant>>,
    delay: Option<Duration>,
}

impl ScriptedWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every walk blocks for `delay` before yielding rows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, columns: &[&str], rows: Vec<WalkItem>) -> &Self {
        let key = columns.iter().map(|c| c.to_string()).collect();
        self.scripts
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(rows);
        self
    }

    /// Queues one counter walk for the default in/out columns.
    pub fn push_counters(&self, rows: Vec<WalkItem>) -> &Self {
        self.push(&[IN_OID, OUT_OID], rows)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// When each walk began, on the tokio clock (paused in `start_paused` tests).
    pub fn started_at(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }

    /// Gaps between consecutive walk starts.
    pub fn gaps(&self) -> Vec<Duration> {
        self.started_at()
            .windows(2)
            .map(|w| w[1].duration_since(w[0]))
            .collect()
    }
}

impl TableWalker for ScriptedWalker {
    fn walk<'a>(&'a self, columns: &[String]) -> Box<dyn Iterator<Item = WalkItem> + Send + 'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let rows = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(columns)
            .and_then(|q| q.pop_front())
            .unwrap_or_default();
        Box::new(rows.into_iter())
    }
}

/// Positional counter row (no explicit index).
pub fn row(in_packets: u64, out_packets: u64) -> WalkItem {
    Ok(TableRow::positional(vec![
        in_packets.to_string(),
        out_packets.to_string(),
    ]))
}

/// Counter row carrying its row index.
pub fn keyed_row(index: PortId, in_packets: u64, out_packets: u64) -> WalkItem {
    Ok(TableRow::keyed(
        index,
        vec![in_packets.to_string(), out_packets.to_string()],
    ))
}

pub fn value_row(value: &str) -> WalkItem {
    Ok(TableRow::positional(vec![value.to_string()]))
}

pub fn timeout_fault() -> WalkItem {
    Err(WalkFault::Indication("No SNMP response received before timeout".into()))
}

pub fn status_fault() -> WalkItem {
    Err(WalkFault::Status {
        status: "noSuchName".into(),
        index: 1,
    })
}

/// Table whose device row order equals its ids ascending.
pub fn table(ports: &[(PortId, &str)]) -> PortTable {
    PortTable::from_names(names(ports))
}

pub fn names(ports: &[(PortId, &str)]) -> BTreeMap<PortId, String> {
    ports
        .iter()
        .map(|(id, name)| (*id, name.to_string()))
        .collect()
}
