// Raw counter snapshots and the signed delta between two of them

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::{PortId, PortTable};

/// Milliseconds since the Unix epoch; 0 if the clock is before the epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortCounters {
    pub in_packets: u64,
    pub out_packets: u64,
}

impl PortCounters {
    pub fn new(in_packets: u64, out_packets: u64) -> Self {
        Self {
            in_packets,
            out_packets,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDelta {
    pub in_delta: i64,
    pub out_delta: i64,
}

/// Raw cumulative counters for every monitored port at one instant.
/// Immutable once built; holds exactly the ports of the table it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    timestamp: u64,
    counters: BTreeMap<PortId, PortCounters>,
}

impl Snapshot {
    pub fn new(timestamp: u64, counters: BTreeMap<PortId, PortCounters>) -> Self {
        Self {
            timestamp,
            counters,
        }
    }

    /// All-zero counters for every port in `table`.
    pub fn zeroed(table: &PortTable, timestamp: u64) -> Self {
        let counters = table.ids().map(|id| (id, PortCounters::default())).collect();
        Self::new(timestamp, counters)
    }

    /// Builds the next snapshot: ports present in `fresh` take the new values,
    /// every other port of `table` keeps its value from `fallback`.
    /// Entries of `fresh` outside the table are ignored.
    pub fn merge(
        table: &PortTable,
        fresh: &BTreeMap<PortId, PortCounters>,
        fallback: &Snapshot,
        timestamp: u64,
    ) -> Self {
        let counters = table
            .ids()
            .map(|id| {
                let value = fresh
                    .get(&id)
                    .or_else(|| fallback.counters.get(&id))
                    .copied()
                    .unwrap_or_default();
                (id, value)
            })
            .collect();
        Self::new(timestamp, counters)
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn counters(&self) -> &BTreeMap<PortId, PortCounters> {
        &self.counters
    }

    pub fn get(&self, port: PortId) -> Option<PortCounters> {
        self.counters.get(&port).copied()
    }
}

/// Per-port signed difference between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeltaSet(BTreeMap<PortId, PortDelta>);

impl DeltaSet {
    /// `current - previous` for every port. Negative values (wrap, device
    /// reset) pass through unmodified.
    ///
    /// # Panics
    /// If the two snapshots do not cover the same ports. Both are always
    /// built from one port table, so a mismatch is a bug in the caller.
    pub fn between(current: &Snapshot, previous: &Snapshot) -> Self {
        if !current.counters.keys().eq(previous.counters.keys()) {
            panic!(
                "delta between snapshots with different ports: {:?} vs {:?}",
                current.counters.keys().collect::<Vec<_>>(),
                previous.counters.keys().collect::<Vec<_>>()
            );
        }
        let deltas = current
            .counters
            .iter()
            .zip(previous.counters.values())
            .map(|((&id, cur), prev)| {
                (
                    id,
                    PortDelta {
                        in_delta: signed_diff(cur.in_packets, prev.in_packets),
                        out_delta: signed_diff(cur.out_packets, prev.out_packets),
                    },
                )
            })
            .collect();
        Self(deltas)
    }

    /// Replaces the delta of every port not in `fresh` with its value from
    /// `last`, so a port the fetch did not reach keeps its published rate.
    pub fn keep_stale(mut self, last: &DeltaSet, fresh: &BTreeSet<PortId>) -> Self {
        for (id, delta) in self.0.iter_mut() {
            if !fresh.contains(id)
                && let Some(prev) = last.0.get(id)
            {
                *delta = *prev;
            }
        }
        self
    }

    pub fn get(&self, port: PortId) -> Option<PortDelta> {
        self.0.get(&port).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PortId, &PortDelta)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn signed_diff(current: u64, previous: u64) -> i64 {
    let d = current as i128 - previous as i128;
    i64::try_from(d).unwrap_or(if d < 0 { i64::MIN } else { i64::MAX })
}
