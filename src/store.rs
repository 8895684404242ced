// Counter store: the single shared state cell between the poller and readers.
// Readers clone an Arc under a short read lock; the poller swaps in a fully
// built state, so `current` and `delta` are always read as one unit.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::config::MIN_SAMPLING_INTERVAL;
use crate::error::TreeError;
use crate::models::{DeltaSet, PortCounters, PortId, PortTable, Snapshot, now_ms};

pub const TOTAL_PACKET_COUNT: &str = "total_packet_count";
pub const RELATIVE_PACKET_COUNT: &str = "relative_packet_count";
pub const PORTS: &str = "ports";
pub const INTERVAL: &str = "interval";
pub const TIMESTAMP: &str = "timestamp";

/// Latest published pair of snapshots and the delta between them.
#[derive(Debug, Clone)]
pub struct PollerState {
    pub current: Arc<Snapshot>,
    pub previous: Arc<Snapshot>,
    pub delta: DeltaSet,
}

impl PollerState {
    /// Both snapshots all-zero, so the first delta is zero rather than undefined.
    pub fn seeded(table: &PortTable) -> Self {
        let zero = Arc::new(Snapshot::zeroed(table, now_ms()));
        let delta = DeltaSet::between(&zero, &zero);
        Self {
            current: zero.clone(),
            previous: zero,
            delta,
        }
    }
}

pub struct CounterStore {
    table: Arc<PortTable>,
    state: RwLock<Arc<PollerState>>,
    /// f64 seconds, stored as bits.
    interval: AtomicU64,
}

impl CounterStore {
    pub fn new(table: Arc<PortTable>, interval_secs: f64) -> Self {
        let state = PollerState::seeded(&table);
        Self {
            table,
            state: RwLock::new(Arc::new(state)),
            interval: AtomicU64::new(clamp_interval(interval_secs).to_bits()),
        }
    }

    /// The state as of the most recent publish. Never waits on a fetch.
    pub fn state(&self) -> Arc<PollerState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the published state. Only the poller calls this.
    pub fn publish(&self, next: PollerState) {
        let next = Arc::new(next);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub fn totals(&self) -> BTreeMap<PortId, PortCounters> {
        self.state().current.counters().clone()
    }

    pub fn deltas(&self) -> DeltaSet {
        self.state().delta.clone()
    }

    pub fn port_table(&self) -> &Arc<PortTable> {
        &self.table
    }

    pub fn interval(&self) -> f64 {
        f64::from_bits(self.interval.load(Ordering::Relaxed))
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval()).unwrap_or(Duration::MAX)
    }

    /// Stores `seconds` floored at MIN_SAMPLING_INTERVAL; returns the stored value.
    /// Takes effect at the next inter-cycle sleep.
    pub fn set_interval(&self, seconds: f64) -> f64 {
        let stored = clamp_interval(seconds);
        if stored != seconds {
            tracing::debug!(
                requested = seconds,
                floor = MIN_SAMPLING_INTERVAL,
                "interval must not be lower than the floor"
            );
        }
        self.interval.store(stored.to_bits(), Ordering::Relaxed);
        tracing::info!(interval_secs = stored, "sampling interval set");
        stored
    }

    /// Reads the parameter tree. Empty path returns the whole tree; nested
    /// paths descend (`total_packet_count/6/inPackets`).
    pub fn get(&self, path: &str) -> Result<Value, TreeError> {
        let tree = self.tree()?;
        let mut node = &tree;
        for segment in segments(path) {
            node = node
                .as_object()
                .and_then(|m| m.get(segment))
                .ok_or_else(|| TreeError::InvalidPath(path.to_string()))?;
        }
        Ok(node.clone())
    }

    /// Writes the parameter tree. Only `interval` is writable, either at its
    /// own path or as `{"interval": n}` at the root. Nothing is changed
    /// unless the whole request is valid.
    pub fn set(&self, path: &str, value: &Value) -> Result<(), TreeError> {
        let segs: Vec<&str> = segments(path).collect();
        match segs.as_slice() {
            [] => {
                let obj = value.as_object().ok_or_else(|| {
                    TreeError::InvalidValue(format!("expected an object at the root, got {}", value))
                })?;
                let mut interval = None;
                for (key, v) in obj {
                    match key.as_str() {
                        INTERVAL => interval = Some(interval_value(v)?),
                        TOTAL_PACKET_COUNT | RELATIVE_PACKET_COUNT | PORTS | TIMESTAMP => {
                            return Err(TreeError::ReadOnly(key.clone()));
                        }
                        _ => return Err(TreeError::InvalidPath(key.clone())),
                    }
                }
                if let Some(seconds) = interval {
                    self.set_interval(seconds);
                }
                Ok(())
            }
            [INTERVAL] => {
                let seconds = interval_value(value)?;
                self.set_interval(seconds);
                Ok(())
            }
            _ => match self.get(path) {
                Ok(_) => Err(TreeError::ReadOnly(path.to_string())),
                Err(e) => Err(e),
            },
        }
    }

    fn tree(&self) -> Result<Value, TreeError> {
        let state = self.state();
        let mut root = Map::new();
        root.insert(
            TOTAL_PACKET_COUNT.into(),
            to_value(state.current.counters())?,
        );
        root.insert(RELATIVE_PACKET_COUNT.into(), to_value(&state.delta)?);
        root.insert(PORTS.into(), to_value(&self.table.names())?);
        root.insert(INTERVAL.into(), Value::from(self.interval()));
        root.insert(TIMESTAMP.into(), Value::from(state.current.timestamp()));
        Ok(Value::Object(root))
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value, TreeError> {
    serde_json::to_value(v).map_err(|e| TreeError::Internal(e.to_string()))
}

fn interval_value(v: &Value) -> Result<f64, TreeError> {
    v.as_f64()
        .filter(|s| s.is_finite())
        .ok_or_else(|| TreeError::InvalidValue(format!("interval must be a number, got {}", v)))
}

fn clamp_interval(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(MIN_SAMPLING_INTERVAL)
    } else {
        MIN_SAMPLING_INTERVAL
    }
}
