// Domain models: port table entries, raw counter snapshots, per-cycle deltas

mod counters;
mod port;

pub use counters::{DeltaSet, PortCounters, PortDelta, Snapshot, now_ms};
pub use port::{Port, PortId, PortTable};
