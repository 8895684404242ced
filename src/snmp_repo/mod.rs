// Management-protocol boundary: bulk table walks over an SNMP agent.
// The core consumes rows through `TableWalker`; PDU encoding lives behind it.

mod net_snmp;

pub use net_snmp::{ColumnWalk, NetSnmpWalker, parse_walk_output};

use crate::error::WalkFault;
use crate::models::PortId;

/// One table row: the values of the requested columns, in request order.
///
/// `index` is the row index when the binding reports it. Without it, callers
/// pair rows by walk position against the device's discovered row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub index: Option<PortId>,
    pub values: Vec<String>,
}

impl TableRow {
    pub fn keyed(index: PortId, values: Vec<String>) -> Self {
        Self {
            index: Some(index),
            values,
        }
    }

    pub fn positional(values: Vec<String>) -> Self {
        Self {
            index: None,
            values,
        }
    }
}

/// A fault ends the walk; nothing follows it.
pub type WalkItem = Result<TableRow, WalkFault>;

/// Walks a table from its first row in ascending (row-major) order,
/// requesting `columns` as parallel columns of each row.
///
/// Implementations are long-lived session objects shared by the resolver and
/// the poller, and may block; call them from a blocking context.
pub trait TableWalker: Send + Sync {
    fn walk<'a>(&'a self, columns: &[String]) -> Box<dyn Iterator<Item = WalkItem> + Send + 'a>;
}
