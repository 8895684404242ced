// Startup resolution of the port table (row index -> name).
// Walk failures degrade to a partial table; they never abort startup.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::models::{PortId, PortTable};
use crate::snmp_repo::TableWalker;

/// Column names used during resolution.
#[derive(Debug, Clone)]
pub struct ResolveColumns {
    pub index_oid: String,
    pub name_oid: String,
}

impl Default for ResolveColumns {
    fn default() -> Self {
        Self {
            index_oid: "ifIndex".into(),
            name_oid: "ifName".into(),
        }
    }
}

/// Builds the port table.
///
/// The index column is always walked: it gives the device row order that
/// positional pairing needs. With `explicit` ports the names come from
/// configuration; otherwise the name column is walked in lockstep with the
/// discovered indices. Blocks on the walker.
pub fn resolve(
    walker: &dyn TableWalker,
    explicit: Option<BTreeMap<PortId, String>>,
    columns: &ResolveColumns,
) -> PortTable {
    let mut row_order = discover_indices(walker, &columns.index_oid);

    let table = match explicit {
        Some(ports) => {
            if row_order.is_empty() && !ports.is_empty() {
                warn!(
                    operation = "resolve_ports",
                    "no row order from device; assuming configured ports in ascending order"
                );
                row_order = ports.keys().copied().collect();
            }
            for id in ports.keys().filter(|id| !row_order.contains(id)) {
                warn!(
                    operation = "resolve_ports",
                    port = id,
                    "configured port not present in device table"
                );
            }
            info!(ports = ports.len(), "using configured ports");
            PortTable::new(ports, row_order)
        }
        None => {
            info!("no ports configured; monitoring every port on the device");
            let names = discover_names(walker, &columns.name_oid, &row_order);
            PortTable::new(names, row_order)
        }
    };

    for port in table.ports() {
        info!(port = port.id, name = %port.name, "monitoring port");
    }
    table
}

fn discover_indices(walker: &dyn TableWalker, index_oid: &str) -> Vec<PortId> {
    let columns = [index_oid.to_string()];
    let mut indices = Vec::new();
    for item in walker.walk(&columns) {
        let row = match item {
            Ok(row) => row,
            Err(fault) => {
                warn!(
                    error = %fault,
                    operation = "walk_index",
                    discovered = indices.len(),
                    "index walk aborted; starting degraded"
                );
                break;
            }
        };
        let parsed = row
            .values
            .first()
            .and_then(|v| v.trim().parse::<PortId>().ok())
            .or(row.index);
        match parsed {
            Some(id) => indices.push(id),
            None => {
                warn!(
                    operation = "walk_index",
                    values = ?row.values,
                    "non-numeric row index; stopping index walk"
                );
                break;
            }
        }
    }
    indices
}

fn discover_names(
    walker: &dyn TableWalker,
    name_oid: &str,
    row_order: &[PortId],
) -> BTreeMap<PortId, String> {
    let columns = [name_oid.to_string()];
    let mut names = BTreeMap::new();
    for (pos, item) in walker.walk(&columns).enumerate() {
        let row = match item {
            Ok(row) => row,
            Err(fault) => {
                warn!(
                    error = %fault,
                    operation = "walk_names",
                    resolved = names.len(),
                    expected = row_order.len(),
                    "name walk aborted; port table is partial"
                );
                break;
            }
        };
        let id = match row.index {
            Some(id) => id,
            None => match row_order.get(pos) {
                Some(&id) => id,
                None => {
                    warn!(
                        operation = "walk_names",
                        resolved = names.len(),
                        expected = row_order.len(),
                        "name walk returned more rows than the index walk; ignoring the rest"
                    );
                    break;
                }
            },
        };
        let name = row.values.first().cloned().unwrap_or_default();
        names.insert(id, name);
    }
    names
}
