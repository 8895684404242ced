// Port table: device row index -> configured display name

use serde::Serialize;
use std::collections::BTreeMap;

/// Device-assigned row index of one interface in the counter table.
pub type PortId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    pub name: String,
}

/// Monitored ports plus the device's row order.
///
/// `row_order` is every index the device reported, in walk order; positional
/// pairing of counter rows relies on it. Monitored ports may be a subset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortTable {
    ports: BTreeMap<PortId, Port>,
    row_order: Vec<PortId>,
}

impl PortTable {
    pub fn new(ports: BTreeMap<PortId, String>, row_order: Vec<PortId>) -> Self {
        let ports = ports
            .into_iter()
            .map(|(id, name)| (id, Port { id, name }))
            .collect();
        Self { ports, row_order }
    }

    /// Table whose row order is just its own ids ascending.
    pub fn from_names(ports: BTreeMap<PortId, String>) -> Self {
        let row_order = ports.keys().copied().collect();
        Self::new(ports, row_order)
    }

    pub fn contains(&self, id: PortId) -> bool {
        self.ports.contains_key(&id)
    }

    pub fn name(&self, id: PortId) -> Option<&str> {
        self.ports.get(&id).map(|p| p.name.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = PortId> + '_ {
        self.ports.keys().copied()
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn row_order(&self) -> &[PortId] {
        &self.row_order
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// id -> name, as exposed on the `ports` path.
    pub fn names(&self) -> BTreeMap<PortId, String> {
        self.ports
            .values()
            .map(|p| (p.id, p.name.clone()))
            .collect()
    }
}
