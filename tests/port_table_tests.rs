// Port table resolution: explicit config, discovery, degraded starts

mod common;

use common::{ScriptedWalker, names, status_fault, timeout_fault, value_row};
use snmp_counters::port_table::{ResolveColumns, resolve};
use snmp_counters::snmp_repo::TableRow;

fn walker_with_indices(indices: &[&str]) -> ScriptedWalker {
    let w = ScriptedWalker::new();
    w.push(&["ifIndex"], indices.iter().map(|i| value_row(i)).collect());
    w
}

#[test]
fn explicit_ports_are_used_verbatim() {
    let w = walker_with_indices(&["1", "2", "6", "7"]);
    let explicit = names(&[(1, "detector"), (6, "node_1"), (7, "node_2")]);
    let t = resolve(&w, Some(explicit.clone()), &ResolveColumns::default());
    assert_eq!(t.names(), explicit);
    assert_eq!(t.row_order(), &[1, 2, 6, 7]);
    // index walk only; names never queried
    assert_eq!(w.calls(), 1);
}

#[test]
fn discovered_names_zip_with_index_order() {
    let w = walker_with_indices(&["1", "2", "3"]);
    w.push(
        &["ifName"],
        vec![value_row("eth0"), value_row("eth1"), value_row("eth2")],
    );
    let t = resolve(&w, None, &ResolveColumns::default());
    assert_eq!(t.names(), names(&[(1, "eth0"), (2, "eth1"), (3, "eth2")]));
}

#[test]
fn discovered_names_prefer_explicit_row_index() {
    let w = walker_with_indices(&["1", "2"]);
    w.push(
        &["ifName"],
        vec![
            Ok(TableRow::keyed(2, vec!["uplink".into()])),
            Ok(TableRow::keyed(1, vec!["mgmt".into()])),
        ],
    );
    let t = resolve(&w, None, &ResolveColumns::default());
    assert_eq!(t.name(1), Some("mgmt"));
    assert_eq!(t.name(2), Some("uplink"));
}

#[test]
fn name_walk_abort_yields_partial_table() {
    let w = walker_with_indices(&["1", "2", "3"]);
    w.push(&["ifName"], vec![value_row("eth0"), timeout_fault()]);
    let t = resolve(&w, None, &ResolveColumns::default());
    assert_eq!(t.names(), names(&[(1, "eth0")]));
    assert_eq!(t.row_order(), &[1, 2, 3]);
}

#[test]
fn index_walk_abort_keeps_indices_fetched_so_far() {
    let w = ScriptedWalker::new();
    w.push(&["ifIndex"], vec![value_row("4"), value_row("5"), status_fault()]);
    w.push(
        &["ifName"],
        vec![value_row("a"), value_row("b"), value_row("c")],
    );
    let t = resolve(&w, None, &ResolveColumns::default());
    assert_eq!(t.names(), names(&[(4, "a"), (5, "b")]));
}

#[test]
fn unreachable_device_without_config_gives_empty_table() {
    let w = ScriptedWalker::new();
    w.push(&["ifIndex"], vec![timeout_fault()]);
    let t = resolve(&w, None, &ResolveColumns::default());
    assert!(t.is_empty());
    assert!(t.row_order().is_empty());
}

#[test]
fn unreachable_device_with_config_assumes_configured_order() {
    let w = ScriptedWalker::new();
    w.push(&["ifIndex"], vec![timeout_fault()]);
    let t = resolve(
        &w,
        Some(names(&[(7, "node_2"), (1, "detector")])),
        &ResolveColumns::default(),
    );
    assert_eq!(t.len(), 2);
    assert_eq!(t.row_order(), &[1, 7]);
}

#[test]
fn custom_column_names_are_walked() {
    let w = ScriptedWalker::new();
    w.push(&["IF-MIB::ifIndex"], vec![value_row("9")]);
    w.push(&["ifDescr"], vec![value_row("port nine")]);
    let columns = ResolveColumns {
        index_oid: "IF-MIB::ifIndex".into(),
        name_oid: "ifDescr".into(),
    };
    let t = resolve(&w, None, &columns);
    assert_eq!(t.name(9), Some("port nine"));
}

#[test]
fn name_rows_beyond_index_walk_are_ignored() {
    let w = walker_with_indices(&["1", "2"]);
    w.push(
        &["ifName"],
        vec![value_row("eth0"), value_row("eth1"), value_row("eth2")],
    );
    let t = resolve(&w, None, &ResolveColumns::default());
    assert_eq!(t.names(), names(&[(1, "eth0"), (2, "eth1")]));
}
