// Counter store: seeded state, interval floor, parameter-tree reads and writes

mod common;

use common::table;
use serde_json::json;
use snmp_counters::error::TreeError;
use snmp_counters::models::{DeltaSet, PortCounters, PortDelta, Snapshot};
use snmp_counters::store::{CounterStore, PollerState};
use std::sync::Arc;

fn store() -> CounterStore {
    CounterStore::new(
        Arc::new(table(&[(1, "detector"), (6, "node_1"), (7, "node_2")])),
        1.0,
    )
}

fn publish(store: &CounterStore, counters: &[(u32, u64, u64)]) {
    let last = store.state();
    let next = Arc::new(Snapshot::new(
        last.current.timestamp() + 1,
        counters
            .iter()
            .map(|&(id, i, o)| (id, PortCounters::new(i, o)))
            .collect(),
    ));
    let delta = DeltaSet::between(&next, &last.current);
    store.publish(PollerState {
        previous: last.current.clone(),
        current: next,
        delta,
    });
}

#[test]
fn fresh_store_reports_zero_totals_and_deltas() {
    let s = store();
    let totals = s.totals();
    assert_eq!(totals.len(), 3);
    assert!(totals.values().all(|c| *c == PortCounters::default()));
    let deltas = s.deltas();
    assert_eq!(deltas.len(), 3);
    assert!(deltas.iter().all(|(_, d)| *d == PortDelta::default()));
}

#[test]
fn interval_is_floored_at_one_second() {
    let s = store();
    assert_eq!(s.set_interval(0.2), 1.0);
    assert_eq!(s.interval(), 1.0);
    assert_eq!(s.set_interval(5.0), 5.0);
    assert_eq!(s.interval(), 5.0);
}

#[test]
fn construction_floors_interval_too() {
    let s = CounterStore::new(Arc::new(table(&[(1, "a")])), 0.5);
    assert_eq!(s.interval(), 1.0);
    let s = CounterStore::new(Arc::new(table(&[(1, "a")])), f64::NAN);
    assert_eq!(s.interval(), 1.0);
}

#[test]
fn root_get_returns_whole_tree() {
    let s = store();
    let tree = s.get("").unwrap();
    for key in [
        "total_packet_count",
        "relative_packet_count",
        "ports",
        "interval",
        "timestamp",
    ] {
        assert!(tree.get(key).is_some(), "missing {key}");
    }
    assert_eq!(tree["ports"], json!({"1": "detector", "6": "node_1", "7": "node_2"}));
    assert_eq!(tree["interval"], json!(1.0));
}

#[test]
fn get_reads_published_counters() {
    let s = store();
    publish(&s, &[(1, 10, 5), (6, 20, 8), (7, 0, 0)]);
    publish(&s, &[(1, 15, 9), (6, 25, 8), (7, 0, 0)]);
    assert_eq!(
        s.get("total_packet_count/1").unwrap(),
        json!({"inPackets": 15, "outPackets": 9})
    );
    assert_eq!(
        s.get("relative_packet_count/6").unwrap(),
        json!({"inDelta": 5, "outDelta": 0})
    );
    assert_eq!(s.get("/relative_packet_count/1/inDelta/").unwrap(), json!(5));
}

#[test]
fn unknown_path_is_a_client_error() {
    let s = store();
    let err = s.get("nonexistent").unwrap_err();
    assert_eq!(err, TreeError::InvalidPath("nonexistent".into()));
    assert!(err.is_client_error());
    assert!(s.get("total_packet_count/99").is_err());
}

#[test]
fn set_interval_path_accepts_numbers() {
    let s = store();
    s.set("interval", &json!(5)).unwrap();
    assert_eq!(s.interval(), 5.0);
    s.set("interval", &json!(0.2)).unwrap();
    assert_eq!(s.interval(), 1.0);
}

#[test]
fn non_numeric_interval_is_rejected_unchanged() {
    let s = store();
    s.set_interval(3.0);
    let err = s.set("interval", &json!("fast")).unwrap_err();
    assert!(matches!(err, TreeError::InvalidValue(_)));
    assert!(err.is_client_error());
    assert_eq!(s.interval(), 3.0);
}

#[test]
fn root_set_with_interval_object() {
    let s = store();
    s.set("", &json!({"interval": 2.5})).unwrap();
    assert_eq!(s.interval(), 2.5);
}

#[test]
fn root_set_rejects_whole_request_on_bad_key() {
    let s = store();
    let err = s
        .set("", &json!({"interval": 9.0, "ports": {}}))
        .unwrap_err();
    assert_eq!(err, TreeError::ReadOnly("ports".into()));
    assert_eq!(s.interval(), 1.0);

    let err = s.set("", &json!({"bogus": 1})).unwrap_err();
    assert_eq!(err, TreeError::InvalidPath("bogus".into()));
}

#[test]
fn writes_to_read_only_or_unknown_paths_fail() {
    let s = store();
    assert_eq!(
        s.set("total_packet_count", &json!({})).unwrap_err(),
        TreeError::ReadOnly("total_packet_count".into())
    );
    assert_eq!(
        s.set("nonexistent", &json!(1)).unwrap_err(),
        TreeError::InvalidPath("nonexistent".into())
    );
}

#[test]
fn port_table_is_exposed() {
    let s = store();
    assert_eq!(s.port_table().len(), 3);
    assert_eq!(s.port_table().name(7), Some("node_2"));
}
