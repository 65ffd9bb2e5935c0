//! Integration tests for network descriptions, export and equivalent branches.

mod common;

use std::fs;

use grid_trace::config::NetworkConfig;
use grid_trace::io::export::{HEADER, export_directions_csv};
use grid_trace::network::{EquipmentKind, NORMAL, add_equivalents_at_edges, find_container_edges};
use grid_trace::trace::set_direction::assign_feeder_directions;

const SMALL_FEEDER: &str = r#"
[[equipment]]
mrid = "src"
kind = "energy_source"

[[equipment]]
mrid = "cb"
kind = "breaker"
feeders = ["f1"]

[[equipment]]
mrid = "cable"
kind = "ac_line_segment"
phases = "ABCN"
feeders = ["f1"]

[[connection]]
node = "n0"
terminals = ["src:1", "cb:1"]

[[connection]]
node = "n1"
terminals = ["cb:2", "cable:1"]

[[feeder]]
mrid = "f1"
head = "cb:2"
"#;

#[test]
fn toml_file_round_trip_through_the_trace() {
    let path = std::env::temp_dir().join(format!("grid-trace-{}-feeder.toml", std::process::id()));
    fs::write(&path, SMALL_FEEDER).expect("write toml");
    let cfg = NetworkConfig::from_toml_file(&path).expect("load");
    fs::remove_file(&path).ok();

    assert!(cfg.validate().is_empty());
    let network = cfg.build_network().expect("build");
    assert_eq!(assign_feeder_directions(&network, NORMAL), 1);

    let csv_path = std::env::temp_dir().join(format!("grid-trace-{}-directions.csv", std::process::id()));
    export_directions_csv(&network, &csv_path).expect("export");
    let written = fs::read_to_string(&csv_path).expect("read csv");
    fs::remove_file(&csv_path).ok();

    let mut lines = written.lines();
    assert_eq!(lines.next(), Some(HEADER));
    assert_eq!(lines.count(), network.terminal_count());
    assert!(written.contains("cable-t2,cable,2,ABCN,DOWNSTREAM,NONE"));
}

#[test]
fn missing_file_reports_the_network_field() {
    let err = NetworkConfig::from_toml_file(std::path::Path::new("/nonexistent/grid.toml"))
        .expect_err("missing file");
    assert_eq!(err.field, "network");
}

#[test]
fn invalid_description_lists_every_problem() {
    let toml = r#"
[[equipment]]
mrid = "cb"
kind = "breaker"
terminals = 1
feeders = ["nowhere"]

[[connection]]
node = "n0"
terminals = ["cb:1", "ghost:1"]

[[feeder]]
mrid = "cb"
"#;
    let errors = NetworkConfig::from_toml_str(toml).expect("parse").validate();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    for expected in [
        "equipment[0].terminals",
        "equipment[0].feeders[0]",
        "connection[0].terminals[1]",
        "feeder[0].mrid",
    ] {
        assert!(fields.contains(&expected), "missing {expected} in {fields:?}");
    }
}

#[test]
fn feeder_edges_get_equivalent_branches() {
    let mut network = common::preset("open_point");
    let f1 = network.find_container("f1").expect("f1");

    let edges = find_container_edges(&network, f1, NORMAL);
    let edge_mrids: Vec<(&str, &str)> = edges
        .iter()
        .map(|(eq, node)| (network.equipment(*eq).mrid(), network.node(*node).mrid()))
        .collect();
    assert_eq!(edge_mrids, vec![("cb1", "s1"), ("op", "n3")]);

    let connections = add_equivalents_at_edges(
        &mut network,
        f1,
        NORMAL,
        &[EquipmentKind::EnergySource, EquipmentKind::EnergyConsumer],
    )
    .expect("equivalents");
    assert_eq!(connections.len(), 2);
    for connection in &connections {
        for (branch, attached) in &connection.branch_to_equipment {
            assert_eq!(network.equipment(*branch).kind(), EquipmentKind::EquivalentBranch);
            assert_eq!(network.equipment(*branch).terminals().len(), 2);
            assert_eq!(attached.len(), 2);
            for item in attached {
                assert_eq!(network.equipment(*item).terminals().len(), 1);
            }
        }
    }
    assert!(network.find_equipment("op-n3-eb").is_some());
}
