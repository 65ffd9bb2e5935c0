//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use grid_trace::config::NetworkConfig;
use grid_trace::network::{EquipmentId, EquipmentKind, Network, PhaseCode, TerminalId};

/// Terminal `sequence` of the equipment named `mrid`.
pub fn terminal(network: &Network, mrid: &str, sequence: usize) -> TerminalId {
    let equipment = network
        .find_equipment(mrid)
        .unwrap_or_else(|| panic!("no equipment {mrid}"));
    network
        .terminal_of(equipment, sequence)
        .unwrap_or_else(|| panic!("{mrid} has no terminal {sequence}"))
}

/// Builds a chain of two-terminal equipment, joining each item's second
/// terminal to the next item's first terminal.
pub fn chain(items: &[(&str, EquipmentKind)]) -> (Network, Vec<EquipmentId>) {
    let mut network = Network::new();
    let ids: Vec<EquipmentId> = items
        .iter()
        .map(|(mrid, kind)| {
            network
                .add_equipment(mrid, *kind, PhaseCode::ABC)
                .expect("equipment")
        })
        .collect();
    for pair in ids.windows(2) {
        let a = network.terminal_of(pair[0], 2).expect("second terminal");
        let b = network.terminal_of(pair[1], 1).expect("first terminal");
        network.connect_terminals(a, b).expect("connect");
    }
    (network, ids)
}

/// Lines `A - B - C`.
pub fn three_lines() -> Network {
    chain(&[
        ("A", EquipmentKind::AcLineSegment),
        ("B", EquipmentKind::AcLineSegment),
        ("C", EquipmentKind::AcLineSegment),
    ])
    .0
}

/// Lines `A` and `C` joined by switch `B`, normally open but currently closed.
pub fn open_point_chain() -> Network {
    let (mut network, ids) = chain(&[
        ("A", EquipmentKind::AcLineSegment),
        ("B", EquipmentKind::Disconnector),
        ("C", EquipmentKind::AcLineSegment),
    ]);
    let switch = network.equipment_mut(ids[1]);
    switch.set_normally_open(true);
    switch.set_open(false);
    network
}

/// Line `r` feeding lines `x` and `y` on one node, `y` feeding `z`.
pub fn fork() -> Network {
    let mut network = Network::new();
    for mrid in ["r", "x", "y", "z"] {
        network
            .add_equipment(mrid, EquipmentKind::AcLineSegment, PhaseCode::ABC)
            .expect("line");
    }
    let pairs = [(("r", 2), ("x", 1)), (("r", 2), ("y", 1)), (("y", 2), ("z", 1))];
    for ((a, sa), (b, sb)) in pairs {
        let ta = terminal(&network, a, sa);
        let tb = terminal(&network, b, sb);
        network.connect_terminals(ta, tb).expect("connect");
    }
    network
}

/// Breaker `cb` feeding line `A`, whose far node also holds `B:1` and
/// `C:1`. `B:2` and `C:2` share a node, closing the loop `B - C`. The
/// feeder `f` is headed at `cb:2`.
pub fn triangle() -> Network {
    let (mut network, _) = chain(&[
        ("cb", EquipmentKind::Breaker),
        ("A", EquipmentKind::AcLineSegment),
        ("B", EquipmentKind::AcLineSegment),
    ]);
    network
        .add_equipment("C", EquipmentKind::AcLineSegment, PhaseCode::ABC)
        .expect("C");
    let pairs = [(("A", 2), ("C", 1)), (("B", 2), ("C", 2))];
    for ((a, sa), (b, sb)) in pairs {
        let ta = terminal(&network, a, sa);
        let tb = terminal(&network, b, sb);
        network.connect_terminals(ta, tb).expect("connect");
    }
    let head = terminal(&network, "cb", 2);
    network.add_feeder("f", Some(head)).expect("feeder");
    network
}

pub fn preset(name: &str) -> Network {
    NetworkConfig::from_preset(name)
        .expect("preset")
        .build_network()
        .expect("build")
}
