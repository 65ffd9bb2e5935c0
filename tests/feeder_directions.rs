//! Integration tests for direction assignment, phase energization and
//! network trace ordering.

mod common;

use std::cell::RefCell;
use std::thread;

use grid_trace::io::export::write_directions_csv;
use grid_trace::network::{CURRENT, FeederDirection, NORMAL, Network, PhaseCode, StateOperators};
use grid_trace::trace::set_direction::{assign_feeder_directions, clear};
use grid_trace::trace::set_phases::energize_sources;
use grid_trace::trace::{NetworkTraceBuilder, NetworkTraceStep};
use grid_trace::traversal::{QueueDiscipline, StepContext};

fn direction(network: &Network, state: &dyn StateOperators, mrid: &str, sequence: usize) -> FeederDirection {
    let terminal = common::terminal(network, mrid, sequence);
    state.feeder_direction(network.terminal(terminal)).get()
}

fn csv(network: &Network) -> Vec<u8> {
    let mut buf = Vec::new();
    write_directions_csv(network, &mut buf).expect("csv");
    buf
}

#[test]
fn ring_terminals_are_fed_from_both_sides() {
    let network = common::preset("ring");
    assert_eq!(assign_feeder_directions(&network, NORMAL), 1);

    for line in ["l1", "l2", "l3"] {
        for sequence in [1, 2] {
            assert_eq!(
                direction(&network, NORMAL, line, sequence),
                FeederDirection::Both,
                "{line}:{sequence}"
            );
        }
    }
    assert_eq!(direction(&network, NORMAL, "bus", 1), FeederDirection::Connector);
    assert_eq!(direction(&network, NORMAL, "load", 1), FeederDirection::Upstream);
    assert_eq!(direction(&network, NORMAL, "src", 1), FeederDirection::None);
}

#[test]
fn linear_feeder_alternates_upstream_and_downstream() {
    let network = common::preset("linear");
    assign_feeder_directions(&network, NORMAL);

    assert_eq!(direction(&network, NORMAL, "cb", 2), FeederDirection::Downstream);
    for line in ["l1", "l2", "l3"] {
        assert_eq!(direction(&network, NORMAL, line, 1), FeederDirection::Upstream);
        assert_eq!(direction(&network, NORMAL, line, 2), FeederDirection::Downstream);
    }
    assert_eq!(direction(&network, NORMAL, "load", 1), FeederDirection::Upstream);
}

#[test]
fn assignment_is_idempotent() {
    let network = common::preset("ring");
    assign_feeder_directions(&network, NORMAL);
    energize_sources(&network, NORMAL);
    let first = csv(&network);

    assign_feeder_directions(&network, NORMAL);
    energize_sources(&network, NORMAL);
    assert_eq!(csv(&network), first);

    clear(&network, NORMAL);
    assign_feeder_directions(&network, NORMAL);
    assert_eq!(csv(&network), first);
}

#[test]
fn open_point_separates_feeders_only_in_the_normal_state() {
    let network = common::preset("open_point");
    assign_feeder_directions(&network, NORMAL);
    assign_feeder_directions(&network, CURRENT);

    // normally open: each feeder stops at its side of the switch
    assert_eq!(direction(&network, NORMAL, "op", 1), FeederDirection::Upstream);
    assert_eq!(direction(&network, NORMAL, "op", 2), FeederDirection::Upstream);
    assert_eq!(direction(&network, NORMAL, "l1", 2), FeederDirection::Downstream);

    // currently closed: both feeders reach every line terminal
    for (mrid, sequence) in [("l1", 1), ("l1", 2), ("op", 1), ("op", 2), ("l2", 1), ("l2", 2)] {
        assert_eq!(
            direction(&network, CURRENT, mrid, sequence),
            FeederDirection::Both,
            "{mrid}:{sequence}"
        );
    }
}

#[test]
fn closed_open_point_stops_at_the_other_feeder_head() {
    let network = common::preset("open_point");
    assign_feeder_directions(&network, CURRENT);

    for (mrid, sequence) in [("src1", 1), ("cb1", 1), ("src2", 1), ("cb2", 1)] {
        assert_eq!(
            direction(&network, CURRENT, mrid, sequence),
            FeederDirection::None,
            "{mrid}:{sequence}"
        );
    }
    // each head is entered from the other feeder as well as traced out of
    assert_eq!(direction(&network, CURRENT, "cb1", 2), FeederDirection::Both);
    assert_eq!(direction(&network, CURRENT, "cb2", 2), FeederDirection::Both);
}

#[test]
fn loop_within_a_feeder_is_fed_from_both_sides() {
    let network = common::triangle();
    assert_eq!(assign_feeder_directions(&network, NORMAL), 1);

    for (mrid, sequence) in [("B", 1), ("B", 2), ("C", 1), ("C", 2)] {
        assert_eq!(
            direction(&network, NORMAL, mrid, sequence),
            FeederDirection::Both,
            "{mrid}:{sequence}"
        );
    }
    assert_eq!(direction(&network, NORMAL, "cb", 1), FeederDirection::None);
}

#[test]
fn normal_and_current_passes_can_run_in_parallel() {
    let sequential = common::preset("open_point");
    assign_feeder_directions(&sequential, NORMAL);
    assign_feeder_directions(&sequential, CURRENT);
    energize_sources(&sequential, NORMAL);
    energize_sources(&sequential, CURRENT);

    let parallel = common::preset("open_point");
    thread::scope(|s| {
        s.spawn(|| {
            assign_feeder_directions(&parallel, NORMAL);
            energize_sources(&parallel, NORMAL);
        });
        s.spawn(|| {
            assign_feeder_directions(&parallel, CURRENT);
            energize_sources(&parallel, CURRENT);
        });
    });

    assert_eq!(csv(&parallel), csv(&sequential));
}

#[test]
fn open_switch_stops_energization_in_that_state_only() {
    let network = common::preset("open_point");
    energize_sources(&network, NORMAL);
    energize_sources(&network, CURRENT);

    let op2 = network.terminal(common::terminal(&network, "op", 2));
    // normally: op:2 is only reached from src2
    assert_eq!(NORMAL.phase_status(op2).traced(), PhaseCode::ABC);
    let l1 = network.terminal(common::terminal(&network, "l1", 2));
    assert_eq!(CURRENT.phase_status(l1).traced(), PhaseCode::ABC);
}

fn order(network: &Network, discipline: QueueDiscipline) -> Vec<String> {
    let seen = RefCell::new(Vec::new());
    let mut trace = NetworkTraceBuilder::<(), ()>::basic(network, NORMAL, discipline)
        .add_step_action(|step: &NetworkTraceStep<()>, _: &StepContext<()>| {
            seen.borrow_mut()
                .push(network.terminal(step.path.to_terminal()).mrid().to_string())
        })
        .build();
    trace.run(common::terminal(network, "r", 2), PhaseCode::NONE, ());
    drop(trace);
    seen.into_inner()
}

fn position(order: &[String], mrid: &str) -> usize {
    order
        .iter()
        .position(|m| m == mrid)
        .unwrap_or_else(|| panic!("{mrid} not visited"))
}

#[test]
fn breadth_first_finishes_each_level_before_the_next() {
    let network = common::fork();
    let bfs = order(&network, QueueDiscipline::BreadthFirst);
    assert_eq!(bfs.len(), 7);
    assert_eq!(bfs[0], "r-t2");
    assert!(position(&bfs, "x-t1") < position(&bfs, "y-t2"));
    assert!(position(&bfs, "y-t1") < position(&bfs, "x-t2"));
    assert!(position(&bfs, "x-t2") < position(&bfs, "z-t1"));
}

#[test]
fn depth_first_finishes_a_branch_before_the_sibling() {
    let network = common::fork();
    let dfs = order(&network, QueueDiscipline::DepthFirst);
    assert_eq!(dfs.len(), 7);
    assert_eq!(dfs[0], "r-t2");
    let z_done = position(&dfs, "z-t2");
    let x_start = position(&dfs, "x-t1");
    let x_done = position(&dfs, "x-t2");
    let y_start = position(&dfs, "y-t1");
    assert!(z_done < x_start || x_done < y_start);
}

#[test]
fn stopping_still_actions_the_item_but_skipping_does_not() {
    let network = common::fork();
    let y1 = common::terminal(&network, "y", 1);

    let stopped = RefCell::new(Vec::new());
    let mut trace = NetworkTraceBuilder::<(), ()>::basic(&network, NORMAL, QueueDiscipline::BreadthFirst)
        .add_stop_condition(|step: &NetworkTraceStep<()>, _: &StepContext<()>| step.path.to_terminal() == y1)
        .add_step_action(|step: &NetworkTraceStep<()>, _: &StepContext<()>| {
            stopped.borrow_mut().push(step.path.to_terminal())
        })
        .build();
    trace.run(common::terminal(&network, "r", 2), PhaseCode::NONE, ());
    drop(trace);
    let stopped = stopped.into_inner();
    assert!(stopped.contains(&y1));
    assert!(!stopped.contains(&common::terminal(&network, "y", 2)));

    let skipped = RefCell::new(Vec::new());
    let mut trace = NetworkTraceBuilder::<(), ()>::basic(&network, NORMAL, QueueDiscipline::BreadthFirst)
        .add_queue_condition(
            |next: &NetworkTraceStep<()>, _: &StepContext<()>, _: &NetworkTraceStep<()>, _: &StepContext<()>| {
                next.path.to_terminal() != y1
            },
        )
        .add_step_action(|step: &NetworkTraceStep<()>, _: &StepContext<()>| {
            skipped.borrow_mut().push(step.path.to_terminal())
        })
        .build();
    trace.run(common::terminal(&network, "r", 2), PhaseCode::NONE, ());
    drop(trace);
    let skipped = skipped.into_inner();
    assert!(!skipped.contains(&y1));
    assert_eq!(skipped.len(), 3);
}
