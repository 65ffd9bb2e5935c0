//! Feeder direction assignment.
//!
//! Starting at a feeder head, every reachable terminal is tagged with the
//! direction of the head relative to it: `UPSTREAM` when entered from
//! another equipment, `DOWNSTREAM` when entered across its own equipment.
//! Busbar terminals are tagged `CONNECTOR`. Terminals on loops are reached
//! from both sides and end up `BOTH`.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::network::direction::FeederDirection;
use crate::network::model::{ContainerKind, EquipmentKind, Network, TerminalId};
use crate::network::phase::PhaseCode;
use crate::network::state::StateOperators;
use crate::traversal::{QueueDiscipline, RunSummary, StepContext, Tracker};

use super::conditions::stop_at_open;
use super::network_trace::NetworkTraceBuilder;
use super::step::{NetworkTraceStep, Path};

/// Tracker keyed on terminal, phases and the direction being applied, so a
/// terminal is stepped on at most once per direction.
#[derive(Debug, Default)]
pub struct DirectionTracker {
    visited: HashSet<(TerminalId, PhaseCode, FeederDirection)>,
}

impl Tracker<NetworkTraceStep<FeederDirection>> for DirectionTracker {
    fn has_visited(&self, item: &NetworkTraceStep<FeederDirection>) -> bool {
        self.visited.contains(&key(item))
    }

    fn visit(&mut self, item: &NetworkTraceStep<FeederDirection>) -> bool {
        self.visited.insert(key(item))
    }

    fn clear(&mut self) {
        self.visited.clear();
    }
}

fn key(item: &NetworkTraceStep<FeederDirection>) -> (TerminalId, PhaseCode, FeederDirection) {
    (item.path.to_terminal(), item.path.to_phases(), item.data)
}

fn direction_for(network: &Network, path: &Path) -> FeederDirection {
    if network.equipment(path.to_equipment()).kind() == EquipmentKind::BusbarSection {
        FeederDirection::Connector
    } else if path.traced_externally() {
        FeederDirection::Upstream
    } else {
        FeederDirection::Downstream
    }
}

/// Assigns directions out of the feeder head terminal `head`.
///
/// The trace stops on reaching `head` again or the head of any feeder in
/// `network`, so directions never leak past another feeder's breaker.
pub fn run_from_terminal(network: &Network, state: &dyn StateOperators, head: TerminalId) -> RunSummary {
    let mut heads = feeder_heads(network);
    heads.insert(head);
    run_with_heads(network, state, head, &heads)
}

/// Runs [`run_from_terminal`] from the head of every feeder that has one.
/// Returns the number of distinct heads traced.
pub fn assign_feeder_directions(network: &Network, state: &dyn StateOperators) -> usize {
    let heads = feeder_heads(network);
    for &head in &heads {
        run_with_heads(network, state, head, &heads);
    }
    info!(state = state.name(), feeders = heads.len(), "feeder direction assignment complete");
    heads.len()
}

/// Normal head terminals of every feeder in `network`.
pub fn feeder_heads(network: &Network) -> BTreeSet<TerminalId> {
    network
        .container_ids()
        .map(|id| network.container(id))
        .filter(|container| container.kind() == ContainerKind::Feeder)
        .filter_map(|container| container.normal_head_terminal())
        .collect()
}

fn run_with_heads(
    network: &Network,
    state: &dyn StateOperators,
    head: TerminalId,
    heads: &BTreeSet<TerminalId>,
) -> RunSummary {
    let mut trace = NetworkTraceBuilder::with_tracker(
        network,
        state,
        QueueDiscipline::BreadthFirst,
        DirectionTracker::default(),
        |_: &NetworkTraceStep<FeederDirection>, _: &StepContext<()>, path: &Path| {
            direction_for(network, path)
        },
    )
    .add_queue_condition(stop_at_open(network, state))
    .add_stop_condition(|step: &NetworkTraceStep<FeederDirection>, ctx: &StepContext<()>| {
        !ctx.is_start_item && heads.contains(&step.path.to_terminal())
    })
    .add_step_action(|step: &NetworkTraceStep<FeederDirection>, _: &StepContext<()>| {
        let terminal = network.terminal(step.path.to_terminal());
        state.feeder_direction(terminal).add(step.data);
    })
    .build();

    let summary = trace.run(head, PhaseCode::NONE, FeederDirection::Downstream);
    debug!(
        head = network.terminal(head).mrid(),
        state = state.name(),
        steps = summary.steps,
        "feeder directions assigned"
    );
    summary
}

/// Resets every terminal's direction under `state` to `NONE`.
pub fn clear(network: &Network, state: &dyn StateOperators) {
    for terminal in network.terminal_ids() {
        state
            .feeder_direction(network.terminal(terminal))
            .set(FeederDirection::None);
    }
}
