//! Phase energization from energy sources.

use tracing::info;

use crate::network::model::{EquipmentKind, Network};
use crate::network::state::StateOperators;
use crate::traversal::{QueueDiscipline, StepContext};

use super::conditions::stop_at_open;
use super::network_trace::NetworkTraceBuilder;
use super::step::NetworkTraceStep;

/// Energizes every energy source with its nominal phases and spreads the
/// traced phases through the network along nominal phase paths, stopping at
/// open switches. Returns the number of sources traced.
pub fn energize_sources(network: &Network, state: &dyn StateOperators) -> usize {
    let mut trace = NetworkTraceBuilder::<(), ()>::basic(network, state, QueueDiscipline::BreadthFirst)
        .add_queue_condition(stop_at_open(network, state))
        .add_step_action(|step: &NetworkTraceStep<()>, _: &StepContext<()>| {
            let from = state.phase_status(network.terminal(step.path.from_terminal()));
            let to = state.phase_status(network.terminal(step.path.to_terminal()));
            for phase_path in step.path.nominal_phase_paths() {
                to.set(phase_path.to, from.get(phase_path.from));
            }
        })
        .build();

    let mut sources = 0;
    for id in network.equipment_ids() {
        let equipment = network.equipment(id);
        if equipment.kind() != EquipmentKind::EnergySource || !state.is_in_service(equipment) {
            continue;
        }
        for &terminal in equipment.terminals() {
            let phases = network.terminal(terminal).phases();
            let status = state.phase_status(network.terminal(terminal));
            for phase in phases.iter() {
                status.set(phase, phase);
            }
            // candidates rejected at an open switch stay visited, so each
            // source starts from a clean tracker
            trace.reset();
            trace.run(terminal, phases, ());
        }
        sources += 1;
    }
    info!(state = state.name(), sources, "phases energized");
    sources
}

/// Clears every traced phase under `state`.
pub fn clear_phases(network: &Network, state: &dyn StateOperators) {
    for terminal in network.terminal_ids() {
        state.phase_status(network.terminal(terminal)).clear();
    }
}
