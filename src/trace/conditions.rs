//! Ready-made conditions for network traces.

use crate::network::direction::FeederDirection;
use crate::network::model::Network;
use crate::network::state::StateOperators;
use crate::traversal::{QueueCondition, StepContext};

use super::step::NetworkTraceStep;

/// Refuses internal hops through equipment that is open under the bound state.
///
/// Phase-agnostic steps are blocked when the equipment is open on any phase;
/// phase-aware steps only when every traced phase is open.
#[derive(Debug, Clone, Copy)]
pub struct StopAtOpen<'a> {
    network: &'a Network,
    state: &'a dyn StateOperators,
}

pub fn stop_at_open<'a>(network: &'a Network, state: &'a dyn StateOperators) -> StopAtOpen<'a> {
    StopAtOpen { network, state }
}

impl<D, V> QueueCondition<NetworkTraceStep<D>, V> for StopAtOpen<'_> {
    fn should_queue(
        &self,
        next: &NetworkTraceStep<D>,
        _: &StepContext<V>,
        _: &NetworkTraceStep<D>,
        _: &StepContext<V>,
    ) -> bool {
        let path = &next.path;
        if path.traced_externally() {
            return true;
        }
        let equipment = self.network.equipment(path.to_equipment());
        let phase_paths = path.nominal_phase_paths();
        if phase_paths.is_empty() {
            !self.state.is_open(equipment, None)
        } else {
            phase_paths
                .iter()
                .any(|p| !self.state.is_open(equipment, Some(p.to)))
        }
    }
}

/// Caps the number of external hops from the start item.
#[derive(Debug, Clone, Copy)]
pub struct EquipmentStepLimit {
    limit: usize,
}

pub fn limit_equipment_steps(limit: usize) -> EquipmentStepLimit {
    EquipmentStepLimit { limit }
}

impl<D, V> QueueCondition<NetworkTraceStep<D>, V> for EquipmentStepLimit {
    fn should_queue(
        &self,
        next: &NetworkTraceStep<D>,
        _: &StepContext<V>,
        _: &NetworkTraceStep<D>,
        _: &StepContext<V>,
    ) -> bool {
        next.equipment_steps <= self.limit
    }
}

/// Only follows hops that move in `direction` according to the feeder
/// directions already assigned under the bound state.
///
/// An internal hop must land on a terminal whose direction contains
/// `direction`; an external hop must land on one containing its opposite.
#[derive(Debug, Clone, Copy)]
pub struct DirectionCondition<'a> {
    network: &'a Network,
    state: &'a dyn StateOperators,
    direction: FeederDirection,
}

pub fn upstream<'a>(network: &'a Network, state: &'a dyn StateOperators) -> DirectionCondition<'a> {
    DirectionCondition {
        network,
        state,
        direction: FeederDirection::Upstream,
    }
}

pub fn downstream<'a>(network: &'a Network, state: &'a dyn StateOperators) -> DirectionCondition<'a> {
    DirectionCondition {
        network,
        state,
        direction: FeederDirection::Downstream,
    }
}

impl<D, V> QueueCondition<NetworkTraceStep<D>, V> for DirectionCondition<'_> {
    fn should_queue(
        &self,
        next: &NetworkTraceStep<D>,
        _: &StepContext<V>,
        _: &NetworkTraceStep<D>,
        _: &StepContext<V>,
    ) -> bool {
        let terminal = self.network.terminal(next.path.to_terminal());
        let assigned = self.state.feeder_direction(terminal).get();
        if next.path.traced_internally() {
            assigned.contains(self.direction)
        } else {
            assigned.contains(!self.direction)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::network::model::{EquipmentId, EquipmentKind};
    use crate::network::phase::{PhaseCode, SinglePhaseKind};
    use crate::network::state::{CURRENT, NORMAL};
    use crate::trace::network_trace::NetworkTraceBuilder;
    use crate::traversal::QueueDiscipline;

    /// line a - breaker cb - line b
    fn switched() -> (Network, EquipmentId, EquipmentId, EquipmentId) {
        let mut network = Network::new();
        let a = network
            .add_equipment("a", EquipmentKind::AcLineSegment, PhaseCode::ABC)
            .expect("a");
        let cb = network
            .add_equipment("cb", EquipmentKind::Breaker, PhaseCode::ABC)
            .expect("cb");
        let b = network
            .add_equipment("b", EquipmentKind::AcLineSegment, PhaseCode::ABC)
            .expect("b");
        for (x, y) in [(a, cb), (cb, b)] {
            let from = network.terminal_of(x, 2).expect("t2");
            let to = network.terminal_of(y, 1).expect("t1");
            network.connect_terminals(from, to).expect("connect");
        }
        (network, a, cb, b)
    }

    fn reaches(network: &Network, state: &'static dyn StateOperators, from: EquipmentId, target: EquipmentId, phases: PhaseCode) -> bool {
        let found = RefCell::new(false);
        let mut trace = NetworkTraceBuilder::<(), ()>::basic(network, state, QueueDiscipline::DepthFirst)
            .add_queue_condition(stop_at_open(network, state))
            .add_step_action(|step: &NetworkTraceStep<()>, _: &StepContext<()>| {
                if step.path.to_equipment() == target {
                    *found.borrow_mut() = true;
                }
            })
            .build();
        let start = network.terminal_of(from, 2).expect("t2");
        trace.run(start, phases, ());
        drop(trace);
        found.into_inner()
    }

    #[test]
    fn open_switch_blocks_only_its_view() {
        let (mut network, a, cb, b) = switched();
        network.equipment_mut(cb).set_normally_open(true);
        assert!(!reaches(&network, NORMAL, a, b, PhaseCode::NONE));
        assert!(reaches(&network, CURRENT, a, b, PhaseCode::NONE));
    }

    #[test]
    fn partially_open_switch_blocks_agnostic_but_not_phase_aware() {
        let (mut network, a, cb, b) = switched();
        network
            .equipment_mut(cb)
            .set_normally_open_phases(PhaseCode::from(SinglePhaseKind::A));
        assert!(!reaches(&network, NORMAL, a, b, PhaseCode::NONE));
        assert!(reaches(&network, NORMAL, a, b, PhaseCode::ABC));
        assert!(!reaches(&network, NORMAL, a, b, PhaseCode::A));
    }

    #[test]
    fn equipment_step_limit() {
        let (network, a, cb, b) = switched();
        let seen = RefCell::new(Vec::new());
        let mut trace = NetworkTraceBuilder::<(), ()>::basic(&network, NORMAL, QueueDiscipline::BreadthFirst)
            .add_queue_condition(limit_equipment_steps(1))
            .add_step_action(|step: &NetworkTraceStep<()>, _: &StepContext<()>| {
                seen.borrow_mut().push(step.path.to_equipment())
            })
            .build();
        trace.run(network.terminal_of(a, 2).expect("a2"), PhaseCode::NONE, ());
        drop(trace);
        let seen = seen.into_inner();
        assert!(seen.contains(&cb));
        assert!(!seen.contains(&b));
    }
}
