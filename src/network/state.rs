//! Normal and current views of network state.
//!
//! Every predicate a trace asks about switching, service status, traced
//! phases or feeder direction goes through a [`StateOperators`] instance.
//! Binding [`NORMAL`] or [`CURRENT`] is how one algorithm yields planned and
//! as-operated results from the same code.

use std::fmt;

use super::direction::DirectionCell;
use super::model::{ContainerId, Equipment, Terminal};
use super::phase::{PhaseStatus, SinglePhaseKind};

/// State queries against one view of the network.
pub trait StateOperators: fmt::Debug + Sync {
    /// Short label used in logs and reports.
    fn name(&self) -> &'static str;

    /// Open on `phase`, or on any phase when `phase` is `None`.
    fn is_open(&self, equipment: &Equipment, phase: Option<SinglePhaseKind>) -> bool;

    fn is_in_service(&self, equipment: &Equipment) -> bool;

    fn phase_status<'t>(&self, terminal: &'t Terminal) -> &'t PhaseStatus;

    fn feeder_direction<'t>(&self, terminal: &'t Terminal) -> &'t DirectionCell;

    fn containers<'e>(&self, equipment: &'e Equipment) -> &'e [ContainerId];
}

/// Planned state.
#[derive(Debug)]
pub struct NormalState {
    _private: (),
}

/// As-operated state.
#[derive(Debug)]
pub struct CurrentState {
    _private: (),
}

impl StateOperators for NormalState {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn is_open(&self, equipment: &Equipment, phase: Option<SinglePhaseKind>) -> bool {
        equipment.is_normally_open(phase)
    }

    fn is_in_service(&self, equipment: &Equipment) -> bool {
        equipment.normally_in_service()
    }

    fn phase_status<'t>(&self, terminal: &'t Terminal) -> &'t PhaseStatus {
        terminal.normal_phases()
    }

    fn feeder_direction<'t>(&self, terminal: &'t Terminal) -> &'t DirectionCell {
        terminal.normal_direction()
    }

    fn containers<'e>(&self, equipment: &'e Equipment) -> &'e [ContainerId] {
        equipment.normal_containers()
    }
}

impl StateOperators for CurrentState {
    fn name(&self) -> &'static str {
        "current"
    }

    fn is_open(&self, equipment: &Equipment, phase: Option<SinglePhaseKind>) -> bool {
        equipment.is_open(phase)
    }

    fn is_in_service(&self, equipment: &Equipment) -> bool {
        equipment.in_service()
    }

    fn phase_status<'t>(&self, terminal: &'t Terminal) -> &'t PhaseStatus {
        terminal.current_phases()
    }

    fn feeder_direction<'t>(&self, terminal: &'t Terminal) -> &'t DirectionCell {
        terminal.current_direction()
    }

    fn containers<'e>(&self, equipment: &'e Equipment) -> &'e [ContainerId] {
        equipment.current_containers()
    }
}

static NORMAL_STATE: NormalState = NormalState { _private: () };
static CURRENT_STATE: CurrentState = CurrentState { _private: () };

/// The planned view.
pub static NORMAL: &dyn StateOperators = &NORMAL_STATE;
/// The as-operated view.
pub static CURRENT: &dyn StateOperators = &CURRENT_STATE;

/// Which open state, if any, gates a walk through equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenPolicy {
    /// Every device conducts.
    #[default]
    IgnoreOpen,
    NormallyOpen,
    CurrentlyOpen,
}

impl OpenPolicy {
    pub fn is_open(self, equipment: &Equipment, phase: Option<SinglePhaseKind>) -> bool {
        match self {
            OpenPolicy::IgnoreOpen => false,
            OpenPolicy::NormallyOpen => NORMAL.is_open(equipment, phase),
            OpenPolicy::CurrentlyOpen => CURRENT.is_open(equipment, phase),
        }
    }
}
