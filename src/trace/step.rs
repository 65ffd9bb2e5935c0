//! Hops between terminals and the steps a network trace is made of.

use crate::network::model::{EquipmentId, Network, TerminalId};
use crate::network::phase::{PhaseCode, SinglePhaseKind};
use crate::traversal::Trackable;

/// Mapping of one conductor across a hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NominalPhasePath {
    pub from: SinglePhaseKind,
    pub to: SinglePhaseKind,
}

impl NominalPhasePath {
    pub fn new(from: SinglePhaseKind, to: SinglePhaseKind) -> Self {
        Self { from, to }
    }

    /// Identity mapping for every phase in `phases`.
    pub fn straight(phases: PhaseCode) -> Vec<NominalPhasePath> {
        phases.iter().map(|p| NominalPhasePath::new(p, p)).collect()
    }
}

/// A hop from one terminal to another.
///
/// Hops between terminals of the same equipment are internal; hops across a
/// connectivity node are external. The start of a trace is the hop from a
/// terminal to itself, which counts as internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    from_terminal: TerminalId,
    to_terminal: TerminalId,
    from_equipment: EquipmentId,
    to_equipment: EquipmentId,
    traversed_segment: Option<EquipmentId>,
    nominal_phase_paths: Vec<NominalPhasePath>,
}

impl Path {
    /// # Panics
    ///
    /// Panics if either terminal does not belong to any equipment.
    pub fn new(
        network: &Network,
        from_terminal: TerminalId,
        to_terminal: TerminalId,
        nominal_phase_paths: Vec<NominalPhasePath>,
    ) -> Self {
        let owner = |terminal: TerminalId| match network.terminal(terminal).equipment() {
            Some(equipment) => equipment,
            None => panic!(
                "terminal {} has no equipment and cannot be part of a path",
                network.terminal(terminal).mrid()
            ),
        };
        let from_equipment = owner(from_terminal);
        let to_equipment = owner(to_terminal);
        let traversed_segment = (from_equipment == to_equipment
            && from_terminal != to_terminal
            && network.equipment(from_equipment).kind().is_conductor())
        .then_some(from_equipment);

        Self {
            from_terminal,
            to_terminal,
            from_equipment,
            to_equipment,
            traversed_segment,
            nominal_phase_paths,
        }
    }

    pub fn from_terminal(&self) -> TerminalId {
        self.from_terminal
    }

    pub fn to_terminal(&self) -> TerminalId {
        self.to_terminal
    }

    pub fn from_equipment(&self) -> EquipmentId {
        self.from_equipment
    }

    pub fn to_equipment(&self) -> EquipmentId {
        self.to_equipment
    }

    /// The AC line segment crossed by an internal hop, if any.
    pub fn traversed_segment(&self) -> Option<EquipmentId> {
        self.traversed_segment
    }

    /// Empty for phase-agnostic traces.
    pub fn nominal_phase_paths(&self) -> &[NominalPhasePath] {
        &self.nominal_phase_paths
    }

    pub fn traced_internally(&self) -> bool {
        self.from_equipment == self.to_equipment
    }

    pub fn traced_externally(&self) -> bool {
        !self.traced_internally()
    }

    pub fn from_phases(&self) -> PhaseCode {
        PhaseCode::from_phases(self.nominal_phase_paths.iter().map(|p| p.from))
    }

    pub fn to_phases(&self) -> PhaseCode {
        PhaseCode::from_phases(self.nominal_phase_paths.iter().map(|p| p.to))
    }
}

/// One item of a network trace.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkTraceStep<D> {
    pub path: Path,
    /// Hops taken since the start item.
    pub terminal_steps: usize,
    /// External hops taken since the start item.
    pub equipment_steps: usize,
    pub data: D,
}

impl<D> NetworkTraceStep<D> {
    pub fn start(network: &Network, terminal: TerminalId, phases: PhaseCode, data: D) -> Self {
        Self {
            path: Path::new(network, terminal, terminal, NominalPhasePath::straight(phases)),
            terminal_steps: 0,
            equipment_steps: 0,
            data,
        }
    }

    /// Builds the step following `self` along `path`.
    pub fn next(&self, path: Path, data: D) -> Self {
        let external = path.traced_externally();
        Self {
            path,
            terminal_steps: self.terminal_steps + 1,
            equipment_steps: self.equipment_steps + usize::from(external),
            data,
        }
    }
}

impl<D> Trackable for NetworkTraceStep<D> {
    type Key = (TerminalId, PhaseCode);

    fn tracking_key(&self) -> Self::Key {
        (self.path.to_terminal(), self.path.to_phases())
    }
}

/// Maps the phases energized at one terminal onto the nominal phases of the next.
///
/// Matching phases go straight through. Remaining non-neutral phases are then
/// paired in order with the unmatched `X`/`Y` phases of the target, which is
/// how a single-phase tap lands on a secondary.
pub fn map_phases(from: PhaseCode, to: PhaseCode) -> Vec<NominalPhasePath> {
    let mut paths: Vec<NominalPhasePath> = from
        .intersection(to)
        .iter()
        .map(|p| NominalPhasePath::new(p, p))
        .collect();

    let unmatched_from = from.without(to).without(PhaseCode::N);
    let unmatched_to = to.without(from).intersection(PhaseCode::XY);
    paths.extend(
        unmatched_from
            .iter()
            .zip(unmatched_to.iter())
            .map(|(f, t)| NominalPhasePath::new(f, t)),
    );
    paths
}
