//! Arena-backed network graph: equipment, terminals, connectivity nodes and containers.
//!
//! Every object lives in a `Vec` owned by [`Network`] and is addressed by a
//! typed index, so the terminal/equipment/node cycle never needs shared
//! ownership.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

use super::direction::DirectionCell;
use super::phase::{PhaseCode, PhaseStatus, SinglePhaseKind};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Position of the object inside its arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle to an [`Equipment`] inside a [`Network`].
    EquipmentId,
    "equipment"
);
arena_id!(
    /// Handle to a [`Terminal`] inside a [`Network`].
    TerminalId,
    "terminal"
);
arena_id!(
    /// Handle to a [`ConnectivityNode`] inside a [`Network`].
    NodeId,
    "node"
);
arena_id!(
    /// Handle to a [`Container`] inside a [`Network`].
    ContainerId,
    "container"
);

/// Device type. Only used to fix terminal cardinality and to answer
/// switch/conductor questions; traces never branch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    Breaker,
    Disconnector,
    Fuse,
    AcLineSegment,
    PowerTransformer,
    BusbarSection,
    Junction,
    EnergySource,
    EnergyConsumer,
    EquivalentBranch,
}

impl EquipmentKind {
    /// Terminal count required by the device type, `None` when variable.
    pub fn terminal_count(self) -> Option<usize> {
        match self {
            EquipmentKind::Breaker
            | EquipmentKind::Disconnector
            | EquipmentKind::Fuse
            | EquipmentKind::AcLineSegment
            | EquipmentKind::PowerTransformer
            | EquipmentKind::EquivalentBranch => Some(2),
            EquipmentKind::BusbarSection
            | EquipmentKind::EnergySource
            | EquipmentKind::EnergyConsumer => Some(1),
            EquipmentKind::Junction => None,
        }
    }

    pub fn is_switch(self) -> bool {
        matches!(
            self,
            EquipmentKind::Breaker | EquipmentKind::Disconnector | EquipmentKind::Fuse
        )
    }

    pub fn is_conductor(self) -> bool {
        self == EquipmentKind::AcLineSegment
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EquipmentKind::Breaker => "breaker",
            EquipmentKind::Disconnector => "disconnector",
            EquipmentKind::Fuse => "fuse",
            EquipmentKind::AcLineSegment => "ac_line_segment",
            EquipmentKind::PowerTransformer => "power_transformer",
            EquipmentKind::BusbarSection => "busbar_section",
            EquipmentKind::Junction => "junction",
            EquipmentKind::EnergySource => "energy_source",
            EquipmentKind::EnergyConsumer => "energy_consumer",
            EquipmentKind::EquivalentBranch => "equivalent_branch",
        };
        f.write_str(s)
    }
}

/// A network device with an ordered, fixed set of terminals.
#[derive(Debug)]
pub struct Equipment {
    mrid: String,
    kind: EquipmentKind,
    phases: PhaseCode,
    terminals: Vec<TerminalId>,
    normally_in_service: bool,
    in_service: bool,
    normal_open: PhaseCode,
    open: PhaseCode,
    normal_containers: Vec<ContainerId>,
    current_containers: Vec<ContainerId>,
}

impl Equipment {
    pub fn mrid(&self) -> &str {
        &self.mrid
    }

    pub fn kind(&self) -> EquipmentKind {
        self.kind
    }

    /// Nominal phases of the device, shared by all of its terminals.
    pub fn phases(&self) -> PhaseCode {
        self.phases
    }

    /// Terminals in sequence-number order.
    pub fn terminals(&self) -> &[TerminalId] {
        &self.terminals
    }

    pub fn normally_in_service(&self) -> bool {
        self.normally_in_service
    }

    pub fn in_service(&self) -> bool {
        self.in_service
    }

    /// Normal open state; with no phase, open on any phase counts.
    pub fn is_normally_open(&self, phase: Option<SinglePhaseKind>) -> bool {
        Self::open_on(self.normal_open, phase)
    }

    /// Current open state; with no phase, open on any phase counts.
    pub fn is_open(&self, phase: Option<SinglePhaseKind>) -> bool {
        Self::open_on(self.open, phase)
    }

    fn open_on(open: PhaseCode, phase: Option<SinglePhaseKind>) -> bool {
        match phase {
            None => !open.is_empty(),
            Some(p) => open.contains(p),
        }
    }

    pub fn normal_containers(&self) -> &[ContainerId] {
        &self.normal_containers
    }

    pub fn current_containers(&self) -> &[ContainerId] {
        &self.current_containers
    }

    /// Opens or closes every phase in the normal state. Ignored for
    /// non-switching equipment.
    pub fn set_normally_open(&mut self, open: bool) {
        self.set_normally_open_phases(if open { self.phases } else { PhaseCode::NONE });
    }

    /// Opens or closes every phase in the current state. Ignored for
    /// non-switching equipment.
    pub fn set_open(&mut self, open: bool) {
        self.set_open_phases(if open { self.phases } else { PhaseCode::NONE });
    }

    pub fn set_normally_open_phases(&mut self, phases: PhaseCode) {
        if self.kind.is_switch() {
            self.normal_open = phases.intersection(self.phases);
        }
    }

    pub fn set_open_phases(&mut self, phases: PhaseCode) {
        if self.kind.is_switch() {
            self.open = phases.intersection(self.phases);
        }
    }

    pub fn set_normally_in_service(&mut self, in_service: bool) {
        self.normally_in_service = in_service;
    }

    pub fn set_in_service(&mut self, in_service: bool) {
        self.in_service = in_service;
    }
}

/// A connection point on a device.
#[derive(Debug)]
pub struct Terminal {
    mrid: String,
    equipment: Option<EquipmentId>,
    sequence_number: usize,
    phases: PhaseCode,
    node: Option<NodeId>,
    normal_phases: PhaseStatus,
    current_phases: PhaseStatus,
    normal_direction: DirectionCell,
    current_direction: DirectionCell,
}

impl Terminal {
    pub fn mrid(&self) -> &str {
        &self.mrid
    }

    pub fn equipment(&self) -> Option<EquipmentId> {
        self.equipment
    }

    /// 1-based position on the owning equipment.
    pub fn sequence_number(&self) -> usize {
        self.sequence_number
    }

    pub fn phases(&self) -> PhaseCode {
        self.phases
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn normal_phases(&self) -> &PhaseStatus {
        &self.normal_phases
    }

    pub fn current_phases(&self) -> &PhaseStatus {
        &self.current_phases
    }

    pub fn normal_direction(&self) -> &DirectionCell {
        &self.normal_direction
    }

    pub fn current_direction(&self) -> &DirectionCell {
        &self.current_direction
    }
}

/// Zero-impedance bus joining terminals.
#[derive(Debug)]
pub struct ConnectivityNode {
    mrid: String,
    terminals: Vec<TerminalId>,
}

impl ConnectivityNode {
    pub fn mrid(&self) -> &str {
        &self.mrid
    }

    pub fn terminals(&self) -> &[TerminalId] {
        &self.terminals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Feeder,
    Site,
    Substation,
}

/// Named grouping of equipment. Feeders carry the terminal they are energized from.
#[derive(Debug)]
pub struct Container {
    mrid: String,
    kind: ContainerKind,
    normal_head_terminal: Option<TerminalId>,
}

impl Container {
    pub fn mrid(&self) -> &str {
        &self.mrid
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn normal_head_terminal(&self) -> Option<TerminalId> {
        self.normal_head_terminal
    }
}

/// Owner of the whole network graph.
///
/// Structure is only changed through `&mut self`; traces borrow the network
/// immutably and write exclusively to the atomic phase and direction cells
/// on each terminal, so a `&Network` may be shared between threads.
#[derive(Debug, Default)]
pub struct Network {
    equipment: Vec<Equipment>,
    terminals: Vec<Terminal>,
    nodes: Vec<ConnectivityNode>,
    containers: Vec<Container>,
    equipment_by_mrid: HashMap<String, EquipmentId>,
    nodes_by_mrid: HashMap<String, NodeId>,
    containers_by_mrid: HashMap<String, ContainerId>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds equipment with the terminal count its kind requires.
    /// Junctions get two terminals.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DuplicateMrid`] if the mRID is already used.
    pub fn add_equipment(
        &mut self,
        mrid: &str,
        kind: EquipmentKind,
        phases: PhaseCode,
    ) -> Result<EquipmentId, NetworkError> {
        let count = kind.terminal_count().unwrap_or(2);
        self.add_equipment_with_terminals(mrid, kind, phases, count)
    }

    /// Adds equipment with an explicit terminal count.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::TerminalCount`] when `count` disagrees with a
    /// fixed-cardinality kind (or is zero), and
    /// [`NetworkError::DuplicateMrid`] if the mRID is already used.
    pub fn add_equipment_with_terminals(
        &mut self,
        mrid: &str,
        kind: EquipmentKind,
        phases: PhaseCode,
        count: usize,
    ) -> Result<EquipmentId, NetworkError> {
        let expected = kind.terminal_count().unwrap_or(count.max(1));
        if count != expected {
            return Err(NetworkError::TerminalCount {
                mrid: mrid.to_string(),
                kind,
                expected,
                actual: count,
            });
        }
        if self.equipment_by_mrid.contains_key(mrid) {
            return Err(NetworkError::DuplicateMrid(mrid.to_string()));
        }

        let id = EquipmentId::from_index(self.equipment.len());
        let terminals = (1..=count)
            .map(|sequence_number| {
                let terminal = TerminalId::from_index(self.terminals.len());
                self.terminals.push(Terminal {
                    mrid: format!("{mrid}-t{sequence_number}"),
                    equipment: Some(id),
                    sequence_number,
                    phases,
                    node: None,
                    normal_phases: PhaseStatus::default(),
                    current_phases: PhaseStatus::default(),
                    normal_direction: DirectionCell::default(),
                    current_direction: DirectionCell::default(),
                });
                terminal
            })
            .collect();

        self.equipment.push(Equipment {
            mrid: mrid.to_string(),
            kind,
            phases,
            terminals,
            normally_in_service: true,
            in_service: true,
            normal_open: PhaseCode::NONE,
            open: PhaseCode::NONE,
            normal_containers: Vec::new(),
            current_containers: Vec::new(),
        });
        self.equipment_by_mrid.insert(mrid.to_string(), id);
        Ok(id)
    }

    /// Adds a terminal that belongs to no equipment. Such terminals can be
    /// connected but can never be part of a trace path.
    pub fn add_detached_terminal(&mut self, mrid: &str, phases: PhaseCode) -> TerminalId {
        let id = TerminalId::from_index(self.terminals.len());
        self.terminals.push(Terminal {
            mrid: mrid.to_string(),
            equipment: None,
            sequence_number: 1,
            phases,
            node: None,
            normal_phases: PhaseStatus::default(),
            current_phases: PhaseStatus::default(),
            normal_direction: DirectionCell::default(),
            current_direction: DirectionCell::default(),
        });
        id
    }

    /// # Errors
    ///
    /// Returns [`NetworkError::DuplicateMrid`] if the mRID is already used.
    pub fn add_node(&mut self, mrid: &str) -> Result<NodeId, NetworkError> {
        if self.nodes_by_mrid.contains_key(mrid) {
            return Err(NetworkError::DuplicateMrid(mrid.to_string()));
        }
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(ConnectivityNode {
            mrid: mrid.to_string(),
            terminals: Vec::new(),
        });
        self.nodes_by_mrid.insert(mrid.to_string(), id);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`NetworkError::DuplicateMrid`] if the mRID is already used.
    pub fn add_container(
        &mut self,
        mrid: &str,
        kind: ContainerKind,
    ) -> Result<ContainerId, NetworkError> {
        if self.containers_by_mrid.contains_key(mrid) {
            return Err(NetworkError::DuplicateMrid(mrid.to_string()));
        }
        let id = ContainerId::from_index(self.containers.len());
        self.containers.push(Container {
            mrid: mrid.to_string(),
            kind,
            normal_head_terminal: None,
        });
        self.containers_by_mrid.insert(mrid.to_string(), id);
        Ok(id)
    }

    /// Adds a feeder energized from `head`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::DuplicateMrid`] if the mRID is already used.
    pub fn add_feeder(
        &mut self,
        mrid: &str,
        head: Option<TerminalId>,
    ) -> Result<ContainerId, NetworkError> {
        let id = self.add_container(mrid, ContainerKind::Feeder)?;
        self.containers[id.index()].normal_head_terminal = head;
        Ok(id)
    }

    /// Places equipment in a container for both the normal and current views.
    pub fn add_to_container(&mut self, equipment: EquipmentId, container: ContainerId) {
        self.add_to_normal_container(equipment, container);
        self.add_to_current_container(equipment, container);
    }

    pub fn add_to_normal_container(&mut self, equipment: EquipmentId, container: ContainerId) {
        let containers = &mut self.equipment[equipment.index()].normal_containers;
        if !containers.contains(&container) {
            containers.push(container);
        }
    }

    pub fn add_to_current_container(&mut self, equipment: EquipmentId, container: ContainerId) {
        let containers = &mut self.equipment[equipment.index()].current_containers;
        if !containers.contains(&container) {
            containers.push(container);
        }
    }

    /// Attaches `terminal` to `node`. Reconnecting to the same node is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AlreadyConnected`] if the terminal sits on another node.
    pub fn connect(&mut self, terminal: TerminalId, node: NodeId) -> Result<(), NetworkError> {
        match self.terminals[terminal.index()].node {
            Some(existing) if existing == node => Ok(()),
            Some(_) => Err(NetworkError::AlreadyConnected(
                self.terminals[terminal.index()].mrid.clone(),
            )),
            None => {
                self.terminals[terminal.index()].node = Some(node);
                self.nodes[node.index()].terminals.push(terminal);
                Ok(())
            }
        }
    }

    /// Joins two terminals on a shared node, creating one when neither is connected.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::AlreadyConnected`] when both terminals already
    /// sit on different nodes.
    pub fn connect_terminals(
        &mut self,
        a: TerminalId,
        b: TerminalId,
    ) -> Result<NodeId, NetworkError> {
        let node = match (self.terminals[a.index()].node, self.terminals[b.index()].node) {
            (Some(node), _) | (None, Some(node)) => node,
            (None, None) => {
                let mrid = self.fresh_node_mrid();
                self.add_node(&mrid)?
            }
        };
        self.connect(a, node)?;
        self.connect(b, node)?;
        Ok(node)
    }

    /// Returns an unused node mRID of the form `cn<n>`.
    pub fn fresh_node_mrid(&self) -> String {
        let mut n = self.nodes.len();
        loop {
            let candidate = format!("cn{n}");
            if !self.nodes_by_mrid.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn equipment(&self, id: EquipmentId) -> &Equipment {
        &self.equipment[id.index()]
    }

    pub fn equipment_mut(&mut self, id: EquipmentId) -> &mut Equipment {
        &mut self.equipment[id.index()]
    }

    pub fn terminal(&self, id: TerminalId) -> &Terminal {
        &self.terminals[id.index()]
    }

    pub fn node(&self, id: NodeId) -> &ConnectivityNode {
        &self.nodes[id.index()]
    }

    pub fn container(&self, id: ContainerId) -> &Container {
        &self.containers[id.index()]
    }

    pub fn find_equipment(&self, mrid: &str) -> Option<EquipmentId> {
        self.equipment_by_mrid.get(mrid).copied()
    }

    pub fn find_node(&self, mrid: &str) -> Option<NodeId> {
        self.nodes_by_mrid.get(mrid).copied()
    }

    pub fn find_container(&self, mrid: &str) -> Option<ContainerId> {
        self.containers_by_mrid.get(mrid).copied()
    }

    /// Terminal with the given 1-based sequence number.
    pub fn terminal_of(&self, equipment: EquipmentId, sequence_number: usize) -> Option<TerminalId> {
        let terminals = &self.equipment[equipment.index()].terminals;
        sequence_number
            .checked_sub(1)
            .and_then(|i| terminals.get(i))
            .copied()
    }

    /// Resolves a `<mrid>:<sequence>` reference, e.g. `"cb1:2"`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidTerminalRef`] for malformed references
    /// and [`NetworkError::UnknownMrid`] for unknown equipment or sequence numbers.
    pub fn resolve_terminal(&self, reference: &str) -> Result<TerminalId, NetworkError> {
        let (mrid, sequence) = reference
            .rsplit_once(':')
            .ok_or_else(|| NetworkError::InvalidTerminalRef(reference.to_string()))?;
        let sequence: usize = sequence
            .parse()
            .map_err(|_| NetworkError::InvalidTerminalRef(reference.to_string()))?;
        let equipment = self
            .find_equipment(mrid)
            .ok_or_else(|| NetworkError::UnknownMrid(mrid.to_string()))?;
        self.terminal_of(equipment, sequence)
            .ok_or_else(|| NetworkError::UnknownMrid(reference.to_string()))
    }

    pub fn equipment_count(&self) -> usize {
        self.equipment.len()
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn equipment_ids(&self) -> impl Iterator<Item = EquipmentId> + use<> {
        (0..self.equipment.len()).map(EquipmentId::from_index)
    }

    pub fn terminal_ids(&self) -> impl Iterator<Item = TerminalId> + use<> {
        (0..self.terminals.len()).map(TerminalId::from_index)
    }

    pub fn container_ids(&self) -> impl Iterator<Item = ContainerId> + use<> {
        (0..self.containers.len()).map(ContainerId::from_index)
    }

    /// Other terminals on the same connectivity node as `terminal`.
    pub fn connected_terminals(&self, terminal: TerminalId) -> impl Iterator<Item = TerminalId> + '_ {
        self.terminals[terminal.index()]
            .node
            .into_iter()
            .flat_map(|node| self.nodes[node.index()].terminals.iter().copied())
            .filter(move |t| *t != terminal)
    }

    /// Other terminals of the equipment owning `terminal`.
    pub fn other_terminals(&self, terminal: TerminalId) -> impl Iterator<Item = TerminalId> + '_ {
        self.terminals[terminal.index()]
            .equipment
            .into_iter()
            .flat_map(|eq| self.equipment[eq.index()].terminals.iter().copied())
            .filter(move |t| *t != terminal)
    }
}
