//! Network graph, phases, feeder directions and the two state views.

pub mod direction;
pub mod equivalent;
pub mod generate;
pub mod model;
pub mod phase;
pub mod state;

pub use direction::{DirectionCell, FeederDirection};
pub use equivalent::{EquivalentNetworkConnection, add_equivalents_at_edges, find_container_edges};
pub use model::{
    ConnectivityNode, Container, ContainerId, ContainerKind, Equipment, EquipmentId, EquipmentKind,
    Network, NodeId, Terminal, TerminalId,
};
pub use phase::{PhaseCode, PhaseStatus, SinglePhaseKind};
pub use state::{CURRENT, NORMAL, OpenPolicy, StateOperators};
