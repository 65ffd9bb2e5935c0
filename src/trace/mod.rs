//! Network traces built on the generic traversal engine.

pub mod associated;
pub mod conditions;
pub mod network_trace;
pub mod set_direction;
pub mod set_phases;
pub mod step;
pub mod tree;

pub use associated::{AssociatedTerminal, AssociatedTerminalTrace, Hop};
pub use conditions::{downstream, limit_equipment_steps, stop_at_open, upstream};
pub use network_trace::{ActionStepType, NetworkTrace, NetworkTraceBuilder};
pub use step::{NetworkTraceStep, NominalPhasePath, Path};
pub use tree::{EquipmentTreeBuilder, TreeContext, TreeNode, TreeNodeRef, TreeSnapshot, downstream_tree};
