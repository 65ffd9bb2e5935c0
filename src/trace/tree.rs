//! Reconstruction of the equipment tree visited by a network trace.
//!
//! The tree is carried as a context value registered alongside the tree
//! builder: every external hop gets a fresh child node whose parent is the
//! node of the step it came from. [`EquipmentTreeBuilder`] then links
//! accepted nodes into their parents as steps are actioned, so candidates
//! rejected by a queue condition never appear in the tree. Other hooks on
//! the same trace keep their own context values.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::error::TraceError;
use crate::network::direction::FeederDirection;
use crate::network::model::{EquipmentId, Network};
use crate::network::phase::PhaseCode;
use crate::network::state::StateOperators;
use crate::traversal::{ContextValueComputer, QueueDiscipline, StepAction, StepContext};

use super::conditions::{downstream, stop_at_open};
use super::network_trace::NetworkTraceBuilder;
use super::step::NetworkTraceStep;

pub type TreeNodeRef<T> = Rc<RefCell<TreeNode<T>>>;

type NodeKey = *const RefCell<TreeNode<EquipmentId>>;

/// Node owning its children and holding a weak link to its parent.
#[derive(Debug)]
pub struct TreeNode<T> {
    payload: T,
    parent: Weak<RefCell<TreeNode<T>>>,
    children: Vec<TreeNodeRef<T>>,
}

impl<T> TreeNode<T> {
    pub fn root(payload: T) -> TreeNodeRef<T> {
        Rc::new(RefCell::new(Self {
            payload,
            parent: Weak::new(),
            children: Vec::new(),
        }))
    }

    /// Creates a node pointing at `parent` without adding it to the
    /// parent's children.
    pub fn detached_child(parent: &TreeNodeRef<T>, payload: T) -> TreeNodeRef<T> {
        Rc::new(RefCell::new(Self {
            payload,
            parent: Rc::downgrade(parent),
            children: Vec::new(),
        }))
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// `None` for roots or once the parent has been dropped.
    pub fn parent(&self) -> Option<TreeNodeRef<T>> {
        self.parent.upgrade()
    }

    pub fn children(&self) -> &[TreeNodeRef<T>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Context computer threading tree nodes through a network trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeContext;

impl<D> ContextValueComputer<NetworkTraceStep<D>, TreeNodeRef<EquipmentId>> for TreeContext {
    fn compute_initial_value(&self, item: &NetworkTraceStep<D>) -> TreeNodeRef<EquipmentId> {
        TreeNode::root(item.path.to_equipment())
    }

    fn compute_next_value(
        &self,
        next: &NetworkTraceStep<D>,
        _current: &NetworkTraceStep<D>,
        current_value: &TreeNodeRef<EquipmentId>,
    ) -> TreeNodeRef<EquipmentId> {
        if next.path.traced_internally() {
            Rc::clone(current_value)
        } else {
            TreeNode::detached_child(current_value, next.path.to_equipment())
        }
    }
}

/// Step action collecting roots and, optionally, the current leaf set.
#[derive(Debug, Default)]
pub struct EquipmentTreeBuilder {
    roots: BTreeMap<EquipmentId, TreeNodeRef<EquipmentId>>,
    leaves: Option<HashMap<NodeKey, TreeNodeRef<EquipmentId>>>,
}

impl EquipmentTreeBuilder {
    pub fn new(track_leaves: bool) -> Self {
        Self {
            roots: BTreeMap::new(),
            leaves: track_leaves.then(HashMap::new),
        }
    }

    /// One root per distinct start equipment, ordered by id.
    pub fn roots(&self) -> impl Iterator<Item = &TreeNodeRef<EquipmentId>> {
        self.roots.values()
    }

    pub fn root(&self, equipment: EquipmentId) -> Option<&TreeNodeRef<EquipmentId>> {
        self.roots.get(&equipment)
    }

    /// Nodes without children, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::LeafTrackingDisabled`] unless the builder was
    /// created with leaf tracking.
    pub fn leaves(&self) -> Result<impl Iterator<Item = &TreeNodeRef<EquipmentId>>, TraceError> {
        self.leaves
            .as_ref()
            .map(HashMap::values)
            .ok_or(TraceError::LeafTrackingDisabled)
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        if let Some(leaves) = &mut self.leaves {
            leaves.clear();
        }
    }

    fn add_leaf(&mut self, node: &TreeNodeRef<EquipmentId>) {
        if let Some(leaves) = &mut self.leaves {
            leaves.insert(Rc::as_ptr(node), Rc::clone(node));
        }
    }

    fn remove_leaf(&mut self, node: &TreeNodeRef<EquipmentId>) {
        if let Some(leaves) = &mut self.leaves {
            leaves.remove(&Rc::as_ptr(node));
        }
    }
}

impl<D> StepAction<NetworkTraceStep<D>, TreeNodeRef<EquipmentId>> for &mut EquipmentTreeBuilder {
    fn apply(&mut self, item: &NetworkTraceStep<D>, context: &StepContext<TreeNodeRef<EquipmentId>>) {
        let node = &context.value;
        if context.is_start_item {
            let equipment = item.path.to_equipment();
            if !self.roots.contains_key(&equipment) {
                self.roots.insert(equipment, Rc::clone(node));
                self.add_leaf(node);
            }
            return;
        }
        if item.path.traced_internally() {
            return;
        }
        let Some(parent) = node.borrow().parent() else {
            return;
        };
        parent.borrow_mut().children.push(Rc::clone(node));
        self.remove_leaf(&parent);
        self.add_leaf(node);
    }
}

/// Serializable copy of a tree, with mRIDs in place of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeSnapshot {
    pub mrid: String,
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    pub fn capture(network: &Network, node: &TreeNodeRef<EquipmentId>) -> Self {
        let node = node.borrow();
        Self {
            mrid: network.equipment(*node.payload()).mrid().to_string(),
            children: node
                .children()
                .iter()
                .map(|child| TreeSnapshot::capture(network, child))
                .collect(),
        }
    }
}

/// Tree of equipment downstream of `equipment` under `state`, following
/// previously assigned feeder directions and stopping at open switches.
///
/// The trace starts from the first terminal already marked `DOWNSTREAM`,
/// or from the first terminal when none is.
pub fn downstream_tree(network: &Network, state: &dyn StateOperators, equipment: EquipmentId) -> TreeSnapshot {
    let terminals = network.equipment(equipment).terminals();
    let start = terminals
        .iter()
        .copied()
        .find(|t| {
            state
                .feeder_direction(network.terminal(*t))
                .get()
                .contains(FeederDirection::Downstream)
        })
        .or_else(|| terminals.first().copied());

    let mut builder = EquipmentTreeBuilder::new(false);
    if let Some(start) = start {
        let mut trace = NetworkTraceBuilder::<(), ()>::basic(network, state, QueueDiscipline::BreadthFirst)
            .add_queue_condition(stop_at_open(network, state))
            .add_queue_condition(downstream(network, state))
            .add_step_action_with_context(TreeContext, &mut builder)
            .build();
        trace.run(start, PhaseCode::NONE, ());
    }

    match builder.root(equipment) {
        Some(root) => TreeSnapshot::capture(network, root),
        None => TreeSnapshot {
            mrid: network.equipment(equipment).mrid().to_string(),
            children: Vec::new(),
        },
    }
}
