//! Equivalent-network reduction at container boundaries.
//!
//! Where a container meets the rest of the network, the outside can be
//! replaced by an equivalent branch with sources or loads hung off it. The
//! branch's first terminal joins the edge node and its second terminal
//! sits on a fresh node together with every attachment.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::NetworkError;

use super::model::{ContainerId, EquipmentId, EquipmentKind, Network, NodeId};
use super::state::StateOperators;

/// Result of connecting one equivalent branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalentNetworkConnection {
    pub edge_equipment: EquipmentId,
    pub edge_node: NodeId,
    /// Equivalent branch created at the edge, mapped to the equipment attached to it.
    pub branch_to_equipment: BTreeMap<EquipmentId, BTreeSet<EquipmentId>>,
}

impl Network {
    /// Connects an equivalent branch to `edge_node` beside `edge_equipment`.
    ///
    /// # Arguments
    ///
    /// * `edge_equipment` - Equipment inside the container with a terminal on `edge_node`
    /// * `edge_node` - Boundary node the branch joins
    /// * `attachments` - Kinds of equipment to hang off the far side of the branch
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NotOnNode`] if `edge_equipment` has no terminal
    /// on `edge_node`, [`NetworkError::UnsupportedEquivalent`] for attachment
    /// kinds other than energy sources and consumers, and
    /// [`NetworkError::DuplicateMrid`] if the generated mRIDs are taken.
    /// Nothing is created when an error is returned.
    pub fn connect_equivalent_branch(
        &mut self,
        edge_equipment: EquipmentId,
        edge_node: NodeId,
        attachments: &[EquipmentKind],
    ) -> Result<EquivalentNetworkConnection, NetworkError> {
        let edge = self.equipment(edge_equipment);
        let edge_terminal = edge
            .terminals()
            .iter()
            .copied()
            .find(|t| self.terminal(*t).node() == Some(edge_node))
            .ok_or_else(|| NetworkError::NotOnNode {
                equipment: edge.mrid().to_string(),
                node: self.node(edge_node).mrid().to_string(),
            })?;
        if let Some(kind) = attachments.iter().copied().find(|kind| {
            !matches!(kind, EquipmentKind::EnergySource | EquipmentKind::EnergyConsumer)
        }) {
            return Err(NetworkError::UnsupportedEquivalent(kind));
        }

        let phases = self.terminal(edge_terminal).phases();
        let branch_mrid = format!("{}-{}-eb", edge.mrid(), self.node(edge_node).mrid());
        let far_node_mrid = format!("{branch_mrid}-cn");
        let attachment_mrids: Vec<String> = attachments
            .iter()
            .enumerate()
            .map(|(i, kind)| format!("{branch_mrid}-{kind}-{}", i + 1))
            .collect();

        for mrid in std::iter::once(&branch_mrid).chain(&attachment_mrids) {
            if self.find_equipment(mrid).is_some() {
                return Err(NetworkError::DuplicateMrid(mrid.clone()));
            }
        }
        if self.find_node(&far_node_mrid).is_some() {
            return Err(NetworkError::DuplicateMrid(far_node_mrid));
        }

        let branch = self.add_equipment(&branch_mrid, EquipmentKind::EquivalentBranch, phases)?;
        let near = self.equipment(branch).terminals()[0];
        let far = self.equipment(branch).terminals()[1];
        self.connect(near, edge_node)?;
        let far_node = self.add_node(&far_node_mrid)?;
        self.connect(far, far_node)?;

        let mut attached = BTreeSet::new();
        for (kind, mrid) in attachments.iter().zip(&attachment_mrids) {
            let equipment = self.add_equipment(mrid, *kind, phases)?;
            let terminals = self.equipment(equipment).terminals().to_vec();
            for terminal in terminals {
                self.connect(terminal, far_node)?;
            }
            attached.insert(equipment);
        }

        debug!(branch = %branch_mrid, attachments = attached.len(), "equivalent branch connected");
        Ok(EquivalentNetworkConnection {
            edge_equipment,
            edge_node,
            branch_to_equipment: BTreeMap::from([(branch, attached)]),
        })
    }
}

/// Finds `(equipment, node)` pairs where equipment in `container` shares a
/// node with equipment outside it, in equipment then node order.
pub fn find_container_edges(
    network: &Network,
    container: ContainerId,
    state: &dyn StateOperators,
) -> Vec<(EquipmentId, NodeId)> {
    let inside = |equipment: EquipmentId| state.containers(network.equipment(equipment)).contains(&container);
    let mut edges = BTreeSet::new();

    for equipment in network.equipment_ids().filter(|e| inside(*e)) {
        for &terminal in network.equipment(equipment).terminals() {
            let Some(node) = network.terminal(terminal).node() else {
                continue;
            };
            let crosses = network
                .connected_terminals(terminal)
                .filter_map(|t| network.terminal(t).equipment())
                .any(|other| !inside(other));
            if crosses {
                edges.insert((equipment, node));
            }
        }
    }
    edges.into_iter().collect()
}

/// Connects one equivalent branch per container edge. Each branch and its
/// attachments join the container under both views.
///
/// # Errors
///
/// Propagates the first [`NetworkError`] from
/// [`Network::connect_equivalent_branch`]; branches created before it remain.
pub fn add_equivalents_at_edges(
    network: &mut Network,
    container: ContainerId,
    state: &dyn StateOperators,
    attachments: &[EquipmentKind],
) -> Result<Vec<EquivalentNetworkConnection>, NetworkError> {
    let edges = find_container_edges(network, container, state);
    let mut connections = Vec::with_capacity(edges.len());
    for (equipment, node) in edges {
        let connection = network.connect_equivalent_branch(equipment, node, attachments)?;
        for (branch, attached) in &connection.branch_to_equipment {
            network.add_to_container(*branch, container);
            for &item in attached {
                network.add_to_container(item, container);
            }
        }
        connections.push(connection);
    }
    Ok(connections)
}
