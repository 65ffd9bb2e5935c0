//! Seeded random feeder generation for demos and property tests.

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::error::NetworkError;

use super::model::{EquipmentId, EquipmentKind, Network, NodeId};
use super::phase::PhaseCode;

/// Name of the feeder every generated network carries.
pub const GENERATED_FEEDER: &str = "feeder";

/// Parameters of a random radial feeder with optional loops and switches.
///
/// The same seed and parameters always produce the same network.
#[derive(Debug, Clone)]
pub struct FeederGenerator {
    /// Number of branch items (lines or switches) hung below the feeder breaker.
    pub size: usize,
    /// Master random seed.
    pub seed: u64,
    /// Probability that a branch item closes a loop onto an existing node.
    pub loop_probability: f64,
    /// Probability that a branch item is a disconnector instead of a line.
    pub switch_probability: f64,
    /// Probability that a generated disconnector is open, drawn separately
    /// for the normal and current state.
    pub open_probability: f64,
}

impl Default for FeederGenerator {
    fn default() -> Self {
        Self {
            size: 20,
            seed: 42,
            loop_probability: 0.05,
            switch_probability: 0.15,
            open_probability: 0.3,
        }
    }
}

impl FeederGenerator {
    pub fn new(size: usize, seed: u64) -> Self {
        Self {
            size,
            seed,
            ..Self::default()
        }
    }

    /// Builds the network: a source and breaker feeding `size` random branch
    /// items, plus a consumer on every node left without one.
    ///
    /// # Errors
    ///
    /// Only fails if generated mRIDs collide, which the naming scheme rules out.
    pub fn generate(&self) -> Result<Network, NetworkError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut network = Network::new();

        let source = network.add_equipment("src", EquipmentKind::EnergySource, PhaseCode::ABC)?;
        let breaker = network.add_equipment("cb", EquipmentKind::Breaker, PhaseCode::ABC)?;
        let source_node = network.add_node("src-cn")?;
        let bus = network.add_node("bus")?;
        connect(&mut network, source, 1, source_node)?;
        connect(&mut network, breaker, 1, source_node)?;
        connect(&mut network, breaker, 2, bus)?;

        let head = network.terminal_of(breaker, 2);
        let feeder = network.add_feeder(GENERATED_FEEDER, head)?;
        network.add_to_container(breaker, feeder);

        let mut nodes: Vec<NodeId> = vec![bus];
        let mut ends: Vec<NodeId> = Vec::new();
        for i in 0..self.size {
            let from = nodes[rng.random_range(0..nodes.len())];
            let is_switch = rng.random_bool(self.switch_probability);
            let (mrid, kind) = if is_switch {
                (format!("sw{i}"), EquipmentKind::Disconnector)
            } else {
                (format!("line{i}"), EquipmentKind::AcLineSegment)
            };
            let item = network.add_equipment(&mrid, kind, PhaseCode::ABC)?;
            network.add_to_container(item, feeder);
            if is_switch {
                let normally_open = rng.random_bool(self.open_probability);
                let open = rng.random_bool(self.open_probability);
                let equipment = network.equipment_mut(item);
                equipment.set_normally_open(normally_open);
                equipment.set_open(open);
            }

            let closes_loop = nodes.len() > 2 && rng.random_bool(self.loop_probability);
            let to = if closes_loop {
                let candidate = nodes[rng.random_range(0..nodes.len())];
                if candidate == from {
                    network.add_node(&format!("n{i}"))?
                } else {
                    candidate
                }
            } else {
                network.add_node(&format!("n{i}"))?
            };
            connect(&mut network, item, 1, from)?;
            connect(&mut network, item, 2, to)?;
            if !nodes.contains(&to) {
                nodes.push(to);
                ends.push(to);
            }
            ends.retain(|n| *n != from);
        }

        for (i, node) in ends.into_iter().enumerate() {
            let load = network.add_equipment(
                &format!("load{i}"),
                EquipmentKind::EnergyConsumer,
                PhaseCode::ABC,
            )?;
            network.add_to_container(load, feeder);
            connect(&mut network, load, 1, node)?;
        }

        debug!(
            seed = self.seed,
            equipment = network.equipment_count(),
            nodes = network.node_count(),
            "feeder generated"
        );
        Ok(network)
    }
}

fn connect(
    network: &mut Network,
    equipment: EquipmentId,
    sequence_number: usize,
    node: NodeId,
) -> Result<(), NetworkError> {
    let terminal = network
        .terminal_of(equipment, sequence_number)
        .ok_or_else(|| {
            let mrid = network.equipment(equipment).mrid();
            NetworkError::UnknownMrid(format!("{mrid}:{sequence_number}"))
        })?;
    network.connect(terminal, node)
}
