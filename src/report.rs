//! Post-trace summary of directions and energized terminals.

use std::fmt;

use crate::network::direction::FeederDirection;
use crate::network::model::Network;
use crate::network::state::StateOperators;

/// Aggregate counts for one state view after direction assignment and
/// phase energization.
///
/// Computed post-hoc from the terminal cells, so it always agrees with
/// what the CSV export shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateReport {
    /// Label of the state view (`normal` or `current`).
    pub state: &'static str,
    /// Feeders traced from their head terminal.
    pub feeders: usize,
    /// Energy sources energized.
    pub sources: usize,
    /// Terminal count per direction, in [`FeederDirection::ALL`] order.
    pub directions: [usize; 5],
    /// Terminals with at least one traced phase.
    pub energized_terminals: usize,
    /// Switches open in this view.
    pub open_switches: usize,
}

impl StateReport {
    /// Counts directions and energized terminals under `state`.
    ///
    /// # Arguments
    ///
    /// * `network` - Network whose terminals have been traced
    /// * `state` - View to read cells from
    /// * `feeders` - Feeders traced, as returned by the direction pass
    /// * `sources` - Sources energized, as returned by the phase pass
    pub fn from_network(
        network: &Network,
        state: &dyn StateOperators,
        feeders: usize,
        sources: usize,
    ) -> Self {
        let mut directions = [0usize; 5];
        let mut energized_terminals = 0;
        for id in network.terminal_ids() {
            let terminal = network.terminal(id);
            if terminal.equipment().is_none() {
                continue;
            }
            let direction = state.feeder_direction(terminal).get();
            directions[direction as usize] += 1;
            if !state.phase_status(terminal).traced().is_empty() {
                energized_terminals += 1;
            }
        }

        let open_switches = network
            .equipment_ids()
            .map(|id| network.equipment(id))
            .filter(|eq| eq.kind().is_switch() && state.is_open(eq, None))
            .count();

        Self {
            state: state.name(),
            feeders,
            sources,
            directions,
            energized_terminals,
            open_switches,
        }
    }

    pub fn count(&self, direction: FeederDirection) -> usize {
        self.directions[direction as usize]
    }
}

impl fmt::Display for StateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} state ---", self.state)?;
        writeln!(f, "Feeders traced:        {}", self.feeders)?;
        writeln!(f, "Sources energized:     {}", self.sources)?;
        writeln!(f, "Open switches:         {}", self.open_switches)?;
        writeln!(f, "Energized terminals:   {}", self.energized_terminals)?;
        let counts: Vec<String> = FeederDirection::ALL
            .iter()
            .map(|d| format!("{d}={}", self.count(*d)))
            .collect();
        write!(f, "Directions:            {}", counts.join(" "))
    }
}

/// Network size plus one [`StateReport`] per view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceReport {
    pub equipment: usize,
    pub terminals: usize,
    pub nodes: usize,
    pub normal: StateReport,
    pub current: StateReport,
}

impl TraceReport {
    pub fn new(network: &Network, normal: StateReport, current: StateReport) -> Self {
        Self {
            equipment: network.equipment_count(),
            terminals: network.terminal_count(),
            nodes: network.node_count(),
            normal,
            current,
        }
    }
}

impl fmt::Display for TraceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Network ---")?;
        writeln!(f, "Equipment:             {}", self.equipment)?;
        writeln!(f, "Terminals:             {}", self.terminals)?;
        writeln!(f, "Nodes:                 {}", self.nodes)?;
        writeln!(f)?;
        writeln!(f, "{}", self.normal)?;
        writeln!(f)?;
        write!(f, "{}", self.current)
    }
}
