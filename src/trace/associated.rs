//! Bus-level walk over terminals, gated by an open-switch policy.
//!
//! Unlike a network trace this works on bare terminals: from a terminal it
//! moves to every other terminal on its connectivity node and, when the
//! owning equipment conducts on at least one nominal phase, to every other
//! terminal of that equipment.

use crate::network::model::{Network, TerminalId};
use crate::network::phase::PhaseCode;
use crate::network::state::OpenPolicy;
use crate::traversal::{
    FlatTracker, QueueDiscipline, RunSummary, StepContext, Trackable, Traversal, TraversalBuilder,
};

/// How a terminal was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hop {
    Start,
    /// Across the equipment owning the previous terminal.
    Internal,
    /// Across a connectivity node.
    External,
}

/// Item of an associated terminal trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociatedTerminal {
    pub terminal: TerminalId,
    pub phases: PhaseCode,
    pub hop: Hop,
}

impl Trackable for AssociatedTerminal {
    type Key = (TerminalId, PhaseCode);

    fn tracking_key(&self) -> Self::Key {
        (self.terminal, self.phases)
    }
}

/// Depth-first associated terminal trace.
///
/// Built with [`AssociatedTerminalTrace::builder`] so callers can attach
/// their own conditions and actions before running.
pub struct AssociatedTerminalTrace<'a> {
    network: &'a Network,
    traversal: Traversal<'a, AssociatedTerminal, ()>,
}

impl<'a> AssociatedTerminalTrace<'a> {
    /// Returns a traversal builder with expansion and tracking already wired.
    pub fn builder(
        network: &'a Network,
        policy: OpenPolicy,
    ) -> TraversalBuilder<'a, AssociatedTerminal, ()> {
        TraversalBuilder::new(
            move |item: &AssociatedTerminal, _: &StepContext<()>| next_terminals(network, policy, item),
            QueueDiscipline::DepthFirst,
            FlatTracker::new(),
        )
    }

    pub fn new(network: &'a Network, traversal: Traversal<'a, AssociatedTerminal, ()>) -> Self {
        Self { network, traversal }
    }

    /// Walks from every terminal in `starts`. All of them are queued as
    /// start items before the first one is stepped on.
    pub fn run(&mut self, starts: &[TerminalId]) -> RunSummary {
        for &terminal in starts {
            self.traversal.add_start_item(start_item(self.network, terminal));
        }
        self.traversal.process_queue(|| false)
    }

    pub fn traversal(&self) -> &Traversal<'a, AssociatedTerminal, ()> {
        &self.traversal
    }

    pub fn traversal_mut(&mut self) -> &mut Traversal<'a, AssociatedTerminal, ()> {
        &mut self.traversal
    }
}

fn start_item(network: &Network, terminal: TerminalId) -> AssociatedTerminal {
    AssociatedTerminal {
        terminal,
        phases: network.terminal(terminal).phases(),
        hop: Hop::Start,
    }
}

fn next_terminals(
    network: &Network,
    policy: OpenPolicy,
    item: &AssociatedTerminal,
) -> Vec<AssociatedTerminal> {
    let terminal = network.terminal(item.terminal);
    let mut next: Vec<AssociatedTerminal> = network
        .connected_terminals(item.terminal)
        .map(|t| AssociatedTerminal {
            terminal: t,
            phases: network.terminal(t).phases(),
            hop: Hop::External,
        })
        .collect();

    let conducts = terminal.equipment().is_some_and(|equipment| {
        let equipment = network.equipment(equipment);
        terminal
            .phases()
            .iter()
            .any(|phase| !policy.is_open(equipment, Some(phase)))
    });
    if conducts {
        next.extend(network.other_terminals(item.terminal).map(|t| AssociatedTerminal {
            terminal: t,
            phases: network.terminal(t).phases(),
            hop: Hop::Internal,
        }));
    }
    next
}
