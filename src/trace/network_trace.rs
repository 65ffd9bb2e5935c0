//! Terminal-to-terminal traces over a [`Network`].
//!
//! A network trace alternates between external hops (across a connectivity
//! node) and internal hops (across an equipment). Whether a step is
//! phase-aware is decided by its start item: starting with an empty phase
//! set gives a phase-agnostic trace.

use tracing::debug;

use crate::network::model::{EquipmentId, Network, TerminalId};
use crate::network::phase::PhaseCode;
use crate::network::state::StateOperators;
use crate::traversal::{
    ContextValueComputer, DefaultValue, FlatTracker, QueueCondition, QueueDiscipline, RunSummary,
    StepAction, StepContext, StopCondition, Tracker, Traversal, TraversalBuilder,
};

use super::step::{map_phases, NetworkTraceStep, Path};

/// Which steps the registered step actions see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionStepType {
    #[default]
    AllSteps,
    /// Start items and external hops only, i.e. the first step onto each equipment.
    FirstStepOnEquipment,
}

type ComputeData<'a, D, V> = dyn Fn(&NetworkTraceStep<D>, &StepContext<V>, &Path) -> D + 'a;

type Inner<'a, D, V> = TraversalBuilder<'a, NetworkTraceStep<D>, V>;

/// Step action registration deferred until the action step type is known.
type PendingAction<'a, D, V> = Box<dyn FnOnce(Inner<'a, D, V>, ActionStepType) -> Inner<'a, D, V> + 'a>;

/// Applies `action` only to the steps selected by `step_type`.
struct OnStepType<A> {
    step_type: ActionStepType,
    action: A,
}

impl<D, W, A: StepAction<NetworkTraceStep<D>, W>> StepAction<NetworkTraceStep<D>, W> for OnStepType<A> {
    fn apply(&mut self, step: &NetworkTraceStep<D>, context: &StepContext<W>) {
        let selected = match self.step_type {
            ActionStepType::AllSteps => true,
            ActionStepType::FirstStepOnEquipment => context.is_start_item || step.path.traced_externally(),
        };
        if selected {
            self.action.apply(step, context);
        }
    }
}

/// Builder for a [`NetworkTrace`].
pub struct NetworkTraceBuilder<'a, D, V> {
    network: &'a Network,
    state: &'a dyn StateOperators,
    inner: Inner<'a, D, V>,
    actions: Vec<PendingAction<'a, D, V>>,
    action_step_type: ActionStepType,
}

impl<'a, V: Default + 'a> NetworkTraceBuilder<'a, (), V> {
    /// A trace carrying no per-step data.
    pub fn basic(
        network: &'a Network,
        state: &'a dyn StateOperators,
        discipline: QueueDiscipline,
    ) -> Self {
        Self::new(network, state, discipline, |_, _, _| ())
    }
}

impl<'a, D: 'a, V: Default + 'a> NetworkTraceBuilder<'a, D, V> {
    /// Creates a builder with a flat tracker and default context values.
    ///
    /// # Arguments
    ///
    /// * `compute_data` - Derives the data of the next step from the current
    ///   step, its context and the path being taken
    pub fn new(
        network: &'a Network,
        state: &'a dyn StateOperators,
        discipline: QueueDiscipline,
        compute_data: impl Fn(&NetworkTraceStep<D>, &StepContext<V>, &Path) -> D + 'a,
    ) -> Self {
        Self::with_context(
            network,
            state,
            discipline,
            FlatTracker::new(),
            DefaultValue,
            compute_data,
        )
    }

    /// Like [`NetworkTraceBuilder::new`] with a caller-supplied tracker.
    pub fn with_tracker(
        network: &'a Network,
        state: &'a dyn StateOperators,
        discipline: QueueDiscipline,
        tracker: impl Tracker<NetworkTraceStep<D>> + 'a,
        compute_data: impl Fn(&NetworkTraceStep<D>, &StepContext<V>, &Path) -> D + 'a,
    ) -> Self {
        Self::with_context(network, state, discipline, tracker, DefaultValue, compute_data)
    }
}

impl<'a, D: 'a, V: 'a> NetworkTraceBuilder<'a, D, V> {
    pub fn with_context(
        network: &'a Network,
        state: &'a dyn StateOperators,
        discipline: QueueDiscipline,
        tracker: impl Tracker<NetworkTraceStep<D>> + 'a,
        computer: impl ContextValueComputer<NetworkTraceStep<D>, V> + 'a,
        compute_data: impl Fn(&NetworkTraceStep<D>, &StepContext<V>, &Path) -> D + 'a,
    ) -> Self {
        let queue_next = move |step: &NetworkTraceStep<D>, context: &StepContext<V>| {
            next_steps(network, state, step, context, &compute_data)
        };
        Self {
            network,
            state,
            inner: TraversalBuilder::with_context(queue_next, discipline, tracker, computer),
            actions: Vec::new(),
            action_step_type: ActionStepType::AllSteps,
        }
    }

    pub fn action_step_type(mut self, action_step_type: ActionStepType) -> Self {
        self.action_step_type = action_step_type;
        self
    }

    pub fn add_stop_condition(
        mut self,
        condition: impl StopCondition<NetworkTraceStep<D>, V> + 'a,
    ) -> Self {
        self.inner = self.inner.add_stop_condition(condition);
        self
    }

    pub fn add_queue_condition(
        mut self,
        condition: impl QueueCondition<NetworkTraceStep<D>, V> + 'a,
    ) -> Self {
        self.inner = self.inner.add_queue_condition(condition);
        self
    }

    pub fn add_step_action(mut self, action: impl StepAction<NetworkTraceStep<D>, V> + 'a) -> Self {
        self.actions.push(Box::new(move |inner: Inner<'a, D, V>, step_type| {
            inner.add_step_action(OnStepType { step_type, action })
        }));
        self
    }

    pub fn add_stop_condition_with_context<W: Clone + 'static>(
        mut self,
        computer: impl ContextValueComputer<NetworkTraceStep<D>, W> + 'a,
        condition: impl StopCondition<NetworkTraceStep<D>, W> + 'a,
    ) -> Self {
        self.inner = self.inner.add_stop_condition_with_context(computer, condition);
        self
    }

    pub fn add_queue_condition_with_context<W: Clone + 'static>(
        mut self,
        computer: impl ContextValueComputer<NetworkTraceStep<D>, W> + 'a,
        condition: impl QueueCondition<NetworkTraceStep<D>, W> + 'a,
    ) -> Self {
        self.inner = self.inner.add_queue_condition_with_context(computer, condition);
        self
    }

    /// Registers a step action with its own context value, e.g. an
    /// [`EquipmentTreeBuilder`](super::tree::EquipmentTreeBuilder) with
    /// [`TreeContext`](super::tree::TreeContext).
    pub fn add_step_action_with_context<W: Clone + 'static>(
        mut self,
        computer: impl ContextValueComputer<NetworkTraceStep<D>, W> + 'a,
        action: impl StepAction<NetworkTraceStep<D>, W> + 'a,
    ) -> Self {
        self.actions.push(Box::new(move |inner: Inner<'a, D, V>, step_type| {
            inner.add_step_action_with_context(computer, OnStepType { step_type, action })
        }));
        self
    }

    pub fn build(self) -> NetworkTrace<'a, D, V> {
        let mut inner = self.inner;
        for register in self.actions {
            inner = register(inner, self.action_step_type);
        }
        NetworkTrace {
            network: self.network,
            state: self.state,
            traversal: inner.build(),
        }
    }
}

fn next_steps<D, V>(
    network: &Network,
    state: &dyn StateOperators,
    step: &NetworkTraceStep<D>,
    context: &StepContext<V>,
    compute_data: &ComputeData<'_, D, V>,
) -> Vec<NetworkTraceStep<D>> {
    let current = step.path.to_terminal();
    let candidates: Vec<TerminalId> = if step.path.traced_internally() {
        network.connected_terminals(current).collect()
    } else {
        network.other_terminals(current).collect()
    };
    let phase_aware = !step.path.nominal_phase_paths().is_empty();

    candidates
        .into_iter()
        .filter_map(|next| {
            let equipment = network.terminal(next).equipment()?;
            if !state.is_in_service(network.equipment(equipment)) {
                return None;
            }
            let phase_paths = if phase_aware {
                let paths = map_phases(step.path.to_phases(), network.terminal(next).phases());
                if paths.is_empty() {
                    return None;
                }
                paths
            } else {
                Vec::new()
            };
            let path = Path::new(network, current, next, phase_paths);
            let data = compute_data(step, context, &path);
            Some(step.next(path, data))
        })
        .collect()
}

/// A built network trace, bound to one network and one state view.
pub struct NetworkTrace<'a, D, V> {
    network: &'a Network,
    state: &'a dyn StateOperators,
    traversal: Traversal<'a, NetworkTraceStep<D>, V>,
}

impl<'a, D, V> NetworkTrace<'a, D, V> {
    /// Traces out of `start` on `phases` (empty for a phase-agnostic trace).
    pub fn run(&mut self, start: TerminalId, phases: PhaseCode, data: D) -> RunSummary {
        self.run_until(start, phases, data, || false)
    }

    pub fn run_until(
        &mut self,
        start: TerminalId,
        phases: PhaseCode,
        data: D,
        cancel: impl Fn() -> bool,
    ) -> RunSummary {
        debug!(
            start = self.network.terminal(start).mrid(),
            state = self.state.name(),
            %phases,
            "network trace"
        );
        self.add_start_terminal(start, phases, data);
        self.traversal.process_queue(cancel)
    }

    /// Seeds every terminal of `equipment` and runs to exhaustion.
    pub fn run_from_equipment(
        &mut self,
        equipment: EquipmentId,
        phases: PhaseCode,
        data: D,
    ) -> RunSummary
    where
        D: Clone,
    {
        for &terminal in self.network.equipment(equipment).terminals() {
            self.add_start_terminal(terminal, phases, data.clone());
        }
        self.traversal.process_queue(|| false)
    }

    /// Queues an additional start terminal without running.
    ///
    /// Returns `false` without queueing anything when none of the requested
    /// `phases` exist on the terminal.
    ///
    /// # Panics
    ///
    /// Panics if `terminal` belongs to no equipment.
    pub fn add_start_terminal(&mut self, terminal: TerminalId, phases: PhaseCode, data: D) -> bool {
        let traced = phases.intersection(self.network.terminal(terminal).phases());
        if traced.is_empty() && !phases.is_empty() {
            debug!(
                terminal = self.network.terminal(terminal).mrid(),
                %phases,
                "requested phases absent from start terminal"
            );
            return false;
        }
        let step = NetworkTraceStep::start(self.network, terminal, traced, data);
        self.traversal.add_start_item(step)
    }

    pub fn process_queue(&mut self, cancel: impl Fn() -> bool) -> RunSummary {
        self.traversal.process_queue(cancel)
    }

    pub fn traversal(&self) -> &Traversal<'a, NetworkTraceStep<D>, V> {
        &self.traversal
    }

    pub fn traversal_mut(&mut self) -> &mut Traversal<'a, NetworkTraceStep<D>, V> {
        &mut self.traversal
    }

    pub fn reset(&mut self) {
        self.traversal.reset();
    }
}
