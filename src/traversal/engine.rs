//! Queue-driven traversal engine.
//!
//! A [`TraversalBuilder`] collects the expansion function, tracker, context
//! computer and hooks; [`TraversalBuilder::build`] freezes them into a
//! [`Traversal`] that can be run, resumed and reset.

use tracing::{debug, trace};

use super::conditions::{QueueCondition, StepAction, StopCondition, WithContext};
use super::context::{
    ContextValueComputer, DefaultValue, ErasedComputer, HookComputer, StepContext, initial_hook_values,
    next_hook_values,
};
use super::queue::{QueueDiscipline, TraversalQueue};
use super::tracker::Tracker;

type QueueNext<'a, T, V> = Box<dyn Fn(&T, &StepContext<V>) -> Vec<T> + 'a>;

/// Outcome of one call to [`Traversal::run`] or [`Traversal::process_queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Items dequeued and actioned.
    pub steps: usize,
    /// `true` if the cancellation check aborted the run.
    pub cancelled: bool,
}

/// Collects the configuration of a [`Traversal`].
pub struct TraversalBuilder<'a, T, V> {
    queue_next: QueueNext<'a, T, V>,
    discipline: QueueDiscipline,
    tracker: Box<dyn Tracker<T> + 'a>,
    computer: Box<dyn ContextValueComputer<T, V> + 'a>,
    hook_computers: Vec<Box<dyn HookComputer<T> + 'a>>,
    stop_conditions: Vec<Box<dyn StopCondition<T, V> + 'a>>,
    queue_conditions: Vec<Box<dyn QueueCondition<T, V> + 'a>>,
    step_actions: Vec<Box<dyn StepAction<T, V> + 'a>>,
}

impl<'a, T, V: Default> TraversalBuilder<'a, T, V> {
    /// Creates a builder whose context value is always `V::default()`.
    ///
    /// # Arguments
    ///
    /// * `queue_next` - Candidates reachable from an item
    /// * `discipline` - Depth- or breadth-first order
    /// * `tracker` - Visited set; use a `LayeredTracker` to nest traces
    pub fn new(
        queue_next: impl Fn(&T, &StepContext<V>) -> Vec<T> + 'a,
        discipline: QueueDiscipline,
        tracker: impl Tracker<T> + 'a,
    ) -> Self {
        Self::with_context(queue_next, discipline, tracker, DefaultValue)
    }
}

impl<'a, T, V> TraversalBuilder<'a, T, V> {
    /// Creates a builder threading a context value computed by `computer`.
    pub fn with_context(
        queue_next: impl Fn(&T, &StepContext<V>) -> Vec<T> + 'a,
        discipline: QueueDiscipline,
        tracker: impl Tracker<T> + 'a,
        computer: impl ContextValueComputer<T, V> + 'a,
    ) -> Self {
        Self {
            queue_next: Box::new(queue_next),
            discipline,
            tracker: Box::new(tracker),
            computer: Box::new(computer),
            hook_computers: Vec::new(),
            stop_conditions: Vec::new(),
            queue_conditions: Vec::new(),
            step_actions: Vec::new(),
        }
    }

    pub fn add_stop_condition(mut self, condition: impl StopCondition<T, V> + 'a) -> Self {
        self.stop_conditions.push(Box::new(condition));
        self
    }

    pub fn add_queue_condition(mut self, condition: impl QueueCondition<T, V> + 'a) -> Self {
        self.queue_conditions.push(Box::new(condition));
        self
    }

    pub fn add_step_action(mut self, action: impl StepAction<T, V> + 'a) -> Self {
        self.step_actions.push(Box::new(action));
        self
    }

    /// Registers a stop condition that sees its own context value, threaded
    /// by `computer` independently of the traversal value and of other hooks.
    pub fn add_stop_condition_with_context<W: Clone + 'static>(
        mut self,
        computer: impl ContextValueComputer<T, W> + 'a,
        condition: impl StopCondition<T, W> + 'a,
    ) -> Self
    where
        T: 'a,
        V: 'a,
    {
        let slot = self.add_hook_computer(computer);
        self.add_stop_condition(WithContext::new(slot, condition))
    }

    /// Queue condition counterpart of [`TraversalBuilder::add_stop_condition_with_context`].
    pub fn add_queue_condition_with_context<W: Clone + 'static>(
        mut self,
        computer: impl ContextValueComputer<T, W> + 'a,
        condition: impl QueueCondition<T, W> + 'a,
    ) -> Self
    where
        T: 'a,
        V: 'a,
    {
        let slot = self.add_hook_computer(computer);
        self.add_queue_condition(WithContext::new(slot, condition))
    }

    /// Step action counterpart of [`TraversalBuilder::add_stop_condition_with_context`].
    pub fn add_step_action_with_context<W: Clone + 'static>(
        mut self,
        computer: impl ContextValueComputer<T, W> + 'a,
        action: impl StepAction<T, W> + 'a,
    ) -> Self
    where
        T: 'a,
        V: 'a,
    {
        let slot = self.add_hook_computer(computer);
        self.add_step_action(WithContext::new(slot, action))
    }

    fn add_hook_computer<W: 'static>(&mut self, computer: impl ContextValueComputer<T, W> + 'a) -> usize
    where
        T: 'a,
    {
        self.hook_computers.push(Box::new(ErasedComputer::new(computer)));
        self.hook_computers.len() - 1
    }

    pub fn build(self) -> Traversal<'a, T, V> {
        Traversal {
            queue: TraversalQueue::new(self.discipline),
            queue_next: self.queue_next,
            tracker: self.tracker,
            computer: self.computer,
            hook_computers: self.hook_computers,
            stop_conditions: self.stop_conditions,
            queue_conditions: self.queue_conditions,
            step_actions: self.step_actions,
        }
    }
}

/// A configured, reusable walk.
///
/// Items are marked visited before the queue conditions decide whether to
/// enqueue them, so every item is considered at most once per tracker
/// lifetime, whether it ends up queued or not.
pub struct Traversal<'a, T, V> {
    queue: TraversalQueue<T, V>,
    queue_next: QueueNext<'a, T, V>,
    tracker: Box<dyn Tracker<T> + 'a>,
    computer: Box<dyn ContextValueComputer<T, V> + 'a>,
    hook_computers: Vec<Box<dyn HookComputer<T> + 'a>>,
    stop_conditions: Vec<Box<dyn StopCondition<T, V> + 'a>>,
    queue_conditions: Vec<Box<dyn QueueCondition<T, V> + 'a>>,
    step_actions: Vec<Box<dyn StepAction<T, V> + 'a>>,
}

impl<'a, T, V> Traversal<'a, T, V> {
    /// Seeds the queue and runs it to exhaustion.
    pub fn run(&mut self, seeds: impl IntoIterator<Item = T>) -> RunSummary {
        self.run_until(seeds, || false)
    }

    /// Like [`Traversal::run`] but polls `cancel` before every dequeue.
    /// Cancelling leaves the tracker, queue and any side effects as they are.
    pub fn run_until(
        &mut self,
        seeds: impl IntoIterator<Item = T>,
        cancel: impl Fn() -> bool,
    ) -> RunSummary {
        for seed in seeds {
            self.add_start_item(seed);
        }
        self.process_queue(cancel)
    }

    /// Marks `item` visited and enqueues it as a start item. Returns `false`
    /// when the tracker had already seen it or a queue condition rejects it
    /// as a start item; a rejected item stays marked.
    pub fn add_start_item(&mut self, item: T) -> bool {
        if !self.tracker.visit(&item) {
            return false;
        }
        if !self
            .queue_conditions
            .iter()
            .all(|condition| condition.should_queue_start_item(&item))
        {
            return false;
        }
        let hook_values = initial_hook_values(&self.hook_computers, &item);
        let context = StepContext::start(self.computer.compute_initial_value(&item)).with_hook_values(hook_values);
        self.queue.push(item, context);
        true
    }

    /// Steps through whatever is queued until it is empty or `cancel` returns `true`.
    pub fn process_queue(&mut self, cancel: impl Fn() -> bool) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            if cancel() {
                summary.cancelled = true;
                debug!(steps = summary.steps, queued = self.queue.len(), "traversal cancelled");
                break;
            }
            let Some((item, mut context)) = self.queue.pop() else {
                break;
            };
            summary.steps += 1;

            // Every stop condition sees every item.
            let mut stopping = false;
            for condition in &self.stop_conditions {
                stopping |= condition.should_stop(&item, &context);
            }
            context.is_stopping = stopping;

            for action in &mut self.step_actions {
                action.apply(&item, &context);
            }

            if !stopping {
                self.expand(&item, &context);
            }
        }

        if !summary.cancelled {
            trace!(steps = summary.steps, "traversal complete");
        }
        summary
    }

    fn expand(&mut self, current: &T, current_context: &StepContext<V>) {
        for next in (self.queue_next)(current, current_context) {
            if !self.tracker.visit(&next) {
                continue;
            }
            let value = self
                .computer
                .compute_next_value(&next, current, &current_context.value);
            let hook_values = next_hook_values(&self.hook_computers, &next, current, current_context.hook_values());
            let next_context = current_context.next(value).with_hook_values(hook_values);
            if self
                .queue_conditions
                .iter()
                .all(|condition| condition.should_queue(&next, &next_context, current, current_context))
            {
                self.queue.push(next, next_context);
            }
        }
    }

    pub fn queue(&self) -> &TraversalQueue<T, V> {
        &self.queue
    }

    /// Direct queue access. Items pushed here skip the tracker and queue
    /// conditions, and carry no values for hooks registered with their own
    /// context computer.
    pub fn queue_mut(&mut self) -> &mut TraversalQueue<T, V> {
        &mut self.queue
    }

    pub fn tracker(&self) -> &dyn Tracker<T> {
        &*self.tracker
    }

    /// Forgets everything visited and drops queued items, keeping all hooks.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.tracker.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::traversal::tracker::{FlatTracker, Trackable};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Vertex(u8);

    impl Trackable for Vertex {
        type Key = u8;

        fn tracking_key(&self) -> u8 {
            self.0
        }
    }

    /// 0 -> {1, 2}, 1 -> {3}, 2 -> {3}, 3 -> {0}
    fn diamond(vertex: &Vertex, _: &StepContext<()>) -> Vec<Vertex> {
        match vertex.0 {
            0 => vec![Vertex(1), Vertex(2)],
            1 | 2 => vec![Vertex(3)],
            _ => vec![Vertex(0)],
        }
    }

    fn order(discipline: QueueDiscipline) -> Vec<u8> {
        let seen = RefCell::new(Vec::new());
        let mut traversal = TraversalBuilder::new(diamond, discipline, FlatTracker::new())
            .add_step_action(|v: &Vertex, _: &StepContext<()>| seen.borrow_mut().push(v.0))
            .build();
        traversal.run([Vertex(0)]);
        drop(traversal);
        seen.into_inner()
    }

    #[test]
    fn visits_each_item_once_in_discipline_order() {
        assert_eq!(order(QueueDiscipline::BreadthFirst), vec![0, 1, 2, 3]);
        assert_eq!(order(QueueDiscipline::DepthFirst), vec![0, 2, 3, 1]);
    }

    #[test]
    fn stopped_items_are_actioned_but_not_expanded() {
        let seen = RefCell::new(Vec::new());
        let mut traversal =
            TraversalBuilder::new(diamond, QueueDiscipline::BreadthFirst, FlatTracker::new())
                .add_stop_condition(|v: &Vertex, _: &StepContext<()>| v.0 == 1 || v.0 == 2)
                .add_step_action(|v: &Vertex, ctx: &StepContext<()>| {
                    seen.borrow_mut().push((v.0, ctx.is_stopping))
                })
                .build();
        let summary = traversal.run([Vertex(0)]);
        drop(traversal);

        assert_eq!(summary.steps, 3);
        assert_eq!(seen.into_inner(), vec![(0, false), (1, true), (2, true)]);
    }

    #[test]
    fn rejected_candidates_stay_visited() {
        // Vertex 3 is offered from 1 first and rejected there.
        let seen = RefCell::new(Vec::new());
        let mut traversal =
            TraversalBuilder::new(diamond, QueueDiscipline::BreadthFirst, FlatTracker::new())
                .add_queue_condition(
                    |next: &Vertex, _: &StepContext<()>, current: &Vertex, _: &StepContext<()>| {
                        next.0 != 3 || current.0 == 2
                    },
                )
                .add_step_action(|v: &Vertex, _: &StepContext<()>| seen.borrow_mut().push(v.0))
                .build();
        traversal.run([Vertex(0)]);
        assert!(traversal.tracker().has_visited(&Vertex(3)));
        drop(traversal);
        assert_eq!(seen.into_inner(), vec![0, 1, 2]);
    }

    #[test]
    fn all_stop_conditions_are_evaluated() {
        let calls = Cell::new(0);
        let mut traversal =
            TraversalBuilder::new(diamond, QueueDiscipline::DepthFirst, FlatTracker::new())
                .add_stop_condition(|_: &Vertex, _: &StepContext<()>| true)
                .add_stop_condition(|_: &Vertex, _: &StepContext<()>| {
                    calls.set(calls.get() + 1);
                    false
                })
                .build();
        traversal.run([Vertex(0)]);
        drop(traversal);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn start_items_respect_tracker_and_start_filter() {
        struct NoOddStarts;

        impl QueueCondition<Vertex, ()> for NoOddStarts {
            fn should_queue(&self, _: &Vertex, _: &StepContext<()>, _: &Vertex, _: &StepContext<()>) -> bool {
                true
            }

            fn should_queue_start_item(&self, item: &Vertex) -> bool {
                item.0 % 2 == 0
            }
        }

        let mut traversal = TraversalBuilder::new(
            |_: &Vertex, _: &StepContext<()>| Vec::new(),
            QueueDiscipline::BreadthFirst,
            FlatTracker::new(),
        )
        .add_queue_condition(NoOddStarts)
        .build();

        assert!(traversal.add_start_item(Vertex(2)));
        assert!(!traversal.add_start_item(Vertex(2)));
        assert!(!traversal.add_start_item(Vertex(1)));
        assert!(traversal.tracker().has_visited(&Vertex(1)));
        assert!(!traversal.add_start_item(Vertex(1)));
        assert_eq!(traversal.queue().len(), 1);
    }

    #[test]
    fn cancellation_keeps_partial_progress() {
        let polls = Cell::new(0);
        let mut traversal =
            TraversalBuilder::new(diamond, QueueDiscipline::BreadthFirst, FlatTracker::new()).build();
        let summary = traversal.run_until([Vertex(0)], || {
            polls.set(polls.get() + 1);
            polls.get() > 2
        });

        assert!(summary.cancelled);
        assert_eq!(summary.steps, 2);
        assert!(traversal.tracker().has_visited(&Vertex(3)));
        assert_eq!(traversal.queue().len(), 2);

        let rest = traversal.process_queue(|| false);
        assert_eq!(rest.steps, 2);
        assert!(!rest.cancelled);
    }

    #[test]
    fn manual_queue_items_are_processed() {
        let seen = RefCell::new(Vec::new());
        let mut traversal = TraversalBuilder::new(
            |_: &Vertex, _: &StepContext<()>| Vec::new(),
            QueueDiscipline::BreadthFirst,
            FlatTracker::new(),
        )
        .add_step_action(|v: &Vertex, _: &StepContext<()>| seen.borrow_mut().push(v.0))
        .build();
        traversal.queue_mut().push(Vertex(9), StepContext::start(()));
        traversal.process_queue(|| false);
        drop(traversal);
        assert_eq!(seen.into_inner(), vec![9]);
    }

    #[test]
    fn context_values_follow_the_computer() {
        struct Depth;

        impl ContextValueComputer<Vertex, u32> for Depth {
            fn compute_initial_value(&self, _: &Vertex) -> u32 {
                100
            }

            fn compute_next_value(&self, _: &Vertex, _: &Vertex, current: &u32) -> u32 {
                current + 1
            }
        }

        let seen = RefCell::new(Vec::new());
        let mut traversal = TraversalBuilder::with_context(
            |v: &Vertex, _: &StepContext<u32>| if v.0 < 3 { vec![Vertex(v.0 + 1)] } else { Vec::new() },
            QueueDiscipline::BreadthFirst,
            FlatTracker::new(),
            Depth,
        )
        .add_step_action(|v: &Vertex, ctx: &StepContext<u32>| {
            seen.borrow_mut().push((v.0, ctx.value, ctx.step_number))
        })
        .build();
        traversal.run([Vertex(0)]);
        drop(traversal);
        assert_eq!(
            seen.into_inner(),
            vec![(0, 100, 0), (1, 101, 1), (2, 102, 2), (3, 103, 3)]
        );
    }

    #[test]
    fn reset_allows_rerun() {
        let count = Cell::new(0);
        let mut traversal =
            TraversalBuilder::new(diamond, QueueDiscipline::DepthFirst, FlatTracker::new())
                .add_step_action(|_: &Vertex, _: &StepContext<()>| count.set(count.get() + 1))
                .build();
        traversal.run([Vertex(0)]);
        traversal.run([Vertex(0)]);
        assert_eq!(count.get(), 4);
        traversal.reset();
        traversal.run([Vertex(0)]);
        assert_eq!(count.get(), 8);
    }

    struct Hops;

    impl ContextValueComputer<Vertex, u32> for Hops {
        fn compute_initial_value(&self, _: &Vertex) -> u32 {
            0
        }

        fn compute_next_value(&self, _: &Vertex, _: &Vertex, current: &u32) -> u32 {
            current + 1
        }
    }

    struct Route;

    impl ContextValueComputer<Vertex, String> for Route {
        fn compute_initial_value(&self, item: &Vertex) -> String {
            item.0.to_string()
        }

        fn compute_next_value(&self, next: &Vertex, _: &Vertex, current: &String) -> String {
            format!("{current}>{}", next.0)
        }
    }

    #[test]
    fn hooks_thread_their_own_context_values() {
        let depths = RefCell::new(Vec::new());
        let routes = RefCell::new(Vec::new());
        let mut traversal =
            TraversalBuilder::new(diamond, QueueDiscipline::BreadthFirst, FlatTracker::new())
                .add_step_action_with_context(Hops, |v: &Vertex, ctx: &StepContext<u32>| {
                    depths.borrow_mut().push((v.0, ctx.value))
                })
                .add_step_action_with_context(Route, |_: &Vertex, ctx: &StepContext<String>| {
                    routes.borrow_mut().push(ctx.value.clone())
                })
                .add_stop_condition_with_context(Hops, |_: &Vertex, ctx: &StepContext<u32>| ctx.value >= 1)
                .build();
        let summary = traversal.run([Vertex(0)]);
        drop(traversal);

        assert_eq!(summary.steps, 3);
        assert_eq!(depths.into_inner(), vec![(0, 0), (1, 1), (2, 1)]);
        assert_eq!(routes.into_inner(), vec!["0", "0>1", "0>2"]);
    }

    #[test]
    fn queue_conditions_can_carry_context() {
        let seen = RefCell::new(Vec::new());
        let mut traversal =
            TraversalBuilder::new(diamond, QueueDiscipline::DepthFirst, FlatTracker::new())
                .add_queue_condition_with_context(
                    Hops,
                    |_: &Vertex, next: &StepContext<u32>, _: &Vertex, current: &StepContext<u32>| {
                        next.value == current.value + 1 && next.value < 2
                    },
                )
                .add_step_action(|v: &Vertex, _: &StepContext<()>| seen.borrow_mut().push(v.0))
                .build();
        traversal.run([Vertex(0)]);
        drop(traversal);
        assert_eq!(seen.into_inner(), vec![0, 2, 1]);
    }
}
