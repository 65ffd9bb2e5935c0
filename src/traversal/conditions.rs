//! Hooks registered on a traversal: stop conditions, queue conditions and
//! step actions, plus a logging decorator for any of them.
//!
//! Closures with the matching signature implement each trait directly.

use std::fmt;
use std::marker::PhantomData;

use tracing::trace;

use super::context::StepContext;

/// Decides whether an item is a boundary. A stopping item is still actioned
/// but its neighbours are not expanded.
pub trait StopCondition<T, V> {
    fn should_stop(&self, item: &T, context: &StepContext<V>) -> bool;
}

impl<T, V, F> StopCondition<T, V> for F
where
    F: Fn(&T, &StepContext<V>) -> bool,
{
    fn should_stop(&self, item: &T, context: &StepContext<V>) -> bool {
        self(item, context)
    }
}

/// Decides whether a candidate is enqueued at all. Candidates are marked
/// visited before the queue conditions run, so a rejected candidate is not
/// reached again along another path.
pub trait QueueCondition<T, V> {
    fn should_queue(
        &self,
        next: &T,
        next_context: &StepContext<V>,
        current: &T,
        current_context: &StepContext<V>,
    ) -> bool;

    fn should_queue_start_item(&self, _item: &T) -> bool {
        true
    }
}

impl<T, V, F> QueueCondition<T, V> for F
where
    F: Fn(&T, &StepContext<V>, &T, &StepContext<V>) -> bool,
{
    fn should_queue(
        &self,
        next: &T,
        next_context: &StepContext<V>,
        current: &T,
        current_context: &StepContext<V>,
    ) -> bool {
        self(next, next_context, current, current_context)
    }
}

/// Work performed on every dequeued item, in registration order.
pub trait StepAction<T, V> {
    fn apply(&mut self, item: &T, context: &StepContext<V>);
}

impl<T, V, F> StepAction<T, V> for F
where
    F: FnMut(&T, &StepContext<V>),
{
    fn apply(&mut self, item: &T, context: &StepContext<V>) {
        self(item, context)
    }
}

/// Wraps a condition or action and emits a `TRACE` level event for every
/// evaluation. Results are passed through untouched.
pub struct Logged<C> {
    label: &'static str,
    inner: C,
}

impl<C> Logged<C> {
    pub fn new(label: &'static str, inner: C) -> Self {
        Self { label, inner }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C> fmt::Debug for Logged<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logged").field("label", &self.label).finish()
    }
}

impl<T: fmt::Debug, V, C: StopCondition<T, V>> StopCondition<T, V> for Logged<C> {
    fn should_stop(&self, item: &T, context: &StepContext<V>) -> bool {
        let stop = self.inner.should_stop(item, context);
        trace!(label = self.label, step = context.step_number, ?item, stop, "stop condition");
        stop
    }
}

impl<T: fmt::Debug, V, C: QueueCondition<T, V>> QueueCondition<T, V> for Logged<C> {
    fn should_queue(
        &self,
        next: &T,
        next_context: &StepContext<V>,
        current: &T,
        current_context: &StepContext<V>,
    ) -> bool {
        let queue = self
            .inner
            .should_queue(next, next_context, current, current_context);
        trace!(label = self.label, step = next_context.step_number, ?next, queue, "queue condition");
        queue
    }

    fn should_queue_start_item(&self, item: &T) -> bool {
        let queue = self.inner.should_queue_start_item(item);
        trace!(label = self.label, ?item, queue, "queue condition (start item)");
        queue
    }
}

impl<T: fmt::Debug, V, C: StepAction<T, V>> StepAction<T, V> for Logged<C> {
    fn apply(&mut self, item: &T, context: &StepContext<V>) {
        trace!(
            label = self.label,
            step = context.step_number,
            stopping = context.is_stopping,
            ?item,
            "step action"
        );
        self.inner.apply(item, context);
    }
}

/// Adapts a hook written against its own context value `W` to the
/// traversal's context. `slot` is where the engine keeps that value.
///
/// Items without a value for the slot, i.e. ones pushed straight onto the
/// queue, never stop and are never rejected or actioned by the hook.
pub(crate) struct WithContext<H, W> {
    slot: usize,
    hook: H,
    _value: PhantomData<fn() -> W>,
}

impl<H, W> WithContext<H, W> {
    pub(crate) fn new(slot: usize, hook: H) -> Self {
        Self {
            slot,
            hook,
            _value: PhantomData,
        }
    }
}

impl<T, V, W, H> StopCondition<T, V> for WithContext<H, W>
where
    W: Clone + 'static,
    H: StopCondition<T, W>,
{
    fn should_stop(&self, item: &T, context: &StepContext<V>) -> bool {
        context
            .view::<W>(self.slot)
            .is_some_and(|view| self.hook.should_stop(item, &view))
    }
}

impl<T, V, W, H> QueueCondition<T, V> for WithContext<H, W>
where
    W: Clone + 'static,
    H: QueueCondition<T, W>,
{
    fn should_queue(
        &self,
        next: &T,
        next_context: &StepContext<V>,
        current: &T,
        current_context: &StepContext<V>,
    ) -> bool {
        match (next_context.view::<W>(self.slot), current_context.view::<W>(self.slot)) {
            (Some(next_view), Some(current_view)) => {
                self.hook.should_queue(next, &next_view, current, &current_view)
            }
            _ => true,
        }
    }

    fn should_queue_start_item(&self, item: &T) -> bool {
        self.hook.should_queue_start_item(item)
    }
}

impl<T, V, W, H> StepAction<T, V> for WithContext<H, W>
where
    W: Clone + 'static,
    H: StepAction<T, W>,
{
    fn apply(&mut self, item: &T, context: &StepContext<V>) {
        if let Some(view) = context.view::<W>(self.slot) {
            self.hook.apply(item, &view);
        }
    }
}
