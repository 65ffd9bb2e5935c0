//! Per-item step context and the computers that derive its value.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Context carried alongside every queued item.
#[derive(Debug, Clone, PartialEq)]
pub struct StepContext<V> {
    /// `true` for seeds passed to `run` or `add_start_item`.
    pub is_start_item: bool,
    /// Number of hops from the seed this item descends from.
    pub step_number: usize,
    /// Set once the stop conditions have been evaluated for this item.
    pub is_stopping: bool,
    pub value: V,
    hook_values: HookValues,
}

impl<V> StepContext<V> {
    pub fn start(value: V) -> Self {
        Self {
            is_start_item: true,
            step_number: 0,
            is_stopping: false,
            value,
            hook_values: HookValues::default(),
        }
    }

    /// Context for an item reached from the one owning `self`.
    pub fn next(&self, value: V) -> Self {
        Self {
            is_start_item: false,
            step_number: self.step_number + 1,
            is_stopping: false,
            value,
            hook_values: HookValues::default(),
        }
    }

    pub(crate) fn with_hook_values(mut self, hook_values: HookValues) -> Self {
        self.hook_values = hook_values;
        self
    }

    pub(crate) fn hook_values(&self) -> &HookValues {
        &self.hook_values
    }

    /// The context a hook registered with its own computer sees: the same
    /// flags with the hook's value in place of the traversal value.
    ///
    /// `None` when the item carries no value for `slot`, which happens for
    /// items pushed straight onto the queue.
    pub(crate) fn view<W: Clone + 'static>(&self, slot: usize) -> Option<StepContext<W>> {
        let value = self.hook_values.get::<W>(slot)?;
        Some(StepContext {
            is_start_item: self.is_start_item,
            step_number: self.step_number,
            is_stopping: self.is_stopping,
            value: value.clone(),
            hook_values: HookValues::default(),
        })
    }
}

/// Derives the context value of each item from its predecessor.
///
/// Both functions must be pure: the engine may call `compute_next_value`
/// for candidates that are then rejected by a queue condition.
pub trait ContextValueComputer<T, V> {
    fn compute_initial_value(&self, item: &T) -> V;

    fn compute_next_value(&self, next: &T, current: &T, current_value: &V) -> V;
}

/// Computer yielding `V::default()` everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValue;

impl<T, V: Default> ContextValueComputer<T, V> for DefaultValue {
    fn compute_initial_value(&self, _item: &T) -> V {
        V::default()
    }

    fn compute_next_value(&self, _next: &T, _current: &T, _current_value: &V) -> V {
        V::default()
    }
}

/// Values computed by the computers registered alongside individual hooks,
/// one slot per registration.
#[derive(Clone, Default)]
pub(crate) struct HookValues(Vec<Option<Rc<dyn Any>>>);

impl HookValues {
    fn get<W: 'static>(&self, slot: usize) -> Option<&W> {
        let value = self.0.get(slot)?.as_ref()?;
        (**value).downcast_ref::<W>()
    }
}

impl fmt::Debug for HookValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookValues").field("slots", &self.0.len()).finish()
    }
}

impl PartialEq for HookValues {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|pair| match pair {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            })
    }
}

/// Type-erased [`ContextValueComputer`] owned by the engine for one hook slot.
pub(crate) trait HookComputer<T> {
    fn initial(&self, item: &T) -> Rc<dyn Any>;

    fn next(&self, next: &T, current: &T, current_value: &dyn Any) -> Option<Rc<dyn Any>>;
}

pub(crate) struct ErasedComputer<C, W> {
    computer: C,
    _value: PhantomData<fn() -> W>,
}

impl<C, W> ErasedComputer<C, W> {
    pub(crate) fn new(computer: C) -> Self {
        Self {
            computer,
            _value: PhantomData,
        }
    }
}

impl<T, W: 'static, C: ContextValueComputer<T, W>> HookComputer<T> for ErasedComputer<C, W> {
    fn initial(&self, item: &T) -> Rc<dyn Any> {
        Rc::new(self.computer.compute_initial_value(item))
    }

    fn next(&self, next: &T, current: &T, current_value: &dyn Any) -> Option<Rc<dyn Any>> {
        let current_value = current_value.downcast_ref::<W>()?;
        Some(Rc::new(self.computer.compute_next_value(next, current, current_value)))
    }
}

/// Initial hook values of a start item.
pub(crate) fn initial_hook_values<T>(computers: &[Box<dyn HookComputer<T> + '_>], item: &T) -> HookValues {
    HookValues(computers.iter().map(|c| Some(c.initial(item))).collect())
}

/// Hook values of `next`, derived slot by slot from those of `current`.
pub(crate) fn next_hook_values<T>(
    computers: &[Box<dyn HookComputer<T> + '_>],
    next: &T,
    current: &T,
    current_values: &HookValues,
) -> HookValues {
    HookValues(
        computers
            .iter()
            .enumerate()
            .map(|(slot, computer)| {
                let value = current_values.0.get(slot)?.as_ref()?;
                computer.next(next, current, &**value)
            })
            .collect(),
    )
}
