//! Work queue used by the traversal engine.

use std::collections::VecDeque;

use super::context::StepContext;

/// Order in which queued items are taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueDiscipline {
    /// Last in, first out.
    #[default]
    DepthFirst,
    /// First in, first out.
    BreadthFirst,
}

/// Items waiting to be stepped on, with their contexts.
#[derive(Debug)]
pub struct TraversalQueue<T, V> {
    discipline: QueueDiscipline,
    items: VecDeque<(T, StepContext<V>)>,
}

impl<T, V> TraversalQueue<T, V> {
    pub fn new(discipline: QueueDiscipline) -> Self {
        Self {
            discipline,
            items: VecDeque::new(),
        }
    }

    pub fn discipline(&self) -> QueueDiscipline {
        self.discipline
    }

    /// Enqueues an item directly, bypassing tracker and queue conditions.
    pub fn push(&mut self, item: T, context: StepContext<V>) {
        self.items.push_back((item, context));
    }

    pub fn pop(&mut self) -> Option<(T, StepContext<V>)> {
        match self.discipline {
            QueueDiscipline::DepthFirst => self.items.pop_back(),
            QueueDiscipline::BreadthFirst => self.items.pop_front(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Queued items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|(item, _)| item)
    }
}
