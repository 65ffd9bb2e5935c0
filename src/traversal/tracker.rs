//! Visited-set tracking for traversals.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// Items that can be recorded by a [`FlatTracker`] or [`LayeredTracker`].
pub trait Trackable {
    type Key: Eq + Hash + Clone;

    fn tracking_key(&self) -> Self::Key;
}

/// Records which items a traversal has already reached.
pub trait Tracker<T> {
    fn has_visited(&self, item: &T) -> bool;

    /// Marks `item` visited. Returns `true` if it had not been seen before.
    fn visit(&mut self, item: &T) -> bool;

    fn clear(&mut self);
}

/// Tracker owning a single hash set of keys.
pub struct FlatTracker<K> {
    visited: HashSet<K>,
}

impl<K> FlatTracker<K> {
    pub fn new() -> Self {
        Self {
            visited: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

impl<K> Default for FlatTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for FlatTracker<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatTracker")
            .field("visited", &self.visited.len())
            .finish()
    }
}

impl<T> Tracker<T> for FlatTracker<T::Key>
where
    T: Trackable,
{
    fn has_visited(&self, item: &T) -> bool {
        self.visited.contains(&item.tracking_key())
    }

    fn visit(&mut self, item: &T) -> bool {
        self.visited.insert(item.tracking_key())
    }

    fn clear(&mut self) {
        self.visited.clear();
    }
}

/// Tracker that consults a borrowed parent before its own set.
///
/// Used by traces started while another trace is in progress: the child
/// never revisits anything the parent has seen and never writes into the
/// parent. Parents can themselves be layered, so chains nest.
pub struct LayeredTracker<'p, T: Trackable> {
    parent: &'p dyn Tracker<T>,
    visited: HashSet<T::Key>,
}

impl<'p, T: Trackable> LayeredTracker<'p, T> {
    pub fn new(parent: &'p dyn Tracker<T>) -> Self {
        Self {
            parent,
            visited: HashSet::new(),
        }
    }

    /// Number of keys recorded by this layer alone.
    pub fn own_len(&self) -> usize {
        self.visited.len()
    }
}

impl<T: Trackable> Tracker<T> for LayeredTracker<'_, T> {
    fn has_visited(&self, item: &T) -> bool {
        self.visited.contains(&item.tracking_key()) || self.parent.has_visited(item)
    }

    fn visit(&mut self, item: &T) -> bool {
        if self.parent.has_visited(item) {
            return false;
        }
        self.visited.insert(item.tracking_key())
    }

    /// Clears this layer only.
    fn clear(&mut self) {
        self.visited.clear();
    }
}
