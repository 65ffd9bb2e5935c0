//! Generic, cycle-safe traversal engine.
//!
//! Nothing here knows about electrical networks: items are any type, the
//! expansion function decides what is reachable, and a [`Tracker`] keeps
//! every item from being stepped on twice.

pub mod conditions;
pub mod context;
pub mod engine;
pub mod queue;
pub mod tracker;

pub use conditions::{Logged, QueueCondition, StepAction, StopCondition};
pub use context::{ContextValueComputer, DefaultValue, StepContext};
pub use engine::{RunSummary, Traversal, TraversalBuilder};
pub use queue::{QueueDiscipline, TraversalQueue};
pub use tracker::{FlatTracker, LayeredTracker, Trackable, Tracker};
