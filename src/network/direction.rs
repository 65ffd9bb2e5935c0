//! Feeder direction values and their merge algebra.

use std::fmt;
use std::ops::{Add, Not, Sub};
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Direction of the feeder head relative to a terminal.
///
/// `UPSTREAM` means the feeder head is reached by tracing out of the
/// terminal, `DOWNSTREAM` means tracing out of it moves away from the head.
/// `BOTH` appears on loops, `CONNECTOR` on busbar-like junction points.
///
/// # Examples
///
/// ```
/// use grid_trace::network::direction::FeederDirection;
///
/// let merged = FeederDirection::Upstream + FeederDirection::Downstream;
/// assert_eq!(merged, FeederDirection::Both);
/// assert!(merged.contains(FeederDirection::Upstream));
/// assert_eq!(!FeederDirection::Upstream, FeederDirection::Downstream);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum FeederDirection {
    #[default]
    None = 0,
    Upstream = 1,
    Downstream = 2,
    Both = 3,
    Connector = 4,
}

const DIRECTION_MASK: u8 = 0b11;

impl FeederDirection {
    pub const ALL: [FeederDirection; 5] = [
        FeederDirection::None,
        FeederDirection::Upstream,
        FeederDirection::Downstream,
        FeederDirection::Both,
        FeederDirection::Connector,
    ];

    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Converts raw bits back into a direction. Anything above the
    /// upstream/downstream mask collapses to `Connector`.
    pub fn from_bits(bits: u8) -> Self {
        if bits & !DIRECTION_MASK != 0 {
            return FeederDirection::Connector;
        }
        match bits {
            1 => FeederDirection::Upstream,
            2 => FeederDirection::Downstream,
            3 => FeederDirection::Both,
            _ => FeederDirection::None,
        }
    }

    /// Returns `true` when `other` is part of this direction.
    ///
    /// `Both` and `Connector` contain every direction except `None`;
    /// anything else only contains itself.
    pub fn contains(self, other: FeederDirection) -> bool {
        match self {
            FeederDirection::Both | FeederDirection::Connector => other != FeederDirection::None,
            _ => self == other,
        }
    }
}

impl Add for FeederDirection {
    type Output = FeederDirection;

    fn add(self, rhs: FeederDirection) -> FeederDirection {
        if self == FeederDirection::Connector || rhs == FeederDirection::Connector {
            return FeederDirection::Connector;
        }
        FeederDirection::from_bits(self.bits() | rhs.bits())
    }
}

impl Sub for FeederDirection {
    type Output = FeederDirection;

    /// Removes the upstream/downstream bits of `rhs`. Only the low two bits
    /// take part, so `Connector` neither subtracts anything nor survives
    /// subtraction.
    fn sub(self, rhs: FeederDirection) -> FeederDirection {
        FeederDirection::from_bits(self.bits() & DIRECTION_MASK & !(rhs.bits() & DIRECTION_MASK))
    }
}

impl Not for FeederDirection {
    type Output = FeederDirection;

    fn not(self) -> FeederDirection {
        match self {
            FeederDirection::None => FeederDirection::Both,
            FeederDirection::Upstream => FeederDirection::Downstream,
            FeederDirection::Downstream => FeederDirection::Upstream,
            FeederDirection::Both | FeederDirection::Connector => FeederDirection::None,
        }
    }
}

impl fmt::Display for FeederDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeederDirection::None => "NONE",
            FeederDirection::Upstream => "UPSTREAM",
            FeederDirection::Downstream => "DOWNSTREAM",
            FeederDirection::Both => "BOTH",
            FeederDirection::Connector => "CONNECTOR",
        };
        f.write_str(s)
    }
}

/// Mutable per-terminal direction storage written by direction traces.
#[derive(Default)]
pub struct DirectionCell(AtomicU8);

impl DirectionCell {
    pub fn get(&self) -> FeederDirection {
        FeederDirection::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, direction: FeederDirection) {
        self.0.store(direction.bits(), Ordering::Relaxed);
    }

    /// Merges `direction` into the cell, returning `true` if the value changed.
    pub fn add(&self, direction: FeederDirection) -> bool {
        self.update(|current| current + direction)
    }

    /// Removes `direction` from the cell, returning `true` if the value changed.
    pub fn remove(&self, direction: FeederDirection) -> bool {
        self.update(|current| current - direction)
    }

    fn update(&self, f: impl Fn(FeederDirection) -> FeederDirection) -> bool {
        let previous = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| {
                Some(f(FeederDirection::from_bits(raw)).bits())
            })
            .unwrap_or_else(|raw| raw);
        let previous = FeederDirection::from_bits(previous);
        f(previous) != previous
    }
}

impl fmt::Debug for DirectionCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectionCell({})", self.get())
    }
}
