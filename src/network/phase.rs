//! Conductor phases: single phases, phase sets and per-terminal traced phase records.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ParsePhaseCodeError;

/// A single conductor phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum SinglePhaseKind {
    #[default]
    None = 0,
    A = 1,
    B = 2,
    C = 3,
    N = 4,
    X = 5,
    Y = 6,
}

impl SinglePhaseKind {
    /// Every real phase, in canonical order.
    pub const ALL: [SinglePhaseKind; 6] = [
        SinglePhaseKind::A,
        SinglePhaseKind::B,
        SinglePhaseKind::C,
        SinglePhaseKind::N,
        SinglePhaseKind::X,
        SinglePhaseKind::Y,
    ];

    /// Bit used for this phase inside a [`PhaseCode`]; `0` for `None`.
    pub fn bit(self) -> u8 {
        match self {
            SinglePhaseKind::None => 0,
            other => 1 << (other as u8 - 1),
        }
    }

    fn from_value(value: u8) -> Self {
        match value {
            1 => SinglePhaseKind::A,
            2 => SinglePhaseKind::B,
            3 => SinglePhaseKind::C,
            4 => SinglePhaseKind::N,
            5 => SinglePhaseKind::X,
            6 => SinglePhaseKind::Y,
            _ => SinglePhaseKind::None,
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(SinglePhaseKind::A),
            'B' => Some(SinglePhaseKind::B),
            'C' => Some(SinglePhaseKind::C),
            'N' => Some(SinglePhaseKind::N),
            'X' => Some(SinglePhaseKind::X),
            'Y' => Some(SinglePhaseKind::Y),
            _ => None,
        }
    }

    /// Returns `true` for the secondary-side `X`/`Y` phases.
    pub fn is_xy(self) -> bool {
        matches!(self, SinglePhaseKind::X | SinglePhaseKind::Y)
    }
}

impl fmt::Display for SinglePhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SinglePhaseKind::None => "NONE",
            SinglePhaseKind::A => "A",
            SinglePhaseKind::B => "B",
            SinglePhaseKind::C => "C",
            SinglePhaseKind::N => "N",
            SinglePhaseKind::X => "X",
            SinglePhaseKind::Y => "Y",
        };
        f.write_str(s)
    }
}

/// An unordered set of single phases, e.g. the nominal phases of a terminal.
///
/// Stored as a bitmask so it can be used directly inside tracker keys.
///
/// # Examples
///
/// ```
/// use grid_trace::network::phase::{PhaseCode, SinglePhaseKind};
///
/// let abcn: PhaseCode = "ABCN".parse().unwrap();
/// assert!(abcn.contains(SinglePhaseKind::N));
/// assert_eq!(abcn.without(PhaseCode::N), PhaseCode::ABC);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhaseCode(u8);

impl PhaseCode {
    pub const NONE: PhaseCode = PhaseCode(0);
    pub const A: PhaseCode = PhaseCode(0b00_0001);
    pub const B: PhaseCode = PhaseCode(0b00_0010);
    pub const C: PhaseCode = PhaseCode(0b00_0100);
    pub const N: PhaseCode = PhaseCode(0b00_1000);
    pub const X: PhaseCode = PhaseCode(0b01_0000);
    pub const Y: PhaseCode = PhaseCode(0b10_0000);
    pub const AB: PhaseCode = PhaseCode(0b00_0011);
    pub const ABC: PhaseCode = PhaseCode(0b00_0111);
    pub const ABCN: PhaseCode = PhaseCode(0b00_1111);
    pub const XY: PhaseCode = PhaseCode(0b11_0000);
    pub const XYN: PhaseCode = PhaseCode(0b11_1000);

    /// Builds a phase code from a sequence of single phases.
    pub fn from_phases(phases: impl IntoIterator<Item = SinglePhaseKind>) -> Self {
        PhaseCode(phases.into_iter().fold(0, |acc, p| acc | p.bit()))
    }

    pub fn contains(self, phase: SinglePhaseKind) -> bool {
        phase != SinglePhaseKind::None && self.0 & phase.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: PhaseCode) -> PhaseCode {
        PhaseCode(self.0 | other.0)
    }

    pub fn intersection(self, other: PhaseCode) -> PhaseCode {
        PhaseCode(self.0 & other.0)
    }

    pub fn without(self, other: PhaseCode) -> PhaseCode {
        PhaseCode(self.0 & !other.0)
    }

    /// Iterates the contained phases in canonical `ABCNXY` order.
    pub fn iter(self) -> impl Iterator<Item = SinglePhaseKind> {
        SinglePhaseKind::ALL
            .into_iter()
            .filter(move |p| self.contains(*p))
    }
}

impl FromStr for PhaseCode {
    type Err = ParsePhaseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(PhaseCode::NONE);
        }
        let mut bits = 0u8;
        for c in trimmed.chars() {
            let phase = SinglePhaseKind::from_char(c.to_ascii_uppercase())
                .ok_or_else(|| ParsePhaseCodeError(s.to_string()))?;
            if bits & phase.bit() != 0 {
                return Err(ParsePhaseCodeError(s.to_string()));
            }
            bits |= phase.bit();
        }
        Ok(PhaseCode(bits))
    }
}

impl TryFrom<String> for PhaseCode {
    type Error = ParsePhaseCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PhaseCode> for String {
    fn from(value: PhaseCode) -> Self {
        value.to_string()
    }
}

impl From<SinglePhaseKind> for PhaseCode {
    fn from(value: SinglePhaseKind) -> Self {
        PhaseCode(value.bit())
    }
}

impl fmt::Display for PhaseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        for phase in self.iter() {
            write!(f, "{phase}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PhaseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhaseCode({self})")
    }
}

/// Traced (energized) phase per nominal phase of one terminal.
///
/// Each nominal phase owns a 4-bit slot holding the [`SinglePhaseKind`]
/// currently flowing on that conductor. Stored atomically so NORMAL and
/// CURRENT passes can run on separate threads against one network.
#[derive(Default)]
pub struct PhaseStatus(AtomicU32);

impl PhaseStatus {
    fn shift(nominal: SinglePhaseKind) -> Option<u32> {
        match nominal {
            SinglePhaseKind::None => None,
            other => Some((other as u32 - 1) * 4),
        }
    }

    /// Returns the phase traced onto the `nominal` conductor.
    pub fn get(&self, nominal: SinglePhaseKind) -> SinglePhaseKind {
        let Some(shift) = Self::shift(nominal) else {
            return SinglePhaseKind::None;
        };
        let raw = self.0.load(Ordering::Relaxed);
        SinglePhaseKind::from_value(((raw >> shift) & 0xF) as u8)
    }

    /// Records `traced` on the `nominal` conductor, returning `true` if it changed.
    pub fn set(&self, nominal: SinglePhaseKind, traced: SinglePhaseKind) -> bool {
        let Some(shift) = Self::shift(nominal) else {
            return false;
        };
        let mask = 0xF << shift;
        let value = (traced as u32) << shift;
        let previous = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |raw| {
                Some((raw & !mask) | value)
            })
            .unwrap_or_default();
        previous & mask != value
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    /// Union of every phase currently traced onto this terminal.
    pub fn traced(&self) -> PhaseCode {
        PhaseCode::from_phases(SinglePhaseKind::ALL.into_iter().map(|p| self.get(p)))
    }
}

impl fmt::Debug for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for nominal in SinglePhaseKind::ALL {
            let traced = self.get(nominal);
            if traced != SinglePhaseKind::None {
                map.entry(&nominal, &traced);
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_phase_codes() {
        let code: PhaseCode = "abcn".parse().expect("valid phase code");
        assert_eq!(code, PhaseCode::ABCN);
        assert_eq!(code.to_string(), "ABCN");
        assert_eq!("".parse::<PhaseCode>().ok(), Some(PhaseCode::NONE));
        assert_eq!(PhaseCode::NONE.to_string(), "NONE");
    }

    #[test]
    fn rejects_unknown_and_repeated_phases() {
        assert!("ABQ".parse::<PhaseCode>().is_err());
        assert!("AA".parse::<PhaseCode>().is_err());
    }

    #[test]
    fn iterates_in_canonical_order() {
        let code = PhaseCode::from_phases([SinglePhaseKind::N, SinglePhaseKind::A]);
        let phases: Vec<_> = code.iter().collect();
        assert_eq!(phases, vec![SinglePhaseKind::A, SinglePhaseKind::N]);
        assert_eq!(code.len(), 2);
    }

    #[test]
    fn set_operations() {
        assert_eq!(PhaseCode::AB.union(PhaseCode::C), PhaseCode::ABC);
        assert_eq!(PhaseCode::ABCN.intersection(PhaseCode::XYN), PhaseCode::N);
        assert!(!PhaseCode::ABC.contains(SinglePhaseKind::None));
    }

    #[test]
    fn phase_status_tracks_each_nominal_slot() {
        let status = PhaseStatus::default();
        assert!(status.set(SinglePhaseKind::A, SinglePhaseKind::B));
        assert!(!status.set(SinglePhaseKind::A, SinglePhaseKind::B));
        assert!(status.set(SinglePhaseKind::Y, SinglePhaseKind::C));

        assert_eq!(status.get(SinglePhaseKind::A), SinglePhaseKind::B);
        assert_eq!(status.get(SinglePhaseKind::B), SinglePhaseKind::None);
        assert_eq!(status.get(SinglePhaseKind::Y), SinglePhaseKind::C);
        assert_eq!(status.traced(), PhaseCode::from_phases([SinglePhaseKind::B, SinglePhaseKind::C]));

        status.clear();
        assert!(status.traced().is_empty());
    }

    #[test]
    fn deserializes_from_string() {
        #[derive(Deserialize)]
        struct Holder {
            phases: PhaseCode,
        }
        let holder: Holder = toml::from_str("phases = \"XYN\"").expect("valid toml");
        assert_eq!(holder.phases, PhaseCode::XYN);
    }
}
