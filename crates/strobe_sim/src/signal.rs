//! Signal identity, state, and edge classification.
//!
//! Signals are two-state vectors up to 64 bits wide. Each keeps its value
//! from before the most recent update so that edges can be classified after
//! a delta cycle has been applied.

use std::fmt;

/// Opaque ID for a simulation signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates a `SignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig{}", self.0)
    }
}

/// The runtime state of a simulation signal.
#[derive(Clone, Debug)]
pub struct SignalState {
    /// Signal name, unique within a simulator.
    pub name: String,
    /// Bit width, 1..=64.
    pub width: u32,
    /// Current value, masked to `width`.
    pub value: u64,
    /// Value before the most recent update.
    pub previous_value: u64,
}

impl SignalState {
    /// Creates a signal holding `init` (masked to `width`).
    pub fn new(name: impl Into<String>, width: u32, init: u64) -> Self {
        let value = init & width_mask(width);
        Self {
            name: name.into(),
            width,
            value,
            previous_value: value,
        }
    }

    /// Bit mask covering the signal's width.
    pub fn mask(&self) -> u64 {
        width_mask(self.width)
    }

    /// Bit 0 went from low to high in the last update.
    pub fn rose(&self) -> bool {
        self.previous_value & 1 == 0 && self.value & 1 == 1
    }

    /// Bit 0 went from high to low in the last update.
    pub fn fell(&self) -> bool {
        self.previous_value & 1 == 1 && self.value & 1 == 0
    }
}

/// Mask of the low `width` bits.
pub fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Which transition of a signal a process is waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// Bit 0 rises.
    Rising,
    /// Bit 0 falls.
    Falling,
    /// Any change of value.
    Any,
}

impl Edge {
    /// Returns true when `state`'s last update is this kind of edge.
    pub fn matches(self, state: &SignalState) -> bool {
        match self {
            Edge::Rising => state.rose(),
            Edge::Falling => state.fell(),
            Edge::Any => state.value != state.previous_value,
        }
    }
}

/// Active level of a reset or select line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Asserted when driven high.
    ActiveHigh,
    /// Asserted when driven low.
    #[default]
    ActiveLow,
}

impl Polarity {
    /// Returns the line value that represents `asserted`.
    pub fn level(self, asserted: bool) -> u64 {
        match self {
            Polarity::ActiveHigh => u64::from(asserted),
            Polarity::ActiveLow => u64::from(!asserted),
        }
    }

    /// Returns true if a line holding `value` is asserted.
    pub fn is_asserted(self, value: u64) -> bool {
        match self {
            Polarity::ActiveHigh => value & 1 == 1,
            Polarity::ActiveLow => value & 1 == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_masks_initial_value() {
        let s = SignalState::new("data", 4, 0xff);
        assert_eq!(s.value, 0xf);
        assert_eq!(s.previous_value, 0xf);
    }

    #[test]
    fn mask_edges() {
        assert_eq!(width_mask(1), 1);
        assert_eq!(width_mask(8), 0xff);
        assert_eq!(width_mask(64), u64::MAX);
    }

    #[test]
    fn rising_and_falling() {
        let mut s = SignalState::new("clk", 1, 0);
        s.value = 1;
        assert!(s.rose());
        assert!(!s.fell());
        assert!(Edge::Rising.matches(&s));
        assert!(Edge::Any.matches(&s));
        s.previous_value = 1;
        s.value = 0;
        assert!(s.fell());
        assert!(Edge::Falling.matches(&s));
    }

    #[test]
    fn multi_bit_change_without_bit0_edge() {
        let mut s = SignalState::new("addr", 8, 0x02);
        s.value = 0x04;
        assert!(!Edge::Rising.matches(&s));
        assert!(!Edge::Falling.matches(&s));
        assert!(Edge::Any.matches(&s));
    }

    #[test]
    fn polarity_levels() {
        assert_eq!(Polarity::ActiveLow.level(true), 0);
        assert_eq!(Polarity::ActiveLow.level(false), 1);
        assert_eq!(Polarity::ActiveHigh.level(true), 1);
        assert!(Polarity::ActiveLow.is_asserted(0));
        assert!(!Polarity::ActiveHigh.is_asserted(0));
    }
}
