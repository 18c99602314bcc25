//! Simulation time with femtosecond resolution and delta cycles.
//!
//! [`SimTime`] pairs a wall-clock timestamp with a delta index so that
//! zero-delay signal updates at the same instant still have a strict order.

use std::cmp::Ordering;
use std::fmt;

use strobe_common::{FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_US};

/// A point in simulated time.
///
/// Ordered first by femtosecond timestamp, then by delta cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct SimTime {
    /// Wall-clock simulation time in femtoseconds.
    pub fs: u64,
    /// Delta cycle index within the current time step.
    pub delta: u32,
}

impl SimTime {
    /// Time zero, delta zero.
    pub const ZERO: SimTime = SimTime { fs: 0, delta: 0 };

    /// Creates a time from a femtosecond value with delta 0.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// Creates a time from a nanosecond value with delta 0.
    pub fn from_ns(ns: u64) -> Self {
        Self::from_fs(ns * FS_PER_NS)
    }

    /// Creates a time from a microsecond value with delta 0.
    pub fn from_us(us: u64) -> Self {
        Self::from_fs(us * FS_PER_US)
    }

    /// Returns the next delta cycle at the same wall-clock time.
    pub fn next_delta(self) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta + 1,
        }
    }

    /// Advances to a later wall-clock time, resetting the delta counter.
    pub fn advance_to(self, fs: u64) -> Self {
        debug_assert!(fs >= self.fs, "cannot advance backwards: {} -> {fs}", self.fs);
        Self { fs, delta: 0 }
    }

    /// Femtosecond timestamp `duration_fs` after this point, saturating.
    pub fn after(self, duration_fs: u64) -> u64 {
        self.fs.saturating_add(duration_fs)
    }

    /// Converts the timestamp to nanoseconds (truncated).
    pub fn to_ns(self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        match [FS_PER_MS, FS_PER_US, FS_PER_NS, FS_PER_PS]
            .into_iter()
            .zip(["ms", "us", "ns", "ps"])
            .find(|(scale, _)| fs >= *scale && fs % scale == 0)
        {
            Some((scale, unit)) => write!(f, "{} {unit}", fs / scale)?,
            None => write!(f, "{fs} fs")?,
        }
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(SimTime::from_ns(10).fs, 10_000_000);
        assert_eq!(SimTime::from_us(5).fs, 5_000_000_000);
        assert_eq!(SimTime::from_fs(42).delta, 0);
    }

    #[test]
    fn delta_then_advance() {
        let t = SimTime::from_ns(5).next_delta().next_delta();
        assert_eq!(t.delta, 2);
        let t2 = t.advance_to(t.fs + 1);
        assert_eq!(t2.delta, 0);
        assert_eq!(t2.fs, t.fs + 1);
    }

    #[test]
    fn after_saturates() {
        assert_eq!(SimTime::from_fs(u64::MAX - 1).after(10), u64::MAX);
        assert_eq!(SimTime::from_ns(1).after(5), 1_000_005);
    }

    #[test]
    fn ordering() {
        let a = SimTime { fs: 100, delta: 9 };
        let b = SimTime { fs: 200, delta: 0 };
        assert!(a < b);
        assert!(SimTime { fs: 100, delta: 0 } < a);
    }

    #[test]
    fn display_units() {
        assert_eq!(SimTime::ZERO.to_string(), "0 fs");
        assert_eq!(SimTime::from_ns(10).to_string(), "10 ns");
        assert_eq!(SimTime::from_us(5).to_string(), "5 us");
        assert_eq!(SimTime::from_fs(8_770_000).to_string(), "8770 ps");
        assert_eq!(SimTime::from_fs(1500).to_string(), "1500 fs");
    }

    #[test]
    fn display_with_delta() {
        let t = SimTime {
            fs: FS_PER_NS,
            delta: 3,
        };
        assert_eq!(t.to_string(), "1 ns+d3");
    }
}
