//! Clock frequencies in whole hertz, with unit parsing and period conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::duration::FS_PER_S;

const UNITS: [(u64, &str); 4] = [
    (1_000_000_000, "GHz"),
    (1_000_000, "MHz"),
    (1_000, "kHz"),
    (1, "Hz"),
];

/// A clock or bit-rate frequency in whole hertz.
///
/// Parses "8MHz", "74.25 MHz", "100kHz" or a bare number of hertz. Decimal
/// fractions are resolved exactly; anything finer than 1 Hz is rejected.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frequency {
    hz: u64,
}

impl Frequency {
    /// A frequency of `hz` hertz.
    pub const fn from_hz(hz: u64) -> Self {
        Self { hz }
    }

    /// A frequency of `mhz` megahertz.
    pub const fn from_mhz(mhz: u64) -> Self {
        Self {
            hz: mhz.saturating_mul(1_000_000),
        }
    }

    /// The frequency in hertz.
    pub fn hz(self) -> u64 {
        self.hz
    }

    /// One period, rounded to the nearest femtosecond. `None` for 0 Hz.
    pub fn period_fs(self) -> Option<u64> {
        if self.hz == 0 {
            return None;
        }
        Some((FS_PER_S + self.hz / 2) / self.hz)
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    /// Uses the largest unit that divides the value exactly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scale, unit) = UNITS
            .iter()
            .find(|(scale, _)| self.hz % scale == 0 && self.hz >= *scale)
            .copied()
            .unwrap_or((1, "Hz"));
        write!(f, "{} {unit}", self.hz / scale)
    }
}

/// A frequency string that could not be resolved to whole hertz.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let err = || ParseFrequencyError {
            input: input.to_string(),
        };

        let split = input
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(input.len());
        let (number, unit) = (&input[..split], input[split..].trim());
        let scale = if unit.is_empty() {
            1
        } else {
            UNITS
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(unit))
                .map(|(scale, _)| *scale)
                .ok_or_else(err)?
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(err());
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| err())?
        };
        let mut hz = whole.checked_mul(scale).ok_or_else(err)?;

        let fraction = fraction.trim_end_matches('0');
        if !fraction.is_empty() {
            let digits: u64 = fraction.parse().map_err(|_| err())?;
            let divisor = 10u64
                .checked_pow(fraction.len() as u32)
                .ok_or_else(err)?;
            let scaled = digits.checked_mul(scale).ok_or_else(err)?;
            if scaled % divisor != 0 {
                return Err(err());
            }
            hz = hz.checked_add(scaled / divisor).ok_or_else(err)?;
        }

        if hz == 0 {
            return Err(err());
        }
        Ok(Frequency { hz })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units_case_insensitively() {
        assert_eq!("8MHz".parse::<Frequency>().unwrap(), Frequency::from_mhz(8));
        assert_eq!("8 mhz".parse::<Frequency>().unwrap(), Frequency::from_mhz(8));
        assert_eq!("100kHz".parse::<Frequency>().unwrap().hz(), 100_000);
        assert_eq!("1GHz".parse::<Frequency>().unwrap().hz(), 1_000_000_000);
        assert_eq!("48000".parse::<Frequency>().unwrap().hz(), 48_000);
    }

    #[test]
    fn decimal_fractions_are_exact() {
        assert_eq!("74.25MHz".parse::<Frequency>().unwrap().hz(), 74_250_000);
        assert_eq!("0.5kHz".parse::<Frequency>().unwrap().hz(), 500);
        assert!("1.5Hz".parse::<Frequency>().is_err());
    }

    #[test]
    fn rejects_garbage_zero_and_signs() {
        for bad in ["", "fast", "0MHz", "-5MHz", "8 MHzz", "1.2.3MHz", "."] {
            assert!(bad.parse::<Frequency>().is_err(), "{bad:?} accepted");
        }
        let err = "fast".parse::<Frequency>().unwrap_err();
        assert_eq!(err.to_string(), "invalid frequency: 'fast'");
    }

    #[test]
    fn period_rounds_to_nearest_fs() {
        assert_eq!(Frequency::from_mhz(8).period_fs(), Some(125_000_000));
        assert_eq!(Frequency::from_mhz(80).period_fs(), Some(12_500_000));
        // 1e15 / 3e6 = 333 333 333.33...
        assert_eq!(Frequency::from_mhz(3).period_fs(), Some(333_333_333));
        assert_eq!(Frequency::from_hz(0).period_fs(), None);
    }

    #[test]
    fn display_uses_exact_unit() {
        assert_eq!(Frequency::from_mhz(8).to_string(), "8 MHz");
        assert_eq!(Frequency::from_hz(74_250_000).to_string(), "74250 kHz");
        assert_eq!(Frequency::from_hz(1_000_000_000).to_string(), "1 GHz");
        assert_eq!(Frequency::from_hz(500).to_string(), "500 Hz");
        assert_eq!(Frequency::from_hz(0).to_string(), "0 Hz");
        assert_eq!(format!("{:?}", Frequency::from_mhz(8)), "Frequency(8 MHz)");
    }

    #[test]
    fn serde_roundtrip() {
        let f = Frequency::from_mhz(8);
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, r#"{"hz":8000000}"#);
        assert_eq!(serde_json::from_str::<Frequency>(&json).unwrap(), f);
    }
}
