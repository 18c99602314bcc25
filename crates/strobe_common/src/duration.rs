//! Duration strings with unit suffixes, resolved to whole femtoseconds.
//!
//! Accepts forms such as `"100ns"`, `"5 us"`, `"8.77ns"` and `"2.5us"`.
//! Fractional values are resolved exactly using decimal arithmetic, so
//! `"8.77ns"` is exactly 8 770 000 fs rather than a float approximation.

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// Error returned when a duration string cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDurationError {
    /// The string was empty or only whitespace.
    #[error("empty duration string")]
    Empty,

    /// No leading numeric value was found.
    #[error("invalid duration: no numeric value in '{0}'")]
    MissingNumber(String),

    /// The numeric part could not be parsed.
    #[error("invalid number in duration '{0}'")]
    InvalidNumber(String),

    /// The unit suffix is absent.
    #[error("missing unit in duration '{0}' (use fs, ps, ns, us, ms, or s)")]
    MissingUnit(String),

    /// The unit suffix is not one of the recognised units.
    #[error("unknown duration unit '{0}' (use fs, ps, ns, us, ms, or s)")]
    UnknownUnit(String),

    /// The value has more precision than one femtosecond.
    #[error("duration '{0}' is finer than 1 fs")]
    TooPrecise(String),

    /// The value does not fit in 64 bits of femtoseconds.
    #[error("duration '{0}' overflows")]
    Overflow(String),
}

/// Parses a duration string such as `"12.5ns"` into femtoseconds.
pub fn parse_duration(s: &str) -> Result<u64, ParseDurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseDurationError::Empty);
    }

    let number_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    if number_end == 0 {
        return Err(ParseDurationError::MissingNumber(s.to_string()));
    }

    let number = &s[..number_end];
    let unit = s[number_end..].trim();

    let multiplier = match unit {
        "fs" => 1,
        "ps" => FS_PER_PS,
        "ns" => FS_PER_NS,
        "us" => FS_PER_US,
        "ms" => FS_PER_MS,
        "s" => FS_PER_S,
        "" => return Err(ParseDurationError::MissingUnit(s.to_string())),
        other => return Err(ParseDurationError::UnknownUnit(other.to_string())),
    };

    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(ParseDurationError::InvalidNumber(s.to_string()));
    }

    let overflow = || ParseDurationError::Overflow(s.to_string());
    let whole_value: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| ParseDurationError::InvalidNumber(s.to_string()))?
    };
    let mut total = whole_value.checked_mul(multiplier).ok_or_else(overflow)?;

    let fraction = fraction.trim_end_matches('0');
    if !fraction.is_empty() {
        let scale = 10u64
            .checked_pow(fraction.len() as u32)
            .ok_or_else(|| ParseDurationError::TooPrecise(s.to_string()))?;
        let digits: u64 = fraction
            .parse()
            .map_err(|_| ParseDurationError::InvalidNumber(s.to_string()))?;
        let scaled = digits.checked_mul(multiplier).ok_or_else(overflow)?;
        if scaled % scale != 0 {
            return Err(ParseDurationError::TooPrecise(s.to_string()));
        }
        total = total.checked_add(scaled / scale).ok_or_else(overflow)?;
    }

    Ok(total)
}

/// Formats a femtosecond count using the largest unit that divides it exactly.
pub fn format_duration(fs: u64) -> String {
    const UNITS: [(u64, &str); 5] = [
        (FS_PER_S, "s"),
        (FS_PER_MS, "ms"),
        (FS_PER_US, "us"),
        (FS_PER_NS, "ns"),
        (FS_PER_PS, "ps"),
    ];
    if fs == 0 {
        return "0 fs".to_string();
    }
    UNITS
        .iter()
        .find(|(scale, _)| fs % scale == 0)
        .map(|(scale, unit)| format!("{} {unit}", fs / scale))
        .unwrap_or_else(|| format!("{fs} fs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_nanoseconds() {
        assert_eq!(parse_duration("100ns").unwrap(), 100 * FS_PER_NS);
    }

    #[test]
    fn whole_microseconds_with_space() {
        assert_eq!(parse_duration("5 us").unwrap(), 5 * FS_PER_US);
    }

    #[test]
    fn fractional_nanoseconds_are_exact() {
        assert_eq!(parse_duration("8.77ns").unwrap(), 8_770_000);
        assert_eq!(parse_duration("13.47ns").unwrap(), 13_470_000);
        assert_eq!(parse_duration("12.5ns").unwrap(), 12_500_000);
    }

    #[test]
    fn leading_dot() {
        assert_eq!(parse_duration(".5us").unwrap(), FS_PER_US / 2);
    }

    #[test]
    fn trailing_zeros_ignored() {
        assert_eq!(parse_duration("1.500ps").unwrap(), 1_500);
    }

    #[test]
    fn seconds_and_femtoseconds() {
        assert_eq!(parse_duration("2s").unwrap(), 2 * FS_PER_S);
        assert_eq!(parse_duration("7fs").unwrap(), 7);
    }

    #[test]
    fn too_precise() {
        let err = parse_duration("1.5fs").unwrap_err();
        assert!(matches!(err, ParseDurationError::TooPrecise(_)));
    }

    #[test]
    fn missing_unit() {
        assert!(matches!(
            parse_duration("100").unwrap_err(),
            ParseDurationError::MissingUnit(_)
        ));
    }

    #[test]
    fn unknown_unit() {
        let err = parse_duration("3 hours").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown duration unit 'hours' (use fs, ps, ns, us, ms, or s)"
        );
    }

    #[test]
    fn empty_and_garbage() {
        assert_eq!(parse_duration("  ").unwrap_err(), ParseDurationError::Empty);
        assert!(matches!(
            parse_duration("ns").unwrap_err(),
            ParseDurationError::MissingNumber(_)
        ));
        assert!(matches!(
            parse_duration("1.2.3ns").unwrap_err(),
            ParseDurationError::InvalidNumber(_)
        ));
    }

    #[test]
    fn overflow_detected() {
        assert!(matches!(
            parse_duration("100000s").unwrap_err(),
            ParseDurationError::Overflow(_)
        ));
    }

    #[test]
    fn format_picks_exact_unit() {
        assert_eq!(format_duration(0), "0 fs");
        assert_eq!(format_duration(5 * FS_PER_US), "5 us");
        assert_eq!(format_duration(12_500_000), "12500 ps");
        assert_eq!(format_duration(1_500), "1500 fs");
    }
}
