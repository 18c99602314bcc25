//! Resolution of a parsed configuration into concrete bench parameters.
//!
//! All duration and frequency strings are converted here, so a bad value
//! fails the run before any simulation time advances.

use std::ops::Range;

use strobe_common::{parse_duration, Frequency};

use crate::error::ConfigError;
use crate::types::{FifoConfig, FifoMode, HarnessConfig, SpiSettings};

/// FIFO bench parameters in simulation units.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFifo {
    /// Wiring variant.
    pub mode: FifoMode,
    /// Seed for pacing and stimulus.
    pub seed: u64,
    /// FIFO depth in words.
    pub depth: usize,
    /// Data bus width in bits.
    pub data_width: u32,
    /// Write-side clock period. Equal to `m_period_fs` in sync mode.
    pub s_period_fs: u64,
    /// Read-side clock period.
    pub m_period_fs: u64,
    /// Cycles per reset level.
    pub reset_cycles: u64,
    /// Write-clock cycles between sending and starting to receive.
    pub release_delay_cycles: u64,
    /// Write-clock cycles to idle after the final check.
    pub drain_cycles: u64,
    /// Liveness bound for each received frame.
    pub frame_timeout_fs: u64,
}

/// SPI bench parameters in simulation units.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpi {
    /// Seed for random bursts.
    pub seed: u64,
    /// Serial clock frequency.
    pub sclk_frequency: Frequency,
    /// Serial clock period.
    pub sclk_period_fs: u64,
    /// Clock polarity.
    pub cpol: bool,
    /// Clock phase.
    pub cpha: bool,
    /// Clockless reset length.
    pub reset_duration_fs: u64,
    /// Quiet time after reset release.
    pub settle_fs: u64,
    /// Quiet time between checks.
    pub gap_fs: u64,
    /// Minimum select-high time between transactions.
    pub frame_spacing_fs: u64,
    /// Liveness bound for one transaction.
    pub transaction_timeout_fs: u64,
    /// Range the number of random burst rounds is drawn from.
    pub burst_rounds: Range<u32>,
    /// Longest random burst in bytes.
    pub max_burst_len: usize,
}

/// Resolves the FIFO section. The mode must be set.
pub fn resolve_fifo(config: &HarnessConfig) -> Result<ResolvedFifo, ConfigError> {
    let fifo = &config.fifo;
    let mode = fifo
        .mode
        .ok_or_else(|| ConfigError::MissingField("fifo.mode".to_string()))?;
    validate_fifo(fifo)?;

    let (s_period_fs, m_period_fs) = match mode {
        FifoMode::Async => (
            period("fifo.s_clock_period", &fifo.s_clock_period)?,
            period("fifo.m_clock_period", &fifo.m_clock_period)?,
        ),
        FifoMode::Sync => {
            let shared = period("fifo.clock_period", &fifo.clock_period)?;
            (shared, shared)
        }
    };

    Ok(ResolvedFifo {
        mode,
        seed: config.harness.seed,
        depth: fifo.depth,
        data_width: fifo.data_width,
        s_period_fs,
        m_period_fs,
        reset_cycles: fifo.reset_cycles,
        release_delay_cycles: (fifo.release_delay_factor * fifo.depth as f64) as u64,
        drain_cycles: fifo.drain_cycles,
        frame_timeout_fs: duration("fifo.frame_timeout", &fifo.frame_timeout)?,
    })
}

/// Resolves the SPI section. Only mode 0 (CPOL 0, CPHA 0) is accepted, the
/// one mode the register bridge implements.
pub fn resolve_spi(config: &HarnessConfig) -> Result<ResolvedSpi, ConfigError> {
    let spi = &config.spi;
    validate_spi(spi)?;
    if spi.cpol || spi.cpha {
        let mode = (u8::from(spi.cpol) << 1) | u8::from(spi.cpha);
        return Err(ConfigError::ValidationError(format!(
            "spi.cpol/spi.cpha select SPI mode {mode}, the register bridge only implements mode 0"
        )));
    }
    let sclk_frequency: Frequency =
        spi.sclk_frequency
            .parse()
            .map_err(|source| ConfigError::InvalidFrequency {
                field: "spi.sclk_frequency".to_string(),
                source,
            })?;
    let sclk_period_fs = sclk_frequency
        .period_fs()
        .filter(|p| *p >= 2)
        .ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "spi.sclk_frequency {sclk_frequency} is too high to simulate"
            ))
        })?;

    let [low, high] = spi.burst_rounds;
    Ok(ResolvedSpi {
        seed: config.harness.seed,
        sclk_frequency,
        sclk_period_fs,
        cpol: spi.cpol,
        cpha: spi.cpha,
        reset_duration_fs: duration("spi.reset_duration", &spi.reset_duration)?,
        settle_fs: duration("spi.settle", &spi.settle)?,
        gap_fs: duration("spi.gap", &spi.gap)?,
        frame_spacing_fs: duration("spi.frame_spacing", &spi.frame_spacing)?,
        transaction_timeout_fs: duration("spi.transaction_timeout", &spi.transaction_timeout)?,
        burst_rounds: low..high,
        max_burst_len: spi.max_burst_len,
    })
}

/// Checks `[fifo]` values no FIFO bench can run with.
pub(crate) fn validate_fifo(fifo: &FifoConfig) -> Result<(), ConfigError> {
    if fifo.depth == 0 {
        return Err(ConfigError::ValidationError(
            "fifo.depth must be at least 1".to_string(),
        ));
    }
    if fifo.data_width == 0 || fifo.data_width > 64 {
        return Err(ConfigError::ValidationError(format!(
            "fifo.data_width must be in 1..=64, got {}",
            fifo.data_width
        )));
    }
    if !fifo.release_delay_factor.is_finite() || fifo.release_delay_factor < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "fifo.release_delay_factor must be a non-negative number, got {}",
            fifo.release_delay_factor
        )));
    }
    Ok(())
}

/// Checks `[spi]` values no SPI bench can run with.
pub(crate) fn validate_spi(spi: &SpiSettings) -> Result<(), ConfigError> {
    let [low, high] = spi.burst_rounds;
    if low >= high {
        return Err(ConfigError::ValidationError(format!(
            "spi.burst_rounds must be a non-empty range, got [{low}, {high}]"
        )));
    }
    if spi.max_burst_len == 0 {
        return Err(ConfigError::ValidationError(
            "spi.max_burst_len must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn duration(field: &str, text: &str) -> Result<u64, ConfigError> {
    parse_duration(text).map_err(|source| ConfigError::InvalidDuration {
        field: field.to_string(),
        source,
    })
}

/// A clock period: a duration that can hold two distinct phases.
fn period(field: &str, text: &str) -> Result<u64, ConfigError> {
    let fs = duration(field, text)?;
    if fs < 2 {
        return Err(ConfigError::ValidationError(format!(
            "{field} must be at least 2 fs, got '{text}'"
        )));
    }
    Ok(fs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn fifo_requires_mode() {
        let config = HarnessConfig::default();
        let err = resolve_fifo(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "fifo.mode"));
    }

    #[test]
    fn async_fifo_defaults() {
        let config = load_config_from_str("[fifo]\nmode = \"async\"\n").unwrap();
        let fifo = resolve_fifo(&config).unwrap();
        assert_eq!(fifo.mode, FifoMode::Async);
        assert_eq!(fifo.s_period_fs, 8_770_000);
        assert_eq!(fifo.m_period_fs, 13_470_000);
        assert_eq!(fifo.release_delay_cycles, 20_480);
        assert_eq!(fifo.frame_timeout_fs, 200_000_000_000);
        assert_eq!(fifo.reset_cycles, 4);
    }

    #[test]
    fn sync_fifo_shares_clock() {
        let config = load_config_from_str("[fifo]\nmode = \"sfifo\"\n").unwrap();
        let fifo = resolve_fifo(&config).unwrap();
        assert_eq!(fifo.s_period_fs, 12_500_000);
        assert_eq!(fifo.m_period_fs, 12_500_000);
    }

    #[test]
    fn zero_period_is_rejected() {
        let config =
            load_config_from_str("[fifo]\nmode = \"sync\"\nclock_period = \"0ns\"\n").unwrap();
        let err = resolve_fifo(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_duration_names_field() {
        let config =
            load_config_from_str("[fifo]\nmode = \"async\"\ns_clock_period = \"fast\"\n").unwrap();
        match resolve_fifo(&config).unwrap_err() {
            ConfigError::InvalidDuration { field, .. } => assert_eq!(field, "fifo.s_clock_period"),
            other => panic!("expected InvalidDuration, got {other:?}"),
        }
    }

    #[test]
    fn spi_defaults() {
        let spi = resolve_spi(&HarnessConfig::default()).unwrap();
        assert_eq!(spi.sclk_period_fs, 125_000_000);
        assert_eq!(spi.reset_duration_fs, 5_000_000_000);
        assert_eq!(spi.settle_fs, 1_000_000_000);
        assert_eq!(spi.gap_fs, 5_000_000_000);
        assert_eq!(spi.frame_spacing_fs, 0);
        assert_eq!(spi.burst_rounds, 4..16);
        assert_eq!(spi.max_burst_len, 31);
    }

    #[test]
    fn fifo_checks_apply_without_loader() {
        let mut config = HarnessConfig::default();
        config.fifo.mode = Some(FifoMode::Sync);
        config.fifo.depth = 0;
        let err = resolve_fifo(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("fifo.depth")));

        config.fifo.depth = 4;
        config.fifo.data_width = 65;
        let err = resolve_fifo(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("fifo.data_width")));
    }

    #[test]
    fn spi_checks_apply_without_loader() {
        let mut config = HarnessConfig::default();
        config.spi.burst_rounds = [5, 5];
        let err = resolve_spi(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("spi.burst_rounds")));

        config.spi.burst_rounds = [1, 2];
        config.spi.max_burst_len = 0;
        assert!(matches!(
            resolve_spi(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn spi_rejects_modes_other_than_zero() {
        for (cpol, cpha, mode) in [(false, true, 1), (true, false, 2), (true, true, 3)] {
            let mut config = HarnessConfig::default();
            config.spi.cpol = cpol;
            config.spi.cpha = cpha;
            match resolve_spi(&config).unwrap_err() {
                ConfigError::ValidationError(message) => {
                    assert!(message.contains(&format!("SPI mode {mode}")), "{message}")
                }
                other => panic!("expected ValidationError, got {other:?}"),
            }
        }
    }

    #[test]
    fn spi_bad_frequency() {
        let config = load_config_from_str("[spi]\nsclk_frequency = \"fast\"\n").unwrap();
        let err = resolve_spi(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFrequency { .. }));
    }
}
