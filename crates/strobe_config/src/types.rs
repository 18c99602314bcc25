//! Configuration types deserialized from `strobe.toml`.
//!
//! Durations and frequencies stay as strings here ("8.77ns", "8MHz") so
//! that errors can name the field they came from; [`crate::resolve`]
//! converts them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The top-level harness configuration parsed from `strobe.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HarnessConfig {
    /// Global settings.
    #[serde(default)]
    pub harness: HarnessSection,
    /// FIFO bench settings.
    #[serde(default)]
    pub fifo: FifoConfig,
    /// SPI bench settings.
    #[serde(default)]
    pub spi: SpiSettings,
    /// Waveform output.
    #[serde(default)]
    pub waveform: WaveformConfig,
}

/// Settings shared by every scenario.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessSection {
    /// Seed for every random source in a run.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> u64 {
    1
}

/// Wiring variant of the FIFO under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FifoMode {
    /// Independent write and read clocks with independent resets.
    #[serde(alias = "afifo")]
    Async,
    /// One clock and one reset shared by both sides.
    #[serde(alias = "sfifo")]
    Sync,
}

impl FifoMode {
    /// The canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            FifoMode::Async => "async",
            FifoMode::Sync => "sync",
        }
    }
}

impl fmt::Display for FifoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FifoMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" | "afifo" => Ok(FifoMode::Async),
            "sync" | "sfifo" => Ok(FifoMode::Sync),
            other => Err(format!(
                "unknown FIFO mode '{other}' (expected async, sync, afifo, or sfifo)"
            )),
        }
    }
}

/// `[fifo]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FifoConfig {
    /// Wiring variant. Required by FIFO scenarios; there is no default.
    #[serde(default)]
    pub mode: Option<FifoMode>,
    /// Number of words the FIFO holds.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Width of `tdata` in bits.
    #[serde(default = "default_data_width")]
    pub data_width: u32,
    /// Write-side clock period in async mode.
    #[serde(default = "default_s_clock_period")]
    pub s_clock_period: String,
    /// Read-side clock period in async mode.
    #[serde(default = "default_m_clock_period")]
    pub m_clock_period: String,
    /// Shared clock period in sync mode.
    #[serde(default = "default_clock_period")]
    pub clock_period: String,
    /// Cycles per reset level.
    #[serde(default = "default_reset_cycles")]
    pub reset_cycles: u64,
    /// Receive delay as a multiple of the depth, in write-clock cycles.
    #[serde(default = "default_release_delay_factor")]
    pub release_delay_factor: f64,
    /// Write-clock cycles to idle after the final check.
    #[serde(default = "default_drain_cycles")]
    pub drain_cycles: u64,
    /// Liveness bound for each received frame.
    #[serde(default = "default_frame_timeout")]
    pub frame_timeout: String,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            mode: None,
            depth: default_depth(),
            data_width: default_data_width(),
            s_clock_period: default_s_clock_period(),
            m_clock_period: default_m_clock_period(),
            clock_period: default_clock_period(),
            reset_cycles: default_reset_cycles(),
            release_delay_factor: default_release_delay_factor(),
            drain_cycles: default_drain_cycles(),
            frame_timeout: default_frame_timeout(),
        }
    }
}

fn default_depth() -> usize {
    8192
}

fn default_data_width() -> u32 {
    32
}

fn default_s_clock_period() -> String {
    "8.77ns".to_string()
}

fn default_m_clock_period() -> String {
    "13.47ns".to_string()
}

fn default_clock_period() -> String {
    "12.5ns".to_string()
}

fn default_reset_cycles() -> u64 {
    4
}

fn default_release_delay_factor() -> f64 {
    2.5
}

fn default_drain_cycles() -> u64 {
    50
}

fn default_frame_timeout() -> String {
    "200us".to_string()
}

/// `[spi]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpiSettings {
    /// Serial clock frequency.
    #[serde(default = "default_sclk_frequency")]
    pub sclk_frequency: String,
    /// Clock polarity: idle level of SCLK.
    #[serde(default)]
    pub cpol: bool,
    /// Clock phase: sample on the trailing edge when set.
    #[serde(default)]
    pub cpha: bool,
    /// Length of the clockless power-on reset.
    #[serde(default = "default_reset_duration")]
    pub reset_duration: String,
    /// Quiet time after reset release.
    #[serde(default = "default_settle")]
    pub settle: String,
    /// Quiet time between checks.
    #[serde(default = "default_gap")]
    pub gap: String,
    /// Minimum select-high time between transactions.
    #[serde(default = "default_frame_spacing")]
    pub frame_spacing: String,
    /// Liveness bound for a single transaction.
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout: String,
    /// Inclusive lower and exclusive upper bound on random burst rounds.
    #[serde(default = "default_burst_rounds")]
    pub burst_rounds: [u32; 2],
    /// Longest random burst in bytes.
    #[serde(default = "default_max_burst_len")]
    pub max_burst_len: usize,
}

impl Default for SpiSettings {
    fn default() -> Self {
        Self {
            sclk_frequency: default_sclk_frequency(),
            cpol: false,
            cpha: false,
            reset_duration: default_reset_duration(),
            settle: default_settle(),
            gap: default_gap(),
            frame_spacing: default_frame_spacing(),
            transaction_timeout: default_transaction_timeout(),
            burst_rounds: default_burst_rounds(),
            max_burst_len: default_max_burst_len(),
        }
    }
}

fn default_sclk_frequency() -> String {
    "8MHz".to_string()
}

fn default_reset_duration() -> String {
    "5us".to_string()
}

fn default_settle() -> String {
    "1us".to_string()
}

fn default_gap() -> String {
    "5us".to_string()
}

fn default_frame_spacing() -> String {
    "0ns".to_string()
}

fn default_transaction_timeout() -> String {
    "1ms".to_string()
}

fn default_burst_rounds() -> [u32; 2] {
    [4, 16]
}

fn default_max_burst_len() -> usize {
    31
}

/// `[waveform]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WaveformConfig {
    /// VCD output path; no waveform is written when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
