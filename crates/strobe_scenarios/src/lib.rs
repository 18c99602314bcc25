//! Test benches and named scenarios for the strobe harness.
//!
//! Each [`Scenario`] resolves the parts of [`HarnessConfig`] it needs before
//! any simulation time advances, builds a bench around a device model, runs
//! its stimulus and returns a [`ScenarioReport`]. Any failed check, timeout
//! or protocol violation ends the run with a [`ScenarioError`].

#![warn(missing_docs)]

pub mod error;
pub mod fifo;
pub mod report;
pub mod spi;

use std::fmt;
use std::str::FromStr;

use strobe_config::{resolve_fifo, resolve_spi, HarnessConfig};

pub use error::ScenarioError;
pub use fifo::{run_fifo_depth_stress, FifoBench};
pub use report::{ScenarioCounts, ScenarioReport};
pub use spi::SpiBench;

/// Every runnable scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Twice-depth frames through the FIFO under strict then random backpressure.
    FifoDepthStress,
    /// One-byte SPI write and read-back.
    SpiSingleByte,
    /// Two-byte SPI burst write and read-back.
    SpiMultiByte,
    /// Address-only SPI commands that must not write registers.
    SpiCommandOnly,
    /// Random-length bursts at random addresses.
    SpiRandomBursts,
    /// Single, multi and random round trips in one session.
    SpiSmoke,
}

impl Scenario {
    /// All scenarios in listing order.
    pub const ALL: [Scenario; 6] = [
        Scenario::FifoDepthStress,
        Scenario::SpiSingleByte,
        Scenario::SpiMultiByte,
        Scenario::SpiCommandOnly,
        Scenario::SpiRandomBursts,
        Scenario::SpiSmoke,
    ];

    /// Stable registry name.
    pub fn name(self) -> &'static str {
        match self {
            Scenario::FifoDepthStress => "fifo-depth-stress",
            Scenario::SpiSingleByte => "spi-single-byte",
            Scenario::SpiMultiByte => "spi-multi-byte",
            Scenario::SpiCommandOnly => "spi-command-only",
            Scenario::SpiRandomBursts => "spi-random-bursts",
            Scenario::SpiSmoke => "spi-smoke",
        }
    }

    /// One-line description for listings.
    pub fn description(self) -> &'static str {
        match self {
            Scenario::FifoDepthStress => {
                "fill the FIFO to twice its depth, release late, check every frame"
            }
            Scenario::SpiSingleByte => "write 0x8e to 0x7c, read it back from 0xfc",
            Scenario::SpiMultiByte => "write [0xa5, 0xff] to 0x3c, read it back from 0xbc",
            Scenario::SpiCommandOnly => "send commands 0x14 and 0x20, expect no register writes",
            Scenario::SpiRandomBursts => "random burst writes, each read back through its alias",
            Scenario::SpiSmoke => "single, multi-byte and random round trips in one session",
        }
    }

    /// True for scenarios that need `fifo.mode`.
    pub fn needs_fifo_mode(self) -> bool {
        self == Scenario::FifoDepthStress
    }

    /// Runs the scenario against `config`.
    pub fn run(self, config: &HarnessConfig) -> Result<ScenarioReport, ScenarioError> {
        let waveform = config.waveform.path.as_deref();
        tracing::info!(scenario = self.name(), seed = config.harness.seed, "starting scenario");
        if self == Scenario::FifoDepthStress {
            return run_fifo_depth_stress(resolve_fifo(config)?, waveform);
        }

        let mut bench = SpiBench::start(resolve_spi(config)?, waveform)?;
        match self {
            Scenario::SpiSingleByte => spi::single_byte(&mut bench)?,
            Scenario::SpiMultiByte => spi::multi_byte(&mut bench)?,
            Scenario::SpiCommandOnly => spi::command_only(&mut bench)?,
            Scenario::SpiRandomBursts => {
                bench.random_bursts()?;
            }
            Scenario::SpiSmoke => {
                spi::single_byte(&mut bench)?;
                spi::multi_byte(&mut bench)?;
                bench.random_bursts()?;
            }
            Scenario::FifoDepthStress => {}
        }
        bench.finish(self.name())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ScenarioError::UnknownScenario(wanted.to_string()))
    }
}
