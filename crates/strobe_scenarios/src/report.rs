//! Scenario results.

use std::fmt;

use serde::Serialize;
use strobe_config::FifoMode;
use strobe_sim::SimResult;

/// What a scenario moved and checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioCounts {
    /// Stream frames accepted from the source.
    pub frames_sent: u64,
    /// Stream frames collected by the sink.
    pub frames_received: u64,
    /// SPI bursts completed by the master.
    pub spi_bursts: u64,
    /// Register bytes stored by the shadow register file.
    pub register_writes: u64,
    /// Register lookups made while read-enable was high.
    pub register_reads: u64,
    /// Comparisons that passed.
    pub checks: u64,
}

/// Outcome of one passing scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Registry name of the scenario.
    pub scenario: String,
    /// Seed every random source was derived from.
    pub seed: u64,
    /// FIFO wiring, for stream scenarios.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<FifoMode>,
    /// Traffic and check totals.
    pub counts: ScenarioCounts,
    /// Simulated time at the end of the run.
    pub final_time: String,
    /// Simulated time at the end of the run, in femtoseconds.
    pub final_time_fs: u64,
    /// Delta cycles executed.
    pub deltas: u64,
    /// Process resumptions.
    pub resumes: u64,
}

impl ScenarioReport {
    pub(crate) fn new(
        scenario: &str,
        seed: u64,
        mode: Option<FifoMode>,
        counts: ScenarioCounts,
        sim: SimResult,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            mode,
            counts,
            final_time: sim.final_time.to_string(),
            final_time_fs: sim.final_time.fs,
            deltas: sim.total_deltas,
            resumes: sim.total_resumes,
        }
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PASS {} (seed {}", self.scenario, self.seed)?;
        if let Some(mode) = self.mode {
            write!(f, ", {mode}")?;
        }
        write!(f, ")")?;
        let c = &self.counts;
        if c.frames_sent > 0 || c.frames_received > 0 {
            write!(f, " frames {}/{}", c.frames_received, c.frames_sent)?;
        }
        if c.spi_bursts > 0 {
            write!(
                f,
                " bursts {} reg-writes {} reg-reads {}",
                c.spi_bursts, c.register_writes, c.register_reads
            )?;
        }
        write!(f, " checks {} at {}", c.checks, self.final_time)
    }
}
