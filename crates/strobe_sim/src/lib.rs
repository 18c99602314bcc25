//! Event-driven simulation kernel for the strobe verification harness.
//!
//! This crate runs behavioral device models and testbench components against
//! each other on a shared set of two-state signals. It provides:
//!
//! - femtosecond time with delta cycles ([`SimTime`]);
//! - non-blocking signal updates with rising/falling/change detection;
//! - cooperative [`Process`] state machines resumed on edges, delays, or
//!   explicit wakeups;
//! - scenario-side helpers that run the kernel until a condition holds, with
//!   timeouts reported as [`SimError::Timeout`];
//! - VCD waveform output.
//!
//! # Usage
//!
//! ```ignore
//! use strobe_sim::{Clock, Edge, Simulator};
//!
//! let mut sim = Simulator::new();
//! let clk = sim.add_signal("clk", 1)?;
//! sim.spawn(Clock::new(clk, 10_000_000)?);
//! sim.wait_edges(clk, Edge::Rising, 4, 1_000_000_000)?;
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod kernel;
pub mod process;
pub mod signal;
pub mod time;
pub mod waveform;

use std::path::PathBuf;

pub use clock::{Clock, EdgeCounter};
pub use error::SimError;
pub use kernel::{SimResult, Simulator, StepResult, DEFAULT_MAX_DELTAS};
pub use process::{AsAny, Handle, Process, ProcessContext, ProcessId, Trigger, Wait};
pub use signal::{width_mask, Edge, Polarity, SignalId, SignalState};
pub use time::SimTime;
pub use waveform::{VcdRecorder, WaveformRecorder};

/// Configuration for a simulator instance.
#[derive(Debug, Clone, Default)]
pub struct SimConfig {
    /// Optional absolute time limit in femtoseconds.
    pub time_limit: Option<u64>,
    /// Maximum delta cycles per time step; [`DEFAULT_MAX_DELTAS`] if `None`.
    pub max_deltas: Option<u32>,
    /// Optional path for VCD output.
    pub waveform_path: Option<PathBuf>,
}

impl Simulator {
    /// Creates a simulator configured from `config`.
    ///
    /// `waveform_path` is not opened here. Pass it to
    /// [`Simulator::start_recording`] once the signals are declared.
    pub fn from_config(config: &SimConfig) -> Self {
        let mut sim = Simulator::new();
        if let Some(limit) = config.time_limit {
            sim.set_time_limit(limit);
        }
        if let Some(max) = config.max_deltas {
            sim.set_max_deltas(max);
        }
        sim
    }

    /// Opens a VCD file at `path` and records every signal declared so far.
    pub fn start_recording(&mut self, path: &std::path::Path) -> Result<(), SimError> {
        let recorder = VcdRecorder::create(path)?;
        self.attach_recorder(Box::new(recorder))
    }
}
