//! Simulation error types.
//!
//! All errors that can occur while building a simulation, running it, or
//! waiting on it from a test scenario are variants of [`SimError`].

use std::io;

use crate::time::SimTime;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A signal name was not found.
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),

    /// A signal with the same name already exists.
    #[error("signal '{0}' is already defined")]
    DuplicateSignal(String),

    /// A signal was declared with an unsupported bit width.
    #[error("signal '{name}' has unsupported width {width} (expected 1..=64)")]
    InvalidWidth {
        /// The signal name.
        name: String,
        /// The requested width.
        width: u32,
    },

    /// A process handle does not refer to a spawned process.
    #[error("no process with ID {0}")]
    UnknownProcess(u32),

    /// A typed handle was used against a process of another type.
    #[error("process {id} ('{name}') is not of the requested type")]
    ProcessTypeMismatch {
        /// Raw process ID.
        id: u32,
        /// Name of the process that was found.
        name: String,
    },

    /// A clock or bus period that cannot be simulated.
    #[error("invalid period for '{name}': {period_fs} fs")]
    InvalidPeriod {
        /// What the period was for.
        name: String,
        /// The rejected period.
        period_fs: u64,
    },

    /// A monitored interface broke its protocol rules.
    #[error("protocol violation in {process} at {at}: {message}")]
    ProtocolViolation {
        /// Name of the process that detected the violation.
        process: String,
        /// When the violation was observed.
        at: SimTime,
        /// What went wrong.
        message: String,
    },

    /// An awaited condition did not occur before its deadline.
    #[error("timed out after {waited} waiting for {awaiting}")]
    Timeout {
        /// Description of the awaited condition.
        awaiting: String,
        /// How long the scenario waited.
        waited: SimTime,
    },

    /// The event queue drained while a condition was still awaited.
    #[error("simulation stalled at {at} waiting for {awaiting}")]
    Stalled {
        /// Description of the awaited condition.
        awaiting: String,
        /// Simulation time when no further events remained.
        at: SimTime,
    },

    /// Too many delta cycles at a single time step, indicating a combinational loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The time in femtoseconds where the limit was hit.
        fs: u64,
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
    },

    /// The configured simulation time limit was reached.
    #[error("time limit exceeded: {limit_fs} fs")]
    TimeLimitExceeded {
        /// The time limit in femtoseconds.
        limit_fs: u64,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_signal_display() {
        let e = SimError::UnknownSignal("s_axis_tvalid".into());
        assert_eq!(e.to_string(), "unknown signal 's_axis_tvalid'");
    }

    #[test]
    fn invalid_width_display() {
        let e = SimError::InvalidWidth {
            name: "wide".into(),
            width: 65,
        };
        assert_eq!(
            e.to_string(),
            "signal 'wide' has unsupported width 65 (expected 1..=64)"
        );
    }

    #[test]
    fn timeout_display() {
        let e = SimError::Timeout {
            awaiting: "frame on m_axis".into(),
            waited: SimTime::from_us(100),
        };
        assert_eq!(
            e.to_string(),
            "timed out after 100 us waiting for frame on m_axis"
        );
    }

    #[test]
    fn stalled_display() {
        let e = SimError::Stalled {
            awaiting: "reset release".into(),
            at: SimTime::from_ns(40),
        };
        assert_eq!(
            e.to_string(),
            "simulation stalled at 40 ns waiting for reset release"
        );
    }

    #[test]
    fn protocol_violation_display() {
        let e = SimError::ProtocolViolation {
            process: "monitor(m_axis)".into(),
            at: SimTime::from_ns(25),
            message: "tvalid dropped before tready".into(),
        };
        assert_eq!(
            e.to_string(),
            "protocol violation in monitor(m_axis) at 25 ns: tvalid dropped before tready"
        );
    }

    #[test]
    fn delta_cycle_limit_display() {
        let e = SimError::DeltaCycleLimit {
            fs: 100,
            max_deltas: 10000,
        };
        assert_eq!(
            e.to_string(),
            "delta cycle limit exceeded at 100 fs (max 10000 deltas)"
        );
    }

    #[test]
    fn waveform_io_display() {
        let e = SimError::WaveformIo(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(e.to_string().contains("waveform I/O error"));
    }
}
