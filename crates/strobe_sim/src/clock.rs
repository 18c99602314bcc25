//! Free-running clock generator and edge counting.

use strobe_common::Frequency;

use crate::error::SimError;
use crate::process::{Process, ProcessContext, Trigger, Wait};
use crate::signal::{Edge, SignalId};

/// Toggles a 1-bit signal forever with a fixed period.
///
/// The clock drives high at the moment it is spawned, stays high for half
/// the period and low for the remainder. Odd periods put the extra
/// femtosecond in the low phase.
#[derive(Debug, Clone)]
pub struct Clock {
    name: String,
    signal: SignalId,
    high_fs: u64,
    low_fs: u64,
    level: bool,
    cycles: u64,
}

impl Clock {
    /// Creates a clock with the given period. Periods under 2 fs cannot
    /// produce two distinct phases and are rejected.
    pub fn new(signal: SignalId, period_fs: u64) -> Result<Self, SimError> {
        let name = format!("clock({signal})");
        if period_fs < 2 {
            return Err(SimError::InvalidPeriod { name, period_fs });
        }
        let high_fs = period_fs / 2;
        Ok(Self {
            name,
            signal,
            high_fs,
            low_fs: period_fs - high_fs,
            level: false,
            cycles: 0,
        })
    }

    /// Creates a clock from a frequency.
    pub fn from_frequency(signal: SignalId, frequency: Frequency) -> Result<Self, SimError> {
        let period_fs = frequency.period_fs().unwrap_or(0);
        Self::new(signal, period_fs)
    }

    /// Sets the name used in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Full period in femtoseconds.
    pub fn period_fs(&self) -> u64 {
        self.high_fs + self.low_fs
    }

    /// Number of rising edges driven so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl Process for Clock {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        self.level = !self.level;
        ctx.set_bit(self.signal, self.level);
        let hold = if self.level {
            self.cycles += 1;
            self.high_fs
        } else {
            self.low_fs
        };
        Ok(Wait::Until(Trigger::Delay(hold)))
    }
}

/// Finishes after observing a number of edges on one signal.
#[derive(Debug, Clone)]
pub struct EdgeCounter {
    signal: SignalId,
    edge: Edge,
    target: u64,
    seen: u64,
}

impl EdgeCounter {
    /// Counts `target` edges of kind `edge` on `signal`.
    pub fn new(signal: SignalId, edge: Edge, target: u64) -> Self {
        Self {
            signal,
            edge,
            target,
            seen: 0,
        }
    }

    /// Edges observed so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl Process for EdgeCounter {
    fn name(&self) -> &str {
        "edge-counter"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let hit = match self.edge {
            Edge::Rising => ctx.rose(self.signal),
            Edge::Falling => ctx.fell(self.signal),
            Edge::Any => ctx.changed(self.signal),
        };
        if hit {
            self.seen += 1;
        }
        if self.seen >= self.target {
            return Ok(Wait::Finished);
        }
        let trigger = match self.edge {
            Edge::Rising => Trigger::Rising(self.signal),
            Edge::Falling => Trigger::Falling(self.signal),
            Edge::Any => Trigger::Change(self.signal),
        };
        Ok(Wait::Until(trigger))
    }
}
