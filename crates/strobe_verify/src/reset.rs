//! Reset sequencing.
//!
//! A [`ResetSequence`] is a list of reset levels, each held for a number of
//! rising clock edges or for a fixed time. [`ResetController`] plays it back
//! as a process. [`run_resets`] drives several sequences concurrently and
//! returns once every one has finished, which is how two clock domains are
//! reset together.

use strobe_sim::{
    Handle, Polarity, Process, ProcessContext, SignalId, SimError, Simulator, Trigger, Wait,
};

use crate::error::VerifyError;

/// How long a reset level is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    /// A number of rising edges of a clock.
    Cycles {
        /// The clock to count.
        clock: SignalId,
        /// Edges to wait for.
        cycles: u64,
    },
    /// A fixed time in femtoseconds, for clockless resets.
    Duration(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    asserted: bool,
    hold: Option<Hold>,
}

/// A timed series of reset levels for one reset line.
#[derive(Debug, Clone)]
pub struct ResetSequence {
    name: String,
    line: SignalId,
    polarity: Polarity,
    steps: Vec<Step>,
}

impl ResetSequence {
    /// An empty sequence for `line`.
    pub fn new(name: impl Into<String>, line: SignalId, polarity: Polarity) -> Self {
        Self {
            name: name.into(),
            line,
            polarity,
            steps: Vec::new(),
        }
    }

    /// Asserts reset and holds it.
    pub fn assert_for(mut self, hold: Hold) -> Self {
        self.steps.push(Step {
            asserted: true,
            hold: Some(hold),
        });
        self
    }

    /// Deasserts reset and holds it.
    pub fn release_for(mut self, hold: Hold) -> Self {
        self.steps.push(Step {
            asserted: false,
            hold: Some(hold),
        });
        self
    }

    /// Deasserts reset and finishes immediately.
    pub fn release(mut self) -> Self {
        self.steps.push(Step {
            asserted: false,
            hold: None,
        });
        self
    }

    /// One assert/release pulse.
    pub fn pulse(self, hold: Hold) -> Self {
        self.assert_for(hold).release_for(hold)
    }

    /// `count` back-to-back pulses.
    pub fn pulses(self, count: usize, hold: Hold) -> Self {
        (0..count).fold(self, |seq, _| seq.pulse(hold))
    }

    /// Number of level steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if the sequence has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Starts the sequence in the background.
    pub fn spawn(self, sim: &mut Simulator) -> Handle<ResetController> {
        sim.spawn(ResetController::new(self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Counting { clock: SignalId, left: u64 },
    Delaying,
    Done,
}

/// Process that plays back a [`ResetSequence`].
#[derive(Debug)]
pub struct ResetController {
    sequence: ResetSequence,
    index: usize,
    phase: Phase,
}

impl ResetController {
    /// A controller for `sequence`.
    pub fn new(sequence: ResetSequence) -> Self {
        Self {
            sequence,
            index: 0,
            phase: Phase::Start,
        }
    }

    /// True once every step has been played.
    pub fn done(&self) -> bool {
        self.phase == Phase::Done
    }
}

impl Process for ResetController {
    fn name(&self) -> &str {
        &self.sequence.name
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        match self.phase {
            Phase::Start => {
                tracing::debug!(reset = %self.sequence.name, at = %ctx.now(), "reset sequence started");
            }
            Phase::Counting { clock, left } => {
                let left = if ctx.rose(clock) { left - 1 } else { left };
                if left > 0 {
                    self.phase = Phase::Counting { clock, left };
                    return Ok(Wait::Until(Trigger::Rising(clock)));
                }
                self.index += 1;
            }
            Phase::Delaying => self.index += 1,
            Phase::Done => return Ok(Wait::Finished),
        }

        while let Some(step) = self.sequence.steps.get(self.index).copied() {
            ctx.set(self.sequence.line, self.sequence.polarity.level(step.asserted));
            match step.hold {
                Some(Hold::Cycles { clock, cycles }) if cycles > 0 => {
                    self.phase = Phase::Counting {
                        clock,
                        left: cycles,
                    };
                    return Ok(Wait::Until(Trigger::Rising(clock)));
                }
                Some(Hold::Duration(fs)) if fs > 0 => {
                    self.phase = Phase::Delaying;
                    return Ok(Wait::Until(Trigger::Delay(fs)));
                }
                _ => self.index += 1,
            }
        }

        self.phase = Phase::Done;
        tracing::debug!(reset = %self.sequence.name, at = %ctx.now(), "reset sequence done");
        Ok(Wait::Finished)
    }
}

/// Drives every sequence concurrently and runs until all have finished.
pub fn run_resets(
    sim: &mut Simulator,
    sequences: Vec<ResetSequence>,
    timeout_fs: u64,
) -> Result<(), VerifyError> {
    let handles: Vec<Handle<ResetController>> =
        sequences.into_iter().map(|seq| seq.spawn(sim)).collect();
    wait_resets(sim, &handles, timeout_fs)
}

/// Runs until every controller in `handles` has finished.
pub fn wait_resets(
    sim: &mut Simulator,
    handles: &[Handle<ResetController>],
    timeout_fs: u64,
) -> Result<(), VerifyError> {
    sim.run_until("reset sequences", timeout_fs, |sim| {
        handles
            .iter()
            .all(|h| sim.get(*h).is_ok_and(|c| c.done()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_sim::Clock;

    const NS: u64 = 1_000_000;

    #[test]
    fn builder_steps() {
        let line = SignalId::from_raw(0);
        let clock = SignalId::from_raw(1);
        let hold = Hold::Cycles { clock, cycles: 4 };
        let seq = ResetSequence::new("r", line, Polarity::ActiveLow)
            .release_for(hold)
            .assert_for(hold)
            .release_for(hold);
        assert_eq!(seq.len(), 3);
        assert_eq!(
            ResetSequence::new("r", line, Polarity::ActiveLow)
                .pulses(3, hold)
                .len(),
            6
        );
    }

    #[test]
    fn clocked_sequence_counts_edges() {
        let mut sim = Simulator::new();
        let clk = sim.add_signal("clk", 1).unwrap();
        let rstn = sim.add_signal("resetn", 1).unwrap();
        sim.spawn(Clock::new(clk, 10 * NS).unwrap());
        let hold = Hold::Cycles {
            clock: clk,
            cycles: 4,
        };
        let seq = ResetSequence::new("resetn", rstn, Polarity::ActiveLow)
            .release_for(hold)
            .assert_for(hold)
            .release_for(hold);
        let h = seq.spawn(&mut sim);

        sim.run_for(5 * NS).unwrap();
        assert_eq!(sim.value(rstn), 1);
        // The clock's first edge at time zero counts toward the first hold.
        sim.run_until("assert", 200 * NS, |s| s.value(rstn) == 0)
            .unwrap();
        assert_eq!(sim.now().fs, 30 * NS);
        run_until_done(&mut sim, h);
        assert_eq!(sim.value(rstn), 1);
        assert_eq!(sim.now().fs, 110 * NS);
    }

    fn run_until_done(sim: &mut Simulator, h: Handle<ResetController>) {
        wait_resets(sim, &[h], 1_000 * NS).unwrap();
    }

    #[test]
    fn clockless_sequence_waits_duration() {
        let mut sim = Simulator::new();
        let rstn = sim.add_signal_with_init("reset_n_in", 1, 1).unwrap();
        let seq = ResetSequence::new("por", rstn, Polarity::ActiveLow)
            .assert_for(Hold::Duration(5_000 * NS))
            .release();
        run_resets(&mut sim, vec![seq], 10_000 * NS).unwrap();
        assert_eq!(sim.value(rstn), 1);
        assert_eq!(sim.now().fs, 5_000 * NS);
    }

    #[test]
    fn two_domains_reset_together() {
        let mut sim = Simulator::new();
        let s_clk = sim.add_signal("s_clk", 1).unwrap();
        let m_clk = sim.add_signal("m_clk", 1).unwrap();
        let s_rst = sim.add_signal("s_rstn", 1).unwrap();
        let m_rst = sim.add_signal("m_rstn", 1).unwrap();
        sim.spawn(Clock::new(s_clk, 10 * NS).unwrap());
        sim.spawn(Clock::new(m_clk, 30 * NS).unwrap());
        let seq = |name: &str, line, clock| {
            ResetSequence::new(name, line, Polarity::ActiveLow).pulse(Hold::Cycles {
                clock,
                cycles: 2,
            })
        };
        run_resets(
            &mut sim,
            vec![seq("s", s_rst, s_clk), seq("m", m_rst, m_clk)],
            1_000 * NS,
        )
        .unwrap();
        // The slower domain finishes last, on its 4th edge counting time zero.
        assert_eq!(sim.now().fs, 90 * NS);
        assert_eq!(sim.value(s_rst), 1);
        assert_eq!(sim.value(m_rst), 1);
    }

    #[test]
    fn stalled_reset_times_out() {
        let mut sim = Simulator::new();
        let clk = sim.add_signal("clk", 1).unwrap();
        let rstn = sim.add_signal("resetn", 1).unwrap();
        let seq = ResetSequence::new("r", rstn, Polarity::ActiveLow).assert_for(Hold::Cycles {
            clock: clk,
            cycles: 1,
        });
        let err = run_resets(&mut sim, vec![seq], 100 * NS).unwrap_err();
        assert!(matches!(err, VerifyError::Sim(SimError::Stalled { .. })));
    }
}
