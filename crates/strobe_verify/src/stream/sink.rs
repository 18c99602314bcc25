use std::collections::VecDeque;

use strobe_sim::{Handle, Process, ProcessContext, SimError, Simulator, Trigger, Wait};

use super::bus::StreamBus;
use super::frame::Frame;
use crate::error::VerifyError;
use crate::pacing::{Pacing, PacingControl};

/// A word held on the bus without being accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Held {
    data: u64,
    last: bool,
}

/// Process that accepts frames from a stream interface.
///
/// Drives `tready` from its backpressure pacing, captures every word on
/// which `tvalid` and `tready` were both high at a rising edge, and checks
/// that a source never withdraws or changes a word it has presented.
#[derive(Debug)]
pub struct StreamMonitor {
    name: String,
    bus: StreamBus,
    pacing: PacingControl,
    received: VecDeque<Frame>,
    partial: Vec<u64>,
    held: Option<Held>,
    frames_received: u64,
}

impl StreamMonitor {
    /// Creates a monitor that starts with `backpressure` pacing.
    pub fn new(name: impl Into<String>, bus: StreamBus, backpressure: Pacing) -> Self {
        Self {
            name: name.into(),
            bus,
            pacing: PacingControl::new(backpressure),
            received: VecDeque::new(),
            partial: Vec::new(),
            held: None,
            frames_received: 0,
        }
    }

    /// Pacing control for backpressure cycles.
    pub fn pacing_mut(&mut self) -> &mut PacingControl {
        &mut self.pacing
    }

    /// Removes the oldest buffered frame.
    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.received.pop_front()
    }

    /// True if a complete frame is buffered.
    pub fn has_frame(&self) -> bool {
        !self.received.is_empty()
    }

    /// True when no frame is buffered or partially received.
    pub fn is_empty(&self) -> bool {
        self.received.is_empty() && self.partial.is_empty()
    }

    /// Frames completed so far, including ones already popped.
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Number of pacing replacements applied.
    pub fn pacing_swaps(&self) -> u64 {
        self.pacing.swaps()
    }

    fn violation(&self, ctx: &ProcessContext<'_>, message: String) -> SimError {
        SimError::ProtocolViolation {
            process: self.name.clone(),
            at: ctx.now(),
            message,
        }
    }

    fn check_held(&self, ctx: &ProcessContext<'_>, valid: bool, now: Held) -> Result<(), SimError> {
        let Some(before) = self.held else {
            return Ok(());
        };
        if !valid {
            return Err(self.violation(
                ctx,
                format!("tvalid dropped while word {:#x} was not accepted", before.data),
            ));
        }
        if now.data != before.data {
            return Err(self.violation(
                ctx,
                format!(
                    "tdata changed from {:#x} to {:#x} before acceptance",
                    before.data, now.data
                ),
            ));
        }
        if now.last != before.last {
            return Err(self.violation(ctx, "tlast changed before acceptance".to_string()));
        }
        Ok(())
    }
}

impl Process for StreamMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let wait = Wait::Until(Trigger::Rising(self.bus.clock));
        if !ctx.rose(self.bus.clock) {
            ctx.set_bit(self.bus.ready, false);
            return Ok(wait);
        }

        if self.bus.in_reset(self.bus.reset.map(|r| ctx.get(r))) {
            if !self.partial.is_empty() {
                tracing::warn!(
                    interface = %self.name,
                    words = self.partial.len(),
                    "reset asserted mid-frame, partial frame discarded"
                );
                self.partial.clear();
            }
            self.held = None;
            ctx.set_bit(self.bus.ready, false);
            return Ok(wait);
        }

        let valid = ctx.is_high(self.bus.valid);
        let ready = ctx.is_high(self.bus.ready);
        let word = Held {
            data: ctx.get(self.bus.data),
            last: self.bus.last.map_or(true, |l| ctx.is_high(l)),
        };
        self.check_held(ctx, valid, word)?;

        if valid && ready {
            self.held = None;
            self.partial.push(word.data);
            if word.last {
                let frame = Frame::new(std::mem::take(&mut self.partial));
                tracing::trace!(interface = %self.name, ?frame, "frame received");
                self.received.push_back(frame);
                self.frames_received += 1;
            }
        } else if valid {
            self.held = Some(word);
        } else {
            self.held = None;
        }

        if self.partial.is_empty() {
            self.pacing.apply_pending();
        }
        let stall = self.pacing.next_stall();
        ctx.set_bit(self.bus.ready, !stall);
        Ok(wait)
    }
}

/// Scenario-side handle to a [`StreamMonitor`].
#[derive(Debug, Clone, Copy)]
pub struct StreamSink {
    monitor: Handle<StreamMonitor>,
}

impl StreamSink {
    /// Spawns a monitor on `bus`.
    pub fn attach(sim: &mut Simulator, name: &str, bus: StreamBus, backpressure: Pacing) -> Self {
        let monitor = sim.spawn(StreamMonitor::new(name, bus, backpressure));
        Self { monitor }
    }

    /// Runs the simulation until the next frame is available and returns it.
    pub fn recv(&self, sim: &mut Simulator, timeout_fs: u64) -> Result<Frame, VerifyError> {
        if let Some(frame) = self.try_recv(sim)? {
            return Ok(frame);
        }
        let monitor = self.monitor;
        let awaiting = format!("frame on {}", sim.get(monitor)?.name());
        sim.run_until(&awaiting, timeout_fs, |sim| {
            sim.get(monitor).is_ok_and(|m| m.has_frame())
        })?;
        self.try_recv(sim)?.ok_or_else(|| {
            VerifyError::Sim(SimError::Stalled {
                awaiting,
                at: sim.now(),
            })
        })
    }

    /// Returns a buffered frame without advancing simulation.
    pub fn try_recv(&self, sim: &mut Simulator) -> Result<Option<Frame>, VerifyError> {
        Ok(sim.get_mut(self.monitor)?.pop_frame())
    }

    /// Replaces the backpressure pacing at the next frame boundary.
    pub fn set_backpressure(&self, sim: &mut Simulator, pacing: Pacing) -> Result<(), VerifyError> {
        sim.get_mut(self.monitor)?.pacing_mut().request(pacing);
        Ok(())
    }

    /// True when nothing is buffered or partially received.
    pub fn empty(&self, sim: &Simulator) -> Result<bool, VerifyError> {
        Ok(sim.get(self.monitor)?.is_empty())
    }

    /// Frames completed so far.
    pub fn frames_received(&self, sim: &Simulator) -> Result<u64, VerifyError> {
        Ok(sim.get(self.monitor)?.frames_received())
    }

    /// The underlying process handle.
    pub fn handle(&self) -> Handle<StreamMonitor> {
        self.monitor
    }
}
