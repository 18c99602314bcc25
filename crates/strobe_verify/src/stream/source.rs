use std::collections::VecDeque;

use strobe_sim::{
    width_mask, Handle, Process, ProcessContext, SimError, Simulator, Trigger, Wait,
};

use super::bus::StreamBus;
use super::frame::Frame;
use crate::error::VerifyError;
use crate::pacing::{Pacing, PacingControl};

/// The frame currently on the bus and the index of the presented word.
#[derive(Debug, Clone)]
struct InFlight {
    frame: Frame,
    word: usize,
}

/// Process that drives queued frames onto a stream interface.
///
/// On each rising clock edge it first retires the presented word if the
/// handshake completed, then either keeps holding an unaccepted word or,
/// when free, consults its idle pacing and presents the next word.
#[derive(Debug)]
pub struct StreamDriver {
    name: String,
    bus: StreamBus,
    queue: VecDeque<Frame>,
    in_flight: Option<InFlight>,
    presenting: bool,
    pacing: PacingControl,
    frames_sent: u64,
    words_sent: u64,
    frames_dropped: u64,
}

impl StreamDriver {
    /// Creates a driver that starts with `idle` pacing.
    pub fn new(name: impl Into<String>, bus: StreamBus, idle: Pacing) -> Self {
        Self {
            name: name.into(),
            bus,
            queue: VecDeque::new(),
            in_flight: None,
            presenting: false,
            pacing: PacingControl::new(idle),
            frames_sent: 0,
            words_sent: 0,
            frames_dropped: 0,
        }
    }

    /// Queues a frame after checking it against the bus.
    pub fn enqueue(&mut self, frame: Frame) -> Result<(), VerifyError> {
        if frame.is_empty() {
            return Err(VerifyError::EmptyFrame {
                interface: self.name.clone(),
            });
        }
        let mask = width_mask(self.bus.width);
        if let Some(&word) = frame.words().iter().find(|w| **w & !mask != 0) {
            return Err(VerifyError::WordTooWide {
                interface: self.name.clone(),
                word,
                width: self.bus.width,
            });
        }
        if self.bus.last.is_none() && frame.len() > 1 {
            tracing::warn!(
                interface = %self.name,
                words = frame.len(),
                "bus has no tlast, frame will arrive as single-word frames"
            );
        }
        self.queue.push_back(frame);
        Ok(())
    }

    /// Pacing control for idle cycles.
    pub fn pacing_mut(&mut self) -> &mut PacingControl {
        &mut self.pacing
    }

    /// True when no frame is queued or on the bus.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_none()
    }

    /// Frames fully accepted by the sink side.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Words accepted by the sink side.
    pub fn words_sent(&self) -> u64 {
        self.words_sent
    }

    /// Frames abandoned because reset asserted mid-frame.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped
    }

    /// Number of pacing replacements applied.
    pub fn pacing_swaps(&self) -> u64 {
        self.pacing.swaps()
    }

    fn retire_word(&mut self) {
        self.words_sent += 1;
        let Some(flight) = &mut self.in_flight else {
            return;
        };
        flight.word += 1;
        if flight.word >= flight.frame.len() {
            self.frames_sent += 1;
            tracing::trace!(interface = %self.name, frame = ?flight.frame, "frame sent");
            self.in_flight = None;
        }
    }

    fn present(&mut self, ctx: &mut ProcessContext<'_>) {
        if self.in_flight.is_none() {
            self.in_flight = self.queue.pop_front().map(|frame| InFlight { frame, word: 0 });
        }
        let Some(flight) = &self.in_flight else {
            ctx.set_bit(self.bus.valid, false);
            self.presenting = false;
            return;
        };
        let word = flight.frame.words()[flight.word];
        let is_last = flight.word + 1 == flight.frame.len();
        ctx.set(self.bus.data, word);
        if let Some(last) = self.bus.last {
            ctx.set_bit(last, is_last);
        }
        ctx.set_bit(self.bus.valid, true);
        self.presenting = true;
    }
}

impl Process for StreamDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let wait = Wait::Until(Trigger::Rising(self.bus.clock));
        if !ctx.rose(self.bus.clock) {
            // Initial resumption: park the bus in its idle state.
            ctx.set_bit(self.bus.valid, false);
            return Ok(wait);
        }

        if self.bus.in_reset(self.bus.reset.map(|r| ctx.get(r))) {
            if let Some(flight) = self.in_flight.take() {
                self.frames_dropped += 1;
                tracing::warn!(
                    interface = %self.name,
                    frame = ?flight.frame,
                    at = %ctx.now(),
                    "reset asserted mid-frame, frame dropped"
                );
            }
            ctx.set_bit(self.bus.valid, false);
            self.presenting = false;
            return Ok(wait);
        }

        let accepted = self.presenting && ctx.is_high(self.bus.ready);
        if accepted {
            self.retire_word();
        }

        let holding = self.presenting && !accepted;
        if !holding && self.in_flight.is_none() {
            self.pacing.apply_pending();
        }
        let stall = self.pacing.next_stall();
        if holding {
            // A presented word must stay on the bus until accepted.
            return Ok(wait);
        }
        if stall {
            ctx.set_bit(self.bus.valid, false);
            self.presenting = false;
        } else {
            self.present(ctx);
        }
        Ok(wait)
    }
}

/// Scenario-side handle to a [`StreamDriver`].
#[derive(Debug, Clone, Copy)]
pub struct StreamSource {
    driver: Handle<StreamDriver>,
}

impl StreamSource {
    /// Spawns a driver on `bus`.
    pub fn attach(sim: &mut Simulator, name: &str, bus: StreamBus, idle: Pacing) -> Self {
        let driver = sim.spawn(StreamDriver::new(name, bus, idle));
        Self { driver }
    }

    /// Queues a frame for transmission. Returns as soon as it is queued.
    pub fn send(&self, sim: &mut Simulator, frame: Frame) -> Result<(), VerifyError> {
        sim.get_mut(self.driver)?.enqueue(frame)
    }

    /// Replaces the idle pacing at the next idle boundary.
    pub fn set_idle(&self, sim: &mut Simulator, pacing: Pacing) -> Result<(), VerifyError> {
        sim.get_mut(self.driver)?.pacing_mut().request(pacing);
        Ok(())
    }

    /// True when nothing is queued or in flight.
    pub fn empty(&self, sim: &Simulator) -> Result<bool, VerifyError> {
        Ok(sim.get(self.driver)?.is_empty())
    }

    /// Frames fully accepted so far.
    pub fn frames_sent(&self, sim: &Simulator) -> Result<u64, VerifyError> {
        Ok(sim.get(self.driver)?.frames_sent())
    }

    /// Runs until every queued frame has been accepted.
    pub fn wait_drained(&self, sim: &mut Simulator, timeout_fs: u64) -> Result<(), VerifyError> {
        let driver = self.driver;
        let awaiting = format!("{} to drain", sim.get(driver)?.name());
        sim.run_until(&awaiting, timeout_fs, |sim| {
            sim.get(driver).is_ok_and(|d| d.is_empty())
        })?;
        Ok(())
    }

    /// The underlying process handle.
    pub fn handle(&self) -> Handle<StreamDriver> {
        self.driver
    }
}
