use strobe_sim::{Polarity, SignalId, SimError, Simulator};

/// The signals of one ready/valid stream interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamBus {
    /// Clock the interface is sampled on.
    pub clock: SignalId,
    /// Reset of the clock domain, if any.
    pub reset: Option<SignalId>,
    /// Level at which `reset` is asserted.
    pub reset_polarity: Polarity,
    /// `tvalid`, driven by the source.
    pub valid: SignalId,
    /// `tready`, driven by the sink.
    pub ready: SignalId,
    /// `tdata`, driven by the source.
    pub data: SignalId,
    /// `tlast`, if the interface has one.
    pub last: Option<SignalId>,
    /// Width of `tdata` in bits.
    pub width: u32,
}

impl StreamBus {
    /// Binds `{prefix}_tvalid`, `{prefix}_tready`, `{prefix}_tdata` and, if
    /// present, `{prefix}_tlast`. The reset is taken as active low.
    pub fn from_prefix(
        sim: &Simulator,
        prefix: &str,
        clock: SignalId,
        reset: Option<SignalId>,
    ) -> Result<Self, SimError> {
        let data = sim.signal(&format!("{prefix}_tdata"))?;
        Ok(Self {
            clock,
            reset,
            reset_polarity: Polarity::ActiveLow,
            valid: sim.signal(&format!("{prefix}_tvalid"))?,
            ready: sim.signal(&format!("{prefix}_tready"))?,
            data,
            last: sim.find_signal(&format!("{prefix}_tlast")),
            width: sim.width(data),
        })
    }

    /// Overrides the reset polarity.
    pub fn with_reset_polarity(mut self, polarity: Polarity) -> Self {
        self.reset_polarity = polarity;
        self
    }

    /// True if `value` on the reset line means reset is asserted.
    pub(crate) fn in_reset(&self, reset_value: Option<u64>) -> bool {
        reset_value.is_some_and(|v| self.reset_polarity.is_asserted(v))
    }
}
