//! First-word-fall-through AXI-stream FIFO.

use std::collections::VecDeque;

use strobe_sim::{
    width_mask, Handle, Process, ProcessContext, SignalId, SimError, Simulator, Trigger, Wait,
};

/// Clock and reset wiring of the FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoClocking {
    /// `s_axis_aclk`/`s_axis_aresetn` and `m_axis_aclk`/`m_axis_aresetn`.
    Independent,
    /// One `clk`/`resetn` pair for both sides.
    Shared,
}

/// Port signals of an [`AxisFifo`].
///
/// In [`FifoClocking::Shared`] wiring both clock fields name the same
/// signal, as do both reset fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisFifoPorts {
    /// Write-side clock.
    pub s_clk: SignalId,
    /// Read-side clock.
    pub m_clk: SignalId,
    /// Write-side active-low reset.
    pub s_resetn: SignalId,
    /// Read-side active-low reset.
    pub m_resetn: SignalId,
    /// Write-side `tvalid`.
    pub s_valid: SignalId,
    /// Write-side `tready`.
    pub s_ready: SignalId,
    /// Write-side `tdata`.
    pub s_data: SignalId,
    /// Read-side `tvalid`.
    pub m_valid: SignalId,
    /// Read-side `tready`.
    pub m_ready: SignalId,
    /// Read-side `tdata`.
    pub m_data: SignalId,
}

impl AxisFifoPorts {
    /// Declares the FIFO's ports. Resets start released.
    pub fn declare(
        sim: &mut Simulator,
        clocking: FifoClocking,
        data_width: u32,
    ) -> Result<Self, SimError> {
        let (s_clk, m_clk, s_resetn, m_resetn) = match clocking {
            FifoClocking::Independent => (
                sim.add_signal("s_axis_aclk", 1)?,
                sim.add_signal("m_axis_aclk", 1)?,
                sim.add_signal_with_init("s_axis_aresetn", 1, 1)?,
                sim.add_signal_with_init("m_axis_aresetn", 1, 1)?,
            ),
            FifoClocking::Shared => {
                let clk = sim.add_signal("clk", 1)?;
                let resetn = sim.add_signal_with_init("resetn", 1, 1)?;
                (clk, clk, resetn, resetn)
            }
        };
        Ok(Self {
            s_clk,
            m_clk,
            s_resetn,
            m_resetn,
            s_valid: sim.add_signal("s_axis_tvalid", 1)?,
            s_ready: sim.add_signal("s_axis_tready", 1)?,
            s_data: sim.add_signal("s_axis_tdata", data_width)?,
            m_valid: sim.add_signal("m_axis_tvalid", 1)?,
            m_ready: sim.add_signal("m_axis_tready", 1)?,
            m_data: sim.add_signal("m_axis_tdata", data_width)?,
        })
    }

    /// True if both sides share one clock.
    pub fn is_shared(&self) -> bool {
        self.s_clk == self.m_clk
    }
}

/// FIFO model process.
///
/// On a write-clock edge a word is pushed if `s_axis_tvalid` and
/// `s_axis_tready` were both high, then `s_axis_tready` is recomputed from the
/// fill level. On a read-clock edge the front word is popped on a handshake
/// and the new front is presented. When both clocks are the same signal the
/// write side is evaluated first.
#[derive(Debug)]
pub struct AxisFifo {
    ports: AxisFifoPorts,
    depth: usize,
    mask: u64,
    contents: VecDeque<u64>,
    pushed: u64,
    popped: u64,
    flushed: u64,
    high_water: usize,
}

impl AxisFifo {
    /// A FIFO holding up to `depth` words.
    pub fn new(ports: AxisFifoPorts, depth: usize, data_width: u32) -> Self {
        Self {
            ports,
            depth,
            mask: width_mask(data_width),
            contents: VecDeque::with_capacity(depth),
            pushed: 0,
            popped: 0,
            flushed: 0,
            high_water: 0,
        }
    }

    /// Declares ports and spawns a FIFO in one go.
    pub fn build(
        sim: &mut Simulator,
        clocking: FifoClocking,
        depth: usize,
        data_width: u32,
    ) -> Result<(AxisFifoPorts, Handle<AxisFifo>), SimError> {
        let ports = AxisFifoPorts::declare(sim, clocking, data_width)?;
        let handle = sim.spawn(Self::new(ports, depth, data_width));
        Ok((ports, handle))
    }

    /// Capacity in words.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Words currently stored.
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// True if no word is stored.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Words accepted on the write side.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Words delivered on the read side.
    pub fn popped(&self) -> u64 {
        self.popped
    }

    /// Words discarded by reset.
    pub fn flushed(&self) -> u64 {
        self.flushed
    }

    /// Highest fill level seen.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    fn flush(&mut self, side: &str) {
        if !self.contents.is_empty() {
            tracing::trace!(side, words = self.contents.len(), "fifo flushed by reset");
            self.flushed += self.contents.len() as u64;
            self.contents.clear();
        }
    }

    fn write_edge(&mut self, ctx: &mut ProcessContext<'_>) {
        let p = self.ports;
        if !ctx.is_high(p.s_resetn) {
            self.flush("write");
            ctx.set_bit(p.s_ready, false);
            return;
        }
        if ctx.is_high(p.s_valid) && ctx.is_high(p.s_ready) && self.contents.len() < self.depth {
            self.contents.push_back(ctx.get(p.s_data) & self.mask);
            self.pushed += 1;
            self.high_water = self.high_water.max(self.contents.len());
        }
    }

    fn read_edge(&mut self, ctx: &mut ProcessContext<'_>) {
        let p = self.ports;
        if !ctx.is_high(p.m_resetn) {
            self.flush("read");
            ctx.set_bit(p.m_valid, false);
            return;
        }
        if ctx.is_high(p.m_valid) && ctx.is_high(p.m_ready) && self.contents.pop_front().is_some()
        {
            self.popped += 1;
        }
        match self.contents.front() {
            Some(&word) => {
                ctx.set(p.m_data, word);
                ctx.set_bit(p.m_valid, true);
            }
            None => ctx.set_bit(p.m_valid, false),
        }
    }

    fn update_ready(&self, ctx: &mut ProcessContext<'_>) {
        if ctx.is_high(self.ports.s_resetn) {
            ctx.set_bit(self.ports.s_ready, self.contents.len() < self.depth);
        }
    }
}

impl Process for AxisFifo {
    fn name(&self) -> &str {
        "axis-fifo"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let p = self.ports;
        let write = ctx.rose(p.s_clk);
        let read = ctx.rose(p.m_clk);

        if !write && !read {
            ctx.set_bit(p.s_ready, false);
            ctx.set_bit(p.m_valid, false);
        }
        if write {
            self.write_edge(ctx);
        }
        if read {
            self.read_edge(ctx);
        }
        if write {
            self.update_ready(ctx);
        }

        Ok(if self.ports.is_shared() {
            Wait::Until(Trigger::Rising(p.s_clk))
        } else {
            Wait::First(vec![Trigger::Rising(p.s_clk), Trigger::Rising(p.m_clk)])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_sim::Clock;
    use strobe_verify::{Frame, Pacing, StreamBus, StreamSink, StreamSource};

    const NS: u64 = 1_000_000;
    const TIMEOUT: u64 = 100_000 * NS;

    struct Bench {
        sim: Simulator,
        ports: AxisFifoPorts,
        fifo: Handle<AxisFifo>,
        source: StreamSource,
        sink: StreamSink,
    }

    fn bench(clocking: FifoClocking, depth: usize, backpressure: Pacing) -> Bench {
        let mut sim = Simulator::new();
        let (ports, fifo) = AxisFifo::build(&mut sim, clocking, depth, 8).unwrap();
        sim.spawn(Clock::new(ports.s_clk, 10 * NS).unwrap());
        if !ports.is_shared() {
            sim.spawn(Clock::new(ports.m_clk, 14 * NS).unwrap());
        }
        let s_bus = StreamBus::from_prefix(&sim, "s_axis", ports.s_clk, Some(ports.s_resetn))
            .unwrap();
        let m_bus = StreamBus::from_prefix(&sim, "m_axis", ports.m_clk, Some(ports.m_resetn))
            .unwrap();
        let source = StreamSource::attach(&mut sim, "s_axis", s_bus, Pacing::NeverStall);
        let sink = StreamSink::attach(&mut sim, "m_axis", m_bus, backpressure);
        Bench {
            sim,
            ports,
            fifo,
            source,
            sink,
        }
    }

    #[test]
    fn shared_ports_alias() {
        let mut sim = Simulator::new();
        let ports = AxisFifoPorts::declare(&mut sim, FifoClocking::Shared, 32).unwrap();
        assert!(ports.is_shared());
        assert_eq!(ports.s_resetn, ports.m_resetn);
        assert!(sim.find_signal("s_axis_aclk").is_none());
        assert_eq!(sim.width(ports.m_data), 32);
        assert_eq!(sim.value(ports.s_resetn), 1);
    }

    #[test]
    fn passes_words_in_order() {
        for clocking in [FifoClocking::Independent, FifoClocking::Shared] {
            let mut b = bench(clocking, 4, Pacing::random(3));
            for word in 0..20 {
                b.source.send(&mut b.sim, Frame::single(word)).unwrap();
            }
            for word in 0..20 {
                assert_eq!(b.sink.recv(&mut b.sim, TIMEOUT).unwrap(), Frame::single(word));
            }
            let fifo = b.sim.get(b.fifo).unwrap();
            assert_eq!(fifo.pushed(), 20);
            assert_eq!(fifo.popped(), 20);
            assert!(fifo.high_water() <= 4);
        }
    }

    #[test]
    fn fills_to_depth_and_deasserts_ready() {
        let mut b = bench(FifoClocking::Independent, 4, Pacing::AlwaysStall);
        for word in 1..=10 {
            b.source.send(&mut b.sim, Frame::single(word)).unwrap();
        }
        b.sim.run_for(200 * NS).unwrap();
        assert_eq!(b.sim.get(b.fifo).unwrap().len(), 4);
        assert_eq!(b.sim.value(b.ports.s_ready), 0);
        assert_eq!(b.sim.value(b.ports.m_valid), 1);
        assert_eq!(b.sim.value(b.ports.m_data), 1);
        assert!(!b.source.empty(&b.sim).unwrap());
    }

    #[test]
    fn reset_flushes_contents() {
        let mut b = bench(FifoClocking::Shared, 8, Pacing::AlwaysStall);
        for word in 0..3 {
            b.source.send(&mut b.sim, Frame::single(word)).unwrap();
        }
        b.sim.run_for(100 * NS).unwrap();
        assert_eq!(b.sim.get(b.fifo).unwrap().len(), 3);

        b.sim.drive(b.ports.s_resetn, 0);
        b.sim.run_for(30 * NS).unwrap();
        let fifo = b.sim.get(b.fifo).unwrap();
        assert!(fifo.is_empty());
        assert_eq!(fifo.flushed(), 3);
        assert_eq!(b.sim.value(b.ports.m_valid), 0);
        assert_eq!(b.sim.value(b.ports.s_ready), 0);

        b.sim.drive(b.ports.s_resetn, 1);
        b.sim.run_for(30 * NS).unwrap();
        assert_eq!(b.sim.value(b.ports.s_ready), 1);
    }
}
