//! AXI-stream FIFO bench and the depth-stress scenario.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use strobe_config::{FifoMode, ResolvedFifo};
use strobe_models::{AxisFifo, AxisFifoPorts, FifoClocking};
use strobe_sim::{Clock, Edge, Handle, Polarity, Simulator};
use strobe_verify::{
    ensure_drained, run_resets, Frame, Hold, Pacing, ResetSequence, Scoreboard, StreamBus,
    StreamSink, StreamSource,
};

use crate::error::ScenarioError;
use crate::report::{ScenarioCounts, ScenarioReport};

/// A FIFO model with clocks, a stream source on `s_axis` and a sink on
/// `m_axis`.
pub struct FifoBench {
    /// The simulator everything runs on.
    pub sim: Simulator,
    /// Resolved settings.
    pub config: ResolvedFifo,
    /// FIFO port signals.
    pub ports: AxisFifoPorts,
    /// The FIFO model.
    pub fifo: Handle<AxisFifo>,
    /// Driver on the write side.
    pub source: StreamSource,
    /// Monitor on the read side.
    pub sink: StreamSink,
    rng: StdRng,
}

impl FifoBench {
    /// Builds the bench for `config.mode`, optionally recording a waveform.
    pub fn new(config: ResolvedFifo, waveform: Option<&Path>) -> Result<Self, ScenarioError> {
        let mut sim = Simulator::new();
        let clocking = match config.mode {
            FifoMode::Async => FifoClocking::Independent,
            FifoMode::Sync => FifoClocking::Shared,
        };
        let (ports, fifo) = AxisFifo::build(&mut sim, clocking, config.depth, config.data_width)?;
        if let Some(path) = waveform {
            sim.start_recording(path)?;
        }

        sim.spawn(Clock::new(ports.s_clk, config.s_period_fs)?.named("s_clk"));
        if !ports.is_shared() {
            sim.spawn(Clock::new(ports.m_clk, config.m_period_fs)?.named("m_clk"));
        }

        let s_bus = StreamBus::from_prefix(&sim, "s_axis", ports.s_clk, Some(ports.s_resetn))?;
        let m_bus = StreamBus::from_prefix(&sim, "m_axis", ports.m_clk, Some(ports.m_resetn))?;
        let source = StreamSource::attach(&mut sim, "s_axis", s_bus, Pacing::NeverStall);
        let sink = StreamSink::attach(&mut sim, "m_axis", m_bus, Pacing::NeverStall);

        tracing::info!(
            mode = %config.mode,
            depth = config.depth,
            width = config.data_width,
            "fifo bench ready"
        );
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            sim,
            config,
            ports,
            fifo,
            source,
            sink,
            rng,
        })
    }

    /// Drives each reset released, asserted, then released again for
    /// `reset_cycles` of its own clock. Both domains run concurrently.
    pub fn reset(&mut self) -> Result<(), ScenarioError> {
        let cycles = self.config.reset_cycles;
        let levels = |name: &str, line, clock| {
            let hold = Hold::Cycles { clock, cycles };
            ResetSequence::new(name, line, Polarity::ActiveLow)
                .release_for(hold)
                .assert_for(hold)
                .release_for(hold)
        };
        let p = self.ports;
        let mut sequences = vec![levels("s_resetn", p.s_resetn, p.s_clk)];
        if !p.is_shared() {
            sequences.push(levels("m_resetn", p.m_resetn, p.m_clk));
        }
        let slowest = self.config.s_period_fs.max(self.config.m_period_fs);
        let timeout = slowest.saturating_mul(3 * cycles + 2).saturating_mul(2);
        run_resets(&mut self.sim, sequences, timeout)?;
        Ok(())
    }

    /// Runs for `cycles` rising edges of the write clock.
    pub fn write_cycles(&mut self, cycles: u64) -> Result<(), ScenarioError> {
        let period = self.config.s_period_fs;
        let timeout = period.saturating_mul(cycles + 1).saturating_mul(2);
        self.sim
            .wait_edges(self.ports.s_clk, Edge::Rising, cycles, timeout)?;
        Ok(())
    }

    /// Random pacing seeded from the bench generator.
    pub fn random_pacing(&mut self) -> Pacing {
        Pacing::random_from(&mut self.rng)
    }
}

/// Fills the FIFO to twice its depth under strict backpressure, holds for
/// `release_delay_cycles`, then drains it under random backpressure and
/// checks every frame in order.
pub fn run_fifo_depth_stress(
    config: ResolvedFifo,
    waveform: Option<&Path>,
) -> Result<ScenarioReport, ScenarioError> {
    let mut bench = FifoBench::new(config, waveform)?;
    let frame_count = bench.config.depth * 2;
    let frame_timeout = bench.config.frame_timeout_fs;
    bench.reset()?;

    let (source, sink) = (bench.source, bench.sink);
    source.set_idle(&mut bench.sim, Pacing::AlwaysStall)?;
    sink.set_backpressure(&mut bench.sim, Pacing::AlwaysStall)?;
    let idle = bench.random_pacing();
    source.set_idle(&mut bench.sim, idle)?;

    tracing::info!(frames = frame_count, "sending test frames");
    let mut board = Scoreboard::new();
    for word in 0..frame_count as u64 {
        let frame = Frame::single(word);
        source.send(&mut bench.sim, frame.clone())?;
        board.record_sent(frame);
    }

    bench.write_cycles(bench.config.release_delay_cycles)?;
    let backpressure = bench.random_pacing();
    sink.set_backpressure(&mut bench.sim, backpressure)?;

    tracing::info!(frames = frame_count, "receiving test frames");
    for _ in 0..frame_count {
        let frame = sink.recv(&mut bench.sim, frame_timeout)?;
        board.record_received(frame);
    }
    sink.set_backpressure(&mut bench.sim, Pacing::AlwaysStall)?;

    let summary = board.compare()?;
    ensure_drained([
        ("m_axis sink", sink.empty(&bench.sim)?),
        ("s_axis source", source.empty(&bench.sim)?),
    ])?;
    bench.write_cycles(bench.config.drain_cycles)?;

    let counts = ScenarioCounts {
        frames_sent: source.frames_sent(&bench.sim)?,
        frames_received: sink.frames_received(&bench.sim)?,
        checks: summary.compared as u64,
        ..ScenarioCounts::default()
    };
    let high_water = bench.sim.get(bench.fifo)?.high_water();
    tracing::info!(compared = summary.compared, high_water, "fifo frames match");
    let sim = bench.sim.finish()?;
    Ok(ScenarioReport::new(
        "fifo-depth-stress",
        bench.config.seed,
        Some(bench.config.mode),
        counts,
        sim,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(mode: FifoMode) -> ResolvedFifo {
        ResolvedFifo {
            mode,
            seed: 5,
            depth: 8,
            data_width: 32,
            s_period_fs: 8_770_000,
            m_period_fs: 13_470_000,
            reset_cycles: 4,
            release_delay_cycles: 20,
            drain_cycles: 5,
            frame_timeout_fs: 200_000_000_000,
        }
    }

    #[test]
    fn reset_releases_both_domains() {
        let mut bench = FifoBench::new(small(FifoMode::Async), None).unwrap();
        bench.reset().unwrap();
        assert_eq!(bench.sim.value(bench.ports.s_resetn), 1);
        assert_eq!(bench.sim.value(bench.ports.m_resetn), 1);
        // The slower read domain decides when reset completes.
        assert!(bench.sim.now().fs >= 11 * 13_470_000);
    }

    #[test]
    fn strict_backpressure_fills_to_depth() {
        let mut bench = FifoBench::new(small(FifoMode::Sync), None).unwrap();
        bench.reset().unwrap();
        let sink = bench.sink;
        sink.set_backpressure(&mut bench.sim, Pacing::AlwaysStall)
            .unwrap();
        for word in 0..16 {
            bench.source.send(&mut bench.sim, Frame::single(word)).unwrap();
        }
        bench.write_cycles(40).unwrap();
        assert_eq!(bench.sim.get(bench.fifo).unwrap().len(), 8);
        assert!(sink.try_recv(&mut bench.sim).unwrap().is_none());
    }

    #[test]
    fn depth_stress_small() {
        for mode in [FifoMode::Async, FifoMode::Sync] {
            let report = run_fifo_depth_stress(small(mode), None).unwrap();
            assert_eq!(report.counts.frames_sent, 16);
            assert_eq!(report.counts.frames_received, 16);
            assert_eq!(report.counts.checks, 16);
            assert_eq!(report.mode, Some(mode));
        }
    }
}
