//! SPI register-bridge bench and its scenarios.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strobe_common::FS_PER_PS;
use strobe_config::ResolvedSpi;
use strobe_models::{SpiPeripheral, SpiPeripheralPorts};
use strobe_sim::{Handle, Polarity, Simulator};
use strobe_verify::{
    check_read_back, check_unchanged, run_resets, Hold, RegisterTaps, ResetSequence,
    ShadowRegisterFile, SpiBus, SpiConfig, SpiTransactor, READ_ALIAS, REGISTER_COUNT,
};

use crate::error::ScenarioError;
use crate::report::{ScenarioCounts, ScenarioReport};

/// The SPI bridge with a master transactor and a shadow register file,
/// brought out of reset.
pub struct SpiBench {
    /// The simulator everything runs on.
    pub sim: Simulator,
    /// Resolved settings.
    pub config: ResolvedSpi,
    /// Bridge pins and taps.
    pub ports: SpiPeripheralPorts,
    /// The bridge model.
    pub dut: Handle<SpiPeripheral>,
    /// Master transactor.
    pub spi: SpiTransactor,
    /// Read-back oracle.
    pub regs: ShadowRegisterFile,
    rng: StdRng,
    checks: u64,
}

impl SpiBench {
    /// Builds the bench and runs the power-on sequence: select low and reset
    /// high for 1 ps, a clockless reset pulse, then `settle`.
    pub fn start(config: ResolvedSpi, waveform: Option<&Path>) -> Result<Self, ScenarioError> {
        let mut sim = Simulator::new();
        let (ports, dut) = SpiPeripheral::build(&mut sim)?;
        if let Some(path) = waveform {
            sim.start_recording(path)?;
        }

        sim.drive(ports.cs, 0);
        sim.drive(ports.reset_n, 1);
        sim.run_for(FS_PER_PS)?;

        let spi_config = SpiConfig {
            sclk_period_fs: config.sclk_period_fs,
            cpol: config.cpol,
            cpha: config.cpha,
            cs_active_low: true,
            frame_spacing_fs: config.frame_spacing_fs,
            transaction_timeout_fs: config.transaction_timeout_fs,
        };
        let bus = SpiBus::from_dut(&sim)?;
        let taps = RegisterTaps::from_dut(&sim)?;
        let spi = SpiTransactor::attach(&mut sim, bus, spi_config);
        let regs = ShadowRegisterFile::attach(&mut sim, taps);

        let por = ResetSequence::new("reset_n_in", ports.reset_n, Polarity::ActiveLow)
            .assert_for(Hold::Duration(config.reset_duration_fs))
            .release();
        let timeout = config
            .reset_duration_fs
            .saturating_add(config.transaction_timeout_fs);
        run_resets(&mut sim, vec![por], timeout)?;
        sim.run_for(config.settle_fs)?;

        tracing::info!(sclk = %config.sclk_frequency, at = %sim.now(), "spi bench out of reset");
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            sim,
            config,
            ports,
            dut,
            spi,
            regs,
            rng,
            checks: 0,
        })
    }

    /// Writes `data` at `address`, reads it back through the read alias,
    /// compares, then idles for the configured gap.
    pub fn round_trip(&mut self, address: u8, data: &[u8]) -> Result<(), ScenarioError> {
        let alias = address | READ_ALIAS;
        self.spi.write(&mut self.sim, address, data)?;
        let read = self.spi.read(&mut self.sim, alias, data.len())?;
        check_read_back(alias, data, &read)?;
        self.checks += 1;
        self.spi.pause(&mut self.sim, self.config.gap_fs)?;
        Ok(())
    }

    /// Sends address-only commands and checks that no register changed.
    pub fn commands(&mut self, addresses: &[u8]) -> Result<(), ScenarioError> {
        let before = self.regs.snapshot(&self.sim)?;
        for &address in addresses {
            self.spi.command(&mut self.sim, address)?;
        }
        let after = self.regs.snapshot(&self.sim)?;
        check_unchanged(&before, &after)?;
        self.checks += 1;
        self.spi.pause(&mut self.sim, self.config.gap_fs)?;
        Ok(())
    }

    /// Round trips of random bursts at random write addresses. Returns the
    /// number of rounds run.
    pub fn random_bursts(&mut self) -> Result<u32, ScenarioError> {
        let rounds = self.rng.gen_range(self.config.burst_rounds.clone());
        tracing::info!(rounds, "random burst round trips");
        for _ in 0..rounds {
            let address = self.rng.gen_range(0..REGISTER_COUNT) as u8;
            let len = self.rng.gen_range(1..=self.config.max_burst_len);
            let data: Vec<u8> = (0..len).map(|_| self.rng.gen()).collect();
            self.round_trip(address, &data)?;
        }
        Ok(rounds)
    }

    /// Finalizes the run into a report.
    pub fn finish(mut self, scenario: &str) -> Result<ScenarioReport, ScenarioError> {
        let counts = ScenarioCounts {
            spi_bursts: self.spi.bursts(&self.sim)?,
            register_writes: self.regs.writes_observed(&self.sim)?,
            register_reads: self.regs.reads_observed(&self.sim)?,
            checks: self.checks,
            ..ScenarioCounts::default()
        };
        let sim = self.sim.finish()?;
        Ok(ScenarioReport::new(
            scenario,
            self.config.seed,
            None,
            counts,
            sim,
        ))
    }
}

/// Writes 0x8e to 0x7c and reads it back from 0xfc.
pub fn single_byte(bench: &mut SpiBench) -> Result<(), ScenarioError> {
    bench.round_trip(0x7c, &[0x8e])
}

/// Writes [0xa5, 0xff] to 0x3c and reads it back from 0xbc.
pub fn multi_byte(bench: &mut SpiBench) -> Result<(), ScenarioError> {
    bench.round_trip(0x3c, &[0xa5, 0xff])
}

/// Issues commands 0x14 and 0x20 with no data phase.
pub fn command_only(bench: &mut SpiBench) -> Result<(), ScenarioError> {
    bench.commands(&[0x14, 0x20])
}
