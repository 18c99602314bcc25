//! SPI master transactor.
//!
//! [`SpiMaster`] is a process that shifts queued byte bursts out on MOSI
//! while shifting MISO in, framing each burst with one chip-select
//! assertion. [`SpiTransactor`] wraps it with the register protocol used by
//! the device: a burst starts with an address byte, addresses below 128
//! write, and the read alias of an address is `address + 128`.

use std::collections::VecDeque;

use strobe_common::{format_duration, Frequency};
use strobe_sim::{Handle, Process, ProcessContext, SignalId, SimError, Simulator, Trigger, Wait};

use crate::error::VerifyError;

/// Bits per SPI word.
pub const WORD_BITS: usize = 8;

/// Timing and mode of the SPI master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiConfig {
    /// Serial clock period.
    pub sclk_period_fs: u64,
    /// Idle level of SCLK.
    pub cpol: bool,
    /// Sample on the trailing edge instead of the leading edge.
    pub cpha: bool,
    /// Chip select is asserted low.
    pub cs_active_low: bool,
    /// Minimum deasserted time between bursts.
    pub frame_spacing_fs: u64,
    /// Liveness bound for one burst.
    pub transaction_timeout_fs: u64,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            sclk_period_fs: 125_000_000,
            cpol: false,
            cpha: false,
            cs_active_low: true,
            frame_spacing_fs: 0,
            transaction_timeout_fs: 1_000_000_000_000,
        }
    }
}

impl SpiConfig {
    /// A mode-0 configuration clocked at `frequency`.
    pub fn from_frequency(frequency: Frequency) -> Result<Self, SimError> {
        let sclk_period_fs = frequency
            .period_fs()
            .filter(|p| *p >= 2)
            .ok_or_else(|| SimError::InvalidPeriod {
                name: "spi sclk".to_string(),
                period_fs: frequency.period_fs().unwrap_or(0),
            })?;
        Ok(Self {
            sclk_period_fs,
            ..Self::default()
        })
    }
}

/// The four wires of an SPI bus, named from the device's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiBus {
    /// Serial clock.
    pub sclk: SignalId,
    /// Master out, device in.
    pub mosi: SignalId,
    /// Master in, device out.
    pub miso: SignalId,
    /// Chip select.
    pub cs: SignalId,
}

impl SpiBus {
    /// Binds `spi_clock_in`, `spi_data_in`, `spi_data_out` and `spi_select_in`.
    pub fn from_dut(sim: &Simulator) -> Result<Self, SimError> {
        Ok(Self {
            sclk: sim.signal("spi_clock_in")?,
            mosi: sim.signal("spi_data_in")?,
            miso: sim.signal("spi_data_out")?,
            cs: sim.signal("spi_select_in")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Leading,
    Trailing,
    Release,
    Spacing,
}

#[derive(Debug, Clone)]
struct Burst {
    tx: Vec<u8>,
    bit: usize,
    rx: Vec<u8>,
    rx_word: u8,
}

impl Burst {
    fn new(tx: Vec<u8>) -> Self {
        let rx = Vec::with_capacity(tx.len());
        Self {
            tx,
            bit: 0,
            rx,
            rx_word: 0,
        }
    }

    fn total_bits(&self) -> usize {
        self.tx.len() * WORD_BITS
    }

    /// MSB-first bit `self.bit` of the outgoing stream.
    fn tx_bit(&self) -> bool {
        let byte = self.tx[self.bit / WORD_BITS];
        (byte >> (WORD_BITS - 1 - self.bit % WORD_BITS)) & 1 == 1
    }

    fn sample(&mut self, miso: bool) {
        self.rx_word = (self.rx_word << 1) | u8::from(miso);
        if self.bit % WORD_BITS == WORD_BITS - 1 {
            self.rx.push(self.rx_word);
            self.rx_word = 0;
        }
    }
}

/// Process that executes queued SPI bursts.
///
/// Parks while idle; [`SpiTransactor`] wakes it after queueing a burst.
#[derive(Debug)]
pub struct SpiMaster {
    bus: SpiBus,
    config: SpiConfig,
    phase: Phase,
    queue: VecDeque<Vec<u8>>,
    active: Option<Burst>,
    completed: VecDeque<Vec<u8>>,
    bursts: u64,
}

impl SpiMaster {
    /// A master driving `bus`.
    pub fn new(bus: SpiBus, config: SpiConfig) -> Self {
        Self {
            bus,
            config,
            phase: Phase::Idle,
            queue: VecDeque::new(),
            active: None,
            completed: VecDeque::new(),
            bursts: 0,
        }
    }

    /// Queues one burst.
    pub fn enqueue(&mut self, tx: Vec<u8>) {
        self.queue.push_back(tx);
    }

    /// Takes the bytes received during the oldest finished burst.
    pub fn take_completed(&mut self) -> Option<Vec<u8>> {
        self.completed.pop_front()
    }

    /// True if a finished burst is waiting to be collected.
    pub fn has_completed(&self) -> bool {
        !self.completed.is_empty()
    }

    /// True when nothing is queued or being shifted.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle && self.queue.is_empty()
    }

    /// Bursts finished so far.
    pub fn bursts(&self) -> u64 {
        self.bursts
    }

    fn cs_level(&self, asserted: bool) -> bool {
        asserted != self.config.cs_active_low
    }

    fn half_high(&self) -> u64 {
        self.config.sclk_period_fs / 2
    }

    fn half_low(&self) -> u64 {
        self.config.sclk_period_fs - self.half_high()
    }

    /// Starts the next queued burst, or parks.
    fn start_next(&mut self, ctx: &mut ProcessContext<'_>) -> Wait {
        let Some(tx) = self.queue.pop_front() else {
            self.phase = Phase::Idle;
            return Wait::Parked;
        };
        let burst = Burst::new(tx);
        if burst.total_bits() == 0 {
            self.completed.push_back(Vec::new());
            return self.start_next(ctx);
        }
        ctx.set_bit(self.bus.sclk, self.config.cpol);
        ctx.set_bit(self.bus.cs, self.cs_level(true));
        if !self.config.cpha {
            ctx.set_bit(self.bus.mosi, burst.tx_bit());
        }
        self.active = Some(burst);
        self.phase = Phase::Leading;
        Wait::Until(Trigger::Delay(self.half_low()))
    }
}

impl Process for SpiMaster {
    fn name(&self) -> &str {
        "spi-master"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let miso = ctx.is_high(self.bus.miso);
        let cpol = self.config.cpol;
        let cpha = self.config.cpha;
        match self.phase {
            Phase::Idle => {
                if self.queue.is_empty() {
                    ctx.set_bit(self.bus.sclk, cpol);
                    ctx.set_bit(self.bus.cs, self.cs_level(false));
                }
                Ok(self.start_next(ctx))
            }
            Phase::Leading => {
                let half_high = self.half_high();
                let Some(burst) = self.active.as_mut() else {
                    return Ok(self.start_next(ctx));
                };
                ctx.set_bit(self.bus.sclk, !cpol);
                if cpha {
                    ctx.set_bit(self.bus.mosi, burst.tx_bit());
                } else {
                    burst.sample(miso);
                }
                self.phase = Phase::Trailing;
                Ok(Wait::Until(Trigger::Delay(half_high)))
            }
            Phase::Trailing => {
                let half_low = self.half_low();
                let Some(burst) = self.active.as_mut() else {
                    return Ok(self.start_next(ctx));
                };
                ctx.set_bit(self.bus.sclk, cpol);
                if cpha {
                    burst.sample(miso);
                }
                burst.bit += 1;
                let more = burst.bit < burst.total_bits();
                if more && !cpha {
                    ctx.set_bit(self.bus.mosi, burst.tx_bit());
                }
                self.phase = if more { Phase::Leading } else { Phase::Release };
                Ok(Wait::Until(Trigger::Delay(half_low)))
            }
            Phase::Release => {
                ctx.set_bit(self.bus.cs, self.cs_level(false));
                if let Some(burst) = self.active.take() {
                    self.completed.push_back(burst.rx);
                }
                self.bursts += 1;
                if self.config.frame_spacing_fs > 0 {
                    self.phase = Phase::Spacing;
                    return Ok(Wait::Until(Trigger::Delay(self.config.frame_spacing_fs)));
                }
                Ok(self.start_next(ctx))
            }
            Phase::Spacing => Ok(self.start_next(ctx)),
        }
    }
}

/// Register-protocol front end for an [`SpiMaster`].
#[derive(Debug, Clone, Copy)]
pub struct SpiTransactor {
    master: Handle<SpiMaster>,
    timeout_fs: u64,
}

impl SpiTransactor {
    /// Spawns a master on `bus`; it drives the bus idle immediately.
    pub fn attach(sim: &mut Simulator, bus: SpiBus, config: SpiConfig) -> Self {
        let timeout_fs = config.transaction_timeout_fs;
        let master = sim.spawn(SpiMaster::new(bus, config));
        Self { master, timeout_fs }
    }

    /// Shifts out one burst and returns the bytes shifted in, one per byte sent.
    pub fn transfer(&self, sim: &mut Simulator, tx: Vec<u8>) -> Result<Vec<u8>, VerifyError> {
        let len = tx.len();
        sim.get_mut(self.master)?.enqueue(tx);
        sim.wake(self.master.id())?;
        let master = self.master;
        let awaiting = format!("SPI burst of {len} bytes");
        sim.run_until(&awaiting, self.timeout_fs, |sim| {
            sim.get(master).is_ok_and(|m| m.has_completed())
        })?;
        sim.get_mut(self.master)?.take_completed().ok_or_else(|| {
            VerifyError::Sim(SimError::Stalled {
                awaiting,
                at: sim.now(),
            })
        })
    }

    /// Writes `data` starting at `address`. An empty write still sends one
    /// zero data byte. Bytes shifted in are discarded.
    pub fn write(&self, sim: &mut Simulator, address: u8, data: &[u8]) -> Result<(), VerifyError> {
        let data: Vec<u8> = if data.is_empty() {
            vec![0]
        } else {
            data.to_vec()
        };
        tracing::debug!(
            address = format_args!("0x{address:02x}"),
            data = ?HexBytes(&data),
            "SPI WRITE"
        );
        let mut tx = Vec::with_capacity(data.len() + 1);
        tx.push(address);
        tx.extend_from_slice(&data);
        self.transfer(sim, tx)?;
        Ok(())
    }

    /// Reads `n` bytes from `address`, sending `n` dummy zero bytes after the
    /// address. The byte shifted in during the address phase is dropped.
    pub fn read(&self, sim: &mut Simulator, address: u8, n: usize) -> Result<Vec<u8>, VerifyError> {
        let mut tx = vec![0u8; n + 1];
        tx[0] = address;
        let rx = self.transfer(sim, tx)?;
        let data = rx.get(1..).map(<[u8]>::to_vec).unwrap_or_default();
        tracing::debug!(
            address = format_args!("0x{address:02x}"),
            data = ?HexBytes(&data),
            "SPI READ"
        );
        Ok(data)
    }

    /// Sends the address byte alone, as an opcode-style command.
    pub fn command(&self, sim: &mut Simulator, address: u8) -> Result<(), VerifyError> {
        tracing::debug!(address = format_args!("0x{address:02x}"), "SPI COMMAND");
        self.transfer(sim, vec![address])?;
        Ok(())
    }

    /// Bursts completed so far.
    pub fn bursts(&self, sim: &Simulator) -> Result<u64, VerifyError> {
        Ok(sim.get(self.master)?.bursts())
    }

    /// Waits `duration_fs` of simulated time with the bus idle.
    pub fn pause(&self, sim: &mut Simulator, duration_fs: u64) -> Result<(), VerifyError> {
        tracing::trace!(gap = %format_duration(duration_fs), "SPI idle");
        sim.run_for(duration_fs)?;
        Ok(())
    }
}

/// Formats bytes as `[0x8e, 0xff]` in logs.
struct HexBytes<'a>(&'a [u8]);

impl std::fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|b| HexByte(*b)))
            .finish()
    }
}

struct HexByte(u8);

impl std::fmt::Debug for HexByte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Loops MOSI back to MISO combinationally and records select edges.
    struct Loopback {
        bus: SpiBus,
        selects: u32,
    }

    impl Process for Loopback {
        fn name(&self) -> &str {
            "loopback"
        }

        fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
            if ctx.fell(self.bus.cs) {
                self.selects += 1;
            }
            let mosi = ctx.get(self.bus.mosi);
            ctx.set(self.bus.miso, mosi);
            Ok(Wait::First(vec![
                Trigger::Change(self.bus.mosi),
                Trigger::Change(self.bus.cs),
            ]))
        }
    }

    fn bench(config: SpiConfig) -> (Simulator, SpiTransactor, Handle<Loopback>) {
        let mut sim = Simulator::new();
        let bus = SpiBus {
            sclk: sim.add_signal("spi_clock_in", 1).unwrap(),
            mosi: sim.add_signal("spi_data_in", 1).unwrap(),
            miso: sim.add_signal("spi_data_out", 1).unwrap(),
            cs: sim.add_signal("spi_select_in", 1).unwrap(),
        };
        assert_eq!(SpiBus::from_dut(&sim).unwrap(), bus);
        let lb = sim.spawn(Loopback { bus, selects: 0 });
        let t = SpiTransactor::attach(&mut sim, bus, config);
        sim.run_for(1_000).unwrap();
        (sim, t, lb)
    }

    #[test]
    fn mode0_loopback_returns_sent_bytes() {
        let (mut sim, t, lb) = bench(SpiConfig::default());
        let rx = t.transfer(&mut sim, vec![0x7c, 0x8e, 0x01]).unwrap();
        assert_eq!(rx, vec![0x7c, 0x8e, 0x01]);
        assert_eq!(sim.get(lb).unwrap().selects, 1);
        assert_eq!(t.bursts(&sim).unwrap(), 1);
    }

    #[test]
    fn burst_takes_expected_time() {
        let (mut sim, t, _) = bench(SpiConfig::default());
        let start = sim.now().fs;
        t.transfer(&mut sim, vec![0xa5, 0x5a]).unwrap();
        // 16 bits plus the select setup and hold half periods.
        let half = 62_500_000;
        assert_eq!(sim.now().fs - start, 16 * 2 * half + half);
    }

    #[test]
    fn cpha1_loopback() {
        let config = SpiConfig {
            cpha: true,
            ..SpiConfig::default()
        };
        let (mut sim, t, _) = bench(config);
        let rx = t.transfer(&mut sim, vec![0x3c, 0xff, 0x00]).unwrap();
        assert_eq!(rx, vec![0x3c, 0xff, 0x00]);
    }

    #[test]
    fn read_drops_address_byte() {
        let (mut sim, t, _) = bench(SpiConfig::default());
        // Loopback echoes the dummy zeros.
        assert_eq!(t.read(&mut sim, 0xfc, 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn empty_write_sends_one_zero_byte() {
        let (mut sim, t, _) = bench(SpiConfig::default());
        let start = sim.now().fs;
        t.write(&mut sim, 0x10, &[]).unwrap();
        let two_bytes = sim.now().fs - start;
        let start = sim.now().fs;
        t.command(&mut sim, 0x10).unwrap();
        let one_byte = sim.now().fs - start;
        assert_eq!(two_bytes - one_byte, 8 * 125_000_000);
    }

    #[test]
    fn select_is_idle_high_after_attach() {
        let (sim, _, _) = bench(SpiConfig::default());
        assert_eq!(sim.value(sim.signal("spi_select_in").unwrap()), 1);
        assert_eq!(sim.value(sim.signal("spi_clock_in").unwrap()), 0);
    }

    #[test]
    fn long_burst_times_out() {
        let config = SpiConfig {
            transaction_timeout_fs: 1_000_000_000,
            ..SpiConfig::default()
        };
        let (mut sim, t, _) = bench(config);
        let err = t.transfer(&mut sim, vec![0; 64]).unwrap_err();
        assert!(matches!(err, VerifyError::Sim(SimError::Timeout { .. })));
    }

    #[test]
    fn hex_bytes_debug_format() {
        assert_eq!(format!("{:?}", HexBytes(&[0x8e, 0x0f])), "[0x8e, 0x0f]");
        assert_eq!(format!("{:?}", HexBytes(&[])), "[]");
    }

    #[test]
    fn from_frequency_rounds_period() {
        let config = SpiConfig::from_frequency(Frequency::from_mhz(8)).unwrap();
        assert_eq!(config.sclk_period_fs, 125_000_000);
        assert!(!config.cpol);
        assert!(config.cs_active_low);
    }
}
