//! Shadow register file.
//!
//! [`RegisterObserver`] watches the device's internal write/read strobes,
//! address and byte-count lines rather than the transactor, keeps its own
//! copy of the 128 byte registers, and drives the read-data line from that
//! copy. Read-back is combinational: any change of read-enable, address or
//! read byte count re-drives the line in the next delta cycle, before the
//! device samples it at its next clock edge.

use strobe_sim::{Handle, Process, ProcessContext, SignalId, SimError, Simulator, Trigger, Wait};

use crate::error::VerifyError;

/// Number of byte registers behind the write-side address range.
pub const REGISTER_COUNT: usize = 128;

/// Addresses at or above this offset are the read-side aliases.
pub const READ_ALIAS: u8 = 0x80;

/// Register index addressed by `base + offset`, wrapped to the register space.
pub fn effective_address(base: u8, offset: u64) -> usize {
    (u64::from(base).wrapping_add(offset) % REGISTER_COUNT as u64) as usize
}

/// Device observation points the shadow file attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterTaps {
    /// Serial clock; writes are captured on its falling edge.
    pub sclk: SignalId,
    /// Write strobe.
    pub wr_en: SignalId,
    /// Read strobe.
    pub rd_en: SignalId,
    /// Base address decoded from the first byte of a burst.
    pub address: SignalId,
    /// Running data-byte count of a write burst.
    pub wr_byte_count: SignalId,
    /// Running data-byte count of a read burst.
    pub rd_byte_count: SignalId,
    /// Byte being written.
    pub wr_data: SignalId,
    /// Read-back byte, driven by the shadow file.
    pub rd_data: SignalId,
}

impl RegisterTaps {
    /// Binds the taps by their device names.
    pub fn from_dut(sim: &Simulator) -> Result<Self, SimError> {
        Ok(Self {
            sclk: sim.signal("spi_clock_in")?,
            wr_en: sim.signal("data_wr_en")?,
            rd_en: sim.signal("data_rd_en")?,
            address: sim.signal("address_out")?,
            wr_byte_count: sim.signal("wr_byte_count")?,
            rd_byte_count: sim.signal("rd_byte_count")?,
            wr_data: sim.signal("wr_data")?,
            rd_data: sim.signal("rd_data")?,
        })
    }
}

/// Process that owns the shadow registers.
#[derive(Debug)]
pub struct RegisterObserver {
    taps: RegisterTaps,
    registers: [u8; REGISTER_COUNT],
    started: bool,
    writes: u64,
    reads: u64,
}

impl RegisterObserver {
    /// An observer with every register cleared.
    pub fn new(taps: RegisterTaps) -> Self {
        Self {
            taps,
            registers: [0; REGISTER_COUNT],
            started: false,
            writes: 0,
            reads: 0,
        }
    }

    /// Current value of register `index` (wrapped to the register space).
    pub fn peek(&self, index: usize) -> u8 {
        self.registers[index % REGISTER_COUNT]
    }

    /// Copy of all registers.
    pub fn snapshot(&self) -> [u8; REGISTER_COUNT] {
        self.registers
    }

    /// Bytes stored so far.
    pub fn writes_observed(&self) -> u64 {
        self.writes
    }

    /// Read-side lookups made while read-enable was high: one when the
    /// address byte lands and one per `rd_byte_count` step after it.
    pub fn reads_observed(&self) -> u64 {
        self.reads
    }

    fn triggers(&self) -> Wait {
        Wait::First(vec![
            Trigger::Falling(self.taps.sclk),
            Trigger::Change(self.taps.rd_en),
            Trigger::Change(self.taps.address),
            Trigger::Change(self.taps.rd_byte_count),
        ])
    }

    fn address(ctx: &ProcessContext<'_>, signal: SignalId) -> u8 {
        (ctx.get(signal) & 0xff) as u8
    }
}

impl Process for RegisterObserver {
    fn name(&self) -> &str {
        "shadow-regfile"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let address = Self::address(ctx, self.taps.address);

        if ctx.fell(self.taps.sclk) && ctx.is_high(self.taps.wr_en) && address < READ_ALIAS {
            let offset = ctx.get(self.taps.wr_byte_count);
            let index = effective_address(address, offset);
            let data = (ctx.get(self.taps.wr_data) & 0xff) as u8;
            self.registers[index] = data;
            self.writes += 1;
            tracing::debug!(
                address = format_args!("0x{index:02x}"),
                data = format_args!("0x{data:02x}"),
                "REG WRITE"
            );
        }

        let read_inputs_changed = ctx.changed(self.taps.rd_en)
            || ctx.changed(self.taps.address)
            || ctx.changed(self.taps.rd_byte_count);
        if read_inputs_changed || !self.started {
            self.started = true;
            let index = effective_address(address, ctx.get(self.taps.rd_byte_count));
            let data = self.registers[index];
            ctx.set(self.taps.rd_data, u64::from(data));
            if ctx.is_high(self.taps.rd_en) && address >= READ_ALIAS {
                self.reads += 1;
                tracing::debug!(
                    address = format_args!("0x{index:02x}"),
                    data = format_args!("0x{data:02x}"),
                    "REG READ"
                );
            }
        }

        Ok(self.triggers())
    }
}

/// Scenario-side handle to a [`RegisterObserver`].
#[derive(Debug, Clone, Copy)]
pub struct ShadowRegisterFile {
    observer: Handle<RegisterObserver>,
}

impl ShadowRegisterFile {
    /// Spawns an observer on `taps`.
    pub fn attach(sim: &mut Simulator, taps: RegisterTaps) -> Self {
        Self {
            observer: sim.spawn(RegisterObserver::new(taps)),
        }
    }

    /// Current value of register `index`.
    pub fn peek(&self, sim: &Simulator, index: usize) -> Result<u8, VerifyError> {
        Ok(sim.get(self.observer)?.peek(index))
    }

    /// Copy of all registers.
    pub fn snapshot(&self, sim: &Simulator) -> Result<[u8; REGISTER_COUNT], VerifyError> {
        Ok(sim.get(self.observer)?.snapshot())
    }

    /// Bytes stored so far.
    pub fn writes_observed(&self, sim: &Simulator) -> Result<u64, VerifyError> {
        Ok(sim.get(self.observer)?.writes_observed())
    }

    /// Read-side lookups made while read-enable was high.
    pub fn reads_observed(&self, sim: &Simulator) -> Result<u64, VerifyError> {
        Ok(sim.get(self.observer)?.reads_observed())
    }

    /// The underlying process handle.
    pub fn handle(&self) -> Handle<RegisterObserver> {
        self.observer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taps(sim: &mut Simulator) -> RegisterTaps {
        let mut add = |name: &str, width: u32| sim.add_signal(name, width).unwrap();
        RegisterTaps {
            sclk: add("spi_clock_in", 1),
            wr_en: add("data_wr_en", 1),
            rd_en: add("data_rd_en", 1),
            address: add("address_out", 8),
            wr_byte_count: add("wr_byte_count", 8),
            rd_byte_count: add("rd_byte_count", 8),
            wr_data: add("wr_data", 8),
            rd_data: add("rd_data", 8),
        }
    }

    fn settle(sim: &mut Simulator) {
        sim.run_for(1_000).unwrap();
    }

    fn write(sim: &mut Simulator, t: &RegisterTaps, address: u8, count: u64, data: u8) {
        sim.drive(t.address, u64::from(address));
        sim.drive(t.wr_byte_count, count);
        sim.drive(t.wr_data, u64::from(data));
        sim.drive(t.wr_en, 1);
        sim.drive(t.sclk, 1);
        settle(sim);
        sim.drive(t.sclk, 0);
        settle(sim);
        sim.drive(t.wr_en, 0);
        settle(sim);
    }

    #[test]
    fn effective_address_wraps() {
        assert_eq!(effective_address(0x10, 2), 0x12);
        assert_eq!(effective_address(0x7f, 1), 0);
        assert_eq!(effective_address(0xfc, 0), 0x7c);
        assert_eq!(effective_address(0xff, 3), 0x02);
    }

    #[test]
    fn taps_bind_by_name() {
        let mut sim = Simulator::new();
        let t = taps(&mut sim);
        assert_eq!(RegisterTaps::from_dut(&sim).unwrap(), t);
        assert!(RegisterTaps::from_dut(&Simulator::new()).is_err());
    }

    #[test]
    fn write_then_alias_read() {
        let mut sim = Simulator::new();
        let t = taps(&mut sim);
        let regs = ShadowRegisterFile::attach(&mut sim, t);
        settle(&mut sim);

        write(&mut sim, &t, 0x10, 2, 0xab);
        assert_eq!(regs.peek(&sim, 0x12).unwrap(), 0xab);
        assert_eq!(regs.writes_observed(&sim).unwrap(), 1);

        sim.drive(t.address, 0x90);
        sim.drive(t.rd_en, 1);
        sim.drive(t.rd_byte_count, 0);
        settle(&mut sim);
        assert_eq!(sim.value(t.rd_data), 0);

        sim.drive(t.rd_byte_count, 2);
        settle(&mut sim);
        assert_eq!(sim.value(t.rd_data), 0xab);
        assert_eq!(regs.reads_observed(&sim).unwrap(), 2);
    }

    #[test]
    fn read_address_writes_are_ignored() {
        let mut sim = Simulator::new();
        let t = taps(&mut sim);
        let regs = ShadowRegisterFile::attach(&mut sim, t);
        settle(&mut sim);
        write(&mut sim, &t, 0x90, 0, 0x55);
        assert_eq!(regs.writes_observed(&sim).unwrap(), 0);
        assert_eq!(regs.snapshot(&sim).unwrap(), [0; REGISTER_COUNT]);
    }

    #[test]
    fn read_data_is_staged_before_read_enable() {
        let mut sim = Simulator::new();
        let t = taps(&mut sim);
        let regs = ShadowRegisterFile::attach(&mut sim, t);
        settle(&mut sim);
        write(&mut sim, &t, 0x05, 0, 0x42);
        sim.drive(t.address, 0x85);
        settle(&mut sim);
        assert_eq!(sim.value(t.rd_data), 0x42);
        assert_eq!(regs.reads_observed(&sim).unwrap(), 0);
    }

    #[test]
    fn rising_edge_does_not_write() {
        let mut sim = Simulator::new();
        let t = taps(&mut sim);
        let regs = ShadowRegisterFile::attach(&mut sim, t);
        settle(&mut sim);
        sim.drive(t.wr_en, 1);
        sim.drive(t.wr_data, 0x99);
        sim.drive(t.sclk, 1);
        settle(&mut sim);
        assert_eq!(regs.writes_observed(&sim).unwrap(), 0);
    }
}
