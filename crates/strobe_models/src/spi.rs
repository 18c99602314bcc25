//! SPI mode-0 register bridge.
//!
//! The first byte of every select window is an address. Below 128 the
//! following bytes are write strobes on `data_wr_en` with a running
//! `wr_byte_count`; at 128 and above `data_rd_en` rises and `rd_data` is
//! shifted back out on MISO, one byte per `rd_byte_count` step. The model
//! keeps no registers: whatever drives `rd_data` is the storage.

use strobe_sim::{Handle, Process, ProcessContext, SignalId, SimError, Simulator, Trigger, Wait};

const READ_ALIAS: u8 = 0x80;

/// Serial pins and internal observation taps of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiPeripheralPorts {
    /// `spi_clock_in`.
    pub sclk: SignalId,
    /// `spi_data_in`, master to device.
    pub mosi: SignalId,
    /// `spi_data_out`, device to master.
    pub miso: SignalId,
    /// `spi_select_in`, active low.
    pub cs: SignalId,
    /// `reset_n_in`, active low.
    pub reset_n: SignalId,
    /// `data_wr_en`.
    pub wr_en: SignalId,
    /// `data_rd_en`.
    pub rd_en: SignalId,
    /// `address_out`.
    pub address: SignalId,
    /// `wr_byte_count`.
    pub wr_byte_count: SignalId,
    /// `rd_byte_count`.
    pub rd_byte_count: SignalId,
    /// `wr_data`.
    pub wr_data: SignalId,
    /// `rd_data`, an input to the bridge.
    pub rd_data: SignalId,
}

impl SpiPeripheralPorts {
    /// Declares every pin and tap. Select and reset start deasserted.
    pub fn declare(sim: &mut Simulator) -> Result<Self, SimError> {
        Ok(Self {
            sclk: sim.add_signal("spi_clock_in", 1)?,
            mosi: sim.add_signal("spi_data_in", 1)?,
            miso: sim.add_signal("spi_data_out", 1)?,
            cs: sim.add_signal_with_init("spi_select_in", 1, 1)?,
            reset_n: sim.add_signal_with_init("reset_n_in", 1, 1)?,
            wr_en: sim.add_signal("data_wr_en", 1)?,
            rd_en: sim.add_signal("data_rd_en", 1)?,
            address: sim.add_signal("address_out", 8)?,
            wr_byte_count: sim.add_signal("wr_byte_count", 8)?,
            rd_byte_count: sim.add_signal("rd_byte_count", 8)?,
            wr_data: sim.add_signal("wr_data", 8)?,
            rd_data: sim.add_signal("rd_data", 8)?,
        })
    }
}

/// Bridge model process.
#[derive(Debug)]
pub struct SpiPeripheral {
    ports: SpiPeripheralPorts,
    bits: u32,
    bytes: u64,
    shift_in: u8,
    shift_out: u8,
    address: u8,
    rd_count: u64,
    frames: u64,
}

impl SpiPeripheral {
    /// A bridge on `ports`.
    pub fn new(ports: SpiPeripheralPorts) -> Self {
        Self {
            ports,
            bits: 0,
            bytes: 0,
            shift_in: 0,
            shift_out: 0,
            address: 0,
            rd_count: 0,
            frames: 0,
        }
    }

    /// Declares ports and spawns the bridge.
    pub fn build(
        sim: &mut Simulator,
    ) -> Result<(SpiPeripheralPorts, Handle<SpiPeripheral>), SimError> {
        let ports = SpiPeripheralPorts::declare(sim)?;
        let handle = sim.spawn(Self::new(ports));
        Ok((ports, handle))
    }

    /// Select windows that completed at least one byte.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Address byte of the current or most recent frame.
    pub fn address(&self) -> u8 {
        self.address
    }

    fn reading(&self) -> bool {
        self.bytes >= 1 && self.address >= READ_ALIAS
    }

    fn clear_frame(&mut self, ctx: &mut ProcessContext<'_>) {
        if self.bytes > 0 {
            self.frames += 1;
        }
        self.bits = 0;
        self.bytes = 0;
        self.shift_in = 0;
        self.shift_out = 0;
        self.rd_count = 0;
        let p = self.ports;
        ctx.set_bit(p.wr_en, false);
        ctx.set_bit(p.rd_en, false);
        ctx.set(p.wr_byte_count, 0);
        ctx.set(p.rd_byte_count, 0);
    }

    fn reset(&mut self, ctx: &mut ProcessContext<'_>) {
        self.clear_frame(ctx);
        self.address = 0;
        let p = self.ports;
        ctx.set(p.address, 0);
        ctx.set(p.wr_data, 0);
        ctx.set_bit(p.miso, false);
    }

    fn drive_out_bit(&self, ctx: &mut ProcessContext<'_>) {
        let bit = (self.shift_out >> (7 - self.bits)) & 1;
        ctx.set_bit(self.ports.miso, bit == 1);
    }

    fn shift_in_bit(&mut self, ctx: &mut ProcessContext<'_>) {
        let p = self.ports;
        self.shift_in = (self.shift_in << 1) | u8::from(ctx.is_high(p.mosi));
        self.bits += 1;
        if self.bits < 8 {
            return;
        }
        let byte = self.shift_in;
        self.bits = 0;
        self.shift_in = 0;
        self.bytes += 1;

        if self.bytes == 1 {
            self.address = byte;
            ctx.set(p.address, u64::from(byte));
            if byte >= READ_ALIAS {
                self.rd_count = 0;
                ctx.set(p.rd_byte_count, 0);
                ctx.set_bit(p.rd_en, true);
            }
        } else if self.address < READ_ALIAS {
            ctx.set(p.wr_data, u64::from(byte));
            ctx.set(p.wr_byte_count, self.bytes - 2);
            ctx.set_bit(p.wr_en, true);
        } else {
            self.rd_count += 1;
            ctx.set(p.rd_byte_count, self.rd_count);
        }
    }

    fn shift_out_bit(&mut self, ctx: &mut ProcessContext<'_>) {
        ctx.set_bit(self.ports.wr_en, false);
        if self.bits == 0 {
            self.shift_out = if self.reading() {
                (ctx.get(self.ports.rd_data) & 0xff) as u8
            } else {
                0
            };
        }
        self.drive_out_bit(ctx);
    }
}

impl Process for SpiPeripheral {
    fn name(&self) -> &str {
        "spi-peripheral"
    }

    fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
        let p = self.ports;
        let wait = Wait::First(vec![
            Trigger::Change(p.sclk),
            Trigger::Change(p.cs),
            Trigger::Change(p.reset_n),
        ]);

        if !ctx.is_high(p.reset_n) {
            if ctx.changed(p.reset_n) {
                self.reset(ctx);
            }
            return Ok(wait);
        }

        if ctx.rose(p.cs) {
            self.clear_frame(ctx);
        }
        if ctx.fell(p.cs) {
            self.clear_frame(ctx);
            self.drive_out_bit(ctx);
        }
        if ctx.is_high(p.cs) {
            return Ok(wait);
        }

        if ctx.rose(p.sclk) {
            self.shift_in_bit(ctx);
        } else if ctx.fell(p.sclk) {
            self.shift_out_bit(ctx);
        }
        Ok(wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_verify::{SpiBus, SpiConfig, SpiTransactor};

    fn bench() -> (Simulator, SpiPeripheralPorts, Handle<SpiPeripheral>, SpiTransactor) {
        let mut sim = Simulator::new();
        let (ports, dut) = SpiPeripheral::build(&mut sim).unwrap();
        let bus = SpiBus::from_dut(&sim).unwrap();
        let spi = SpiTransactor::attach(&mut sim, bus, SpiConfig::default());
        sim.run_for(1_000_000).unwrap();
        (sim, ports, dut, spi)
    }

    /// Records every write strobe seen on a falling clock edge.
    struct StrobeLog {
        ports: SpiPeripheralPorts,
        writes: Vec<(u64, u64, u64)>,
    }

    impl Process for StrobeLog {
        fn name(&self) -> &str {
            "strobe-log"
        }

        fn resume(&mut self, ctx: &mut ProcessContext<'_>) -> Result<Wait, SimError> {
            let p = self.ports;
            if ctx.fell(p.sclk) && ctx.is_high(p.wr_en) {
                self.writes.push((
                    ctx.get(p.address),
                    ctx.get(p.wr_byte_count),
                    ctx.get(p.wr_data),
                ));
            }
            Ok(Wait::Until(Trigger::Falling(p.sclk)))
        }
    }

    #[test]
    fn write_burst_strobes_each_data_byte() {
        let (mut sim, ports, dut, spi) = bench();
        let log = sim.spawn(StrobeLog {
            ports,
            writes: Vec::new(),
        });
        spi.write(&mut sim, 0x3c, &[0xa5, 0xff]).unwrap();
        assert_eq!(
            sim.get(log).unwrap().writes,
            vec![(0x3c, 0, 0xa5), (0x3c, 1, 0xff)]
        );
        assert_eq!(sim.value(ports.wr_en), 0);
        assert_eq!(sim.get(dut).unwrap().frames(), 1);
    }

    #[test]
    fn read_streams_rd_data_back() {
        let (mut sim, ports, _, spi) = bench();
        sim.drive(ports.rd_data, 0x5a);
        let data = spi.read(&mut sim, 0x81, 2).unwrap();
        assert_eq!(data, vec![0x5a, 0x5a]);
        assert_eq!(sim.value(ports.address), 0x81);
        // Select release clears the strobes but keeps the address.
        assert_eq!(sim.value(ports.rd_en), 0);
        assert_eq!(sim.value(ports.rd_byte_count), 0);
    }

    #[test]
    fn command_sets_address_only() {
        let (mut sim, ports, dut, spi) = bench();
        spi.command(&mut sim, 0x14).unwrap();
        assert_eq!(sim.value(ports.address), 0x14);
        assert_eq!(sim.value(ports.wr_en), 0);
        assert_eq!(sim.get(dut).unwrap().address(), 0x14);
    }

    #[test]
    fn reset_clears_address() {
        let (mut sim, ports, dut, spi) = bench();
        spi.command(&mut sim, 0x20).unwrap();
        sim.drive(ports.reset_n, 0);
        sim.run_for(1_000).unwrap();
        assert_eq!(sim.value(ports.address), 0);
        assert_eq!(sim.get(dut).unwrap().address(), 0);
    }
}
