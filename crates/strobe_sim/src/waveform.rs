//! Waveform recording for simulation output.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes IEEE 1364 Value Change Dump text that GTKWave or Surfer can open.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::SimError;
use crate::signal::SignalId;

/// Trait for recording simulation waveforms.
pub trait WaveformRecorder {
    /// Registers a signal for recording.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope in the waveform hierarchy.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given time in femtoseconds.
    fn record_change(&mut self, time_fs: u64, id: SignalId, value: u64) -> Result<(), SimError>;

    /// Flushes the output and writes any trailer.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD recorder with a femtosecond timescale.
///
/// Identifier codes are printable ASCII starting at `!`, widening to several
/// characters after the first 94 signals.
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<SignalId, (String, u32)>,
    next_code: u32,
    header_written: bool,
    current_time: Option<u64>,
}

impl VcdRecorder<BufWriter<File>> {
    /// Creates a recorder writing to a new file at `path`.
    pub fn create(path: &Path) -> Result<Self, SimError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a new VCD recorder writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            next_code: 0,
            header_written: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  strobe {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    fn make_id_code(index: u32) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn format_value(value: u64, width: u32) -> String {
        if width == 1 {
            (value & 1).to_string()
        } else {
            format!("b{value:b}")
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = Self::make_id_code(self.next_code);
        self.next_code += 1;
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.codes.insert(id, (code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, time_fs: u64, id: SignalId, value: u64) -> Result<(), SimError> {
        self.ensure_header()?;
        if self.current_time != Some(time_fs) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
            }
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }

        let (code, width) = self
            .codes
            .get(&id)
            .ok_or_else(|| SimError::UnknownSignal(id.to_string()))?;
        let text = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{text}{code}")?;
        } else {
            writeln!(self.writer, "{text} {code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.ensure_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
