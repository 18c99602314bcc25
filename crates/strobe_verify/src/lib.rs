//! Verification components for the strobe harness.
//!
//! Everything here runs as [`strobe_sim`] processes next to the device
//! models and is driven from scenario code through small `Copy` handles:
//!
//! - [`reset`]: clocked and clockless reset sequencing across domains;
//! - [`pacing`]: stall generators for idle and backpressure cycles;
//! - [`stream`]: ready/valid source and sink with handshake checking;
//! - [`scoreboard`]: ordered sent/received comparison and drain checks;
//! - [`spi`]: SPI master transactor with the register read/write protocol;
//! - [`regfile`]: shadow register file used as the read-back oracle.

#![warn(missing_docs)]

pub mod error;
pub mod pacing;
pub mod regfile;
pub mod reset;
pub mod scoreboard;
pub mod spi;
pub mod stream;

pub use error::VerifyError;
pub use pacing::{Pacing, PacingControl};
pub use regfile::{
    effective_address, RegisterObserver, RegisterTaps, ShadowRegisterFile, READ_ALIAS,
    REGISTER_COUNT,
};
pub use reset::{run_resets, wait_resets, Hold, ResetController, ResetSequence};
pub use scoreboard::{
    check_read_back, check_unchanged, ensure_drained, ScoreSummary, Scoreboard,
};
pub use spi::{SpiBus, SpiConfig, SpiMaster, SpiTransactor, WORD_BITS};
pub use stream::{Frame, StreamBus, StreamDriver, StreamMonitor, StreamSink, StreamSource};
