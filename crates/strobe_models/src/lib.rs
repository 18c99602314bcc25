//! Behavioural stand-ins for the devices the harness verifies.
//!
//! Each model declares its ports on a [`strobe_sim::Simulator`] under the
//! device's own signal names, so verification components bind to a model
//! exactly as they would bind to the real design.

#![warn(missing_docs)]

pub mod fifo;
pub mod spi;

pub use fifo::{AxisFifo, AxisFifoPorts, FifoClocking};
pub use spi::{SpiPeripheral, SpiPeripheralPorts};
