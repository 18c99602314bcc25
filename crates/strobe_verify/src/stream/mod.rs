//! Ready/valid stream source and sink.
//!
//! A [`StreamSource`] drives queued [`Frame`]s onto a [`StreamBus`] and a
//! [`StreamSink`] collects them on the far side. Both sides sample on the
//! rising edge of their own clock, hold their outputs in reset, and take a
//! [`Pacing`](crate::pacing::Pacing) that can be replaced while running.

mod bus;
mod frame;
mod sink;
mod source;

pub use bus::StreamBus;
pub use frame::Frame;
pub use sink::{StreamMonitor, StreamSink};
pub use source::{StreamDriver, StreamSource};
