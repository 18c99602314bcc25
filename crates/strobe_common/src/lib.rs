//! Shared foundational types used across the strobe verification harness.
//!
//! This crate provides clock frequencies with unit parsing, human-readable
//! durations, and the femtosecond unit constants every other crate counts in.

#![warn(missing_docs)]

pub mod duration;
pub mod frequency;

pub use duration::{
    format_duration, parse_duration, ParseDurationError, FS_PER_MS, FS_PER_NS, FS_PER_PS,
    FS_PER_S, FS_PER_US,
};
pub use frequency::{Frequency, ParseFrequencyError};
