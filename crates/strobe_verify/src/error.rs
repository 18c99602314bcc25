//! Verification error types.

use strobe_sim::SimError;

/// A failed check or a failure of the simulation underneath it.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Sent and received sequences first differ at `index`.
    #[error("frame mismatch at index {index}: expected {expected}, got {actual}")]
    FrameMismatch {
        /// Position of the first diverging frame.
        index: usize,
        /// The sent frame.
        expected: String,
        /// The received frame.
        actual: String,
    },

    /// Every received frame matched, but the counts differ.
    #[error("frame count mismatch: sent {sent}, received {received}")]
    FrameCountMismatch {
        /// Frames sent.
        sent: usize,
        /// Frames received.
        received: usize,
    },

    /// A register read returned something other than what was written.
    #[error(
        "read-back mismatch at address 0x{address:02x}, byte {index}: expected {}, got {}",
        show_byte(.expected),
        show_byte(.actual)
    )]
    ReadBackMismatch {
        /// Read-side address of the burst.
        address: u8,
        /// Byte offset within the burst.
        index: usize,
        /// Expected byte, or `None` if more bytes came back than expected.
        expected: Option<u8>,
        /// Received byte, or `None` if the read came back short.
        actual: Option<u8>,
    },

    /// A register changed although no write was issued.
    #[error("register 0x{index:02x} changed from 0x{before:02x} to 0x{after:02x} without a write")]
    UnexpectedWrite {
        /// Register index.
        index: usize,
        /// Value before the operation.
        before: u8,
        /// Value after the operation.
        after: u8,
    },

    /// A component still holds frames at the end of a test.
    #[error("{component} is not drained")]
    NotDrained {
        /// The component holding data.
        component: String,
    },

    /// A frame with no words was submitted.
    #[error("empty frame submitted to {interface}")]
    EmptyFrame {
        /// The interface that rejected it.
        interface: String,
    },

    /// A word does not fit the data bus.
    #[error("word 0x{word:x} does not fit the {width}-bit data bus of {interface}")]
    WordTooWide {
        /// The interface that rejected it.
        interface: String,
        /// The offending word.
        word: u64,
        /// Width of the data bus.
        width: u32,
    },

    /// The simulation failed: timeout, stall, protocol violation or kernel error.
    #[error(transparent)]
    Sim(#[from] SimError),
}

fn show_byte(byte: &Option<u8>) -> String {
    match byte {
        Some(b) => format!("0x{b:02x}"),
        None => "nothing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_sim::SimTime;

    #[test]
    fn frame_mismatch_display() {
        let e = VerifyError::FrameMismatch {
            index: 7,
            expected: "[7]".into(),
            actual: "[8]".into(),
        };
        assert_eq!(
            e.to_string(),
            "frame mismatch at index 7: expected [7], got [8]"
        );
    }

    #[test]
    fn read_back_display() {
        let e = VerifyError::ReadBackMismatch {
            address: 0xfc,
            index: 0,
            expected: Some(0x8e),
            actual: Some(0x00),
        };
        assert_eq!(
            e.to_string(),
            "read-back mismatch at address 0xfc, byte 0: expected 0x8e, got 0x00"
        );
        let short = VerifyError::ReadBackMismatch {
            address: 0xbc,
            index: 1,
            expected: Some(0xff),
            actual: None,
        };
        assert!(short.to_string().ends_with("got nothing"));
    }

    #[test]
    fn sim_errors_pass_through() {
        let e: VerifyError = SimError::Timeout {
            awaiting: "frame on m_axis".into(),
            waited: SimTime::from_us(200),
        }
        .into();
        assert_eq!(
            e.to_string(),
            "timed out after 200 us waiting for frame on m_axis"
        );
    }

    #[test]
    fn word_too_wide_display() {
        let e = VerifyError::WordTooWide {
            interface: "s_axis".into(),
            word: 0x1ff,
            width: 8,
        };
        assert_eq!(
            e.to_string(),
            "word 0x1ff does not fit the 8-bit data bus of s_axis"
        );
    }
}
