//! Ordered comparison of sent and received items.

use std::fmt;

use serde::Serialize;

use crate::error::VerifyError;

/// Totals from a passing comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    /// Items compared.
    pub compared: usize,
}

/// Records what went into a DUT and what came out, then compares the two
/// sequences item for item.
#[derive(Debug, Clone)]
pub struct Scoreboard<T> {
    sent: Vec<T>,
    received: Vec<T>,
}

impl<T> Default for Scoreboard<T> {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            received: Vec::new(),
        }
    }
}

impl<T: PartialEq + fmt::Debug> Scoreboard<T> {
    /// An empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an item handed to the DUT.
    pub fn record_sent(&mut self, item: T) {
        self.sent.push(item);
    }

    /// Records an item that came out of the DUT.
    pub fn record_received(&mut self, item: T) {
        self.received.push(item);
    }

    /// Items sent so far.
    pub fn sent(&self) -> &[T] {
        &self.sent
    }

    /// Items received so far.
    pub fn received(&self) -> &[T] {
        &self.received
    }

    /// Checks that both sequences are equal, reporting the first index at
    /// which they diverge.
    pub fn compare(&self) -> Result<ScoreSummary, VerifyError> {
        if let Some(index) = self
            .sent
            .iter()
            .zip(&self.received)
            .position(|(sent, received)| sent != received)
        {
            return Err(VerifyError::FrameMismatch {
                index,
                expected: format!("{:?}", self.sent[index]),
                actual: format!("{:?}", self.received[index]),
            });
        }
        if self.sent.len() != self.received.len() {
            return Err(VerifyError::FrameCountMismatch {
                sent: self.sent.len(),
                received: self.received.len(),
            });
        }
        Ok(ScoreSummary {
            compared: self.sent.len(),
        })
    }
}

/// Fails with [`VerifyError::NotDrained`] naming the first component that
/// still holds data.
pub fn ensure_drained<'a>(
    components: impl IntoIterator<Item = (&'a str, bool)>,
) -> Result<(), VerifyError> {
    match components.into_iter().find(|(_, empty)| !empty) {
        Some((component, _)) => Err(VerifyError::NotDrained {
            component: component.to_string(),
        }),
        None => Ok(()),
    }
}

/// Compares bytes read back from `address` with the bytes expected there.
pub fn check_read_back(address: u8, expected: &[u8], actual: &[u8]) -> Result<(), VerifyError> {
    let len = expected.len().max(actual.len());
    match (0..len).find(|&i| expected.get(i) != actual.get(i)) {
        Some(index) => Err(VerifyError::ReadBackMismatch {
            address,
            index,
            expected: expected.get(index).copied(),
            actual: actual.get(index).copied(),
        }),
        None => Ok(()),
    }
}

/// Fails with [`VerifyError::UnexpectedWrite`] at the first register that
/// differs between two snapshots.
pub fn check_unchanged(before: &[u8], after: &[u8]) -> Result<(), VerifyError> {
    match before.iter().zip(after).position(|(b, a)| b != a) {
        Some(index) => Err(VerifyError::UnexpectedWrite {
            index,
            before: before[index],
            after: after[index],
        }),
        None => Ok(()),
    }
}
