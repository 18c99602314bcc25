use serde::Serialize;
use std::fmt;

/// An ordered sequence of data words.
///
/// Two frames are equal when their words are equal. On a bus without a
/// last-word marker every frame carries exactly one word.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Frame {
    words: Vec<u64>,
}

impl Frame {
    /// A frame holding `words`.
    pub fn new(words: Vec<u64>) -> Self {
        Self { words }
    }

    /// A one-word frame.
    pub fn single(word: u64) -> Self {
        Self { words: vec![word] }
    }

    /// The payload.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True if the frame has no words.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl From<Vec<u64>> for Frame {
    fn from(words: Vec<u64>) -> Self {
        Self::new(words)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Frame[")?;
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{word:#x}")?;
        }
        f.write_str("]")
    }
}
