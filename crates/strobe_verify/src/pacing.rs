//! Stall-decision generators for throttling handshake interfaces.
//!
//! A [`Pacing`] is an endless iterator of booleans: `true` means "stall this
//! cycle" (idle on a source, backpressure on a sink). Random pacing owns its
//! own seeded generator so that a run is reproducible from one seed.
//!
//! Interfaces hold their pacing in a [`PacingControl`], which defers a
//! replacement until the interface reaches an idle boundary.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// An endless sequence of stall decisions.
#[derive(Debug, Clone)]
pub enum Pacing {
    /// Every decision is a stall.
    AlwaysStall,
    /// No decision is a stall.
    NeverStall,
    /// Unbiased coin flips from a seeded generator.
    Random(StdRng),
    /// A repeating pattern; an empty pattern never stalls.
    Pattern {
        /// One period of the pattern.
        steps: Vec<bool>,
        /// Index of the next decision.
        position: usize,
    },
}

impl Pacing {
    /// Random pacing seeded directly.
    pub fn random(seed: u64) -> Self {
        Pacing::Random(StdRng::seed_from_u64(seed))
    }

    /// Random pacing seeded from a parent generator.
    pub fn random_from(rng: &mut StdRng) -> Self {
        Self::random(rng.gen())
    }

    /// A repeating stall pattern.
    pub fn pattern(steps: Vec<bool>) -> Self {
        Pacing::Pattern { steps, position: 0 }
    }

    /// The decision for the current step.
    pub fn next_stall(&mut self) -> bool {
        match self {
            Pacing::AlwaysStall => true,
            Pacing::NeverStall => false,
            Pacing::Random(rng) => rng.gen(),
            Pacing::Pattern { steps, position } => {
                if steps.is_empty() {
                    return false;
                }
                let stall = steps[*position % steps.len()];
                *position = (*position + 1) % steps.len();
                stall
            }
        }
    }
}

impl Iterator for Pacing {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        Some(self.next_stall())
    }
}

/// The active pacing of an interface plus a pending replacement.
#[derive(Debug, Clone)]
pub struct PacingControl {
    active: Pacing,
    pending: Option<Pacing>,
    swaps: u64,
}

impl PacingControl {
    /// Starts with `initial` active.
    pub fn new(initial: Pacing) -> Self {
        Self {
            active: initial,
            pending: None,
            swaps: 0,
        }
    }

    /// Queues a replacement. A later request overrides an earlier one that
    /// has not been applied yet.
    pub fn request(&mut self, pacing: Pacing) {
        self.pending = Some(pacing);
    }

    /// Installs the pending replacement, if any. Call only at an idle boundary.
    pub fn apply_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(next) => {
                self.active = next;
                self.swaps += 1;
                true
            }
            None => false,
        }
    }

    /// Draws the next decision from the active pacing.
    pub fn next_stall(&mut self) -> bool {
        self.active.next_stall()
    }

    /// Number of replacements applied so far.
    pub fn swaps(&self) -> u64 {
        self.swaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_policies() {
        assert!(Pacing::AlwaysStall.take(100).all(|s| s));
        assert!(Pacing::NeverStall.take(100).all(|s| !s));
    }

    #[test]
    fn random_is_reproducible() {
        let a: Vec<bool> = Pacing::random(7).take(64).collect();
        let b: Vec<bool> = Pacing::random(7).take(64).collect();
        let c: Vec<bool> = Pacing::random(8).take(64).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn random_is_roughly_unbiased() {
        let stalls = Pacing::random(3).take(10_000).filter(|s| *s).count();
        assert!((4_500..5_500).contains(&stalls), "stalls = {stalls}");
    }

    #[test]
    fn pattern_repeats() {
        let got: Vec<bool> = Pacing::pattern(vec![true, false, false]).take(7).collect();
        assert_eq!(got, vec![true, false, false, true, false, false, true]);
        assert!(Pacing::pattern(Vec::new()).take(5).all(|s| !s));
    }

    #[test]
    fn child_seeds_follow_parent() {
        let mut rng = StdRng::seed_from_u64(1);
        let a: Vec<bool> = Pacing::random_from(&mut rng).take(32).collect();
        let sibling: Vec<bool> = Pacing::random_from(&mut rng).take(32).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let b: Vec<bool> = Pacing::random_from(&mut rng).take(32).collect();
        assert_eq!(a, b);
        assert_ne!(a, sibling);
    }

    #[test]
    fn control_swaps_only_when_applied() {
        let mut control = PacingControl::new(Pacing::AlwaysStall);
        control.request(Pacing::NeverStall);
        assert!(control.next_stall());
        assert!(control.apply_pending());
        assert!(!control.next_stall());
        assert!(!control.apply_pending());
        assert_eq!(control.swaps(), 1);
    }

    #[test]
    fn later_request_wins() {
        let mut control = PacingControl::new(Pacing::NeverStall);
        control.request(Pacing::AlwaysStall);
        control.request(Pacing::pattern(vec![false, true]));
        control.apply_pending();
        assert!(!control.next_stall());
        assert!(control.next_stall());
        assert_eq!(control.swaps(), 1);
    }
}
