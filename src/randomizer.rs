//! Piece randomizer
//!
//! Every draw picks one of the 7 tetrominoes uniformly, with replacement.
//! There is no bag, so droughts and repeats are possible.

use crate::tetromino::TetrominoType;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform piece randomizer
#[derive(Debug, Clone)]
pub struct Randomizer {
    rng: ChaCha8Rng,
}

impl Default for Randomizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Randomizer {
    /// Create a randomizer seeded from the OS
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Create a deterministic randomizer
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draw the next piece type
    pub fn next(&mut self) -> TetrominoType {
        let all = TetrominoType::all();
        all[self.rng.gen_range(0..all.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Randomizer::with_seed(42);
        let mut b = Randomizer::with_seed(42);
        for _ in 0..50 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn test_all_kinds_eventually_drawn() {
        let mut randomizer = Randomizer::with_seed(7);
        let mut seen = [false; 7];
        for _ in 0..1000 {
            seen[randomizer.next().index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_draws_with_replacement() {
        // Seven draws in a row are not forced to be a permutation
        let mut randomizer = Randomizer::with_seed(1);
        let repeated = (0..200).any(|_| {
            let mut counts = [0u8; 7];
            for _ in 0..7 {
                counts[randomizer.next().index()] += 1;
            }
            counts.iter().any(|&c| c > 1)
        });
        assert!(repeated);
    }
}
