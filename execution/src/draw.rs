//! Secret number draws.

use numbercontest_types::{PlayerId, MAX_SECRET_NUMBER, MIN_SECRET_NUMBER};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Source of secret numbers for a round.
///
/// Implementations must return a value in
/// `[MIN_SECRET_NUMBER, MAX_SECRET_NUMBER]` and draw independently for every
/// call.
pub trait NumberDraw {
    fn draw(&mut self, round: u64, player: PlayerId) -> u8;
}

/// Uniform draws from a seedable, non-cryptographic PRNG.
#[derive(Clone, Debug)]
pub struct SeededDraw {
    rng: ChaCha20Rng,
}

impl SeededDraw {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, otherwise from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }
}

impl NumberDraw for SeededDraw {
    fn draw(&mut self, _round: u64, _player: PlayerId) -> u8 {
        self.rng.gen_range(MIN_SECRET_NUMBER..=MAX_SECRET_NUMBER)
    }
}
