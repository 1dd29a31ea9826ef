//! Deterministic helpers for tests.

use std::collections::BTreeMap;

use numbercontest_types::PlayerId;

use crate::draw::NumberDraw;

/// Number source that deals preset numbers and records every draw.
#[derive(Clone, Debug)]
pub struct FixedDraw {
    numbers: BTreeMap<PlayerId, u8>,
    fallback: u8,
    draws: Vec<(u64, PlayerId)>,
}

impl FixedDraw {
    /// Deal `fallback` to any player without a preset number.
    pub fn new(fallback: u8) -> Self {
        Self {
            numbers: BTreeMap::new(),
            fallback,
            draws: Vec::new(),
        }
    }

    /// Preset numbers from `(player, number)` pairs.
    pub fn dealing(numbers: impl IntoIterator<Item = (u32, u8)>) -> Self {
        let mut draw = Self::new(50);
        for (player, number) in numbers {
            draw.set(PlayerId(player), number);
        }
        draw
    }

    pub fn set(&mut self, player: PlayerId, number: u8) {
        self.numbers.insert(player, number);
    }

    /// Every `(round, player)` drawn so far.
    pub fn draws(&self) -> &[(u64, PlayerId)] {
        &self.draws
    }
}

impl NumberDraw for FixedDraw {
    fn draw(&mut self, round: u64, player: PlayerId) -> u8 {
        self.draws.push((round, player));
        self.numbers.get(&player).copied().unwrap_or(self.fallback)
    }
}
