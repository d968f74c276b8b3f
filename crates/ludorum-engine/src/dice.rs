//! Dice randomness behind a trait so tests and scripted demos can
//! inject deterministic sequences.

use std::collections::VecDeque;

/// Produces dice values in `1..=6`.
///
/// The engine never samples randomness directly; `complete_roll` takes a
/// `&mut dyn DiceRoller`, which is the only non-determinism in the whole
/// rule engine.
pub trait DiceRoller: Send {
    /// Returns the next dice value, in `1..=6`.
    fn roll(&mut self) -> u8;
}

/// Uniform dice from the thread RNG. The production roller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDice;

impl DiceRoller for ThreadDice {
    fn roll(&mut self) -> u8 {
        rand::Rng::random_range(&mut rand::rng(), 1..=6)
    }
}

/// Replays a fixed sequence of values, then falls back to ones.
///
/// Used in tests and scripted scenarios where the exact rolls matter.
#[derive(Debug, Clone, Default)]
pub struct SequenceDice {
    values: VecDeque<u8>,
}

impl SequenceDice {
    /// Builds a roller that yields `values` in order. Values are clamped
    /// into `1..=6`.
    pub fn new(values: impl IntoIterator<Item = u8>) -> Self {
        Self {
            values: values.into_iter().map(|v| v.clamp(1, 6)).collect(),
        }
    }

    /// Remaining scripted values.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl DiceRoller for SequenceDice {
    fn roll(&mut self) -> u8 {
        self.values.pop_front().unwrap_or(1)
    }
}
