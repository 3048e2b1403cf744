//! Monster loot drops.
//!
//! The kind of a drop is not random: it is looked up from the global kill
//! count modulo 10 in [`LOOT_TABLE`]. Only whether anything drops at all is
//! rolled, with the configured drop chance. Over any ten consecutive kills the
//! table yields rupees, hearts, bombs and fairies in a 4:3:2:1 ratio.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinds of loot a monster can drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootKind {
    /// Currency.
    Rupee,
    /// Bomb refill.
    Bomb,
    /// Rare full heal.
    Fairy,
    /// Restores one heart.
    Heart,
}

/// Loot kind for each value of `kill_count % 10`.
pub const LOOT_TABLE: [LootKind; 10] = [
    LootKind::Rupee,
    LootKind::Bomb,
    LootKind::Rupee,
    LootKind::Fairy,
    LootKind::Rupee,
    LootKind::Heart,
    LootKind::Heart,
    LootKind::Bomb,
    LootKind::Rupee,
    LootKind::Heart,
];

/// Loot kind for the kill numbered `kill_count` (zero-based).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn loot_for_kill(kill_count: u64) -> LootKind {
    LOOT_TABLE[(kill_count % 10) as usize]
}

/// Decides whether a kill drops loot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootRoller {
    drop_chance: f64,
}

impl LootRoller {
    /// Creates a roller; the chance is clamped to `0.0..=1.0`.
    #[must_use]
    pub fn new(drop_chance: f64) -> Self {
        Self {
            drop_chance: drop_chance.clamp(0.0, 1.0),
        }
    }

    /// Probability of a drop.
    #[must_use]
    pub fn drop_chance(&self) -> f64 {
        self.drop_chance
    }

    /// Rolls for the kill numbered `kill_count`.
    pub fn roll<R: Rng + ?Sized>(&self, kill_count: u64, rng: &mut R) -> Option<LootKind> {
        rng.gen_bool(self.drop_chance)
            .then(|| loot_for_kill(kill_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_table_sequence_with_certain_drop() {
        let roller = LootRoller::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let drops: Vec<LootKind> = (0..10)
            .map(|kill| roller.roll(kill, &mut rng).unwrap())
            .collect();
        assert_eq!(
            drops,
            vec![
                LootKind::Rupee,
                LootKind::Bomb,
                LootKind::Rupee,
                LootKind::Fairy,
                LootKind::Rupee,
                LootKind::Heart,
                LootKind::Heart,
                LootKind::Bomb,
                LootKind::Rupee,
                LootKind::Heart,
            ]
        );
    }

    #[test]
    fn test_table_ratio() {
        let count = |kind| LOOT_TABLE.iter().filter(|k| **k == kind).count();
        assert_eq!(count(LootKind::Rupee), 4);
        assert_eq!(count(LootKind::Heart), 3);
        assert_eq!(count(LootKind::Bomb), 2);
        assert_eq!(count(LootKind::Fairy), 1);
    }

    #[test]
    fn test_table_repeats_every_ten_kills() {
        for kill in 0..10 {
            assert_eq!(loot_for_kill(kill), loot_for_kill(kill + 10));
            assert_eq!(loot_for_kill(kill), loot_for_kill(kill + 1000));
        }
    }

    #[test]
    fn test_zero_chance_never_drops() {
        let roller = LootRoller::new(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!((0..100).all(|kill| roller.roll(kill, &mut rng).is_none()));
    }

    #[test]
    fn test_same_seed_same_drops() {
        let roller = LootRoller::new(0.35);
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let first: Vec<_> = (0..50).map(|k| roller.roll(k, &mut a)).collect();
        let second: Vec<_> = (0..50).map(|k| roller.roll(k, &mut b)).collect();
        assert_eq!(first, second);
    }
}
