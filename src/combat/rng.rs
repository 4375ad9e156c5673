use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random source for every roll the combat engine makes.
#[derive(Debug, Clone)]
pub struct CombatRng {
    inner: StdRng,
}

impl CombatRng {
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Inclusive roll; swapped bounds are tolerated.
    pub fn roll_range(&mut self, min: u32, max: u32) -> u32 {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.inner.gen_range(min..=max)
    }

    pub fn roll_range_i32(&mut self, min: i32, max: i32) -> i32 {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.inner.gen_range(min..=max)
    }

    pub fn roll_percent(&mut self, chance: u32) -> bool {
        if chance >= 100 {
            return true;
        }
        if chance == 0 {
            return false;
        }
        self.inner.gen_range(0..100) < chance
    }
}

impl Default for CombatRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
