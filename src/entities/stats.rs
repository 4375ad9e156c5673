#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
}

impl Stats {
    pub fn new(max_health: u32, max_mana: u32) -> Self {
        Self {
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
        }
    }

    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.health);
        self.health = self.health.saturating_sub(applied);
        applied
    }

    pub fn apply_heal(&mut self, amount: u32) -> u32 {
        if self.max_health == 0 {
            return 0;
        }
        let before = self.health;
        let new = before.saturating_add(amount).min(self.max_health);
        self.health = new;
        new.saturating_sub(before)
    }

    pub fn drain_mana(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.mana);
        self.mana = self.mana.saturating_sub(applied);
        applied
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn is_full_health(&self) -> bool {
        self.health >= self.max_health
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(150, 0)
    }
}
