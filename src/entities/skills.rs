use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillType {
    Fist,
    Club,
    Sword,
    Axe,
    Distance,
    Shielding,
    Magic,
}

impl SkillType {
    pub const COUNT: usize = 7;

    fn index(self) -> usize {
        self as usize
    }

    /// Skills a wielded weapon can train.
    pub fn is_weapon(self) -> bool {
        matches!(
            self,
            SkillType::Fist | SkillType::Club | SkillType::Sword | SkillType::Axe | SkillType::Distance
        )
    }
}

/// Skill levels read by the damage formulas. Fighting skills start at 10,
/// magic level at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSet {
    levels: [u16; SkillType::COUNT],
}

impl Default for SkillSet {
    fn default() -> Self {
        let mut levels = [10; SkillType::COUNT];
        levels[SkillType::Magic.index()] = 0;
        Self { levels }
    }
}

impl SkillSet {
    pub fn get(&self, skill: SkillType) -> u16 {
        self.levels[skill.index()]
    }

    pub fn set(&mut self, skill: SkillType, level: u16) {
        self.levels[skill.index()] = level;
    }

    pub fn with(mut self, skill: SkillType, level: u16) -> Self {
        self.set(skill, level);
        self
    }
}
