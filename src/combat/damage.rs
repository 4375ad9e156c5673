use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Physical,
    Energy,
    Earth,
    Fire,
    LifeDrain,
    ManaDrain,
    Healing,
    Drown,
    Ice,
    Holy,
    Death,
    Undefined,
}

impl DamageType {
    pub const COUNT: usize = 11;

    pub const ALL: [DamageType; DamageType::COUNT] = [
        DamageType::Physical,
        DamageType::Energy,
        DamageType::Earth,
        DamageType::Fire,
        DamageType::LifeDrain,
        DamageType::ManaDrain,
        DamageType::Healing,
        DamageType::Drown,
        DamageType::Ice,
        DamageType::Holy,
        DamageType::Death,
    ];

    pub fn from_mask(mask: u16) -> Self {
        match mask {
            1 => Self::Physical,
            2 => Self::Energy,
            4 => Self::Earth,
            8 => Self::Fire,
            16 => Self::LifeDrain,
            32 => Self::ManaDrain,
            64 => Self::Healing,
            128 => Self::Drown,
            256 => Self::Ice,
            512 => Self::Holy,
            1024 => Self::Death,
            _ => Self::Undefined,
        }
    }

    pub fn mask(self) -> u16 {
        match self {
            Self::Physical => 1,
            Self::Energy => 2,
            Self::Earth => 4,
            Self::Fire => 8,
            Self::LifeDrain => 16,
            Self::ManaDrain => 32,
            Self::Healing => 64,
            Self::Drown => 128,
            Self::Ice => 256,
            Self::Holy => 512,
            Self::Death => 1024,
            Self::Undefined => 0,
        }
    }

    pub fn index(self) -> Option<usize> {
        match self {
            Self::Physical => Some(0),
            Self::Energy => Some(1),
            Self::Earth => Some(2),
            Self::Fire => Some(3),
            Self::LifeDrain => Some(4),
            Self::ManaDrain => Some(5),
            Self::Healing => Some(6),
            Self::Drown => Some(7),
            Self::Ice => Some(8),
            Self::Holy => Some(9),
            Self::Death => Some(10),
            Self::Undefined => None,
        }
    }

    /// Name used as the death cause when no creature claims the kill.
    pub fn cause_name(self) -> &'static str {
        match self {
            Self::Physical => "physical damage",
            Self::Energy => "an electrical discharge",
            Self::Earth => "poison",
            Self::Fire => "a burning field",
            Self::LifeDrain => "life drain",
            Self::ManaDrain => "mana drain",
            Self::Healing => "healing",
            Self::Drown => "drowning",
            Self::Ice => "freezing",
            Self::Holy => "holy energy",
            Self::Death => "death energy",
            Self::Undefined => "unknown causes",
        }
    }

    /// Types that the vocation magic-defense multiplier applies to.
    pub fn is_magical(self) -> bool {
        !matches!(self, Self::Physical | Self::Undefined | Self::Drown)
    }
}

/// How the damage reached the target; field damage also counts field absorption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DamageOrigin {
    #[default]
    Spell,
    Melee,
    Ranged,
    Field,
    Condition,
    Reflect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageComponent {
    pub damage_type: DamageType,
    pub value: u32,
    pub min: i32,
    pub max: i32,
}

impl DamageComponent {
    pub fn new(damage_type: DamageType, value: u32) -> Self {
        let bound = i32::try_from(value).unwrap_or(i32::MAX);
        Self {
            damage_type,
            value,
            min: bound,
            max: bound,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatDamage {
    pub primary: DamageComponent,
    pub secondary: Option<DamageComponent>,
    pub origin: DamageOrigin,
}

impl CombatDamage {
    pub fn new(damage_type: DamageType, value: u32, origin: DamageOrigin) -> Self {
        Self {
            primary: DamageComponent::new(damage_type, value),
            secondary: None,
            origin,
        }
    }

    pub fn is_healing(&self) -> bool {
        self.primary.damage_type == DamageType::Healing
    }

    pub fn total(&self) -> u32 {
        self.primary
            .value
            .saturating_add(self.secondary.map(|component| component.value).unwrap_or(0))
    }

    /// Integer halving used for player-versus-player reduction.
    pub fn halve(&mut self) {
        self.primary.value /= 2;
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.value /= 2;
        }
    }
}
