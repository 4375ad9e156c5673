use crate::combat::damage::{CombatDamage, DamageComponent, DamageOrigin, DamageType};
use crate::combat::hooks::{DamageFormulaProvider, HookError};
use crate::combat::rng::CombatRng;
use crate::entities::creature::Creature;
use crate::entities::item::WeaponStats;
use crate::entities::skills::SkillType;
use log::warn;
use serde::{Deserialize, Serialize};

/// Unsampled damage bounds. Negative values are allowed and sampled by magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageRange {
    pub min: i32,
    pub max: i32,
    pub secondary: Option<SecondaryRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryRange {
    pub damage_type: DamageType,
    pub min: i32,
    pub max: i32,
}

impl DamageRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self {
            min,
            max,
            secondary: None,
        }
    }
}

/// Caster facts handed to formula providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormulaContext {
    pub level: u16,
    pub magic_level: u16,
    pub weapon: Option<WeaponStats>,
    pub weapon_skill: u16,
    pub damage_type: DamageType,
}

impl FormulaContext {
    pub fn from_caster(caster: &Creature, damage_type: DamageType) -> Self {
        let weapon = caster.inventory.weapon().map(|(_, weapon)| weapon);
        let skill = weapon.map(|weapon| weapon.skill).unwrap_or(SkillType::Fist);
        Self {
            level: caster.level,
            magic_level: caster.skills.get(SkillType::Magic),
            weapon,
            weapon_skill: caster.skills.get(skill),
            damage_type,
        }
    }
}

/// One side of a level and magic level formula:
/// `(level / level_divisor + magic * magic_factor) * multiplier + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelMagicBound {
    #[serde(default = "default_level_divisor")]
    pub level_divisor: f64,
    #[serde(default)]
    pub magic_factor: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub offset: f64,
    /// Results closer to zero than this are raised to it.
    #[serde(default)]
    pub floor: Option<i32>,
}

fn default_level_divisor() -> f64 {
    5.0
}

fn default_multiplier() -> f64 {
    1.0
}

impl LevelMagicBound {
    pub fn evaluate(&self, level: u16, magic_level: u16) -> i32 {
        let level_part = if self.level_divisor == 0.0 {
            0.0
        } else {
            f64::from(level) / self.level_divisor
        };
        let value = (level_part + f64::from(magic_level) * self.magic_factor) * self.multiplier
            + self.offset;
        let value = clamp_to_i32(value);
        match self.floor {
            Some(floor) if value.unsigned_abs() < floor.unsigned_abs() => floor,
            _ => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Formula {
    Flat {
        min: i32,
        max: i32,
    },
    LevelMagic {
        min: LevelMagicBound,
        max: LevelMagicBound,
    },
    /// `min = min_offset`, `max = weapon_max * max_multiplier + max_offset`.
    Skill {
        #[serde(default)]
        min_offset: f64,
        #[serde(default = "default_multiplier")]
        max_multiplier: f64,
        #[serde(default)]
        max_offset: f64,
    },
}

impl Default for Formula {
    fn default() -> Self {
        Formula::Flat { min: 0, max: 0 }
    }
}

/// Highest melee hit for a weapon attack value at `skill`.
pub fn max_weapon_damage(skill: u16, attack: u16) -> i32 {
    // ceil(skill * attack * 0.05 + attack * 0.5) in hundredths
    let hundredths = u64::from(skill) * u64::from(attack) * 5 + u64::from(attack) * 50;
    i32::try_from(hundredths.div_ceil(100)).unwrap_or(i32::MAX)
}

impl Formula {
    /// Bounds before any provider adjustment. Casterless formulas evaluate at
    /// level and magic level zero.
    pub fn base_range(&self, context: Option<&FormulaContext>) -> DamageRange {
        match *self {
            Formula::Flat { min, max } => DamageRange::new(min, max),
            Formula::LevelMagic { min, max } => {
                let (level, magic) = context
                    .map(|ctx| (ctx.level, ctx.magic_level))
                    .unwrap_or((0, 0));
                DamageRange::new(min.evaluate(level, magic), max.evaluate(level, magic))
            }
            Formula::Skill {
                min_offset,
                max_multiplier,
                max_offset,
            } => {
                let weapon = context.and_then(|ctx| ctx.weapon.map(|weapon| (ctx.weapon_skill, weapon)));
                let weapon_max = weapon
                    .map(|(skill, weapon)| max_weapon_damage(skill, weapon.attack))
                    .unwrap_or(0);
                let mut range = DamageRange::new(
                    clamp_to_i32(min_offset),
                    clamp_to_i32(f64::from(weapon_max) * max_multiplier + max_offset),
                );
                if let Some((skill, WeaponStats {
                    element: Some((damage_type, attack)),
                    ..
                })) = weapon
                {
                    range.secondary = Some(SecondaryRange {
                        damage_type,
                        min: 0,
                        max: max_weapon_damage(skill, attack),
                    });
                }
                range
            }
        }
    }

    /// Full range for `caster`: base bounds, then the provider. A failing
    /// provider leaves the base bounds in place. Skill formulas spend a
    /// weapon charge when `use_charges` is set.
    pub fn evaluate(
        &self,
        caster: Option<&mut Creature>,
        damage_type: DamageType,
        provider: Option<&dyn DamageFormulaProvider>,
        use_charges: bool,
    ) -> DamageRange {
        let Some(caster) = caster else {
            return self.base_range(None);
        };
        let context = FormulaContext::from_caster(caster, damage_type);
        let base = self.base_range(Some(&context));
        let range = match provider {
            Some(provider) => match provider.adjust(caster, &context, base) {
                Ok(range) => range,
                Err(err) => {
                    warn!("damage formula for {} failed: {}", caster.name, err);
                    base
                }
            },
            None => base,
        };
        if use_charges && matches!(self, Formula::Skill { .. }) {
            if let Some((slot, _)) = caster.inventory.weapon() {
                caster.inventory.consume_charge(slot);
            }
        }
        range
    }
}

/// Draws one damage value from `range`; always non-negative.
pub fn sample(range: &DamageRange, primary_type: DamageType, origin: DamageOrigin, rng: &mut CombatRng) -> CombatDamage {
    let value = rng.roll_range_i32(range.min, range.max).unsigned_abs();
    let mut damage = CombatDamage::new(primary_type, value, origin);
    damage.primary.min = range.min;
    damage.primary.max = range.max;
    damage.secondary = range.secondary.map(|secondary| DamageComponent {
        damage_type: secondary.damage_type,
        value: rng.roll_range_i32(secondary.min, secondary.max).unsigned_abs(),
        min: secondary.min,
        max: secondary.max,
    });
    damage
}

fn clamp_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Scales the range by the caster's spent mana and charges that mana.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaScaledFormula {
    pub mana_cost: u32,
    /// Extra percent per 100 mana spent.
    pub bonus_per_hundred: u32,
}

impl DamageFormulaProvider for ManaScaledFormula {
    fn adjust(
        &self,
        caster: &mut Creature,
        _context: &FormulaContext,
        range: DamageRange,
    ) -> Result<DamageRange, HookError> {
        if caster.stats.mana < self.mana_cost {
            return Err(HookError::InsufficientResource {
                resource: "mana",
                needed: self.mana_cost,
                available: caster.stats.mana,
            });
        }
        caster.stats.drain_mana(self.mana_cost);
        let percent = 100 + i64::from(self.mana_cost / 100) * i64::from(self.bonus_per_hundred);
        let scale = |value: i32| clamp_to_i32((i64::from(value) * percent / 100) as f64);
        Ok(DamageRange {
            min: scale(range.min),
            max: scale(range.max),
            secondary: range.secondary,
        })
    }
}
