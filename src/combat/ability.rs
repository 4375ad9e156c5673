//! Ability catalogue: YAML definitions built into ready-to-resolve abilities.
//!
//! Area shapes are validated while the catalogue loads, so a broken entry
//! fails the load instead of the first cast.

use crate::combat::conditions::{ConditionKind, ConditionTemplate};
use crate::combat::damage::DamageType;
use crate::combat::dispatch::CombatContext;
use crate::combat::formula::{Formula, ManaScaledFormula};
use crate::combat::params::{CombatParams, FieldItem};
use crate::entities::creature::CreatureId;
use crate::world::area::{AreaError, AreaShape, DirectionalAreaSet};
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AbilityError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse ability catalogue: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("ability {name} has an invalid area: {source}")]
    Area { name: String, source: AreaError },
    #[error("ability {0} is defined twice")]
    Duplicate(String),
}

/// Authored footprint, pointing north.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AreaDefinition {
    Rows {
        rows: Vec<Vec<u8>>,
        /// Northwest variant used for diagonal casts.
        #[serde(default)]
        diagonal: Option<Vec<Vec<u8>>>,
    },
    Circle {
        radius: u8,
    },
    Square {
        radius: u8,
    },
    Beam {
        length: u8,
    },
    Wave {
        length: u8,
        spread: u8,
    },
}

impl AreaDefinition {
    pub fn build(&self) -> Result<DirectionalAreaSet, AreaError> {
        let set = match self {
            AreaDefinition::Rows { rows, diagonal } => {
                let set = DirectionalAreaSet::new(AreaShape::from_rows(rows)?);
                match diagonal {
                    Some(diagonal) => set.with_extended(AreaShape::from_rows(diagonal)?),
                    None => set,
                }
            }
            AreaDefinition::Circle { radius } => DirectionalAreaSet::new(AreaShape::circle(*radius)),
            AreaDefinition::Square { radius } => DirectionalAreaSet::new(AreaShape::square(*radius)),
            AreaDefinition::Beam { length } => DirectionalAreaSet::new(AreaShape::beam(*length)),
            AreaDefinition::Wave { length, spread } => {
                DirectionalAreaSet::new(AreaShape::wave(*length, *spread))
            }
        };
        Ok(set)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDefinition {
    pub impact: Option<u8>,
    pub hit: Option<u8>,
    pub distance: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagDefinition {
    /// Defaults to `true` for everything but healing.
    pub aggressive: Option<bool>,
    pub blocked_by_armor: bool,
    pub blocked_by_shield: bool,
    pub target_caster_or_top_most: bool,
    pub target_players_or_summons: bool,
    pub different_area_damage: bool,
    pub use_charges: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    pub damage_type: DamageType,
    #[serde(default)]
    pub formula: Formula,
    #[serde(default)]
    pub mana_scaling: Option<ManaScaledFormula>,
    #[serde(default)]
    pub area: Option<AreaDefinition>,
    #[serde(default)]
    pub conditions: Vec<ConditionTemplate>,
    #[serde(default)]
    pub dispel: Option<ConditionKind>,
    #[serde(default)]
    pub field: Option<FieldItem>,
    #[serde(default)]
    pub effects: EffectDefinition,
    #[serde(default)]
    pub flags: FlagDefinition,
}

#[derive(Debug, Deserialize)]
struct Catalogue {
    #[serde(default)]
    abilities: Vec<AbilityDefinition>,
}

#[derive(Debug, Clone)]
pub struct Ability {
    pub name: String,
    pub params: CombatParams,
    pub formula: Formula,
    pub area: Option<DirectionalAreaSet>,
}

impl Ability {
    pub fn new(name: &str, params: CombatParams, formula: Formula) -> Self {
        Self {
            name: name.to_string(),
            params,
            formula,
            area: None,
        }
    }

    pub fn from_definition(definition: AbilityDefinition) -> Result<Self, AbilityError> {
        let area = match &definition.area {
            Some(area) => Some(area.build().map_err(|source| AbilityError::Area {
                name: definition.name.clone(),
                source,
            })?),
            None => None,
        };
        let flags = definition.flags;
        let mut params = CombatParams::new(definition.damage_type);
        if let Some(aggressive) = flags.aggressive {
            params.aggressive = aggressive;
        }
        params.blocked_by_armor = flags.blocked_by_armor;
        params.blocked_by_shield = flags.blocked_by_shield;
        params.target_caster_or_top_most = flags.target_caster_or_top_most;
        params.target_players_or_summons = flags.target_players_or_summons;
        params.different_area_damage = flags.different_area_damage;
        params.use_charges = flags.use_charges;
        params.impact_effect = definition.effects.impact;
        params.hit_effect = definition.effects.hit;
        params.distance_effect = definition.effects.distance;
        params.conditions = definition.conditions;
        params.dispel = definition.dispel;
        params.field_item = definition.field;
        if let Some(scaling) = definition.mana_scaling {
            params.formula_provider = Some(Arc::new(scaling));
        }
        Ok(Self {
            name: definition.name,
            params,
            formula: definition.formula,
            area,
        })
    }

    pub fn resolve_single_target(
        &self,
        ctx: &mut CombatContext<'_>,
        caster: Option<CreatureId>,
        target: CreatureId,
    ) -> bool {
        ctx.resolve_single_target(caster, target, &self.params, &self.formula)
    }

    pub fn resolve_area(&self, ctx: &mut CombatContext<'_>, caster: Option<CreatureId>, anchor: Position) -> bool {
        ctx.resolve_area(caster, anchor, self.area.as_ref(), &self.params, &self.formula)
    }

    /// Area abilities anchor on the target's tile; the rest hit it directly.
    pub fn cast_at(&self, ctx: &mut CombatContext<'_>, caster: Option<CreatureId>, target: CreatureId) -> bool {
        if self.area.is_none() {
            return self.resolve_single_target(ctx, caster, target);
        }
        match ctx.world.creature(target).map(|creature| creature.position) {
            Some(anchor) => self.resolve_area(ctx, caster, anchor),
            None => false,
        }
    }
}

/// Counts printed by the catalogue scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogueSummary {
    pub total: usize,
    pub area: usize,
    pub single_target: usize,
    pub healing: usize,
    pub fields: usize,
    pub conditions: usize,
}

pub fn summarize(abilities: &[Ability]) -> CatalogueSummary {
    let mut summary = CatalogueSummary {
        total: abilities.len(),
        ..CatalogueSummary::default()
    };
    for ability in abilities {
        if ability.area.is_some() {
            summary.area += 1;
        } else {
            summary.single_target += 1;
        }
        if ability.params.damage_type == DamageType::Healing {
            summary.healing += 1;
        }
        if ability.params.field_item.is_some() {
            summary.fields += 1;
        }
        summary.conditions += ability.params.conditions.len();
    }
    summary
}

pub fn parse_catalogue(content: &str) -> Result<Vec<Ability>, AbilityError> {
    let catalogue: Catalogue = serde_yaml::from_str(content)?;
    let mut seen = HashSet::new();
    let mut abilities = Vec::with_capacity(catalogue.abilities.len());
    for definition in catalogue.abilities {
        if !seen.insert(definition.name.to_lowercase()) {
            return Err(AbilityError::Duplicate(definition.name));
        }
        abilities.push(Ability::from_definition(definition)?);
    }
    Ok(abilities)
}

pub fn load_catalogue(path: &Path) -> Result<Vec<Ability>, AbilityError> {
    let content = std::fs::read_to_string(path).map_err(|source| AbilityError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_catalogue(&content)
}

pub fn find<'a>(abilities: &'a [Ability], name: &str) -> Option<&'a Ability> {
    abilities
        .iter()
        .find(|ability| ability.name.eq_ignore_ascii_case(name))
}
