use crate::combat::conditions::{ConditionKind, ConditionTemplate};
use crate::combat::damage::{DamageOrigin, DamageType};
use crate::combat::hooks::{DamageFormulaProvider, TargetEffectHook, TileEffectHook};
use crate::combat::mitigation::HitChecks;
use crate::entities::item::ItemTypeId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Item left on every affected tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldItem {
    pub item: ItemTypeId,
    /// Variant placed by players where PvP is off.
    #[serde(default)]
    pub safe_item: Option<ItemTypeId>,
    #[serde(default)]
    pub blocks_path: bool,
}

/// Per-ability settings, built once and shared by every invocation.
#[derive(Debug, Clone)]
pub struct CombatParams {
    pub damage_type: DamageType,
    pub origin: DamageOrigin,
    pub impact_effect: Option<u8>,
    pub hit_effect: Option<u8>,
    pub distance_effect: Option<u8>,
    pub conditions: Vec<ConditionTemplate>,
    pub dispel: Option<ConditionKind>,
    pub aggressive: bool,
    pub blocked_by_armor: bool,
    pub blocked_by_shield: bool,
    pub target_caster_or_top_most: bool,
    pub target_players_or_summons: bool,
    pub different_area_damage: bool,
    pub use_charges: bool,
    pub field_item: Option<FieldItem>,
    pub formula_provider: Option<Arc<dyn DamageFormulaProvider>>,
    pub tile_hook: Option<Arc<dyn TileEffectHook>>,
    pub target_hook: Option<Arc<dyn TargetEffectHook>>,
}

impl Default for CombatParams {
    fn default() -> Self {
        Self {
            damage_type: DamageType::Undefined,
            origin: DamageOrigin::Spell,
            impact_effect: None,
            hit_effect: None,
            distance_effect: None,
            conditions: Vec::new(),
            dispel: None,
            aggressive: true,
            blocked_by_armor: false,
            blocked_by_shield: false,
            target_caster_or_top_most: false,
            target_players_or_summons: false,
            different_area_damage: false,
            use_charges: false,
            field_item: None,
            formula_provider: None,
            tile_hook: None,
            target_hook: None,
        }
    }
}

impl CombatParams {
    pub fn new(damage_type: DamageType) -> Self {
        Self {
            damage_type,
            aggressive: damage_type != DamageType::Healing,
            ..Self::default()
        }
    }

    /// Settings for one periodic condition tick.
    pub fn condition_tick(damage_type: DamageType) -> Self {
        Self {
            origin: DamageOrigin::Condition,
            ..Self::new(damage_type)
        }
    }

    pub fn hit_checks(&self, reflect: bool) -> HitChecks {
        HitChecks {
            defense: self.blocked_by_shield,
            armor: self.blocked_by_armor,
            field: self.origin == DamageOrigin::Field,
            reflect,
        }
    }
}
