use crate::combat::damage::DamageType;
use crate::combat::rng::CombatRng;
use crate::config::CombatConfig;
use crate::entities::creature::Creature;
use crate::entities::inventory::INVENTORY_SLOTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockOutcome {
    #[default]
    None,
    Immunity,
    Defense,
    Armor,
}

impl BlockOutcome {
    pub fn is_blocked(self) -> bool {
        self != BlockOutcome::None
    }
}

/// Which mitigation steps a hit is subject to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitChecks {
    pub defense: bool,
    pub armor: bool,
    /// Damage from a field item; adds field absorption.
    pub field: bool,
    /// The attacker is alive and this hit is not itself a reflection.
    pub reflect: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mitigation {
    pub outcome: BlockOutcome,
    pub raw: u32,
    pub damage: u32,
    pub absorbed: u32,
    /// Amount to send back at the attacker.
    pub reflected: u32,
}

/// Bounds of the armor reduction roll.
pub fn armor_reduction_bounds(armor: u32) -> (u32, u32) {
    match armor {
        0 => (0, 0),
        1 => (1, 1),
        _ => {
            let high = (armor.saturating_mul(475)).div_ceil(1000);
            (high.saturating_sub(1), high)
        }
    }
}

fn percent_of(value: u32, percent: u32) -> u32 {
    (u64::from(value) * u64::from(percent) / 100).min(u64::from(value)) as u32
}

/// Runs `amount` of `damage_type` through the target's defenses in order:
/// immunity, shield defense, armor, vocation magic defense, then equipment
/// and vocation absorption and reflection.
pub fn block_hit(
    target: &mut Creature,
    config: &CombatConfig,
    rng: &mut CombatRng,
    damage_type: DamageType,
    amount: u32,
    checks: HitChecks,
) -> Mitigation {
    let mut result = Mitigation {
        raw: amount,
        damage: amount,
        ..Mitigation::default()
    };
    if target.is_immune(damage_type) {
        result.damage = 0;
        result.outcome = BlockOutcome::Immunity;
        return result;
    }
    if amount == 0 {
        return result;
    }

    if checks.defense || checks.armor {
        let has_defense = target.take_block_charge();
        if checks.defense && has_defense && target.defense > 0 {
            let defense = rng.roll_range(target.defense / 2, target.defense);
            result.damage = result.damage.saturating_sub(defense);
            if result.damage == 0 {
                result.outcome = BlockOutcome::Defense;
                return result;
            }
        }
        if checks.armor && target.armor > 0 {
            let (low, high) = armor_reduction_bounds(target.armor);
            let reduction = rng.roll_range(low, high);
            result.damage = result.damage.saturating_sub(reduction);
            if result.damage == 0 {
                result.outcome = BlockOutcome::Armor;
                return result;
            }
        }
    }

    let vocation = config.vocation(target.vocation);
    if damage_type.is_magical() && damage_type != DamageType::Healing {
        if let Some(vocation) = vocation {
            let shrink = percent_of(result.damage, u32::from(vocation.magic_defense_percent));
            result.damage -= shrink;
        }
    }

    let mut absorb: i32 = 0;
    let mut reflect: i32 = 0;
    let mut spent = Vec::new();
    for slot in INVENTORY_SLOTS {
        if !target.inventory.is_ability_enabled(slot) {
            continue;
        }
        let Some(item) = target.inventory.slot(slot) else {
            continue;
        };
        let Some(abilities) = item.abilities.as_ref() else {
            continue;
        };
        let mut contributed = false;
        let mut item_absorb = i32::from(abilities.absorb(damage_type));
        if checks.field {
            item_absorb += i32::from(abilities.field_absorb(damage_type));
        }
        if item_absorb != 0 {
            absorb += item_absorb;
            contributed = true;
        }
        if checks.reflect {
            let (percent, chance) = abilities.reflect(damage_type);
            if percent != 0 && rng.roll_percent(u32::from(chance)) {
                reflect += i32::from(percent);
                contributed = true;
            }
        }
        if contributed && item.charges.is_some() {
            spent.push(slot);
        }
    }
    for slot in spent {
        target.inventory.consume_charge(slot);
    }
    if let Some(vocation) = vocation {
        absorb += i32::from(vocation.absorb(damage_type));
        if checks.reflect {
            reflect += i32::from(vocation.reflect(damage_type));
        }
    }

    let absorb = absorb.clamp(0, i32::from(config.max_absorb_percent.min(100))) as u32;
    let reflect = reflect.clamp(0, 100) as u32;
    result.absorbed = percent_of(result.damage, absorb);
    result.damage -= result.absorbed;
    result.reflected = percent_of(result.damage, reflect);
    if result.damage == 0 {
        result.outcome = BlockOutcome::Armor;
    }
    result
}

/// Healing skips every defense but can still bounce back to the healer.
/// Returns the share of `amount` to reflect; items that roll consume a charge.
pub fn healing_reflection(
    target: &mut Creature,
    config: &CombatConfig,
    rng: &mut CombatRng,
    amount: u32,
) -> u32 {
    let mut reflect: i32 = 0;
    let mut spent = Vec::new();
    for slot in INVENTORY_SLOTS {
        if !target.inventory.is_ability_enabled(slot) {
            continue;
        }
        let Some(item) = target.inventory.slot(slot) else {
            continue;
        };
        let Some(abilities) = item.abilities.as_ref() else {
            continue;
        };
        let (percent, chance) = abilities.reflect(DamageType::Healing);
        if percent != 0 && rng.roll_percent(u32::from(chance)) {
            reflect += i32::from(percent);
            if item.charges.is_some() {
                spent.push(slot);
            }
        }
    }
    for slot in spent {
        target.inventory.consume_charge(slot);
    }
    if let Some(vocation) = config.vocation(target.vocation) {
        reflect += i32::from(vocation.reflect(DamageType::Healing));
    }
    percent_of(amount, reflect.clamp(0, 100) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VocationConfig;
    use crate::entities::inventory::InventorySlot;
    use crate::entities::item::{EquippedItem, ItemAbilities, ItemTypeId};
    use crate::entities::stats::Stats;
    use crate::world::position::Position;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn target() -> Creature {
        Creature::monster("target", Position::new(100, 100, 7), Stats::new(1_000, 0))
    }

    fn wear(creature: &mut Creature, slot: InventorySlot, abilities: ItemAbilities, charges: Option<u16>) {
        let mut item = EquippedItem::new(ItemTypeId(100), "charm")
            .worn_in(slot)
            .with_abilities(abilities);
        item.charges = charges;
        creature.inventory.set_slot(slot, Some(item));
    }

    #[test]
    fn armor_bounds_follow_rating() {
        assert_eq!(armor_reduction_bounds(0), (0, 0));
        assert_eq!(armor_reduction_bounds(1), (1, 1));
        assert_eq!(armor_reduction_bounds(2), (0, 1));
        assert_eq!(armor_reduction_bounds(10), (4, 5));
        assert_eq!(armor_reduction_bounds(40), (18, 19));
    }

    #[test]
    fn immunity_zeroes_everything() {
        let mut creature = target();
        creature.damage_immunities = DamageType::Fire.mask();
        wear(&mut creature, InventorySlot::Armor, ItemAbilities::default().with_reflect(DamageType::Fire, 50, 100), None);
        let mut rng = CombatRng::from_seed(1);
        let result = block_hit(
            &mut creature,
            &CombatConfig::default(),
            &mut rng,
            DamageType::Fire,
            200,
            HitChecks { reflect: true, ..HitChecks::default() },
        );
        assert_eq!(result.outcome, BlockOutcome::Immunity);
        assert_eq!(result.damage, 0);
        assert_eq!(result.reflected, 0);
    }

    #[test]
    fn full_defense_skips_armor() {
        let mut creature = target();
        creature.defense = 40;
        creature.armor = 40;
        let mut rng = CombatRng::from_seed(2);
        let checks = HitChecks {
            defense: true,
            armor: true,
            ..HitChecks::default()
        };
        let result = block_hit(&mut creature, &CombatConfig::default(), &mut rng, DamageType::Physical, 15, checks);
        assert_eq!(result.outcome, BlockOutcome::Defense);
        assert_eq!(creature.block_charges, 0);

        // No charge left: only armor applies.
        let result = block_hit(&mut creature, &CombatConfig::default(), &mut rng, DamageType::Physical, 15, checks);
        assert_eq!(result.outcome, BlockOutcome::Armor);
    }

    #[test]
    fn reflection_uses_post_absorption_damage() {
        let mut creature = target();
        wear(
            &mut creature,
            InventorySlot::Armor,
            ItemAbilities::default().with_reflect(DamageType::Physical, 50, 100),
            None,
        );
        let mut rng = CombatRng::from_seed(3);
        let checks = HitChecks { reflect: true, ..HitChecks::default() };
        let result = block_hit(&mut creature, &CombatConfig::default(), &mut rng, DamageType::Physical, 100, checks);
        assert_eq!(result.damage, 100);
        assert_eq!(result.reflected, 50);

        wear(
            &mut creature,
            InventorySlot::Necklace,
            ItemAbilities::default().with_absorb(DamageType::Physical, 20),
            None,
        );
        let result = block_hit(&mut creature, &CombatConfig::default(), &mut rng, DamageType::Physical, 100, checks);
        assert_eq!(result.absorbed, 20);
        assert_eq!(result.damage, 80);
        assert_eq!(result.reflected, 40);

        let result = block_hit(
            &mut creature,
            &CombatConfig::default(),
            &mut rng,
            DamageType::Physical,
            100,
            HitChecks::default(),
        );
        assert_eq!(result.reflected, 0);
    }

    #[test]
    fn absorption_is_capped_and_charges_are_spent() {
        let mut creature = target();
        wear(&mut creature, InventorySlot::Ring, ItemAbilities::default().with_absorb(DamageType::Ice, 60), Some(1));
        wear(&mut creature, InventorySlot::Necklace, ItemAbilities::default().with_absorb(DamageType::Ice, 60), None);
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(4);
        let result = block_hit(&mut creature, &config, &mut rng, DamageType::Ice, 100, HitChecks::default());
        assert_eq!(result.damage, 20);
        assert!(creature.inventory.slot(InventorySlot::Ring).is_none());

        let result = block_hit(&mut creature, &config, &mut rng, DamageType::Ice, 100, HitChecks::default());
        assert_eq!(result.damage, 40);
    }

    #[test]
    fn disabled_slots_grant_nothing() {
        let mut creature = target();
        let item = EquippedItem::new(ItemTypeId(7), "ring")
            .worn_in(InventorySlot::Ring)
            .with_abilities(ItemAbilities::default().with_absorb(DamageType::Fire, 50));
        creature.inventory.set_slot(InventorySlot::Ammo, Some(item));
        let mut rng = CombatRng::from_seed(5);
        let result = block_hit(
            &mut creature,
            &CombatConfig::default(),
            &mut rng,
            DamageType::Fire,
            100,
            HitChecks::default(),
        );
        assert_eq!(result.damage, 100);
    }

    #[test]
    fn field_absorption_only_counts_for_fields() {
        let mut creature = target();
        wear(
            &mut creature,
            InventorySlot::Feet,
            ItemAbilities::default().with_field_absorb(DamageType::Fire, 100),
            None,
        );
        let mut rng = CombatRng::from_seed(6);
        let config = CombatConfig::default();
        let spell = block_hit(&mut creature, &config, &mut rng, DamageType::Fire, 50, HitChecks::default());
        assert_eq!(spell.damage, 50);
        let field = block_hit(
            &mut creature,
            &config,
            &mut rng,
            DamageType::Fire,
            50,
            HitChecks { field: true, ..HitChecks::default() },
        );
        assert_eq!(field.damage, 10);
    }

    #[test]
    fn vocation_magic_defense_applies_to_magic_only() {
        let config = CombatConfig {
            vocations: vec![VocationConfig {
                id: 2,
                name: "druid".to_string(),
                magic_defense_percent: 10,
                absorb_percent: HashMap::from([(DamageType::Earth, 10)]),
                ..VocationConfig::default()
            }],
            ..CombatConfig::default()
        };
        let mut creature = target();
        creature.vocation = 2;
        let mut rng = CombatRng::from_seed(7);
        let earth = block_hit(&mut creature, &config, &mut rng, DamageType::Earth, 100, HitChecks::default());
        assert_eq!(earth.damage, 81);
        let physical = block_hit(&mut creature, &config, &mut rng, DamageType::Physical, 100, HitChecks::default());
        assert_eq!(physical.damage, 100);
        let drown = block_hit(&mut creature, &config, &mut rng, DamageType::Drown, 100, HitChecks::default());
        assert_eq!(drown.damage, 100);
    }

    proptest! {
        #[test]
        fn mitigation_never_raises_damage(
            raw in 0u32..5_000,
            defense in 0u32..200,
            armor in 0u32..200,
            absorb in -100i16..150,
            immune in any::<bool>(),
            seed in any::<u64>(),
        ) {
            let mut creature = target();
            creature.defense = defense;
            creature.armor = armor;
            if immune {
                creature.damage_immunities = DamageType::Energy.mask();
            }
            wear(&mut creature, InventorySlot::Armor, ItemAbilities::default().with_absorb(DamageType::Energy, absorb), None);
            let mut rng = CombatRng::from_seed(seed);
            let checks = HitChecks { defense: true, armor: true, field: false, reflect: true };
            let result = block_hit(&mut creature, &CombatConfig::default(), &mut rng, DamageType::Energy, raw, checks);
            prop_assert!(result.damage <= raw);
            if immune {
                prop_assert_eq!(result.damage, 0);
            }
        }
    }
}
