use crate::combat::conditions::ConditionKind;
use crate::combat::damage::{CombatDamage, DamageOrigin, DamageType};
use crate::combat::formula::{sample, DamageRange, Formula};
use crate::combat::hooks::LegalityHook;
use crate::combat::hostility::{self, add_in_fight};
use crate::combat::ledger::{compute_kill_list, Attacker, Killer};
use crate::combat::legality::{Legality, ReturnValue};
use crate::combat::mitigation::{block_hit, healing_reflection, BlockOutcome, HitChecks, Mitigation};
use crate::combat::params::CombatParams;
use crate::combat::report::{
    CombatHit, CombatReport, DeathReport, DistanceEffect, FieldPlacement, MagicEffect, Rejection,
};
use crate::combat::rng::CombatRng;
use crate::config::{CombatConfig, WorldType};
use crate::entities::creature::CreatureId;
use crate::entities::player::SkullState;
use crate::telemetry::logging::KILLS_TARGET;
use crate::world::area::DirectionalAreaSet;
use crate::world::map::{TileItem, TileMap, Zone};
use crate::world::position::Position;
use crate::world::state::World;
use crate::world::viewport::ViewRange;
use log::{debug, info, warn};

/// One combat resolution: the world it mutates, the configuration snapshot
/// it reads, and the report it fills.
pub struct CombatContext<'a> {
    pub world: &'a mut World,
    pub config: &'a CombatConfig,
    pub rng: &'a mut CombatRng,
    pub legality_hook: Option<&'a dyn LegalityHook>,
    pub report: CombatReport,
}

impl<'a> CombatContext<'a> {
    pub fn new(world: &'a mut World, config: &'a CombatConfig, rng: &'a mut CombatRng) -> Self {
        Self {
            world,
            config,
            rng,
            legality_hook: None,
            report: CombatReport::default(),
        }
    }

    pub fn with_legality_hook(mut self, hook: &'a dyn LegalityHook) -> Self {
        self.legality_hook = Some(hook);
        self
    }

    pub fn into_report(self) -> CombatReport {
        self.report
    }

    pub fn legality(&self) -> Legality<'_> {
        Legality::new(self.world, self.config).with_hook(self.legality_hook)
    }

    fn view_range(&self) -> ViewRange {
        ViewRange {
            x: self.config.view_range_x,
            y: self.config.view_range_y,
        }
    }

    /// Resolves an ability against one creature. Returns `false` when the
    /// target is gone or the action is illegal; nothing is applied then.
    pub fn resolve_single_target(
        &mut self,
        caster: Option<CreatureId>,
        target: CreatureId,
        params: &CombatParams,
        formula: &Formula,
    ) -> bool {
        let Some(target_position) = self.world.creature(target).map(|creature| creature.position) else {
            return false;
        };
        if params.aggressive {
            if let Err(reason) = self.check_creature(caster, target) {
                debug!("combat on {} refused: {}", target, reason);
                self.report.rejections.push(Rejection {
                    target: Some(target),
                    position: target_position,
                    reason,
                });
                return false;
            }
        }
        let range = self.evaluate(caster, params, formula);
        let damage = sample(&range, params.damage_type, params.origin, self.rng);
        self.emit_distance_effect(caster, target_position, params.distance_effect);
        self.emit_magic_effect(caster, target_position, params.impact_effect);
        self.apply_damage(caster, target, damage, params);
        true
    }

    /// Resolves an ability over an area anchored on `anchor`. Without a shape
    /// only the anchor tile is affected. Returns `true` when at least one
    /// tile passed legality.
    pub fn resolve_area(
        &mut self,
        caster: Option<CreatureId>,
        anchor: Position,
        area: Option<&DirectionalAreaSet>,
        params: &CombatParams,
        formula: &Formula,
    ) -> bool {
        let caster_position = caster
            .and_then(|id| self.world.creature(id))
            .map(|creature| creature.position);
        let positions = match area {
            Some(set) => set.project(self.world.map.as_mut(), caster_position, anchor),
            None => {
                self.world.map.ensure_tile(anchor);
                vec![anchor]
            }
        };
        if let Some(from) = caster_position {
            self.emit_distance_effect(caster, anchor, params.distance_effect);
            debug!("area from {:?} to {:?} covers {} tiles", from, anchor, positions.len());
        }

        let mut any_tile = false;
        let mut targets: Vec<CreatureId> = Vec::new();
        for position in positions {
            if let Err(reason) = self.check_tile(caster, position, params.aggressive) {
                self.report.rejections.push(Rejection {
                    target: None,
                    position,
                    reason,
                });
                continue;
            }
            any_tile = true;
            self.report.positions.push(position);
            self.place_field(caster, position, params);
            if let Some(hook) = params.tile_hook.as_deref() {
                if let Err(err) = hook.on_tile(self.world, caster, position) {
                    warn!("tile hook at {:?} failed: {}", position, err);
                }
            }
            self.emit_magic_effect(caster, position, params.impact_effect);
            self.collect_targets(caster, position, params, &mut targets);
        }

        let range = self.evaluate(caster, params, formula);
        let shared = (!params.different_area_damage)
            .then(|| sample(&range, params.damage_type, params.origin, self.rng));
        for target in targets {
            let damage = match shared {
                Some(damage) => damage,
                None => sample(&range, params.damage_type, params.origin, self.rng),
            };
            self.apply_damage(caster, target, damage, params);
        }
        any_tile
    }

    fn collect_targets(
        &mut self,
        caster: Option<CreatureId>,
        position: Position,
        params: &CombatParams,
        targets: &mut Vec<CreatureId>,
    ) {
        let stack = self
            .world
            .tile(position)
            .map(|tile| tile.creatures.clone())
            .unwrap_or_default();
        let caster_here = caster.is_some_and(|id| stack.contains(&id));
        let wanted = if caster_here { caster } else { stack.first().copied() };
        for id in stack {
            if params.target_caster_or_top_most && Some(id) != wanted {
                continue;
            }
            if params.target_players_or_summons && !self.world.creatures.is_player_controlled(id) {
                continue;
            }
            if !targets.contains(&id) {
                if !params.aggressive {
                    targets.push(id);
                } else if Some(id) != caster {
                    match self.check_creature(caster, id) {
                        Ok(()) => targets.push(id),
                        Err(reason) => self.report.rejections.push(Rejection {
                            target: Some(id),
                            position,
                            reason,
                        }),
                    }
                }
            }
            if params.target_caster_or_top_most {
                break;
            }
        }
    }

    fn check_creature(&self, caster: Option<CreatureId>, target: CreatureId) -> Result<(), ReturnValue> {
        let Some(target) = self.world.creature(target) else {
            return Err(ReturnValue::NotPossible);
        };
        let caster = caster.and_then(|id| self.world.creature(id));
        self.legality().can_affect_creature(caster, target)
    }

    fn check_tile(&self, caster: Option<CreatureId>, position: Position, aggressive: bool) -> Result<(), ReturnValue> {
        let Some(tile) = self.world.tile(position) else {
            return Err(ReturnValue::NotPossible);
        };
        let caster = caster.and_then(|id| self.world.creature(id));
        self.legality().can_affect_tile(caster, tile, aggressive)
    }

    fn evaluate(&mut self, caster: Option<CreatureId>, params: &CombatParams, formula: &Formula) -> DamageRange {
        let provider = params.formula_provider.as_deref();
        let caster = caster.and_then(|id| self.world.creatures.get_mut(id));
        formula.evaluate(caster, params.damage_type, provider, params.use_charges)
    }

    fn place_field(&mut self, caster: Option<CreatureId>, position: Position, params: &CombatParams) {
        let Some(field) = params.field_item else {
            return;
        };
        let mut item = field.item;
        let player = caster
            .and_then(|id| self.world.creatures.controlling_player(id))
            .map(|player| player.id);
        if let Some(player) = player {
            let safe_here = self.config.world_type == WorldType::NoPvp
                || self.world.zone_at(position) == Zone::NoPvp;
            if safe_here {
                item = field.safe_item.unwrap_or(field.item);
            } else if params.aggressive && !field.blocks_path {
                let clock = self.world.clock.clone();
                if let Some(player) = self.world.creatures.get_mut(player) {
                    add_in_fight(player, &clock, self.config.fight_time_ms);
                }
            }
        }
        self.world.map.ensure_tile(position).add_item(TileItem {
            type_id: item,
            owner: caster,
        });
        self.report.fields.push(FieldPlacement {
            position,
            item,
            owner: caster,
        });
    }

    /// Observers of an effect at `position`. An invisible caster's effects
    /// only reach those who can see it, unless configured otherwise.
    fn effect_observers(&self, caster: Option<CreatureId>, position: Position) -> Option<Vec<CreatureId>> {
        let observers = self.world.observers(position, self.view_range());
        let Some(caster) = caster.and_then(|id| self.world.creature(id)) else {
            return Some(observers);
        };
        if !caster.is_invisible() || self.config.show_invisible_effects {
            return Some(observers);
        }
        let visible: Vec<CreatureId> = observers
            .into_iter()
            .filter(|id| {
                *id == caster.id
                    || self
                        .world
                        .creature(*id)
                        .map(|observer| observer.can_see_invisible())
                        .unwrap_or(false)
            })
            .collect();
        (!visible.is_empty()).then_some(visible)
    }

    fn emit_magic_effect(&mut self, caster: Option<CreatureId>, position: Position, effect: Option<u8>) {
        let Some(effect) = effect else {
            return;
        };
        if let Some(observers) = self.effect_observers(caster, position) {
            self.report.magic_effects.push(MagicEffect {
                position,
                effect,
                observers,
            });
        }
    }

    fn emit_distance_effect(&mut self, caster: Option<CreatureId>, to: Position, effect: Option<u8>) {
        let Some(effect) = effect else {
            return;
        };
        let Some(from) = caster
            .and_then(|id| self.world.creature(id))
            .map(|creature| creature.position)
        else {
            return;
        };
        if let Some(observers) = self.effect_observers(caster, from) {
            self.report.distance_effects.push(DistanceEffect {
                from,
                to,
                effect,
                observers,
            });
        }
    }

    fn pvp_halving_applies(&self, caster: Option<CreatureId>, target: CreatureId, damage: &CombatDamage) -> bool {
        if !self.config.pvp_damage_halving || damage.is_healing() || damage.origin == DamageOrigin::Reflect {
            return false;
        }
        let Some(caster) = caster else {
            return false;
        };
        let creatures = &self.world.creatures;
        let (Some(attacker), Some(victim)) = (
            creatures.controlling_player(caster),
            creatures.controlling_player(target),
        ) else {
            return false;
        };
        let black = |skull: Option<SkullState>| skull == Some(SkullState::Black);
        attacker.id != victim.id
            && !black(attacker.player.as_ref().map(|state| state.skull))
            && !black(victim.player.as_ref().map(|state| state.skull))
    }

    /// Applies sampled damage to `target`: PvP halving, mitigation,
    /// reflection, conditions, dispel, the per-target hook and death.
    pub fn apply_damage(
        &mut self,
        caster: Option<CreatureId>,
        target: CreatureId,
        damage: CombatDamage,
        params: &CombatParams,
    ) -> Option<Mitigation> {
        let mut damage = damage;
        if self.pvp_halving_applies(caster, target, &damage) {
            damage.halve();
        }
        let config = self.config;
        let now = self.world.now();
        let attacker_alive = caster.and_then(|id| self.world.creatures.alive(id)).is_some();
        let reflect = attacker_alive
            && matches!(
                damage.origin,
                DamageOrigin::Spell | DamageOrigin::Melee | DamageOrigin::Ranged
            );
        let damage_type = damage.primary.damage_type;

        let (target_position, result) = {
            let victim = self.world.creatures.get_mut(target).filter(|creature| creature.is_alive())?;
            let result = if damage.is_healing() {
                let raw = damage.primary.value;
                let reflected = if reflect && caster != Some(target) {
                    healing_reflection(victim, config, self.rng, raw)
                } else {
                    0
                };
                let healed = victim.stats.apply_heal(raw);
                Mitigation {
                    raw,
                    damage: healed,
                    reflected,
                    ..Mitigation::default()
                }
            } else {
                let checks = params.hit_checks(reflect);
                let mut result = block_hit(victim, config, self.rng, damage_type, damage.primary.value, checks);
                if let Some(secondary) = damage.secondary {
                    let extra = block_hit(
                        victim,
                        config,
                        self.rng,
                        secondary.damage_type,
                        secondary.value,
                        HitChecks {
                            field: checks.field,
                            ..HitChecks::default()
                        },
                    );
                    result.raw = result.raw.saturating_add(extra.raw);
                    result.damage = result.damage.saturating_add(extra.damage);
                    result.absorbed = result.absorbed.saturating_add(extra.absorbed);
                    if extra.damage > 0 {
                        result.outcome = BlockOutcome::None;
                    }
                }
                let applied = if damage_type == DamageType::ManaDrain {
                    victim.stats.drain_mana(result.damage)
                } else {
                    let applied = victim.stats.apply_damage(result.damage);
                    victim
                        .ledger
                        .record_damage(Attacker::from(caster), applied, damage_type, now);
                    applied
                };
                result.damage = applied;
                result
            };
            (victim.position, result)
        };

        self.report.hits.push(CombatHit {
            target,
            attacker: caster,
            damage_type,
            attempted_damage: damage.total(),
            applied_damage: result.damage,
            block: result.outcome,
            reflected: damage.origin == DamageOrigin::Reflect,
        });
        if result.damage > 0 {
            self.emit_magic_effect(caster, target_position, params.hit_effect);
        }
        if params.aggressive && !damage.is_healing() {
            if let Some(attacker) = caster.filter(|id| *id != target) {
                hostility::on_attacked_creature(self.world, config, attacker, target);
            }
        }

        if damage.is_healing() || !result.outcome.is_blocked() {
            let clock = self.world.clock.clone();
            if let Some(victim) = self.world.creatures.get_mut(target).filter(|c| c.is_alive()) {
                for template in &params.conditions {
                    if victim.is_condition_immune(template.kind) {
                        continue;
                    }
                    victim.conditions.add(template.instantiate(caster, &clock));
                }
                if let Some(kind) = params.dispel {
                    victim.conditions.remove(kind);
                }
            }
        }

        if result.reflected > 0 {
            if let Some(attacker) = caster {
                self.reflect(target, attacker, damage_type, result.reflected);
            }
        }
        if let Some(hook) = params.target_hook.as_deref() {
            if let Err(err) = hook.on_target(self.world, caster, target) {
                warn!("target hook on {} failed: {}", target, err);
            }
        }
        self.handle_death(target);
        Some(result)
    }

    fn reflect(&mut self, from: CreatureId, to: CreatureId, damage_type: DamageType, amount: u32) {
        let params = CombatParams {
            damage_type,
            origin: DamageOrigin::Reflect,
            aggressive: false,
            ..CombatParams::default()
        };
        let damage = CombatDamage::new(damage_type, amount, DamageOrigin::Reflect);
        self.apply_damage(Some(from), to, damage, &params);
    }

    /// Attributes and reports the death of `victim`, then removes it.
    pub fn handle_death(&mut self, victim: CreatureId) -> bool {
        let Some(creature) = self.world.creature(victim).filter(|creature| !creature.is_alive()) else {
            return false;
        };
        let window = self.world.clock.ticks_from_millis(self.config.damage_window_ms);
        let kill_list = compute_kill_list(
            &self.world.creatures,
            creature,
            self.world.now(),
            window,
            self.config.death_assists,
        );
        let name = creature.name.clone();
        for entry in &kill_list {
            if let Some(killer) = entry.creature() {
                if hostility::on_killed_creature(self.world, self.config, killer, victim, entry) {
                    info!(target: KILLS_TARGET, "unjustified kill of {} by {}", name, killer);
                }
            }
        }
        let killers: Vec<String> = kill_list
            .iter()
            .map(|entry| match &entry.killer {
                Killer::Creature(id) => self
                    .world
                    .creature(*id)
                    .map(|creature| creature.name.clone())
                    .unwrap_or_else(|| id.to_string()),
                Killer::Cause(cause) => cause.clone(),
            })
            .collect();
        info!(target: KILLS_TARGET, "{} died, killed by {}", name, killers.join(", "));
        self.report.deaths.push(DeathReport {
            victim,
            name,
            kill_list,
        });
        self.world.despawn(victim);
        true
    }

    /// Per-tick upkeep: defense charges, periodic condition damage, expiry
    /// of conditions and skulls, and idle ledger clearing.
    pub fn process_tick(&mut self) {
        let now = self.world.now();
        for id in self.world.creatures.ids() {
            let Some(creature) = self.world.creatures.get_mut(id) else {
                continue;
            };
            creature.reset_block_charges();
            let ticks = creature.conditions.tick(now);
            let expired = creature.conditions.expire(now);
            if let Some(player) = creature.player.as_mut() {
                player.refresh(now);
                if expired.contains(&ConditionKind::InFight) {
                    player.leave_fight();
                }
            }
            creature.clear_ledger_if_idle();

            for tick in ticks {
                let owner = tick
                    .owner
                    .filter(|owner| self.world.creatures.alive(*owner).is_some());
                let params = CombatParams::condition_tick(tick.damage_type);
                let damage = CombatDamage::new(tick.damage_type, tick.damage, DamageOrigin::Condition);
                if self.apply_damage(owner, id, damage, &params).is_none() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::conditions::ConditionTemplate;
    use crate::combat::hooks::{HookError, LegalityHook, TargetEffectHook, TileEffectHook};
    use crate::entities::creature::Creature;
    use crate::combat::params::FieldItem;
    use crate::combat::testkit::{open_world, spawn_monster, spawn_player, HERE, THERE};
    use crate::entities::inventory::InventorySlot;
    use crate::entities::item::{EquippedItem, ItemAbilities, ItemTypeId};
    use crate::world::area::AreaShape;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn flat(value: i32) -> Formula {
        Formula::Flat { min: value, max: value }
    }

    fn health(world: &World, id: CreatureId) -> u32 {
        world.creature(id).map(|creature| creature.stats.health).unwrap_or(0)
    }

    #[test]
    fn player_versus_player_damage_is_halved() {
        let mut world = open_world();
        let a = spawn_player(&mut world, "A", HERE);
        let b = spawn_player(&mut world, "B", THERE);
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(1);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        assert!(ctx.resolve_single_target(Some(a), b, &CombatParams::new(DamageType::Physical), &flat(40)));
        let report = ctx.into_report();
        assert_eq!(report.applied_to(b), 20);
        assert_eq!(health(&world, b), 480);
    }

    #[test]
    fn black_skull_loses_halving() {
        let mut world = open_world();
        let a = spawn_player(&mut world, "A", HERE);
        let b = spawn_player(&mut world, "B", THERE);
        world.creature_mut(a).and_then(|c| c.player.as_mut()).expect("player").skull = SkullState::Black;
        world.creature_mut(b).and_then(|c| c.player.as_mut()).expect("player").skull = SkullState::Red;
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(1);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(a), b, &CombatParams::new(DamageType::Physical), &flat(40));
        assert_eq!(ctx.into_report().applied_to(b), 40);
    }

    #[test]
    fn reflection_hits_back_once() {
        let mut world = open_world();
        let attacker = spawn_monster(&mut world, "dragon", HERE);
        let target = spawn_player(&mut world, "Paladin", THERE);
        let mirror = |slot| {
            EquippedItem::new(ItemTypeId(2542), "mirror shield")
                .worn_in(slot)
                .with_abilities(ItemAbilities::default().with_reflect(DamageType::Physical, 50, 100))
        };
        world
            .creature_mut(target)
            .expect("target")
            .inventory
            .set_slot(InventorySlot::LeftHand, Some(mirror(InventorySlot::LeftHand)));
        world
            .creature_mut(attacker)
            .expect("attacker")
            .inventory
            .set_slot(InventorySlot::Armor, Some(mirror(InventorySlot::Armor)));

        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(2);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(attacker), target, &CombatParams::new(DamageType::Physical), &flat(100));
        let report = ctx.into_report();

        assert_eq!(report.applied_to(target), 100);
        assert_eq!(report.applied_to(attacker), 50);
        let bounce: Vec<_> = report.hits_on(attacker).collect();
        assert_eq!(bounce.len(), 1);
        assert!(bounce[0].reflected);
        assert_eq!(health(&world, target), 400);
        assert_eq!(health(&world, attacker), 250);
    }

    #[test]
    fn reflected_healing_restores_the_healer() {
        let mut world = open_world();
        let healer = spawn_player(&mut world, "Druid", HERE);
        let patient = spawn_player(&mut world, "Knight", THERE);
        world.creature_mut(healer).expect("healer").stats.health = 200;
        let patient_mut = world.creature_mut(patient).expect("patient");
        patient_mut.stats.health = 300;
        patient_mut.inventory.set_slot(
            InventorySlot::Ring,
            Some(
                EquippedItem::new(ItemTypeId(3048), "life ring")
                    .worn_in(InventorySlot::Ring)
                    .with_abilities(ItemAbilities::default().with_reflect(DamageType::Healing, 50, 100)),
            ),
        );

        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(4);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(healer), patient, &CombatParams::new(DamageType::Healing), &flat(100));
        let report = ctx.into_report();

        assert_eq!(health(&world, patient), 400);
        assert_eq!(health(&world, healer), 250);
        let bounce: Vec<_> = report.hits_on(healer).collect();
        assert_eq!(bounce.len(), 1);
        assert!(bounce[0].reflected);
    }

    #[test]
    fn protection_zone_target_is_untouched() {
        let mut world = open_world();
        world.map.ensure_tile(THERE).zone = Zone::Protection;
        let a = spawn_player(&mut world, "A", HERE);
        let b = spawn_player(&mut world, "B", THERE);
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(3);
        let mut params = CombatParams::new(DamageType::Earth);
        params.conditions.push(ConditionTemplate::periodic(ConditionKind::Poison, 5, 2_000, 5));
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        assert!(!ctx.resolve_single_target(Some(a), b, &params, &flat(50)));
        let report = ctx.into_report();
        assert!(report.hits.is_empty());
        assert_eq!(
            report.rejections[0].reason,
            ReturnValue::YouMayNotAttackAPersonInProtectionZone
        );
        let b = world.creature(b).expect("b");
        assert_eq!(b.stats.health, 500);
        assert!(b.conditions.is_empty());
    }

    #[test]
    fn caster_on_tile_wins_over_the_stack() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Druid", HERE);
        let under = spawn_monster(&mut world, "rat", HERE);
        let top = spawn_monster(&mut world, "cat", HERE);
        for id in [caster, under, top] {
            world.creature_mut(id).expect("creature").stats.health = 100;
        }
        let area = DirectionalAreaSet::new(AreaShape::square(1));
        let mut params = CombatParams::new(DamageType::Healing);
        params.target_caster_or_top_most = true;

        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(4);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        assert!(ctx.resolve_area(Some(caster), THERE, Some(&area), &params, &flat(50)));
        drop(ctx);

        assert_eq!(health(&world, caster), 150);
        assert_eq!(health(&world, under), 100);
        assert_eq!(health(&world, top), 100);
    }

    #[test]
    fn topmost_creature_takes_the_hit_without_caster() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Sorcerer", HERE);
        let under = spawn_monster(&mut world, "rat", THERE);
        let top = spawn_monster(&mut world, "cat", THERE);
        let mut params = CombatParams::new(DamageType::Fire);
        params.target_caster_or_top_most = true;

        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(5);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_area(Some(caster), THERE, None, &params, &flat(30));
        drop(ctx);

        assert_eq!(health(&world, top), 270);
        assert_eq!(health(&world, under), 300);
        assert_eq!(health(&world, caster), 500);
    }

    #[test]
    fn shared_area_damage_is_sampled_once() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Sorcerer", HERE);
        let victims: Vec<_> = (0..3)
            .map(|i| spawn_monster(&mut world, "orc", Position::new(102 + i, 100, 7)))
            .collect();
        let area = DirectionalAreaSet::new(AreaShape::square(2));
        let params = CombatParams::new(DamageType::Energy);
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(6);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_area(
            Some(caster),
            Position::new(103, 100, 7),
            Some(&area),
            &params,
            &Formula::Flat { min: 1, max: 200 },
        );
        let report = ctx.into_report();
        let attempted: Vec<u32> = victims
            .iter()
            .flat_map(|id| report.hits_on(*id).map(|hit| hit.attempted_damage))
            .collect();
        assert_eq!(attempted.len(), 3);
        assert!(attempted.iter().all(|value| *value == attempted[0]));
        assert!(report.hits_on(caster).next().is_none());
    }

    #[test]
    fn players_or_summons_filter_skips_wild_monsters() {
        let mut world = open_world();
        let a = spawn_player(&mut world, "A", HERE);
        let b = spawn_player(&mut world, "B", THERE);
        let rat = spawn_monster(&mut world, "rat", Position::new(102, 100, 7));
        let area = DirectionalAreaSet::new(AreaShape::square(1));
        let mut params = CombatParams::new(DamageType::Holy);
        params.target_players_or_summons = true;
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(7);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_area(Some(a), THERE, Some(&area), &params, &flat(10));
        let report = ctx.into_report();
        assert_eq!(report.applied_to(b), 5);
        assert!(report.hits_on(rat).next().is_none());
    }

    #[test]
    fn conditions_carry_the_caster_and_respect_immunity() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Druid", HERE);
        let target = spawn_monster(&mut world, "orc", THERE);
        let immune = spawn_monster(&mut world, "slime", Position::new(102, 100, 7));
        world
            .creature_mut(immune)
            .expect("slime")
            .condition_immunities
            .push(ConditionKind::Poison);
        let clock = world.clock.clone();
        world
            .creature_mut(target)
            .expect("orc")
            .conditions
            .add(ConditionTemplate::speed(ConditionKind::Haste, 40, 10_000).instantiate(None, &clock));
        let mut params = CombatParams::new(DamageType::Earth);
        params.conditions.push(ConditionTemplate::periodic(ConditionKind::Poison, 5, 2_000, 5));
        params.dispel = Some(ConditionKind::Haste);

        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(8);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(caster), target, &params, &flat(10));
        ctx.resolve_single_target(Some(caster), immune, &params, &flat(10));
        drop(ctx);

        let orc = world.creature(target).expect("orc");
        assert_eq!(orc.conditions.get(ConditionKind::Poison).and_then(|c| c.owner), Some(caster));
        assert!(!orc.conditions.has(ConditionKind::Haste));
        assert!(!world.creature(immune).expect("slime").conditions.has(ConditionKind::Poison));
    }

    #[test]
    fn blocked_hits_apply_no_conditions() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Knight", HERE);
        let target = spawn_monster(&mut world, "golem", THERE);
        world.creature_mut(target).expect("golem").damage_immunities = DamageType::Earth.mask();
        let mut params = CombatParams::new(DamageType::Earth);
        params.conditions.push(ConditionTemplate::periodic(ConditionKind::Poison, 5, 2_000, 5));
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(9);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(caster), target, &params, &flat(10));
        let report = ctx.into_report();
        assert_eq!(report.hits[0].block, BlockOutcome::Immunity);
        let golem = world.creature(target).expect("golem");
        assert!(golem.conditions.is_empty());
        let entry = golem.ledger.entry(Attacker::Creature(caster)).expect("blocked attacker recorded");
        assert_eq!(entry.total, 0);
        assert_eq!(entry.last_hit, world.now());
    }

    #[test]
    fn fields_use_the_safe_variant_where_pvp_is_off() {
        let mut world = open_world();
        world.map.ensure_tile(THERE).zone = Zone::NoPvp;
        let caster = spawn_player(&mut world, "Sorcerer", HERE);
        let far = Position::new(100, 102, 7);
        let mut params = CombatParams::new(DamageType::Fire);
        params.field_item = Some(FieldItem {
            item: ItemTypeId(1492),
            safe_item: Some(ItemTypeId(1500)),
            blocks_path: false,
        });
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(10);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_area(Some(caster), THERE, None, &params, &flat(0));
        assert!(!ctx.world.creature(caster).expect("caster").in_fight());
        ctx.resolve_area(Some(caster), far, None, &params, &flat(0));
        let report = ctx.into_report();

        let items: Vec<_> = report.fields.iter().map(|field| field.item).collect();
        assert_eq!(items, vec![ItemTypeId(1500), ItemTypeId(1492)]);
        assert!(world.creature(caster).expect("caster").in_fight());
        let tile = world.tile(far).expect("tile");
        assert_eq!(tile.items[0].owner, Some(caster));
    }

    #[test]
    fn killing_blow_reports_the_death() {
        let mut world = open_world();
        let a = spawn_player(&mut world, "A", HERE);
        let b = spawn_player(&mut world, "B", Position::new(100, 101, 7));
        let orc = spawn_monster(&mut world, "orc", THERE);
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(11);
        let params = CombatParams::new(DamageType::Physical);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(a), orc, &params, &flat(200));
        ctx.resolve_single_target(Some(b), orc, &params, &flat(150));
        let report = ctx.into_report();

        assert!(report.died(orc));
        assert!(world.creature(orc).is_none());
        let death = &report.deaths[0];
        let killers: Vec<_> = death.kill_list.iter().map(|entry| entry.creature()).collect();
        assert_eq!(killers, vec![Some(b), Some(a)]);
        assert_eq!(death.kill_list[0].damage, 100);
    }

    #[test]
    fn condition_ticks_damage_on_behalf_of_the_owner() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Druid", HERE);
        let target = spawn_monster(&mut world, "orc", THERE);
        let mut params = CombatParams::new(DamageType::Fire);
        params.conditions.push(ConditionTemplate::periodic(ConditionKind::Fire, 10, 1_000, 3));
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(12);
        {
            let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
            ctx.resolve_single_target(Some(caster), target, &params, &flat(0));
            ctx.process_tick();
        }
        assert_eq!(health(&world, target), 290);
        world.clock.advance(20);
        {
            let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
            ctx.process_tick();
        }
        let orc = world.creature(target).expect("orc");
        assert_eq!(orc.stats.health, 280);
        assert_eq!(
            orc.ledger.entry(Attacker::Creature(caster)).map(|entry| entry.total),
            Some(20)
        );
    }

    #[test]
    fn ledger_clears_once_idle_and_healed() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Knight", HERE);
        let target = spawn_monster(&mut world, "orc", THERE);
        let config = CombatConfig {
            fight_time_ms: 1_000,
            ..CombatConfig::default()
        };
        let mut rng = CombatRng::from_seed(13);
        {
            let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
            ctx.resolve_single_target(Some(caster), target, &CombatParams::new(DamageType::Physical), &flat(10));
        }
        world.creature_mut(target).expect("orc").stats.health = 300;
        world.clock.advance(25);
        {
            let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
            ctx.process_tick();
        }
        assert!(world.creature(target).expect("orc").ledger.is_empty());
    }

    #[test]
    fn invisible_casters_hide_their_effects() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Ghost", HERE);
        let watcher = spawn_player(&mut world, "Watcher", Position::new(100, 103, 7));
        let rat = spawn_monster(&mut world, "rat", THERE);
        world.creature_mut(caster).expect("caster").flags.ghost = true;
        let mut params = CombatParams::new(DamageType::Energy);
        params.impact_effect = Some(11);

        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(14);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(caster), rat, &params, &flat(5));
        let report = ctx.into_report();
        assert_eq!(report.magic_effects.len(), 1);
        assert_eq!(report.magic_effects[0].observers, vec![caster]);

        let config = CombatConfig {
            show_invisible_effects: true,
            ..CombatConfig::default()
        };
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_single_target(Some(caster), rat, &params, &flat(5));
        let report = ctx.into_report();
        assert_eq!(report.magic_effects[0].observers, vec![caster, watcher]);
    }

    #[derive(Debug, Default)]
    struct Counting {
        tiles: AtomicUsize,
        targets: AtomicUsize,
    }

    impl TileEffectHook for Counting {
        fn on_tile(&self, _world: &mut World, _caster: Option<CreatureId>, _position: Position) -> Result<(), HookError> {
            self.tiles.fetch_add(1, Ordering::Relaxed);
            Err(HookError::Failed {
                hook: "tile",
                reason: "script error".to_string(),
            })
        }
    }

    impl TargetEffectHook for Counting {
        fn on_target(&self, _world: &mut World, _caster: Option<CreatureId>, _target: CreatureId) -> Result<(), HookError> {
            self.targets.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn failing_hooks_do_not_abort_the_batch() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Sorcerer", HERE);
        let orc = spawn_monster(&mut world, "orc", THERE);
        let hooks = Arc::new(Counting::default());
        let mut params = CombatParams::new(DamageType::Fire);
        params.tile_hook = Some(hooks.clone());
        params.target_hook = Some(hooks.clone());
        let area = DirectionalAreaSet::new(AreaShape::square(1));
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(15);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng);
        ctx.resolve_area(Some(caster), THERE, Some(&area), &params, &flat(10));
        let report = ctx.into_report();
        assert_eq!(hooks.tiles.load(Ordering::Relaxed), 9);
        assert_eq!(hooks.targets.load(Ordering::Relaxed), 1);
        assert_eq!(report.applied_to(orc), 10);
    }

    #[derive(Debug)]
    struct SparedNames(&'static str);

    impl LegalityHook for SparedNames {
        fn check_target(&self, _attacker: Option<&Creature>, target: &Creature) -> Result<(), ReturnValue> {
            if target.name == self.0 {
                return Err(ReturnValue::YouMayNotAttackThisCreature);
            }
            Ok(())
        }
    }

    #[test]
    fn legality_hook_spares_its_targets_inside_an_area() {
        let mut world = open_world();
        let caster = spawn_player(&mut world, "Sorcerer", HERE);
        let guard = spawn_monster(&mut world, "guard", THERE);
        let orc = spawn_monster(&mut world, "orc", Position::new(102, 100, 7));
        let area = DirectionalAreaSet::new(AreaShape::square(1));
        let hook = SparedNames("guard");
        let config = CombatConfig::default();
        let mut rng = CombatRng::from_seed(16);
        let mut ctx = CombatContext::new(&mut world, &config, &mut rng).with_legality_hook(&hook);
        ctx.resolve_area(Some(caster), THERE, Some(&area), &CombatParams::new(DamageType::Ice), &flat(12));
        let report = ctx.into_report();
        assert_eq!(report.applied_to(orc), 12);
        assert!(report.hits_on(guard).next().is_none());
        assert!(report
            .rejections
            .iter()
            .any(|rejection| rejection.target == Some(guard)));
    }
}
