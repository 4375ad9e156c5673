use crate::combat::hooks::LegalityHook;
use crate::combat::hostility::skull_seen_by;
use crate::config::{CombatConfig, WorldType};
use crate::entities::creature::{Creature, CreatureKind};
use crate::entities::player::SkullState;
use crate::world::map::{Tile, Zone};
use crate::world::state::World;
use thiserror::Error;

/// Reason a combat action was refused. Messages are shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReturnValue {
    #[error("There is not enough room.")]
    NotEnoughRoom,
    #[error("First go downstairs.")]
    FirstGoDownstairs,
    #[error("First go upstairs.")]
    FirstGoUpstairs,
    #[error("This action is not permitted in a protection zone.")]
    ActionNotPermittedInProtectionZone,
    #[error("You may not attack a person in a protection zone.")]
    YouMayNotAttackAPersonInProtectionZone,
    #[error("You may not attack a person while you are in a protection zone.")]
    YouMayNotAttackAPersonWhileInProtectionZone,
    #[error("This action is not permitted in a non pvp zone.")]
    ActionNotPermittedInNoPvpZone,
    #[error("You may not attack this person.")]
    YouMayNotAttackThisPlayer,
    #[error("You may not attack this creature.")]
    YouMayNotAttackThisCreature,
    #[error("You may not attack yourself.")]
    YouMayNotAttackYourself,
    #[error("Turn secure mode off if you really want to attack unmarked players.")]
    TurnSecureModeToAttackUnmarkedPlayers,
    #[error("Sorry, not possible.")]
    NotPossible,
}

/// Read-only legality checks over one world snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Legality<'a> {
    pub world: &'a World,
    pub config: &'a CombatConfig,
    pub hook: Option<&'a dyn LegalityHook>,
}

impl<'a> Legality<'a> {
    pub fn new(world: &'a World, config: &'a CombatConfig) -> Self {
        Self {
            world,
            config,
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: Option<&'a dyn LegalityHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn can_affect_tile(
        &self,
        caster: Option<&Creature>,
        tile: &Tile,
        aggressive: bool,
    ) -> Result<(), ReturnValue> {
        if tile.blocks_projectile || tile.floor_change || tile.teleport {
            return Err(ReturnValue::NotEnoughRoom);
        }
        let Some(caster) = caster else {
            return Ok(());
        };
        if let Some(hook) = self.hook {
            hook.check_tile(Some(caster), tile, aggressive)?;
        }
        if caster.position.z < tile.position.z {
            return Err(ReturnValue::FirstGoDownstairs);
        }
        if caster.position.z > tile.position.z {
            return Err(ReturnValue::FirstGoUpstairs);
        }
        if !aggressive {
            return Ok(());
        }
        if tile.zone == Zone::Protection && !caster.flags.ignore_protection_zone {
            return Err(ReturnValue::ActionNotPermittedInProtectionZone);
        }
        Ok(())
    }

    /// Whether an aggressive action by `attacker` may touch `target`.
    pub fn can_affect_creature(
        &self,
        attacker: Option<&Creature>,
        target: &Creature,
    ) -> Result<(), ReturnValue> {
        let Some(attacker) = attacker else {
            return Ok(());
        };
        if let Some(hook) = self.hook {
            hook.check_target(Some(attacker), target)?;
        }
        let refusal = if target.is_player() {
            ReturnValue::YouMayNotAttackThisPlayer
        } else {
            ReturnValue::YouMayNotAttackThisCreature
        };
        if !target.is_attackable() || !attacker.can_see(target) {
            return Err(refusal);
        }
        if attacker.master == Some(target.id) {
            return Err(ReturnValue::YouMayNotAttackThisCreature);
        }
        if let Some(target_state) = &target.player {
            let grace_ticks = self.world.clock.ticks_from_millis(self.config.login_grace_ms);
            if target_state.within_login_grace(self.world.now(), grace_ticks)
                && !target_state.has_attacked(attacker.id)
            {
                return Err(refusal);
            }
        }

        let creatures = &self.world.creatures;
        let attacker_is_pc = creatures.is_player_controlled(attacker.id);
        let target_is_pc = creatures.is_player_controlled(target.id);
        if !attacker_is_pc && !target_is_pc && !self.config.monster_friendly_fire {
            return Err(ReturnValue::YouMayNotAttackThisCreature);
        }
        if target_is_pc && attacker.flags.cannot_attack_players {
            return Err(refusal);
        }
        if !target_is_pc && attacker.flags.cannot_attack_monsters {
            return Err(refusal);
        }

        let target_zone = self.world.zone_at(target.position);
        let attacker_zone = self.world.zone_at(attacker.position);
        if target_zone == Zone::Protection && !attacker.flags.ignore_protection_zone {
            return Err(if target.is_player() {
                ReturnValue::YouMayNotAttackAPersonInProtectionZone
            } else {
                ReturnValue::ActionNotPermittedInProtectionZone
            });
        }

        if attacker_is_pc && target_is_pc {
            let (Some(attacker_player), Some(target_player)) = (
                creatures.controlling_player(attacker.id),
                creatures.controlling_player(target.id),
            ) else {
                return Ok(());
            };
            if attacker_player.id == target_player.id {
                return Err(ReturnValue::YouMayNotAttackThisCreature);
            }
            if attacker_zone == Zone::Protection && !attacker.flags.ignore_protection_zone {
                return Err(ReturnValue::YouMayNotAttackAPersonWhileInProtectionZone);
            }
            if self.is_protected(attacker_player, target_player) {
                return Err(ReturnValue::YouMayNotAttackThisPlayer);
            }
            if target_zone == Zone::NoPvp || attacker_zone == Zone::NoPvp {
                return Err(ReturnValue::ActionNotPermittedInNoPvpZone);
            }
            if self.config.world_type == WorldType::NoPvp
                && !self.is_in_pvp_zone(attacker, target)
                && !at_war(attacker_player, target_player)
            {
                return Err(refusal);
            }
        }
        Ok(())
    }

    /// Whether `attacker` may pick `target` as its attack target.
    pub fn can_select_target(&self, attacker: &Creature, target: &Creature) -> Result<(), ReturnValue> {
        if attacker.id == target.id {
            return Err(ReturnValue::YouMayNotAttackYourself);
        }
        if let Some(hook) = self.hook {
            hook.check_target(Some(attacker), target)?;
        }
        if let Some(player) = attacker.player.as_ref() {
            let ignores_pz = attacker.flags.ignore_protection_zone;
            if self.world.zone_at(attacker.position) == Zone::Protection && !ignores_pz {
                return Err(ReturnValue::ActionNotPermittedInProtectionZone);
            }
            if self.world.zone_at(target.position) == Zone::Protection && !ignores_pz {
                return Err(if target.is_player() {
                    ReturnValue::YouMayNotAttackAPersonInProtectionZone
                } else {
                    ReturnValue::ActionNotPermittedInProtectionZone
                });
            }
            if let Some(target_player) = self.world.creatures.controlling_player(target.id) {
                if player.secure_mode
                    && target_player.id != attacker.id
                    && skull_seen_by(attacker, target_player) == SkullState::None
                    && !self.is_in_pvp_zone(attacker, target)
                    && !at_war(attacker, target_player)
                {
                    return Err(ReturnValue::TurnSecureModeToAttackUnmarkedPlayers);
                }
            }
        }
        if target.kind == CreatureKind::Npc && !self.world.creatures.is_player_controlled(target.id) {
            return Err(ReturnValue::YouMayNotAttackThisCreature);
        }
        self.can_affect_creature(Some(attacker), target)
    }

    /// Both sides stand in a hardcore PvP zone.
    pub fn is_in_pvp_zone(&self, attacker: &Creature, target: &Creature) -> bool {
        self.world.zone_at(attacker.position) == Zone::Pvp
            && self.world.zone_at(target.position) == Zone::Pvp
    }

    /// Player-versus-player exemptions that hold outside PvP zones.
    pub fn is_protected(&self, attacker: &Creature, target: &Creature) -> bool {
        let (Some(attacker_state), Some(target_state)) = (&attacker.player, &target.player) else {
            return false;
        };
        if self.is_in_pvp_zone(attacker, target) {
            return false;
        }
        let protection_level = self.config.protection_level;
        if attacker.level < protection_level || target.level < protection_level {
            return true;
        }
        let allows_pvp = |creature: &Creature| {
            self.config
                .vocation(creature.vocation)
                .map(|vocation| vocation.allows_pvp)
                .unwrap_or(true)
        };
        if !allows_pvp(attacker) || !allows_pvp(target) {
            return true;
        }
        if attacker_state.skull == SkullState::Black
            && skull_seen_by(attacker, target) == SkullState::None
        {
            return true;
        }
        let grace_ticks = self.world.clock.ticks_from_millis(self.config.login_grace_ms);
        target_state.within_login_grace(self.world.now(), grace_ticks)
            && !target_state.has_attacked(attacker.id)
    }
}

fn at_war(a: &Creature, b: &Creature) -> bool {
    match (&a.player, &b.player) {
        (Some(ours), Some(theirs)) => ours.is_at_war_with(theirs),
        _ => false,
    }
}
