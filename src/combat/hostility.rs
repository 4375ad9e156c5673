use crate::combat::conditions::{ConditionKind, ConditionTemplate};
use crate::combat::ledger::DeathEntry;
use crate::config::{CombatConfig, WorldType};
use crate::entities::creature::{Creature, CreatureId};
use crate::entities::player::SkullState;
use crate::world::map::Zone;
use crate::world::state::World;
use crate::world::time::GameClock;
use log::info;

/// The skull `viewer` sees on `subject`. An unmarked player who attacked the
/// viewer shows yellow to that viewer only.
pub fn skull_seen_by(viewer: &Creature, subject: &Creature) -> SkullState {
    let Some(state) = subject.player.as_ref() else {
        return SkullState::None;
    };
    if state.skull != SkullState::None {
        return state.skull;
    }
    if let Some(viewer_state) = viewer.player.as_ref() {
        if state.has_attacked(viewer.id) && !viewer_state.is_at_war_with(state) {
            return SkullState::Yellow;
        }
    }
    SkullState::None
}

pub fn add_in_fight(creature: &mut Creature, clock: &GameClock, duration_ms: u64) {
    creature
        .conditions
        .add(ConditionTemplate::timed(ConditionKind::InFight, duration_ms).instantiate(None, clock));
}

fn both_in_pvp_zone(world: &World, a: &Creature, b: &Creature) -> bool {
    world.zone_at(a.position) == Zone::Pvp && world.zone_at(b.position) == Zone::Pvp
}

/// Updates fight state and reputation after `attacker` hurt `target`.
pub fn on_attacked_creature(
    world: &mut World,
    config: &CombatConfig,
    attacker: CreatureId,
    target: CreatureId,
) {
    let clock = world.clock.clone();
    if let Some(target) = world.creatures.get_mut(target) {
        add_in_fight(target, &clock, config.fight_time_ms);
    }
    let Some(attacker_player) = world.creatures.controlling_player(attacker).map(|c| c.id) else {
        return;
    };
    if let Some(player) = world.creatures.get_mut(attacker_player) {
        add_in_fight(player, &clock, config.fight_time_ms);
    }
    let Some(target_player) = world.creatures.controlling_player(target).map(|c| c.id) else {
        return;
    };
    if target_player == attacker_player {
        return;
    }
    if let Some(player) = world.creatures.get_mut(target_player) {
        add_in_fight(player, &clock, config.fight_time_ms);
    }

    let (Some(a), Some(t)) = (
        world.creatures.get(attacker_player),
        world.creatures.get(target_player),
    ) else {
        return;
    };
    let (Some(a_state), Some(t_state)) = (a.player.as_ref(), t.player.as_ref()) else {
        return;
    };
    let in_pvp_zone = both_in_pvp_zone(world, a, t);
    let seen = skull_seen_by(a, t);
    let at_war = a_state.is_at_war_with(t_state);
    let guild_mate = a_state.is_guild_mate(t_state);
    let provoked = t_state.has_attacked(attacker_player);
    let target_skull = t_state.skull;
    let now = clock.now();

    let Some(state) = world
        .creatures
        .get_mut(attacker_player)
        .and_then(|creature| creature.player.as_mut())
    else {
        return;
    };
    if !guild_mate && config.world_type == WorldType::PvpEnforced {
        state.pz_locked = true;
    }
    if state.skull == SkullState::None && seen == SkullState::Yellow {
        state.add_attacked(target_player, now);
    } else if !provoked {
        state.pz_locked = true;
        if !in_pvp_zone && !at_war {
            state.add_attacked(target_player, now);
            if target_skull == SkullState::None && state.skull == SkullState::None {
                state.raise_skull(SkullState::White, &clock, config.white_skull_time_ms);
                info!("player {} marked white for attacking {}", attacker_player, target_player);
            }
        }
    }
}

/// Applies reputation consequences of `killer`'s contribution to a death.
/// Returns `true` when the kill was unjustified.
pub fn on_killed_creature(
    world: &mut World,
    config: &CombatConfig,
    killer: CreatureId,
    victim: CreatureId,
    entry: &DeathEntry,
) -> bool {
    let Some(killer_player) = world.creatures.controlling_player(killer).map(|c| c.id) else {
        return false;
    };
    let Some(victim_creature) = world.creatures.get(victim).filter(|c| c.is_player()) else {
        return false;
    };
    let Some(killer_creature) = world.creatures.get(killer_player) else {
        return false;
    };
    if killer_player == victim || both_in_pvp_zone(world, killer_creature, victim_creature) {
        return false;
    }
    let (Some(k_state), Some(v_state)) = (
        killer_creature.player.as_ref(),
        victim_creature.player.as_ref(),
    ) else {
        return false;
    };
    if k_state.is_guild_mate(v_state) {
        return false;
    }
    if !entry.is_justified || !killer_creature.in_fight() {
        return false;
    }
    if k_state.is_at_war_with(v_state) {
        return false;
    }
    let unjust = !v_state.has_attacked(killer_player) && v_state.skull == SkullState::None;

    let clock = world.clock.clone();
    let frag_window = clock.ticks_from_millis(config.frag_window_ms);
    let Some(creature) = world.creatures.get_mut(killer_player) else {
        return false;
    };
    if unjust {
        if let Some(state) = creature.player.as_mut() {
            let kills = state.add_unjustified_kill(clock.now(), frag_window);
            let skull = if config.kills_to_black_skull > 0 && kills >= config.kills_to_black_skull {
                Some(SkullState::Black)
            } else if config.kills_to_red_skull > 0 && kills >= config.kills_to_red_skull {
                Some(SkullState::Red)
            } else {
                None
            };
            if let Some(skull) = skull {
                state.raise_skull(skull, &clock, config.frag_window_ms);
                info!("player {} reached {:?} skull after {} unjustified kills", killer_player, skull, kills);
            }
        }
    }
    add_in_fight(creature, &clock, config.white_skull_time_ms);
    unjust
}
