use crate::entities::creature::CreatureId;
use crate::world::time::{GameClock, GameTick};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SkullState {
    #[default]
    None,
    Yellow,
    White,
    Red,
    Black,
}

/// Player-only combat state: reputation marks, secure mode and guild wars.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerState {
    pub skull: SkullState,
    pub skull_expires_at: Option<GameTick>,
    pub pz_locked: bool,
    pub secure_mode: bool,
    pub guild_id: Option<u32>,
    pub war_enemies: HashSet<u32>,
    pub login_tick: GameTick,
    /// Players this one attacked unprovoked, with the tick of the first attack.
    attacked: HashMap<CreatureId, GameTick>,
    unjustified_kills: Vec<GameTick>,
}

impl PlayerState {
    pub fn new(login_tick: GameTick) -> Self {
        Self {
            login_tick,
            secure_mode: true,
            ..Self::default()
        }
    }

    pub fn with_guild(mut self, guild_id: u32) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn has_attacked(&self, other: CreatureId) -> bool {
        self.attacked.contains_key(&other)
    }

    pub fn add_attacked(&mut self, other: CreatureId, now: GameTick) {
        self.attacked.entry(other).or_insert(now);
    }

    pub fn clear_attacked(&mut self) {
        self.attacked.clear();
    }

    pub fn is_at_war_with(&self, other: &PlayerState) -> bool {
        match (self.guild_id, other.guild_id) {
            (Some(_), Some(theirs)) => self.war_enemies.contains(&theirs),
            _ => false,
        }
    }

    pub fn is_guild_mate(&self, other: &PlayerState) -> bool {
        self.guild_id.is_some() && self.guild_id == other.guild_id
    }

    pub fn within_login_grace(&self, now: GameTick, grace_ticks: u64) -> bool {
        now.since(self.login_tick) < grace_ticks
    }

    pub fn unjustified_kill_count(&self) -> usize {
        self.unjustified_kills.len()
    }

    /// Records an unjustified kill and prunes kills older than the window.
    /// Returns the number of kills inside the window.
    pub fn add_unjustified_kill(&mut self, now: GameTick, window_ticks: u64) -> usize {
        self.unjustified_kills.push(now);
        self.prune_kills(now, window_ticks);
        self.unjustified_kills.len()
    }

    fn prune_kills(&mut self, now: GameTick, window_ticks: u64) {
        self.unjustified_kills
            .retain(|tick| now.since(*tick) < window_ticks);
    }

    /// Raises the skull, never lowering an existing harsher mark. The expiry
    /// only moves later.
    pub fn raise_skull(&mut self, skull: SkullState, clock: &GameClock, duration_ms: u64) {
        if skull < self.skull {
            return;
        }
        let deadline = clock.now().after(clock.ticks_from_millis(duration_ms));
        let next = match self.skull_expires_at {
            Some(current) if skull == self.skull => current.max(deadline),
            _ => deadline,
        };
        self.skull = skull;
        self.skull_expires_at = Some(next);
    }

    /// Drops an expired skull. Yellow marks never persist on the player itself.
    pub fn refresh(&mut self, now: GameTick) {
        if let Some(until) = self.skull_expires_at {
            if now >= until {
                self.skull_expires_at = None;
                self.skull = SkullState::None;
            }
        }
    }

    /// Called when the in-fight condition ends.
    pub fn leave_fight(&mut self) {
        self.pz_locked = false;
        self.clear_attacked();
        if self.skull == SkullState::White || self.skull == SkullState::Yellow {
            self.skull = SkullState::None;
            self.skull_expires_at = None;
        }
    }
}
