use crate::combat::damage::DamageType;
use crate::entities::creature::CreatureId;
use crate::world::time::{GameClock, GameTick};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Poison,
    Fire,
    Energy,
    Drown,
    Freeze,
    Dazzle,
    Curse,
    Bleeding,
    Paralyze,
    Haste,
    Invisible,
    InFight,
    Drunk,
    MagicShield,
}

impl ConditionKind {
    /// Damage type dealt by periodic kinds.
    pub fn damage_type(self) -> Option<DamageType> {
        match self {
            ConditionKind::Poison => Some(DamageType::Earth),
            ConditionKind::Fire => Some(DamageType::Fire),
            ConditionKind::Energy => Some(DamageType::Energy),
            ConditionKind::Drown => Some(DamageType::Drown),
            ConditionKind::Freeze => Some(DamageType::Ice),
            ConditionKind::Dazzle => Some(DamageType::Holy),
            ConditionKind::Curse => Some(DamageType::Death),
            ConditionKind::Bleeding => Some(DamageType::Physical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ConditionEffect {
    Periodic {
        tick_damage: u32,
        interval_ms: u64,
        ticks: u32,
    },
    Speed {
        delta: i32,
        duration_ms: u64,
    },
    Timed {
        duration_ms: u64,
    },
}

/// Authored condition carried by an ability; instantiated per application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionTemplate {
    pub kind: ConditionKind,
    #[serde(default)]
    pub sub_id: u32,
    #[serde(flatten)]
    pub effect: ConditionEffect,
}

impl ConditionTemplate {
    pub fn periodic(kind: ConditionKind, tick_damage: u32, interval_ms: u64, ticks: u32) -> Self {
        Self {
            kind,
            sub_id: 0,
            effect: ConditionEffect::Periodic {
                tick_damage,
                interval_ms,
                ticks,
            },
        }
    }

    pub fn timed(kind: ConditionKind, duration_ms: u64) -> Self {
        Self {
            kind,
            sub_id: 0,
            effect: ConditionEffect::Timed { duration_ms },
        }
    }

    pub fn speed(kind: ConditionKind, delta: i32, duration_ms: u64) -> Self {
        Self {
            kind,
            sub_id: 0,
            effect: ConditionEffect::Speed { delta, duration_ms },
        }
    }

    /// Stamps `owner` on a fresh instance starting at the clock's current tick.
    pub fn instantiate(&self, owner: Option<CreatureId>, clock: &GameClock) -> ConditionInstance {
        let start = clock.now();
        match self.effect {
            ConditionEffect::Periodic {
                tick_damage,
                interval_ms,
                ticks,
            } => {
                let interval_ticks = clock.ticks_from_millis(interval_ms).max(1);
                ConditionInstance::new(
                    self.kind,
                    self.sub_id,
                    owner,
                    tick_damage,
                    interval_ticks,
                    start,
                    interval_ticks.saturating_mul(u64::from(ticks.max(1))),
                )
            }
            ConditionEffect::Speed { delta, duration_ms } => {
                let mut instance = ConditionInstance::new(
                    self.kind,
                    self.sub_id,
                    owner,
                    0,
                    1,
                    start,
                    clock.ticks_from_millis(duration_ms),
                );
                instance.speed_delta = delta;
                instance
            }
            ConditionEffect::Timed { duration_ms } => ConditionInstance::new(
                self.kind,
                self.sub_id,
                owner,
                0,
                1,
                start,
                clock.ticks_from_millis(duration_ms),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionTick {
    pub kind: ConditionKind,
    pub owner: Option<CreatureId>,
    pub damage_type: DamageType,
    pub damage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionInstance {
    pub kind: ConditionKind,
    pub sub_id: u32,
    pub owner: Option<CreatureId>,
    pub tick_damage: u32,
    pub interval_ticks: u64,
    pub next_tick: GameTick,
    pub expires_at: GameTick,
    pub speed_delta: i32,
}

impl ConditionInstance {
    pub fn new(
        kind: ConditionKind,
        sub_id: u32,
        owner: Option<CreatureId>,
        tick_damage: u32,
        interval_ticks: u64,
        start_tick: GameTick,
        duration_ticks: u64,
    ) -> Self {
        let interval_ticks = interval_ticks.max(1);
        let duration_ticks = duration_ticks.max(1);
        Self {
            kind,
            sub_id,
            owner,
            tick_damage,
            interval_ticks,
            next_tick: start_tick,
            expires_at: start_tick.after(duration_ticks),
            speed_delta: 0,
        }
    }

    /// Damage due between the last processed tick and `now`, if any.
    pub fn apply_until(&mut self, now: GameTick) -> Option<u32> {
        if self.tick_damage == 0 || now < self.next_tick {
            return None;
        }
        let last_tick = if now >= self.expires_at {
            self.expires_at
        } else {
            now
        };
        if last_tick < self.next_tick {
            return None;
        }
        let available = last_tick.since(self.next_tick);
        let ticks = (available / self.interval_ticks).saturating_add(1);
        let damage = self.tick_damage.saturating_mul(ticks.min(u64::from(u32::MAX)) as u32);
        self.next_tick = self
            .next_tick
            .after(self.interval_ticks.saturating_mul(ticks));
        Some(damage)
    }

    pub fn is_expired(&self, now: GameTick) -> bool {
        now >= self.expires_at
    }

    pub fn merge_from(&mut self, other: ConditionInstance) {
        if self.kind != other.kind || self.sub_id != other.sub_id {
            return;
        }
        if other.expires_at > self.expires_at {
            self.expires_at = other.expires_at;
        }
        if other.next_tick < self.next_tick {
            self.next_tick = other.next_tick;
        }
        self.tick_damage = self.tick_damage.max(other.tick_damage);
        self.interval_ticks = self.interval_ticks.min(other.interval_ticks.max(1));
        if other.owner.is_some() {
            self.owner = other.owner;
        }
        if other.speed_delta.abs() > self.speed_delta.abs() {
            self.speed_delta = other.speed_delta;
        }
    }
}

/// Active conditions of one creature, keyed by `(kind, sub_id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet {
    entries: Vec<ConditionInstance>,
}

impl ConditionSet {
    pub fn add(&mut self, instance: ConditionInstance) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.kind == instance.kind && entry.sub_id == instance.sub_id)
        {
            Some(existing) => existing.merge_from(instance),
            None => self.entries.push(instance),
        }
    }

    pub fn has(&self, kind: ConditionKind) -> bool {
        self.entries.iter().any(|entry| entry.kind == kind)
    }

    pub fn get(&self, kind: ConditionKind) -> Option<&ConditionInstance> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    /// Removes every instance of `kind`. Returns whether anything was removed.
    pub fn remove(&mut self, kind: ConditionKind) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.kind != kind);
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn speed_delta(&self) -> i32 {
        self.entries.iter().map(|entry| entry.speed_delta).sum()
    }

    /// Collects periodic damage due at `now`.
    pub fn tick(&mut self, now: GameTick) -> Vec<ConditionTick> {
        let mut ticks = Vec::new();
        for entry in &mut self.entries {
            let Some(damage_type) = entry.kind.damage_type() else {
                continue;
            };
            if let Some(damage) = entry.apply_until(now) {
                ticks.push(ConditionTick {
                    kind: entry.kind,
                    owner: entry.owner,
                    damage_type,
                    damage,
                });
            }
        }
        ticks
    }

    /// Drops expired instances and returns their kinds.
    pub fn expire(&mut self, now: GameTick) -> Vec<ConditionKind> {
        let mut expired = Vec::new();
        self.entries.retain(|entry| {
            if entry.is_expired(now) {
                expired.push(entry.kind);
                false
            } else {
                true
            }
        });
        expired
    }
}
