use crate::combat::conditions::{ConditionKind, ConditionSet};
use crate::combat::damage::DamageType;
use crate::combat::ledger::DamageLedger;
use crate::entities::inventory::Inventory;
use crate::entities::player::PlayerState;
use crate::entities::skills::SkillSet;
use crate::entities::stats::Stats;
use crate::world::position::{Direction, Position};
use std::fmt;

/// Handle into [`CreatureArena`]. A stale handle never resolves to a newer
/// creature reusing the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId {
    index: u32,
    generation: u32,
}

impl CreatureId {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureKind {
    Player,
    Npc,
    Monster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreatureFlags {
    pub cannot_be_attacked: bool,
    pub cannot_attack_players: bool,
    pub cannot_attack_monsters: bool,
    pub ignore_protection_zone: bool,
    /// Gamemaster ghost mode; hidden from anyone without `can_see_ghosts`.
    pub ghost: bool,
    pub can_see_ghosts: bool,
    pub can_see_invisible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub kind: CreatureKind,
    pub master: Option<CreatureId>,
    pub position: Position,
    pub direction: Direction,
    pub stats: Stats,
    pub level: u16,
    pub skills: SkillSet,
    pub vocation: u16,
    pub defense: u32,
    pub armor: u32,
    /// Defense rolls left this tick.
    pub block_charges: u8,
    pub max_block_charges: u8,
    pub damage_immunities: u16,
    pub condition_immunities: Vec<ConditionKind>,
    pub conditions: ConditionSet,
    pub inventory: Inventory,
    pub flags: CreatureFlags,
    pub ledger: DamageLedger,
    pub player: Option<PlayerState>,
}

impl Creature {
    pub fn new(name: &str, kind: CreatureKind, position: Position, stats: Stats) -> Self {
        Self {
            id: CreatureId::new(0, 0),
            name: name.to_string(),
            kind,
            master: None,
            position,
            direction: Direction::South,
            stats,
            level: 1,
            skills: SkillSet::default(),
            vocation: 0,
            defense: 0,
            armor: 0,
            block_charges: 1,
            max_block_charges: 1,
            damage_immunities: 0,
            condition_immunities: Vec::new(),
            conditions: ConditionSet::default(),
            inventory: Inventory::default(),
            flags: CreatureFlags::default(),
            ledger: DamageLedger::default(),
            player: None,
        }
    }

    pub fn player(name: &str, position: Position, stats: Stats, player: PlayerState) -> Self {
        Self {
            player: Some(player),
            ..Self::new(name, CreatureKind::Player, position, stats)
        }
    }

    pub fn monster(name: &str, position: Position, stats: Stats) -> Self {
        Self::new(name, CreatureKind::Monster, position, stats)
    }

    pub fn is_player(&self) -> bool {
        self.kind == CreatureKind::Player
    }

    pub fn is_monster(&self) -> bool {
        self.kind == CreatureKind::Monster
    }

    pub fn is_alive(&self) -> bool {
        !self.stats.is_dead()
    }

    /// The creature answering for this one's actions: its master, or itself.
    pub fn controller(&self) -> CreatureId {
        self.master.unwrap_or(self.id)
    }

    pub fn is_immune(&self, damage_type: DamageType) -> bool {
        let mask = damage_type.mask();
        mask != 0 && self.damage_immunities & mask == mask
    }

    pub fn is_condition_immune(&self, kind: ConditionKind) -> bool {
        self.condition_immunities.contains(&kind)
    }

    pub fn is_attackable(&self) -> bool {
        self.kind != CreatureKind::Npc && !self.flags.cannot_be_attacked
    }

    pub fn is_invisible(&self) -> bool {
        self.flags.ghost || self.conditions.has(ConditionKind::Invisible)
    }

    pub fn can_see(&self, other: &Creature) -> bool {
        if self.id == other.id {
            return true;
        }
        if other.flags.ghost && !self.flags.can_see_ghosts {
            return false;
        }
        !(other.is_invisible() && !self.can_see_invisible())
    }

    pub fn can_see_invisible(&self) -> bool {
        self.flags.can_see_invisible || self.flags.can_see_ghosts
    }

    pub fn in_fight(&self) -> bool {
        self.conditions.has(ConditionKind::InFight)
    }

    pub fn reset_block_charges(&mut self) {
        self.block_charges = self.max_block_charges;
    }

    /// Takes one defense roll if any are left this tick.
    pub fn take_block_charge(&mut self) -> bool {
        if self.block_charges == 0 {
            return false;
        }
        self.block_charges -= 1;
        true
    }

    /// Forgets recorded damage once the creature is whole and out of combat.
    pub fn clear_ledger_if_idle(&mut self) -> bool {
        if self.stats.is_full_health() && !self.in_fight() && !self.ledger.is_empty() {
            self.ledger.clear();
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    creature: Option<Creature>,
}

/// Generational storage for every creature in the world.
#[derive(Debug, Clone, Default)]
pub struct CreatureArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl CreatureArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut creature: Creature) -> CreatureId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let id = CreatureId::new(index, slot.generation);
        creature.id = id;
        slot.creature = Some(creature);
        self.len += 1;
        id
    }

    pub fn remove(&mut self, id: CreatureId) -> Option<Creature> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let creature = slot.creature.take()?;
        self.free.push(id.index);
        self.len -= 1;
        Some(creature)
    }

    pub fn get(&self, id: CreatureId) -> Option<&Creature> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.creature.as_ref()
    }

    pub fn get_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.creature.as_mut()
    }

    pub fn contains(&self, id: CreatureId) -> bool {
        self.get(id).is_some()
    }

    /// Resolves `id` only while the creature is still alive.
    pub fn alive(&self, id: CreatureId) -> Option<&Creature> {
        self.get(id).filter(|creature| creature.is_alive())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ids(&self) -> Vec<CreatureId> {
        self.iter().map(|creature| creature.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Creature> {
        self.slots.iter().filter_map(|slot| slot.creature.as_ref())
    }

    /// Whether the creature, or its master, is a player.
    pub fn is_player_controlled(&self, id: CreatureId) -> bool {
        let Some(creature) = self.get(id) else {
            return false;
        };
        if creature.is_player() {
            return true;
        }
        creature
            .master
            .and_then(|master| self.get(master))
            .map(|master| master.is_player())
            .unwrap_or(false)
    }

    /// The player answering for `id`: itself or its master.
    pub fn controlling_player(&self, id: CreatureId) -> Option<&Creature> {
        let creature = self.get(id)?;
        if creature.is_player() {
            return Some(creature);
        }
        let master = self.get(creature.master?)?;
        master.is_player().then_some(master)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat() -> Creature {
        Creature::monster("rat", Position::new(100, 100, 7), Stats::new(20, 0))
    }

    #[test]
    fn stale_handles_do_not_resolve_reused_slots() {
        let mut arena = CreatureArena::new();
        let first = arena.insert(rat());
        assert_eq!(arena.get(first).map(|creature| creature.id), Some(first));
        assert!(arena.remove(first).is_some());
        let second = arena.insert(rat());
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert!(arena.get(first).is_none());
        assert!(arena.remove(first).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn summons_answer_to_their_player_master() {
        let mut arena = CreatureArena::new();
        let player = arena.insert(Creature::player(
            "Knight",
            Position::new(100, 100, 7),
            Stats::new(200, 50),
            PlayerState::default(),
        ));
        let mut summon = rat();
        summon.master = Some(player);
        let summon = arena.insert(summon);
        let wild = arena.insert(rat());

        assert!(arena.is_player_controlled(summon));
        assert!(!arena.is_player_controlled(wild));
        assert_eq!(
            arena.controlling_player(summon).map(|creature| creature.id),
            Some(player)
        );
        assert_eq!(arena.get(summon).map(Creature::controller), Some(player));
    }

    #[test]
    fn immunity_masks_match_damage_types() {
        let mut creature = rat();
        creature.damage_immunities = DamageType::Fire.mask() | DamageType::Earth.mask();
        assert!(creature.is_immune(DamageType::Fire));
        assert!(!creature.is_immune(DamageType::Ice));
        assert!(!creature.is_immune(DamageType::Undefined));
    }

    #[test]
    fn block_charges_refill_per_tick() {
        let mut creature = rat();
        creature.max_block_charges = 2;
        creature.reset_block_charges();
        assert!(creature.take_block_charge());
        assert!(creature.take_block_charge());
        assert!(!creature.take_block_charge());
        creature.reset_block_charges();
        assert_eq!(creature.block_charges, 2);
    }

    #[test]
    fn npcs_are_never_attackable() {
        let npc = Creature::new("Sam", CreatureKind::Npc, Position::new(1, 1, 7), Stats::new(1, 0));
        assert!(!npc.is_attackable());
        assert!(rat().is_attackable());
    }
}
