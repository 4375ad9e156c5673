use crate::combat::damage::DamageType;
use crate::entities::creature::{Creature, CreatureArena, CreatureId};
use crate::world::time::GameTick;
use std::collections::{BTreeMap, HashSet};

/// Who dealt recorded damage. Environmental sources have no creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attacker {
    Environment,
    Creature(CreatureId),
}

impl From<Option<CreatureId>> for Attacker {
    fn from(value: Option<CreatureId>) -> Self {
        match value {
            Some(id) => Attacker::Creature(id),
            None => Attacker::Environment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub first_hit: GameTick,
    pub last_hit: GameTick,
    pub total: u64,
}

/// Per-victim damage history used to attribute a death.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageLedger {
    entries: BTreeMap<Attacker, LedgerEntry>,
    last_attacker: Option<Attacker>,
    last_damage_type: DamageType,
}

impl Default for DamageLedger {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            last_attacker: None,
            last_damage_type: DamageType::Undefined,
        }
    }
}

impl DamageLedger {
    pub fn record_damage(
        &mut self,
        attacker: Attacker,
        amount: u32,
        damage_type: DamageType,
        now: GameTick,
    ) {
        let entry = self.entries.entry(attacker).or_insert(LedgerEntry {
            first_hit: now,
            last_hit: now,
            total: 0,
        });
        entry.last_hit = now;
        if amount == 0 {
            return;
        }
        entry.total = entry.total.saturating_add(u64::from(amount));
        self.last_attacker = Some(attacker);
        self.last_damage_type = damage_type;
    }

    pub fn entry(&self, attacker: Attacker) -> Option<&LedgerEntry> {
        self.entries.get(&attacker)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Attacker, &LedgerEntry)> {
        self.entries.iter()
    }

    pub fn last_attacker(&self) -> Option<Attacker> {
        self.last_attacker
    }

    pub fn last_damage_type(&self) -> DamageType {
        self.last_damage_type
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_attacker = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Killer {
    Creature(CreatureId),
    /// Textual cause for a death with no living creature to blame.
    Cause(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathEntry {
    pub killer: Killer,
    pub damage: u64,
    /// Entry 0 is the final blow.
    pub is_last: bool,
    /// Set on the player contributors that answer for this death.
    pub is_justified: bool,
}

impl DeathEntry {
    pub fn creature(&self) -> Option<CreatureId> {
        match self.killer {
            Killer::Creature(id) => Some(id),
            Killer::Cause(_) => None,
        }
    }
}

/// Ordered list of contributors to `victim`'s death.
///
/// Entry 0 is the most recent attacker, or a textual cause when that attacker
/// is environmental or gone. The rest are contributors whose last hit falls
/// inside `window_ticks`, one per controlling creature, sorted by total damage
/// descending. The first `assist_cap + 1` player-controlled entries are
/// marked justified, each controlling player at most once.
pub fn compute_kill_list(
    creatures: &CreatureArena,
    victim: &Creature,
    now: GameTick,
    window_ticks: u64,
    assist_cap: usize,
) -> Vec<DeathEntry> {
    let ledger = &victim.ledger;
    let primary = match ledger.last_attacker() {
        Some(Attacker::Creature(id)) => creatures.alive(id).map(|creature| creature.id),
        _ => None,
    };

    let mut list = Vec::new();
    let mut controllers: HashSet<CreatureId> = HashSet::new();
    let mut named: HashSet<(String, Option<CreatureId>)> = HashSet::new();

    match primary.and_then(|id| creatures.get(id)) {
        Some(creature) => {
            controllers.insert(creature.controller());
            named.insert((creature.name.clone(), creature.master));
            list.push(DeathEntry {
                killer: Killer::Creature(creature.id),
                damage: ledger
                    .entry(Attacker::Creature(creature.id))
                    .map(|entry| entry.total)
                    .unwrap_or(0),
                is_last: true,
                is_justified: false,
            });
        }
        None => list.push(DeathEntry {
            killer: Killer::Cause(ledger.last_damage_type().cause_name().to_string()),
            damage: ledger
                .entry(Attacker::Environment)
                .map(|entry| entry.total)
                .unwrap_or(0),
            is_last: true,
            is_justified: false,
        }),
    }

    let mut assists = Vec::new();
    for (attacker, entry) in ledger.iter() {
        let Attacker::Creature(id) = *attacker else {
            continue;
        };
        if Some(id) == primary || now.since(entry.last_hit) > window_ticks {
            continue;
        }
        let Some(creature) = creatures.alive(id) else {
            continue;
        };
        if controllers.contains(&creature.controller()) {
            continue;
        }
        if !named.insert((creature.name.clone(), creature.master)) {
            continue;
        }
        controllers.insert(creature.controller());
        assists.push(DeathEntry {
            killer: Killer::Creature(id),
            damage: entry.total,
            is_last: false,
            is_justified: false,
        });
    }
    assists.sort_by(|a, b| b.damage.cmp(&a.damage));
    list.extend(assists);

    let mut justified_players = HashSet::new();
    for entry in list.iter_mut().take(assist_cap.saturating_add(1)) {
        let Some(id) = entry.creature() else {
            continue;
        };
        let Some(player) = creatures.controlling_player(id) else {
            continue;
        };
        if justified_players.insert(player.id) {
            entry.is_justified = true;
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::player::PlayerState;
    use crate::entities::stats::Stats;
    use crate::world::position::Position;

    fn spot() -> Position {
        Position::new(100, 100, 7)
    }

    fn player(arena: &mut CreatureArena, name: &str) -> CreatureId {
        arena.insert(Creature::player(
            name,
            spot(),
            Stats::new(200, 0),
            PlayerState::default(),
        ))
    }

    fn monster(arena: &mut CreatureArena, name: &str) -> CreatureId {
        arena.insert(Creature::monster(name, spot(), Stats::new(100, 0)))
    }

    #[test]
    fn zero_damage_refreshes_without_counting() {
        let mut ledger = DamageLedger::default();
        ledger.record_damage(Attacker::Environment, 0, DamageType::Fire, GameTick(1));
        let entry = ledger.entry(Attacker::Environment).expect("entry");
        assert_eq!(entry.total, 0);
        assert_eq!(ledger.last_attacker(), None);
        assert_eq!(ledger.last_damage_type(), DamageType::Undefined);
    }

    #[test]
    fn blocked_hits_keep_a_contributor_in_the_window() {
        let mut arena = CreatureArena::new();
        let old = player(&mut arena, "Old");
        let recent = player(&mut arena, "Recent");
        let mut victim = Creature::monster("orc", spot(), Stats::new(100, 0));
        victim.ledger.record_damage(Attacker::Creature(old), 10, DamageType::Physical, GameTick(1));
        victim.ledger.record_damage(Attacker::Creature(old), 0, DamageType::Physical, GameTick(500));
        victim.ledger.record_damage(Attacker::Creature(recent), 5, DamageType::Physical, GameTick(520));

        let entry = victim.ledger.entry(Attacker::Creature(old)).expect("entry");
        assert_eq!(entry.last_hit, GameTick(500));
        assert_eq!(entry.total, 10);
        assert_eq!(victim.ledger.last_attacker(), Some(Attacker::Creature(recent)));

        let list = compute_kill_list(&arena, &victim, GameTick(530), 100, 3);
        let killers: Vec<_> = list.iter().map(DeathEntry::creature).collect();
        assert_eq!(killers, vec![Some(recent), Some(old)]);
        assert_eq!(list[1].damage, 10);
    }

    #[test]
    fn hits_accumulate_per_attacker() {
        let mut ledger = DamageLedger::default();
        let id = CreatureId::new(3, 1);
        ledger.record_damage(Attacker::Creature(id), 10, DamageType::Physical, GameTick(1));
        ledger.record_damage(Attacker::Creature(id), 15, DamageType::Fire, GameTick(4));
        let entry = ledger.entry(Attacker::Creature(id)).expect("entry");
        assert_eq!(entry.total, 25);
        assert_eq!(entry.first_hit, GameTick(1));
        assert_eq!(entry.last_hit, GameTick(4));
        assert_eq!(ledger.last_damage_type(), DamageType::Fire);
    }

    #[test]
    fn kill_list_orders_assists_by_damage() {
        let mut arena = CreatureArena::new();
        let a = player(&mut arena, "A");
        let b = player(&mut arena, "B");
        let c = player(&mut arena, "C");
        let mut victim = Creature::monster("dragon", spot(), Stats::new(1000, 0));
        victim.ledger.record_damage(Attacker::Creature(a), 100, DamageType::Physical, GameTick(1));
        victim.ledger.record_damage(Attacker::Creature(b), 50, DamageType::Physical, GameTick(2));
        victim.ledger.record_damage(Attacker::Creature(c), 10, DamageType::Physical, GameTick(3));

        let list = compute_kill_list(&arena, &victim, GameTick(4), 100, 1);
        let killers: Vec<_> = list.iter().map(DeathEntry::creature).collect();
        assert_eq!(killers, vec![Some(c), Some(a), Some(b)]);
        assert!(list[0].is_last);
        assert!(list[0].is_justified && list[1].is_justified);
        assert!(!list[2].is_justified);
    }

    #[test]
    fn stale_contributors_fall_out_of_the_window() {
        let mut arena = CreatureArena::new();
        let old = player(&mut arena, "Old");
        let recent = player(&mut arena, "Recent");
        let mut victim = Creature::monster("orc", spot(), Stats::new(100, 0));
        victim.ledger.record_damage(Attacker::Creature(old), 90, DamageType::Physical, GameTick(0));
        victim.ledger.record_damage(Attacker::Creature(recent), 10, DamageType::Physical, GameTick(150));

        let list = compute_kill_list(&arena, &victim, GameTick(160), 100, 3);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].creature(), Some(recent));
    }

    #[test]
    fn environmental_final_blow_names_the_cause() {
        let mut arena = CreatureArena::new();
        let a = monster(&mut arena, "wolf");
        let mut victim = Creature::monster("deer", spot(), Stats::new(100, 0));
        victim.ledger.record_damage(Attacker::Creature(a), 30, DamageType::Physical, GameTick(1));
        victim.ledger.record_damage(Attacker::Environment, 70, DamageType::Fire, GameTick(2));

        let list = compute_kill_list(&arena, &victim, GameTick(3), 100, 1);
        assert_eq!(list[0].killer, Killer::Cause("a burning field".to_string()));
        assert_eq!(list[1].creature(), Some(a));
        assert!(!list[1].is_justified);
    }

    #[test]
    fn dead_last_attacker_becomes_a_cause() {
        let mut arena = CreatureArena::new();
        let a = monster(&mut arena, "wasp");
        let mut victim = Creature::monster("deer", spot(), Stats::new(100, 0));
        victim.ledger.record_damage(Attacker::Creature(a), 30, DamageType::Earth, GameTick(1));
        arena.remove(a);

        let list = compute_kill_list(&arena, &victim, GameTick(2), 100, 1);
        assert_eq!(list.len(), 1);
        assert!(matches!(list[0].killer, Killer::Cause(_)));
    }

    #[test]
    fn summon_and_master_count_once() {
        let mut arena = CreatureArena::new();
        let master = player(&mut arena, "Druid");
        let mut summon = Creature::monster("bear", spot(), Stats::new(100, 0));
        summon.master = Some(master);
        let summon = arena.insert(summon);
        let mut victim = Creature::monster("orc", spot(), Stats::new(100, 0));
        victim.ledger.record_damage(Attacker::Creature(master), 60, DamageType::Physical, GameTick(1));
        victim.ledger.record_damage(Attacker::Creature(summon), 40, DamageType::Physical, GameTick(2));

        let list = compute_kill_list(&arena, &victim, GameTick(3), 100, 2);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].creature(), Some(summon));
        assert!(list[0].is_justified);
    }

    #[test]
    fn same_named_wild_monsters_collapse() {
        let mut arena = CreatureArena::new();
        let first = monster(&mut arena, "rat");
        let second = monster(&mut arena, "rat");
        let killer = monster(&mut arena, "cat");
        let mut victim = Creature::monster("mouse", spot(), Stats::new(10, 0));
        victim.ledger.record_damage(Attacker::Creature(first), 3, DamageType::Physical, GameTick(1));
        victim.ledger.record_damage(Attacker::Creature(second), 4, DamageType::Physical, GameTick(1));
        victim.ledger.record_damage(Attacker::Creature(killer), 3, DamageType::Physical, GameTick(2));

        let list = compute_kill_list(&arena, &victim, GameTick(3), 100, 5);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].creature(), Some(killer));
    }
}
