use crate::combat::damage::DamageType;
use crate::combat::ledger::DeathEntry;
use crate::combat::legality::ReturnValue;
use crate::combat::mitigation::BlockOutcome;
use crate::entities::creature::CreatureId;
use crate::entities::item::ItemTypeId;
use crate::world::position::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatHit {
    pub target: CreatureId,
    pub attacker: Option<CreatureId>,
    pub damage_type: DamageType,
    pub attempted_damage: u32,
    pub applied_damage: u32,
    pub block: BlockOutcome,
    /// Set on the follow-up hit sent back by reflection.
    pub reflected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicEffect {
    pub position: Position,
    pub effect: u8,
    pub observers: Vec<CreatureId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceEffect {
    pub from: Position,
    pub to: Position,
    pub effect: u8,
    pub observers: Vec<CreatureId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlacement {
    pub position: Position,
    pub item: ItemTypeId,
    pub owner: Option<CreatureId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathReport {
    pub victim: CreatureId,
    pub name: String,
    pub kill_list: Vec<DeathEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub target: Option<CreatureId>,
    pub position: Position,
    pub reason: ReturnValue,
}

/// Everything one combat resolution did, for the caller to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CombatReport {
    pub positions: Vec<Position>,
    pub hits: Vec<CombatHit>,
    pub magic_effects: Vec<MagicEffect>,
    pub distance_effects: Vec<DistanceEffect>,
    pub fields: Vec<FieldPlacement>,
    pub deaths: Vec<DeathReport>,
    pub rejections: Vec<Rejection>,
}

impl CombatReport {
    pub fn hits_on(&self, target: CreatureId) -> impl Iterator<Item = &CombatHit> {
        self.hits.iter().filter(move |hit| hit.target == target)
    }

    pub fn applied_to(&self, target: CreatureId) -> u32 {
        self.hits_on(target).map(|hit| hit.applied_damage).sum()
    }

    pub fn died(&self, victim: CreatureId) -> bool {
        self.deaths.iter().any(|death| death.victim == victim)
    }
}
