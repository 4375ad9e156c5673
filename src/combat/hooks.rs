use crate::combat::formula::{DamageRange, FormulaContext};
use crate::combat::legality::ReturnValue;
use crate::entities::creature::{Creature, CreatureId};
use crate::world::map::Tile;
use crate::world::position::Position;
use crate::world::state::World;
use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("{hook} hook failed: {reason}")]
    Failed { hook: &'static str, reason: String },
    #[error("caster lacks {resource} ({needed} needed, {available} available)")]
    InsufficientResource {
        resource: &'static str,
        needed: u32,
        available: u32,
    },
}

/// Reshapes the damage range computed by an ability's formula.
pub trait DamageFormulaProvider: Debug + Send + Sync {
    fn adjust(
        &self,
        caster: &mut Creature,
        context: &FormulaContext,
        range: DamageRange,
    ) -> Result<DamageRange, HookError>;
}

/// Runs once for every tile an ability affects.
pub trait TileEffectHook: Debug + Send + Sync {
    fn on_tile(
        &self,
        world: &mut World,
        caster: Option<CreatureId>,
        position: Position,
    ) -> Result<(), HookError>;
}

/// Runs once for every creature an ability resolves against.
pub trait TargetEffectHook: Debug + Send + Sync {
    fn on_target(
        &self,
        world: &mut World,
        caster: Option<CreatureId>,
        target: CreatureId,
    ) -> Result<(), HookError>;
}

/// Last word on a legality check that the built-in rules allowed.
pub trait LegalityHook: Debug + Send + Sync {
    fn check_tile(
        &self,
        _caster: Option<&Creature>,
        _tile: &Tile,
        _aggressive: bool,
    ) -> Result<(), ReturnValue> {
        Ok(())
    }

    fn check_target(&self, _attacker: Option<&Creature>, _target: &Creature) -> Result<(), ReturnValue> {
        Ok(())
    }
}
