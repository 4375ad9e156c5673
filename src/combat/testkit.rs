//! World fixtures shared by the combat tests.

use crate::entities::creature::{Creature, CreatureId};
use crate::entities::player::PlayerState;
use crate::entities::stats::Stats;
use crate::world::map::{GridMap, Zone};
use crate::world::position::Position;
use crate::world::state::World;
use crate::world::time::{GameClock, GameTick};

pub const HERE: Position = Position::new(100, 100, 7);
pub const THERE: Position = Position::new(101, 100, 7);

/// A plain 41x41 floor with the clock well past any login grace.
pub fn open_world() -> World {
    let mut map = GridMap::new();
    map.fill(Position::new(80, 80, 7), Position::new(120, 120, 7), Zone::Normal);
    let mut world = World::new(map, GameClock::default());
    world.clock.advance(1_000);
    world
}

pub fn spawn_player(world: &mut World, name: &str, position: Position) -> CreatureId {
    let mut creature = Creature::player(
        name,
        position,
        Stats::new(500, 200),
        PlayerState::new(GameTick(0)),
    );
    creature.level = 50;
    world.spawn(creature)
}

pub fn spawn_monster(world: &mut World, name: &str, position: Position) -> CreatureId {
    world.spawn(Creature::monster(name, position, Stats::new(300, 0)))
}
