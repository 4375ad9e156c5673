use crate::entities::creature::{Creature, CreatureArena, CreatureId};
use crate::world::map::{GridMap, Tile, TileMap, Zone};
use crate::world::position::Position;
use crate::world::time::{GameClock, GameTick};
use crate::world::viewport::{ViewRange, Viewport};

/// Map, creatures and clock as seen by the combat engine.
pub struct World {
    pub map: Box<dyn TileMap>,
    pub creatures: CreatureArena,
    pub clock: GameClock,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("creatures", &self.creatures.len())
            .field("now", &self.clock.now())
            .finish()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(GridMap::new(), GameClock::default())
    }
}

impl World {
    pub fn new<M: TileMap + 'static>(map: M, clock: GameClock) -> Self {
        Self {
            map: Box::new(map),
            creatures: CreatureArena::new(),
            clock,
        }
    }

    pub fn now(&self) -> GameTick {
        self.clock.now()
    }

    /// Adds `creature` to the arena and puts it on top of its tile's stack.
    pub fn spawn(&mut self, creature: Creature) -> CreatureId {
        let position = creature.position;
        let id = self.creatures.insert(creature);
        self.map.ensure_tile(position).push_creature(id);
        id
    }

    pub fn despawn(&mut self, id: CreatureId) -> Option<Creature> {
        let creature = self.creatures.remove(id)?;
        if let Some(tile) = self.map.tile_mut(creature.position) {
            tile.remove_creature(id);
        }
        Some(creature)
    }

    pub fn move_creature(&mut self, id: CreatureId, to: Position) -> bool {
        let Some(creature) = self.creatures.get_mut(id) else {
            return false;
        };
        let from = creature.position;
        creature.position = to;
        if let Some(tile) = self.map.tile_mut(from) {
            tile.remove_creature(id);
        }
        self.map.ensure_tile(to).push_creature(id);
        true
    }

    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(id)
    }

    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(id)
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.map.tile(position)
    }

    pub fn zone_at(&self, position: Position) -> Zone {
        self.map.zone(position)
    }

    /// Players whose viewport covers `position`, in arena order.
    pub fn observers(&self, position: Position, range: ViewRange) -> Vec<CreatureId> {
        self.creatures
            .iter()
            .filter(|creature| creature.is_player())
            .filter(|creature| Viewport::around(creature.position, range).contains(position))
            .map(|creature| creature.id)
            .collect()
    }
}
