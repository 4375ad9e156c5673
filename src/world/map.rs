use crate::entities::creature::CreatureId;
use crate::entities::item::ItemTypeId;
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tile-level combat classification. Read-only for the combat engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Protection,
    NoPvp,
    Pvp,
    NoLogout,
    #[default]
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileItem {
    pub type_id: ItemTypeId,
    pub owner: Option<CreatureId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    pub zone: Zone,
    pub blocks_projectile: bool,
    pub floor_change: bool,
    pub teleport: bool,
    pub items: Vec<TileItem>,
    /// Stacking order, topmost first. A creature entering the tile goes on top.
    pub creatures: Vec<CreatureId>,
    /// Materialized on demand by an area effect over empty ground.
    pub is_static: bool,
}

impl Tile {
    pub fn new(position: Position, zone: Zone) -> Self {
        Self {
            position,
            zone,
            blocks_projectile: false,
            floor_change: false,
            teleport: false,
            items: Vec::new(),
            creatures: Vec::new(),
            is_static: false,
        }
    }

    pub fn new_static(position: Position) -> Self {
        Self {
            is_static: true,
            ..Self::new(position, Zone::Normal)
        }
    }

    pub fn top_creature(&self) -> Option<CreatureId> {
        self.creatures.first().copied()
    }

    pub fn push_creature(&mut self, id: CreatureId) {
        self.creatures.retain(|existing| *existing != id);
        self.creatures.insert(0, id);
    }

    pub fn remove_creature(&mut self, id: CreatureId) -> bool {
        let before = self.creatures.len();
        self.creatures.retain(|existing| *existing != id);
        before != self.creatures.len()
    }

    pub fn add_item(&mut self, item: TileItem) {
        self.items.push(item);
    }
}

/// Tile storage and sight queries consumed by the combat engine.
pub trait TileMap {
    fn tile(&self, position: Position) -> Option<&Tile>;

    fn tile_mut(&mut self, position: Position) -> Option<&mut Tile>;

    fn set_tile(&mut self, tile: Tile);

    /// Returns the tile at `position`, creating a static tile when none exists.
    fn ensure_tile(&mut self, position: Position) -> &mut Tile;

    fn has_line_of_sight(&self, from: Position, to: Position, floor_check: bool) -> bool;

    fn zone(&self, position: Position) -> Zone {
        self.tile(position).map(|tile| tile.zone).unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GridMap {
    pub tiles: HashMap<Position, Tile>,
}

impl GridMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Fills a rectangle on one floor with plain tiles of `zone`.
    pub fn fill(&mut self, from: Position, to: Position, zone: Zone) {
        let (min_x, max_x) = (from.x.min(to.x), from.x.max(to.x));
        let (min_y, max_y) = (from.y.min(to.y), from.y.max(to.y));
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let position = Position::new(x, y, from.z);
                self.tiles.insert(position, Tile::new(position, zone));
            }
        }
    }

    fn blocks_sight(&self, position: Position) -> bool {
        self.tiles
            .get(&position)
            .map(|tile| tile.blocks_projectile)
            .unwrap_or(false)
    }
}

impl TileMap for GridMap {
    fn tile(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.tiles.get_mut(&position)
    }

    fn set_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.position, tile);
    }

    fn ensure_tile(&mut self, position: Position) -> &mut Tile {
        self.tiles
            .entry(position)
            .or_insert_with(|| Tile::new_static(position))
    }

    fn has_line_of_sight(&self, from: Position, to: Position, floor_check: bool) -> bool {
        if floor_check && from.z != to.z {
            return false;
        }
        // Bresenham walk; both endpoints are exempt from the projectile check.
        let (mut x, mut y) = (i32::from(from.x), i32::from(from.y));
        let (x1, y1) = (i32::from(to.x), i32::from(to.y));
        let dx = (x1 - x).abs();
        let dy = -(y1 - y).abs();
        let sx = if x < x1 { 1 } else { -1 };
        let sy = if y < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if x == x1 && y == y1 {
                return true;
            }
            let doubled = err * 2;
            if doubled >= dy {
                err += dy;
                x += sx;
            }
            if doubled <= dx {
                err += dx;
                y += sy;
            }
            if x == x1 && y == y1 {
                return true;
            }
            let step = Position::new(x as u16, y as u16, to.z);
            if self.blocks_sight(step) {
                return false;
            }
        }
    }
}
