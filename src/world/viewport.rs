use crate::world::position::Position;

/// Half extents of the area a spectator can see around its own position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRange {
    pub x: u16,
    pub y: u16,
}

impl Default for ViewRange {
    fn default() -> Self {
        // Classic clients show an 18x14 tile viewport.
        Self { x: 8, y: 6 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub center: Position,
    pub min: Position,
    pub max: Position,
}

impl Viewport {
    pub fn around(center: Position, range: ViewRange) -> Self {
        let min = Position {
            x: center.x.saturating_sub(range.x),
            y: center.y.saturating_sub(range.y),
            z: center.z,
        };
        // The client shows one more column and row towards the south-east.
        let max = Position {
            x: center.x.saturating_add(range.x.saturating_add(1)),
            y: center.y.saturating_add(range.y.saturating_add(1)),
            z: center.z,
        };
        Self { center, min, max }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.z == self.center.z
            && position.x >= self.min.x
            && position.x <= self.max.x
            && position.y >= self.min.y
            && position.y <= self.max.y
    }
}
