//! Tile grid: occupancy bits, road overlay, and world/grid conversions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer cell coordinate. Signed so callers can probe around the map edge
/// without pre-checking bounds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: GridPos) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Continuous position on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: WorldPos) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Step toward `target` by at most `max_step`, never overshooting.
    pub fn move_towards(self, target: WorldPos, max_step: f64) -> WorldPos {
        let dist = self.distance(target);
        if dist <= max_step || dist == 0.0 {
            return target;
        }
        let t = max_step / dist;
        WorldPos::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    occupied: bool,
    road: bool,
}

pub struct Grid {
    width: i32,
    height: i32,
    cell_size: f64,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: u32, height: u32, cell_size: f64) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            cell_size,
            cells: vec![Cell::default(); (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn height(&self) -> u32 {
        self.height as u32
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn world_to_grid(&self, world: WorldPos) -> GridPos {
        GridPos::new(
            (world.x / self.cell_size).floor() as i32,
            (world.y / self.cell_size).floor() as i32,
        )
    }

    /// Center of the cell in world space.
    pub fn grid_to_world(&self, pos: GridPos) -> WorldPos {
        WorldPos::new(
            pos.x as f64 * self.cell_size + self.cell_size * 0.5,
            pos.y as f64 * self.cell_size + self.cell_size * 0.5,
        )
    }

    /// Out-of-bounds cells report as occupied.
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.index(pos).map_or(true, |idx| self.cells[idx].occupied)
    }

    pub fn set_occupied(&mut self, pos: GridPos, occupied: bool) {
        if let Some(idx) = self.index(pos) {
            self.cells[idx].occupied = occupied;
        }
    }

    pub fn is_valid_placement(&self, pos: GridPos) -> bool {
        self.in_bounds(pos) && !self.is_occupied(pos)
    }

    /// True iff every cell of the `width × height` rectangle at `origin` is
    /// in bounds and unoccupied.
    pub fn is_area_valid_placement(&self, origin: GridPos, size: (u32, u32)) -> bool {
        if size.0 == 0 || size.1 == 0 {
            return false;
        }
        footprint_cells(origin, size).all(|cell| self.is_valid_placement(cell))
    }

    pub fn set_area_occupied(&mut self, origin: GridPos, size: (u32, u32), occupied: bool) {
        for cell in footprint_cells(origin, size) {
            self.set_occupied(cell, occupied);
        }
    }

    pub fn is_road_at(&self, pos: GridPos) -> bool {
        self.index(pos).map_or(false, |idx| self.cells[idx].road)
    }

    pub fn set_road(&mut self, pos: GridPos, road: bool) {
        if let Some(idx) = self.index(pos) {
            self.cells[idx].road = road;
        }
    }

    /// Road first, then the occupancy bit.
    pub fn is_walkable(&self, pos: GridPos) -> bool {
        match self.index(pos) {
            Some(idx) => {
                let cell = self.cells[idx];
                cell.road || !cell.occupied
            }
            None => false,
        }
    }
}

/// Cells of a rectangle in x-major order.
pub fn footprint_cells(origin: GridPos, size: (u32, u32)) -> impl Iterator<Item = GridPos> {
    let (w, h) = (size.0 as i32, size.1 as i32);
    (0..w).flat_map(move |dx| (0..h).map(move |dy| origin.offset(dx, dy)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_grid_roundtrip_hits_cell_center() {
        let grid = Grid::new(10, 10, 2.0);
        let center = grid.grid_to_world(GridPos::new(3, 4));
        assert_eq!(center, WorldPos::new(7.0, 9.0));
        assert_eq!(grid.world_to_grid(center), GridPos::new(3, 4));
        assert_eq!(grid.world_to_grid(WorldPos::new(-0.1, 0.0)), GridPos::new(-1, 0));
    }

    #[test]
    fn area_validity_rejects_partial_overlap_and_edges() {
        let mut grid = Grid::new(5, 5, 1.0);
        assert!(grid.is_area_valid_placement(GridPos::new(3, 3), (2, 2)));
        assert!(!grid.is_area_valid_placement(GridPos::new(4, 4), (2, 2)));
        assert!(!grid.is_area_valid_placement(GridPos::new(-1, 0), (1, 1)));

        grid.set_occupied(GridPos::new(4, 3), true);
        assert!(!grid.is_area_valid_placement(GridPos::new(3, 3), (2, 2)));
        assert!(grid.is_area_valid_placement(GridPos::new(0, 0), (3, 3)));
    }

    #[test]
    fn road_is_walkable_even_when_occupied() {
        let mut grid = Grid::new(3, 3, 1.0);
        let cell = GridPos::new(1, 1);
        grid.set_occupied(cell, true);
        assert!(!grid.is_walkable(cell));
        grid.set_road(cell, true);
        assert!(grid.is_walkable(cell));
        assert!(!grid.is_valid_placement(cell));
    }

    #[test]
    fn out_of_bounds_is_never_walkable_or_road() {
        let grid = Grid::new(2, 2, 1.0);
        let outside = GridPos::new(2, 0);
        assert!(!grid.is_walkable(outside));
        assert!(!grid.is_road_at(outside));
        assert!(grid.is_occupied(outside));
    }

    #[test]
    fn move_towards_does_not_overshoot() {
        let from = WorldPos::new(0.0, 0.0);
        let to = WorldPos::new(3.0, 4.0);
        assert_eq!(from.move_towards(to, 10.0), to);
        let step = from.move_towards(to, 2.5);
        assert!((step.distance(from) - 2.5).abs() < 1e-9);
    }
}
