//! Breadth-first search over the tile grid.
//!
//! Every step costs the same, so the returned path is shortest in edge count.
//! Neighbors are expanded in the fixed order of [`NEIGHBORS`] (the four
//! orthogonal moves, then the four diagonals); with a FIFO frontier this
//! order alone decides which of several equal-length paths comes back.

use std::collections::VecDeque;

use crate::grid::{Grid, GridPos};

/// Expansion order: E, W, N, S, then NE, SE, NW, SW (y grows "north").
pub const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

#[derive(Debug, Clone, Copy)]
pub struct PathOptions {
    /// Allow leaving a start cell that is not walkable.
    pub allow_start_blocked: bool,
    /// Allow arriving at a goal cell that is not walkable.
    pub allow_goal_blocked: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            allow_start_blocked: true,
            allow_goal_blocked: true,
        }
    }
}

/// Cells from `start` to `goal`, both inclusive. Empty when unreachable.
pub fn find_path(grid: &Grid, start: GridPos, goal: GridPos, options: PathOptions) -> Vec<GridPos> {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Vec::new();
    }
    if !options.allow_start_blocked && !grid.is_walkable(start) {
        return Vec::new();
    }
    if !options.allow_goal_blocked && !grid.is_walkable(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let width = grid.width() as usize;
    let index = |pos: GridPos| pos.y as usize * width + pos.x as usize;
    let mut came_from: Vec<Option<GridPos>> = vec![None; width * grid.height() as usize];
    let mut visited = vec![false; came_from.len()];
    let mut frontier = VecDeque::new();

    visited[index(start)] = true;
    frontier.push_back(start);

    let mut found = false;
    while let Some(current) = frontier.pop_front() {
        if current == goal {
            found = true;
            break;
        }
        for (dx, dy) in NEIGHBORS {
            let next = current.offset(dx, dy);
            if !grid.in_bounds(next) || visited[index(next)] {
                continue;
            }
            if next != goal && !grid.is_walkable(next) {
                continue;
            }
            visited[index(next)] = true;
            came_from[index(next)] = Some(current);
            frontier.push_back(next);
        }
    }

    if !found {
        return Vec::new();
    }

    let mut path = vec![goal];
    let mut step = goal;
    while step != start {
        match came_from[index(step)] {
            Some(prev) => {
                path.push(prev);
                step = prev;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

/// Number of moves in a path returned by [`find_path`].
pub fn edge_count(path: &[GridPos]) -> usize {
    path.len().saturating_sub(1)
}
