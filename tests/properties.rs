use std::collections::VecDeque;

use homestead::{
    building::{ResourceAmounts, ResourceKind},
    grid::{footprint_cells, Grid, GridPos},
    pathfinding::{edge_count, find_path, PathOptions, NEIGHBORS},
    store::ResourceStore,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_grid(rng: &mut ChaCha8Rng, blocked: f64) -> Grid {
    let width = rng.gen_range(1..=16);
    let height = rng.gen_range(1..=16);
    let mut grid = Grid::new(width, height, 1.0);
    for x in 0..width as i32 {
        for y in 0..height as i32 {
            let cell = GridPos::new(x, y);
            if rng.gen_bool(blocked) {
                grid.set_occupied(cell, true);
            }
            if rng.gen_bool(0.15) {
                grid.set_road(cell, true);
            }
        }
    }
    grid
}

fn random_cell(rng: &mut ChaCha8Rng, grid: &Grid) -> GridPos {
    GridPos::new(
        rng.gen_range(0..grid.width() as i32),
        rng.gen_range(0..grid.height() as i32),
    )
}

/// Edge distance by plain BFS over the same moves, or `None` if unreachable.
fn bfs_distance(grid: &Grid, start: GridPos, goal: GridPos) -> Option<usize> {
    let mut dist = vec![usize::MAX; (grid.width() * grid.height()) as usize];
    let index = |p: GridPos| (p.y * grid.width() as i32 + p.x) as usize;
    let mut queue = VecDeque::from([start]);
    dist[index(start)] = 0;
    while let Some(current) = queue.pop_front() {
        if current == goal {
            return Some(dist[index(current)]);
        }
        for (dx, dy) in NEIGHBORS {
            let next = current.offset(dx, dy);
            if !grid.in_bounds(next) || dist[index(next)] != usize::MAX {
                continue;
            }
            if next != goal && !grid.is_walkable(next) {
                continue;
            }
            dist[index(next)] = dist[index(current)] + 1;
            queue.push_back(next);
        }
    }
    None
}

#[test]
fn walkable_iff_road_or_free() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..50 {
        let grid = random_grid(&mut rng, 0.4);
        for x in 0..grid.width() as i32 {
            for y in 0..grid.height() as i32 {
                let cell = GridPos::new(x, y);
                assert_eq!(
                    grid.is_walkable(cell),
                    grid.is_road_at(cell) || !grid.is_occupied(cell)
                );
            }
        }
    }
}

#[test]
fn area_validity_matches_cellwise_check() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..200 {
        let mut grid = random_grid(&mut rng, 0.1);
        let origin = GridPos::new(rng.gen_range(-2..18), rng.gen_range(-2..18));
        let size = (rng.gen_range(1..=4), rng.gen_range(1..=4));
        let expected = footprint_cells(origin, size)
            .all(|cell| grid.in_bounds(cell) && !grid.is_occupied(cell));
        assert_eq!(grid.is_area_valid_placement(origin, size), expected);

        if expected {
            grid.set_area_occupied(origin, size, true);
            assert!(footprint_cells(origin, size).all(|cell| !grid.is_valid_placement(cell)));
        }
    }
}

#[test]
fn path_length_is_bfs_distance_and_symmetric() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    for _ in 0..300 {
        let grid = random_grid(&mut rng, 0.3);
        let start = random_cell(&mut rng, &grid);
        let goal = random_cell(&mut rng, &grid);
        let path = find_path(&grid, start, goal, PathOptions::default());

        match bfs_distance(&grid, start, goal) {
            Some(distance) => {
                assert_eq!(edge_count(&path), distance);
                assert_eq!(path.first(), Some(&start));
                assert_eq!(path.last(), Some(&goal));
                for pair in path.windows(2) {
                    let (dx, dy) = (pair[1].x - pair[0].x, pair[1].y - pair[0].y);
                    assert!(dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0));
                }
            }
            None => assert!(path.is_empty()),
        }

        if grid.is_walkable(start) && grid.is_walkable(goal) {
            let back = find_path(&grid, goal, start, PathOptions::default());
            assert_eq!(back.len(), path.len());
        }
    }
}

#[test]
fn walled_off_goal_has_no_path() {
    let mut grid = Grid::new(9, 5, 1.0);
    for y in 0..5 {
        grid.set_occupied(GridPos::new(4, y), true);
    }
    assert!(find_path(&grid, GridPos::new(0, 2), GridPos::new(8, 2), PathOptions::default()).is_empty());

    grid.set_road(GridPos::new(4, 0), true);
    let path = find_path(&grid, GridPos::new(0, 2), GridPos::new(8, 2), PathOptions::default());
    assert!(path.contains(&GridPos::new(4, 0)));
}

#[test]
fn store_never_exceeds_caps_or_goes_negative() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let caps = ResourceAmounts::new(60, 80, 40);
    let mut store = ResourceStore::new(ResourceAmounts::new(10, 10, 10), caps);
    for _ in 0..2_000 {
        let amounts = ResourceAmounts::new(
            rng.gen_range(0..30),
            rng.gen_range(0..30),
            rng.gen_range(0..30),
        );
        if rng.gen_bool(0.5) {
            let before = store.amounts();
            let applied = store.add(amounts);
            for kind in ResourceKind::ALL {
                assert!(store.get(kind) <= store.cap(kind));
                assert_eq!(store.get(kind) - before.get(kind), applied.get(kind));
                assert!(applied.get(kind) <= amounts.get(kind));
            }
        } else if store.can_afford(amounts) {
            store.spend(amounts);
        }
        for kind in ResourceKind::ALL {
            assert!(store.get(kind) >= 0);
        }
    }
}
