//! Per-agent work loop: walk to work, harvest, walk to a drop-off, deposit,
//! and walk back.
//!
//! Agents hold building ids, never references. Every id is re-resolved
//! through the registry on use, and a building that has since been removed
//! is treated the same as one that was never known.

use std::f64::consts::PI;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::building::{Building, BuildingId, Production, ResourceAmounts, ResourceKind};
use crate::config::AgentConfig;
use crate::grid::{Grid, GridPos, WorldPos};
use crate::pathfinding::{find_path, PathOptions};
use crate::registry::BuildingRegistry;
use crate::store::ResourceStore;

/// Worker slots arranged around a building for display.
pub const WORK_SLOTS: u8 = 6;
const WORK_SLOT_RADIUS: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgentState {
    Idle,
    MovingToWork,
    Working,
    MovingToStorage,
    Depositing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Borrowed view of the town an agent acts on during one tick.
pub struct AgentEnv<'a> {
    pub grid: &'a Grid,
    pub registry: &'a mut BuildingRegistry,
    pub store: &'a mut ResourceStore,
    pub config: &'a AgentConfig,
}

#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    active: bool,
    state: AgentState,
    home: Option<BuildingId>,
    work: Option<BuildingId>,
    dropoff: Option<BuildingId>,
    working_at: Option<BuildingId>,
    position: WorldPos,
    path: Vec<GridPos>,
    path_index: usize,
    waypoint: WorldPos,
    pending_target: Option<GridPos>,
    timer: f64,
    cargo: ResourceAmounts,
    slot: u8,
}

impl Agent {
    pub(crate) fn parked(id: AgentId) -> Self {
        Self {
            id,
            active: false,
            state: AgentState::Idle,
            home: None,
            work: None,
            dropoff: None,
            working_at: None,
            position: WorldPos::default(),
            path: Vec::new(),
            path_index: 0,
            waypoint: WorldPos::default(),
            pending_target: None,
            timer: 0.0,
            cargo: ResourceAmounts::ZERO,
            slot: 0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn home(&self) -> Option<BuildingId> {
        self.home
    }

    pub fn work(&self) -> Option<BuildingId> {
        self.work
    }

    pub fn dropoff(&self) -> Option<BuildingId> {
        self.dropoff
    }

    pub fn position(&self) -> WorldPos {
        self.position
    }

    pub fn cargo(&self) -> ResourceAmounts {
        self.cargo
    }

    pub fn path(&self) -> &[GridPos] {
        &self.path
    }

    pub fn work_slot(&self) -> u8 {
        self.slot
    }

    /// Position nudged to this agent's slot around the workplace while
    /// working, so co-workers do not stack on one point.
    pub fn display_position(&self, cell_size: f64) -> WorldPos {
        if self.state != AgentState::Working {
            return self.position;
        }
        let angle = f64::from(self.slot) * (2.0 * PI / f64::from(WORK_SLOTS));
        let radius = WORK_SLOT_RADIUS * cell_size;
        WorldPos::new(
            self.position.x + radius * angle.cos(),
            self.position.y + radius * angle.sin(),
        )
    }

    /// Bind a parked agent to a home/work/drop-off triple and send it to
    /// work. Any previous state and cargo is discarded.
    pub(crate) fn activate(
        &mut self,
        home: BuildingId,
        work: BuildingId,
        dropoff: Option<BuildingId>,
        slot: u8,
        env: &mut AgentEnv<'_>,
    ) {
        *self = Agent::parked(self.id);
        self.active = true;
        self.home = Some(home);
        self.work = Some(work);
        self.dropoff = dropoff;
        self.slot = slot % WORK_SLOTS;

        let spawn = env
            .registry
            .get(home)
            .or_else(|| env.registry.get(work))
            .map(|building| building.origin)
            .unwrap_or_default();
        self.position = env.grid.grid_to_world(spawn);

        self.state = AgentState::MovingToWork;
        self.set_path_to_building(work, env);
        debug!(agent = self.id.0, work = %work, home = %home, "agent activated");
    }

    /// Return to the pool. The caller releases the workplace assignment.
    pub(crate) fn park(&mut self, registry: &mut BuildingRegistry) {
        self.stop_working(registry);
        *self = Agent::parked(self.id);
    }

    pub fn tick(&mut self, dt: f64, env: &mut AgentEnv<'_>) {
        if !self.active {
            return;
        }
        match self.state {
            AgentState::MovingToWork | AgentState::MovingToStorage => self.move_along_path(dt, env),
            AgentState::Working | AgentState::Depositing => self.tick_timer(dt, env),
            AgentState::Idle => {}
        }
    }

    fn move_along_path(&mut self, dt: f64, env: &mut AgentEnv<'_>) {
        if self.path.is_empty() {
            self.go_idle(env.registry);
            return;
        }

        let speed = self.current_speed(env.grid, env.config);
        self.position = self.position.move_towards(self.waypoint, speed * dt);
        if self.position.distance(self.waypoint) > env.config.waypoint_tolerance {
            return;
        }

        self.path_index += 1;
        if self.path_index >= self.path.len() {
            self.on_reached_destination(env);
            return;
        }
        self.waypoint = env.grid.grid_to_world(self.path[self.path_index]);
    }

    /// Full speed on a road, reduced speed elsewhere. Sampled every tick.
    fn current_speed(&self, grid: &Grid, config: &AgentConfig) -> f64 {
        let cell = grid.world_to_grid(self.position);
        if grid.is_road_at(cell) {
            config.move_speed
        } else {
            config.move_speed * config.ground_speed_multiplier
        }
    }

    fn on_reached_destination(&mut self, env: &mut AgentEnv<'_>) {
        if let Some(target) = self.pending_target.take() {
            self.set_path_to(target, env.grid);
            return;
        }

        match self.state {
            AgentState::MovingToWork => {
                let Some(work) = self.live_work(env.registry) else {
                    self.go_idle(env.registry);
                    return;
                };
                self.state = AgentState::Working;
                self.timer = work_cycle_seconds(env.registry.get(work), env.config);
                if let Some(building) = env.registry.get_mut(work) {
                    building.notify_work_started();
                    self.working_at = Some(work);
                }
                trace!(agent = self.id.0, work = %work, "started working");
            }
            AgentState::MovingToStorage => {
                if self.live_dropoff(env.registry).is_none() {
                    self.reroute_without_dropoff(env);
                    return;
                }
                self.state = AgentState::Depositing;
                self.timer = env.config.deposit_seconds;
                self.deposit(env.store);
            }
            _ => self.go_idle(env.registry),
        }
    }

    fn tick_timer(&mut self, dt: f64, env: &mut AgentEnv<'_>) {
        self.timer -= dt;
        if self.timer > 0.0 {
            return;
        }
        match self.state {
            AgentState::Working => self.finish_work_cycle(env),
            AgentState::Depositing => match self.live_work(env.registry) {
                Some(work) => {
                    self.state = AgentState::MovingToWork;
                    self.set_path_to_building(work, env);
                }
                None => self.go_idle(env.registry),
            },
            _ => {}
        }
    }

    fn finish_work_cycle(&mut self, env: &mut AgentEnv<'_>) {
        let Some(work) = self.live_work(env.registry) else {
            self.abandon_work(env);
            return;
        };

        self.dropoff = env.registry.dropoff_for(work);

        let capacity = env.config.carry_capacity;
        if !self.is_cargo_full(capacity) {
            self.harvest(work, env.registry, env.store.production_efficiency(), env.config);
        }

        if self.is_cargo_full(capacity) {
            if let Some(dropoff) = self.dropoff {
                self.stop_working(env.registry);
                self.state = AgentState::MovingToStorage;
                self.set_path_to_building(dropoff, env);
                return;
            }
        }
        self.timer = work_cycle_seconds(env.registry.get(work), env.config);
    }

    /// Pull one cycle's yield from `work` into cargo, clamped to the carry
    /// capacity. `efficiency` scales per-second production only; harvest
    /// batches are fixed. Returns whether anything was collected.
    pub(crate) fn harvest(
        &mut self,
        work: BuildingId,
        registry: &mut BuildingRegistry,
        efficiency: f64,
        config: &AgentConfig,
    ) -> bool {
        let Some(building) = registry.get_mut(work) else {
            return false;
        };
        let def = Arc::clone(&building.def);
        let mut collected = false;
        for kind in ResourceKind::ALL {
            let amount = match &def.production {
                Production::None => 0,
                Production::Continuous { per_second } => {
                    continuous_yield(per_second.get(kind) * efficiency, config.work_seconds)
                }
                Production::Harvest { per_cycle, .. } => {
                    let workers = def.required_workers.max(1) as f64;
                    let share = per_cycle.get(kind) / workers;
                    if share > 0.0 {
                        building.take_harvest_share(kind, share)
                    } else {
                        0
                    }
                }
            };
            let carried = self.cargo.get_mut(kind);
            let space = config.carry_capacity - *carried;
            if amount > 0 && space > 0 {
                let add = amount.min(space);
                *carried += add;
                collected = true;
            }
        }
        collected
    }

    fn deposit(&mut self, store: &mut ResourceStore) {
        if self.cargo.is_zero() {
            return;
        }
        let applied = store.add(self.cargo);
        debug!(agent = self.id.0, cargo = ?self.cargo, ?applied, "cargo deposited");
        self.cargo = ResourceAmounts::ZERO;
    }

    pub fn is_cargo_full(&self, capacity: i32) -> bool {
        ResourceKind::ALL
            .iter()
            .any(|kind| self.cargo.get(*kind) >= capacity)
    }

    fn live_work(&self, registry: &BuildingRegistry) -> Option<BuildingId> {
        self.work.filter(|id| registry.contains(*id))
    }

    fn live_dropoff(&self, registry: &BuildingRegistry) -> Option<BuildingId> {
        self.dropoff.filter(|id| registry.contains(*id))
    }

    /// Workplace is gone: deliver what is carried if possible, else idle.
    fn abandon_work(&mut self, env: &mut AgentEnv<'_>) {
        self.stop_working(env.registry);
        self.work = None;
        match self.live_dropoff(env.registry) {
            Some(dropoff) if !self.cargo.is_zero() => {
                self.state = AgentState::MovingToStorage;
                self.set_path_to_building(dropoff, env);
            }
            _ => self.go_idle(env.registry),
        }
    }

    /// Drop-off is gone while carrying: find another, or walk back to work
    /// and wait there at capacity.
    fn reroute_without_dropoff(&mut self, env: &mut AgentEnv<'_>) {
        let work = self.live_work(env.registry);
        self.dropoff = match work {
            Some(work) => env.registry.dropoff_for(work),
            None => env
                .registry
                .nearest_dropoff_to(env.grid.world_to_grid(self.position)),
        };
        if let Some(dropoff) = self.dropoff {
            self.state = AgentState::MovingToStorage;
            self.set_path_to_building(dropoff, env);
        } else if let Some(work) = work {
            self.state = AgentState::MovingToWork;
            self.set_path_to_building(work, env);
        } else {
            self.go_idle(env.registry);
        }
    }

    /// React to `removed` having been unregistered.
    pub(crate) fn on_building_removed(&mut self, removed: BuildingId, env: &mut AgentEnv<'_>) {
        if !self.active {
            return;
        }
        if self.home == Some(removed) {
            self.home = None;
        }
        if self.working_at == Some(removed) {
            self.working_at = None;
        }
        if self.work == Some(removed) {
            match self.state {
                AgentState::MovingToStorage | AgentState::Depositing => self.work = None,
                _ => self.abandon_work(env),
            }
        }
        if self.active && self.dropoff == Some(removed) {
            self.dropoff = None;
            if self.state == AgentState::MovingToStorage {
                self.reroute_without_dropoff(env);
            }
        }
    }

    fn go_idle(&mut self, registry: &mut BuildingRegistry) {
        self.stop_working(registry);
        self.state = AgentState::Idle;
        self.path.clear();
        self.path_index = 0;
        self.pending_target = None;
    }

    fn stop_working(&mut self, registry: &mut BuildingRegistry) {
        if let Some(id) = self.working_at.take() {
            if let Some(building) = registry.get_mut(id) {
                building.notify_work_stopped();
            }
        }
    }

    /// Path to `target`'s origin cell, approaching via the nearest road tile
    /// around it when that tile is a distinct first leg.
    fn set_path_to_building(&mut self, target: BuildingId, env: &mut AgentEnv<'_>) {
        self.pending_target = None;
        let Some(building) = env.registry.get(target) else {
            self.path.clear();
            self.path_index = 0;
            return;
        };
        let goal = building.origin;
        let start = env.grid.world_to_grid(self.position);

        if let Some(road) = nearest_road_tile(env.grid, building, env.config.road_search_radius) {
            if road != start && road != goal {
                self.set_path_to(road, env.grid);
                if !self.path.is_empty() {
                    self.pending_target = Some(goal);
                    return;
                }
            }
        }
        self.set_path_to(goal, env.grid);
    }

    fn set_path_to(&mut self, target: GridPos, grid: &Grid) {
        let start = grid.world_to_grid(self.position);
        self.path = find_path(grid, start, target, PathOptions::default());
        self.path_index = 0;
        if let Some(first) = self.path.first() {
            self.waypoint = grid.grid_to_world(*first);
        }
    }
}

/// Units yielded by one work cycle at a per-second rate: at least one for
/// any positive rate.
pub fn continuous_yield(rate_per_second: f64, work_seconds: f64) -> i32 {
    if rate_per_second <= 0.0 {
        return 0;
    }
    (rate_per_second * work_seconds).ceil().max(1.0) as i32
}

fn work_cycle_seconds(building: Option<&Building>, config: &AgentConfig) -> f64 {
    match building.map(|b| &b.def.production) {
        Some(Production::Harvest { cycle_seconds, .. }) => *cycle_seconds,
        _ => config.work_seconds,
    }
}

/// Nearest road cell to the building's origin within `radius` cells of its
/// footprint. Ties keep the first cell in x-major scan order.
pub fn nearest_road_tile(grid: &Grid, building: &Building, radius: i32) -> Option<GridPos> {
    let origin = building.origin;
    let (w, h) = building.footprint();
    let mut best: Option<(GridPos, f64)> = None;
    for dx in -radius..=(w as i32 - 1 + radius) {
        for dy in -radius..=(h as i32 - 1 + radius) {
            let candidate = origin.offset(dx, dy);
            if !grid.is_road_at(candidate) {
                continue;
            }
            let dist = origin.distance(candidate);
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((candidate, dist));
            }
        }
    }
    best.map(|(cell, _)| cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{BuildingDef, ResourceRates};

    fn harvest_def(per_cycle: f64, workers: u32) -> Arc<BuildingDef> {
        BuildingDef::named("Berry Bush")
            .with_required_workers(workers)
            .with_production(Production::Harvest {
                per_cycle: ResourceRates {
                    food: per_cycle,
                    ..ResourceRates::default()
                },
                cycle_seconds: 3.0,
            })
            .into_shared()
    }

    #[test]
    fn continuous_yield_never_rounds_to_zero() {
        assert_eq!(continuous_yield(0.0, 2.0), 0);
        assert_eq!(continuous_yield(0.1, 2.0), 1);
        assert_eq!(continuous_yield(2.0, 2.0), 4);
        assert_eq!(continuous_yield(1.3, 2.0), 3);
    }

    #[test]
    fn shared_batch_is_not_lost_across_workers() {
        let mut registry = BuildingRegistry::new(0);
        let bush = registry.register(harvest_def(1.0, 3), GridPos::new(0, 0));
        let config = AgentConfig::default();
        let mut workers: Vec<Agent> = (0..3).map(|i| Agent::parked(AgentId(i))).collect();

        let cycles = 250;
        let mut total = 0;
        for _ in 0..cycles {
            for worker in workers.iter_mut() {
                worker.harvest(bush, &mut registry, 1.0, &config);
                total += worker.cargo.food;
                worker.cargo = ResourceAmounts::ZERO;
            }
        }
        assert_eq!(total, cycles);
    }

    #[test]
    fn harvest_is_clamped_to_carry_capacity() {
        let mut registry = BuildingRegistry::new(0);
        let def = BuildingDef::named("Farm")
            .with_required_workers(1)
            .with_production(Production::Continuous {
                per_second: ResourceRates {
                    food: 2.0,
                    wood: 0.5,
                    stone: 0.0,
                },
            })
            .into_shared();
        let farm = registry.register(def, GridPos::new(0, 0));
        let config = AgentConfig::default();
        let mut agent = Agent::parked(AgentId(0));

        assert!(agent.harvest(farm, &mut registry, 1.0, &config));
        assert_eq!(agent.cargo, ResourceAmounts::new(4, 1, 0));
        assert!(agent.harvest(farm, &mut registry, 1.0, &config));
        assert_eq!(agent.cargo, ResourceAmounts::new(5, 2, 0));
        assert!(agent.is_cargo_full(config.carry_capacity));
    }

    #[test]
    fn efficiency_scales_continuous_yield() {
        let mut registry = BuildingRegistry::new(0);
        let def = BuildingDef::named("Farm")
            .with_required_workers(1)
            .with_production(Production::Continuous {
                per_second: ResourceRates {
                    food: 2.0,
                    ..ResourceRates::default()
                },
            })
            .into_shared();
        let farm = registry.register(def, GridPos::new(0, 0));
        let config = AgentConfig::default();
        let mut agent = Agent::parked(AgentId(0));
        agent.harvest(farm, &mut registry, 0.4, &config);
        assert_eq!(agent.cargo.food, 2);
    }

    #[test]
    fn efficiency_leaves_harvest_batches_alone() {
        let mut registry = BuildingRegistry::new(0);
        let bush = registry.register(harvest_def(3.0, 1), GridPos::new(0, 0));
        let config = AgentConfig::default();
        let mut agent = Agent::parked(AgentId(0));
        agent.harvest(bush, &mut registry, 0.4, &config);
        assert_eq!(agent.cargo.food, 3);
    }

    #[test]
    fn speed_follows_the_cell_under_the_agent() {
        let mut grid = Grid::new(10, 10, 1.0);
        grid.set_road(GridPos::new(0, 0), true);
        grid.set_road(GridPos::new(1, 0), true);
        let mut registry = BuildingRegistry::new(0);
        let mut store = ResourceStore::new(ResourceAmounts::ZERO, ResourceAmounts::new(100, 100, 100));
        let config = AgentConfig::default();

        let mut agent = Agent::parked(AgentId(0));
        agent.active = true;
        agent.state = AgentState::MovingToWork;
        agent.position = grid.grid_to_world(GridPos::new(0, 0));
        agent.path = vec![GridPos::new(1, 0), GridPos::new(2, 0), GridPos::new(3, 0)];
        agent.waypoint = grid.grid_to_world(GridPos::new(1, 0));

        let mut env = AgentEnv {
            grid: &grid,
            registry: &mut registry,
            store: &mut store,
            config: &config,
        };
        let mut road_steps = Vec::new();
        let mut ground_steps = Vec::new();
        for _ in 0..12 {
            let before = agent.position;
            let on_road = env.grid.is_road_at(env.grid.world_to_grid(before));
            agent.tick(0.1, &mut env);
            let step = before.distance(agent.position);
            if on_road {
                road_steps.push(step);
            } else {
                ground_steps.push(step);
            }
        }

        assert!(!road_steps.is_empty() && !ground_steps.is_empty());
        assert!(road_steps.iter().all(|step| (step - 0.2).abs() < 1e-6), "{road_steps:?}");
        assert!(ground_steps.iter().all(|step| (step - 0.1).abs() < 1e-6), "{ground_steps:?}");
        assert_eq!(agent.state(), AgentState::MovingToWork);
    }

    #[test]
    fn road_tile_search_prefers_nearest_to_origin() {
        let mut grid = Grid::new(10, 10, 1.0);
        let mut registry = BuildingRegistry::new(0);
        let id = registry.register(BuildingDef::named("Hut").into_shared(), GridPos::new(4, 4));
        let hut = registry.get(id).unwrap();
        assert_eq!(nearest_road_tile(&grid, hut, 2), None);

        grid.set_road(GridPos::new(6, 4), true);
        grid.set_road(GridPos::new(4, 3), true);
        assert_eq!(nearest_road_tile(&grid, hut, 2), Some(GridPos::new(4, 3)));

        grid.set_road(GridPos::new(4, 3), false);
        grid.set_road(GridPos::new(9, 9), true);
        assert_eq!(nearest_road_tile(&grid, hut, 2), Some(GridPos::new(6, 4)));
    }

    #[test]
    fn display_position_offsets_only_while_working() {
        let mut agent = Agent::parked(AgentId(0));
        agent.position = WorldPos::new(1.0, 1.0);
        agent.slot = 0;
        assert_eq!(agent.display_position(1.0), WorldPos::new(1.0, 1.0));
        agent.state = AgentState::Working;
        let shown = agent.display_position(1.0);
        assert!((shown.x - 1.3).abs() < 1e-9);
        assert!((shown.y - 1.0).abs() < 1e-9);
    }
}
