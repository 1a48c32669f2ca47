//! The town: one explicitly constructed owner for every subsystem, plus the
//! placement facade that keeps grid occupancy, registry membership, and the
//! store in step.

use std::rc::Rc;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::agent::AgentState;
use crate::building::{Building, BuildingDef, BuildingId, ResourceAmounts};
use crate::config::TownConfig;
use crate::day::{DayCycle, FoodConsumption};
use crate::events::RegistryEvent;
use crate::grid::{footprint_cells, Grid, GridPos, WorldPos};
use crate::quest::{QuestDef, QuestLog, QuestStatus, SharedQuestLog};
use crate::registry::BuildingRegistry;
use crate::store::ResourceStore;
use crate::workforce::Workforce;

#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    #[error("cell {0} is off the grid")]
    OutOfBounds(GridPos),
    #[error("cell {0} is already occupied")]
    Occupied(GridPos),
    #[error("cannot afford {0:?}")]
    CannotAfford(ResourceAmounts),
    #[error("no building with id {0}")]
    NoSuchBuilding(BuildingId),
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildingSnapshot {
    pub id: u64,
    pub name: String,
    pub origin: GridPos,
    pub assigned_workers: u32,
    pub required_workers: u32,
    pub working_agents: u32,
    pub dropoff: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub id: usize,
    pub state: AgentState,
    pub position: WorldPos,
    pub work: Option<u64>,
    pub cargo: ResourceAmounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct TownSnapshot {
    pub tick: u64,
    pub elapsed_seconds: f64,
    pub day: u32,
    pub day_time_left: f64,
    pub resources: ResourceAmounts,
    pub caps: ResourceAmounts,
    pub production_efficiency: f64,
    pub hunger_warning: bool,
    pub population: u32,
    pub max_population: u32,
    pub idle_workers: u32,
    pub buildings: Vec<BuildingSnapshot>,
    pub agents: Vec<AgentSnapshot>,
    pub quest: Option<QuestStatus>,
    pub quests_completed: usize,
    pub victory: bool,
}

pub struct World {
    tick: u64,
    elapsed_seconds: f64,
    dt_seconds: f64,
    config: TownConfig,
    pub(crate) grid: Grid,
    pub(crate) registry: BuildingRegistry,
    pub(crate) store: ResourceStore,
    pub(crate) workforce: Workforce,
    pub(crate) clock: DayCycle,
    pub(crate) consumption: FoodConsumption,
    quests: Option<SharedQuestLog>,
}

impl World {
    pub fn new(config: TownConfig, dt_seconds: f64) -> Self {
        let grid = Grid::new(config.grid.width, config.grid.height, config.grid.cell_size);
        let registry = BuildingRegistry::new(config.population.initial);
        let store = ResourceStore::new(config.store.initial, config.store.caps);
        let workforce = Workforce::new(config.agents.clone());
        let clock = DayCycle::new(config.day.length_seconds);
        let consumption = FoodConsumption::new(config.day.food_per_capita);
        Self {
            tick: 0,
            elapsed_seconds: 0.0,
            dt_seconds,
            config,
            grid,
            registry,
            store,
            workforce,
            clock,
            consumption,
            quests: None,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn dt_seconds(&self) -> f64 {
        self.dt_seconds
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn advance_time(&mut self) {
        self.tick += 1;
        self.elapsed_seconds += self.dt_seconds;
    }

    pub fn config(&self) -> &TownConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn registry(&self) -> &BuildingRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ResourceStore {
        &mut self.store
    }

    pub fn workforce(&self) -> &Workforce {
        &self.workforce
    }

    pub fn clock(&self) -> &DayCycle {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut DayCycle {
        &mut self.clock
    }

    pub fn consumption(&self) -> &FoodConsumption {
        &self.consumption
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.registry.get(id)
    }

    pub fn quest_log(&self) -> Option<&SharedQuestLog> {
        self.quests.as_ref()
    }

    /// Subscribe a fresh quest chain to the registry, store, and day cycle.
    /// Population and staffing already in place count toward the first
    /// quests.
    pub fn attach_quests(&mut self, quests: Vec<QuestDef>) -> SharedQuestLog {
        let log = QuestLog::shared(quests);
        {
            let mut primed = log.borrow_mut();
            primed.on_registry_event(&RegistryEvent::PopulationChanged {
                current: self.registry.current_population(),
                max: self.registry.max_population(),
            });
            for building in self.registry.iter().filter(|b| b.assigned_workers > 0) {
                primed.on_registry_event(&RegistryEvent::WorkersAssigned {
                    building: building.id,
                    assigned: building.assigned_workers,
                    required: building.def.required_workers,
                });
            }
        }

        let sink = Rc::clone(&log);
        self.registry
            .subscribe(move |event| sink.borrow_mut().on_registry_event(event));
        let sink = Rc::clone(&log);
        self.store
            .subscribe(move |event| sink.borrow_mut().on_store_event(event));
        let sink = Rc::clone(&log);
        self.clock
            .subscribe(move |event| sink.borrow_mut().on_day_event(event));

        self.quests = Some(Rc::clone(&log));
        log
    }

    /// Buy and place a building. Nothing changes unless this returns `Ok`.
    pub fn place_building(
        &mut self,
        def: Arc<BuildingDef>,
        origin: GridPos,
    ) -> Result<BuildingId, PlacementError> {
        self.check_area(&def, origin)?;
        if !self.store.can_afford(def.cost) {
            return Err(PlacementError::CannotAfford(def.cost));
        }
        self.store.spend(def.cost);
        Ok(self.commit_building(def, origin))
    }

    /// Place a building without paying for it.
    pub fn spawn_building(
        &mut self,
        def: Arc<BuildingDef>,
        origin: GridPos,
    ) -> Result<BuildingId, PlacementError> {
        self.check_area(&def, origin)?;
        Ok(self.commit_building(def, origin))
    }

    fn check_area(&self, def: &BuildingDef, origin: GridPos) -> Result<(), PlacementError> {
        let (w, h) = def.footprint;
        if w == 0 || h == 0 {
            return Err(PlacementError::OutOfBounds(origin));
        }
        if let Some(cell) = footprint_cells(origin, def.footprint).find(|c| !self.grid.in_bounds(*c)) {
            return Err(PlacementError::OutOfBounds(cell));
        }
        if let Some(cell) = footprint_cells(origin, def.footprint).find(|c| self.grid.is_occupied(*c)) {
            return Err(PlacementError::Occupied(cell));
        }
        Ok(())
    }

    fn commit_building(&mut self, def: Arc<BuildingDef>, origin: GridPos) -> BuildingId {
        self.grid.set_area_occupied(origin, def.footprint, true);
        let bonus = def.storage_bonus;
        let id = self.registry.register(def, origin);
        if bonus > 0 {
            self.store.increase_cap(bonus);
        }
        self.auto_assign();
        id
    }

    /// Demolish a building. Its footprint is freed and every agent bound to
    /// it is released or rerouted before this returns.
    pub fn remove_building(&mut self, id: BuildingId) -> Result<Building, PlacementError> {
        let building = self
            .registry
            .unregister(id)
            .ok_or(PlacementError::NoSuchBuilding(id))?;
        self.grid
            .set_area_occupied(building.origin, building.footprint(), false);
        self.workforce
            .on_building_removed(id, &self.grid, &mut self.registry, &mut self.store);
        if let Some(log) = &self.quests {
            log.borrow_mut().forget_building(id);
        }
        Ok(building)
    }

    pub fn place_road(&mut self, cell: GridPos) -> Result<(), PlacementError> {
        if !self.grid.in_bounds(cell) {
            return Err(PlacementError::OutOfBounds(cell));
        }
        if self.grid.is_occupied(cell) {
            return Err(PlacementError::Occupied(cell));
        }
        let cost = self.config.road_cost();
        if !self.store.can_afford(cost) {
            return Err(PlacementError::CannotAfford(cost));
        }
        self.store.spend(cost);
        self.lay_road(cell);
        Ok(())
    }

    /// Lay a road for free; used by scenario layouts.
    pub fn spawn_road(&mut self, cell: GridPos) -> Result<(), PlacementError> {
        if !self.grid.in_bounds(cell) {
            return Err(PlacementError::OutOfBounds(cell));
        }
        if self.grid.is_occupied(cell) {
            return Err(PlacementError::Occupied(cell));
        }
        self.lay_road(cell);
        Ok(())
    }

    fn lay_road(&mut self, cell: GridPos) {
        self.grid.set_occupied(cell, true);
        self.grid.set_road(cell, true);
    }

    pub fn remove_road(&mut self, cell: GridPos) -> bool {
        if !self.grid.is_road_at(cell) {
            return false;
        }
        self.grid.set_road(cell, false);
        self.grid.set_occupied(cell, false);
        true
    }

    /// Staff understaffed buildings from the idle population.
    pub fn auto_assign(&mut self) -> u32 {
        self.workforce
            .auto_assign(&self.grid, &mut self.registry, &mut self.store)
    }

    pub fn request_worker(&mut self, building: BuildingId) -> bool {
        self.workforce
            .request_assignment(building, &self.grid, &mut self.registry, &mut self.store)
    }

    /// Move every active agent forward by `dt` seconds.
    pub fn advance_agents(&mut self, dt: f64) {
        self.workforce
            .tick(dt, &self.grid, &mut self.registry, &mut self.store);
    }

    /// Advance the day timer; on a boundary, feed the town and start the
    /// next day. Returns whether a day ended.
    pub fn advance_day(&mut self, dt: f64) -> bool {
        if !self.clock.advance(dt) {
            return false;
        }
        let population = self.registry.current_population();
        self.consumption.apply(population, &mut self.store);
        self.clock.roll_over();
        info!(day = self.clock.day(), "day started");
        true
    }

    pub fn snapshot(&self) -> TownSnapshot {
        let buildings = self
            .registry
            .iter()
            .map(|b| BuildingSnapshot {
                id: b.id.raw(),
                name: b.name().to_string(),
                origin: b.origin,
                assigned_workers: b.assigned_workers,
                required_workers: b.def.required_workers,
                working_agents: b.working_agents,
                dropoff: self.registry.dropoff_for(b.id).map(BuildingId::raw),
            })
            .collect();
        let agents = self
            .workforce
            .agents()
            .map(|a| AgentSnapshot {
                id: a.id().index(),
                state: a.state(),
                position: a.display_position(self.grid.cell_size()),
                work: a.work().map(BuildingId::raw),
                cargo: a.cargo(),
            })
            .collect();
        let (quest, quests_completed, victory) = match &self.quests {
            Some(log) => {
                let log = log.borrow();
                (log.status(), log.completed().len(), log.victory())
            }
            None => (None, 0, false),
        };
        TownSnapshot {
            tick: self.tick,
            elapsed_seconds: self.elapsed_seconds,
            day: self.clock.day(),
            day_time_left: self.clock.time_left(),
            resources: self.store.amounts(),
            caps: self.store.caps(),
            production_efficiency: self.store.production_efficiency(),
            hunger_warning: self.consumption.hunger_warning(),
            population: self.registry.current_population(),
            max_population: self.registry.max_population(),
            idle_workers: self.registry.idle_workers(),
            buildings,
            agents,
            quest,
            quests_completed,
            victory,
        }
    }
}
