//! Agent pool and the worker dispatcher.
//!
//! Agents live in a slot arena that only grows. Parked slots sit on a FIFO
//! free list and are reset in place when activated again. New assignments
//! are bounded by the idle population, current population minus assigned
//! workers. An agent finishing a delivery for a demolished workplace holds
//! no assignment and does not count against it.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::agent::{Agent, AgentEnv, AgentId, AgentState, WORK_SLOTS};
use crate::building::BuildingId;
use crate::config::AgentConfig;
use crate::grid::Grid;
use crate::registry::BuildingRegistry;
use crate::store::ResourceStore;

pub struct Workforce {
    slots: Vec<Agent>,
    free: VecDeque<usize>,
    active: usize,
    config: AgentConfig,
}

impl Workforce {
    pub fn new(config: AgentConfig) -> Self {
        let mut workforce = Self {
            slots: Vec::with_capacity(config.initial_pool_size),
            free: VecDeque::with_capacity(config.initial_pool_size),
            active: 0,
            config,
        };
        for _ in 0..workforce.config.initial_pool_size {
            workforce.grow();
        }
        workforce
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn grow(&mut self) -> usize {
        let index = self.slots.len();
        self.slots.push(Agent::parked(AgentId(index)));
        self.free.push_back(index);
        index
    }

    /// Take a parked slot, growing the arena when none is free. `None` when
    /// nobody in town is idle.
    fn acquire(&mut self, idle_workers: u32) -> Option<usize> {
        if idle_workers == 0 {
            return None;
        }
        let index = match self.free.pop_front() {
            Some(index) => index,
            None => {
                let index = self.grow();
                self.free.pop_back();
                index
            }
        };
        self.active += 1;
        Some(index)
    }

    fn release(&mut self, index: usize, registry: &mut BuildingRegistry) {
        let Some(agent) = self.slots.get_mut(index) else {
            return;
        };
        if !agent.is_active() {
            return;
        }
        if let Some(work) = agent.work() {
            registry.release_worker(work);
        }
        agent.park(registry);
        self.free.push_back(index);
        self.active -= 1;
        debug!(agent = index, "agent parked");
    }

    /// Pair one available agent with `work`. Fails without side effects when
    /// the building is unknown or fully staffed, or no agent can be spared.
    pub fn request_assignment(
        &mut self,
        work: BuildingId,
        grid: &Grid,
        registry: &mut BuildingRegistry,
        store: &mut ResourceStore,
    ) -> bool {
        let Some(building) = registry.get(work) else {
            return false;
        };
        if building.is_fully_staffed() {
            return false;
        }
        let origin = building.origin;
        let slot = (building.assigned_workers % u32::from(WORK_SLOTS)) as u8;

        let Some(index) = self.acquire(registry.idle_workers()) else {
            debug!(building = %work, "no agent available");
            return false;
        };

        let home = registry
            .nearest_matching(origin, |b| b.def.population_capacity > 0)
            .or_else(|| registry.nearest_dropoff_to(origin))
            .unwrap_or(work);
        let dropoff = registry.dropoff_for(work);

        if !registry.record_assignment(work) {
            self.free.push_front(index);
            self.active -= 1;
            return false;
        }

        let mut env = AgentEnv {
            grid,
            registry,
            store,
            config: &self.config,
        };
        self.slots[index].activate(home, work, dropoff, slot, &mut env);
        true
    }

    /// Fill open worker slots across the town, building by building in id
    /// order, limited by the idle population. Returns the number assigned.
    pub fn auto_assign(
        &mut self,
        grid: &Grid,
        registry: &mut BuildingRegistry,
        store: &mut ResourceStore,
    ) -> u32 {
        let mut assigned = 0;
        for id in registry.understaffed() {
            let needed = registry.get(id).map_or(0, |b| b.open_worker_slots());
            let available = registry.idle_workers();
            for _ in 0..needed.min(available) {
                if !self.request_assignment(id, grid, registry, store) {
                    break;
                }
                assigned += 1;
            }
        }
        if assigned > 0 {
            info!(
                assigned,
                idle = registry.idle_workers(),
                "auto-assigned workers"
            );
        }
        assigned
    }

    /// Advance every active agent, then park the ones that went idle.
    pub fn tick(
        &mut self,
        dt: f64,
        grid: &Grid,
        registry: &mut BuildingRegistry,
        store: &mut ResourceStore,
    ) {
        let mut idle = Vec::new();
        {
            let mut env = AgentEnv {
                grid,
                registry,
                store,
                config: &self.config,
            };
            for agent in self.slots.iter_mut().filter(|agent| agent.is_active()) {
                agent.tick(dt, &mut env);
                if agent.state() == AgentState::Idle {
                    idle.push(agent.id().index());
                }
            }
        }
        for index in idle {
            self.release(index, registry);
        }
    }

    /// Release every agent bound to a building that has just been removed
    /// from the registry.
    pub fn on_building_removed(
        &mut self,
        removed: BuildingId,
        grid: &Grid,
        registry: &mut BuildingRegistry,
        store: &mut ResourceStore,
    ) {
        let mut idle = Vec::new();
        {
            let mut env = AgentEnv {
                grid,
                registry,
                store,
                config: &self.config,
            };
            for agent in self.slots.iter_mut().filter(|agent| agent.is_active()) {
                agent.on_building_removed(removed, &mut env);
                if agent.state() == AgentState::Idle {
                    idle.push(agent.id().index());
                }
            }
        }
        for index in idle {
            self.release(index, registry);
        }
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.slots.iter().filter(|agent| agent.is_active())
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.slots.get(id.index()).filter(|agent| agent.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn parked_count(&self) -> usize {
        self.free.len()
    }

    pub fn pool_size(&self) -> usize {
        self.slots.len()
    }
}
