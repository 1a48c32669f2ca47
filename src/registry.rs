//! Registry of placed buildings: drop-off caching and town population.
//!
//! Buildings are kept in id order, and ids are never reused, so a stale id
//! simply stops resolving. Nearest-building queries scan linearly and keep
//! the first building at the smallest distance. Distances are measured
//! between origin cells; with square cells that orders buildings exactly as
//! world-space distance between the cell centers would.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::building::{Building, BuildingDef, BuildingId};
use crate::events::{ListenerId, Listeners, RegistryEvent};
use crate::grid::GridPos;

pub struct BuildingRegistry {
    next_id: u64,
    buildings: BTreeMap<BuildingId, Building>,
    dropoffs: Vec<BuildingId>,
    base_population: u32,
    max_population: u32,
    current_population: u32,
    listeners: Listeners<RegistryEvent>,
}

impl BuildingRegistry {
    /// `base_population` is housed without any building.
    pub fn new(base_population: u32) -> Self {
        Self {
            next_id: 0,
            buildings: BTreeMap::new(),
            dropoffs: Vec::new(),
            base_population,
            max_population: base_population,
            current_population: base_population,
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&RegistryEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn register(&mut self, def: Arc<BuildingDef>, origin: GridPos) -> BuildingId {
        let id = BuildingId(self.next_id);
        self.next_id += 1;

        let capacity = def.population_capacity;
        let is_dropoff = def.is_dropoff;
        let name = def.name.clone();
        self.buildings.insert(id, Building::new(id, def, origin));

        if is_dropoff {
            self.dropoffs.push(id);
            self.recompute_dropoffs();
        } else {
            let nearest = self.nearest_dropoff_to(origin);
            if let Some(building) = self.buildings.get_mut(&id) {
                building.dropoff = nearest;
            }
        }

        info!(building = %id, %name, x = origin.x, y = origin.y, "building registered");
        self.listeners.emit(&RegistryEvent::BuildingRegistered { building: id, name });

        if capacity > 0 {
            self.max_population += capacity;
            self.current_population = (self.current_population + capacity).min(self.max_population);
            self.emit_population();
        }
        id
    }

    /// Removes the building and returns it. Dependents of a removed drop-off
    /// fall back to the next nearest one, or to none.
    pub fn unregister(&mut self, id: BuildingId) -> Option<Building> {
        let building = self.buildings.remove(&id)?;

        if building.is_dropoff() {
            self.dropoffs.retain(|existing| *existing != id);
            self.recompute_dropoffs();
        }

        let capacity = building.def.population_capacity;
        if capacity > 0 {
            self.max_population = self.max_population.saturating_sub(capacity).max(self.base_population);
            self.current_population = self.current_population.min(self.max_population);
            self.emit_population();
        }
        info!(building = %id, name = building.name(), "building unregistered");
        Some(building)
    }

    fn recompute_dropoffs(&mut self) {
        let updates: Vec<(BuildingId, Option<BuildingId>)> = self
            .buildings
            .values()
            .filter(|building| !building.is_dropoff())
            .map(|building| (building.id, self.nearest_dropoff_to(building.origin)))
            .collect();
        for (id, dropoff) in updates {
            if let Some(building) = self.buildings.get_mut(&id) {
                building.dropoff = dropoff;
            }
        }
        debug!(dropoffs = self.dropoffs.len(), "drop-off cache recomputed");
    }

    pub fn nearest_dropoff_to(&self, origin: GridPos) -> Option<BuildingId> {
        let mut best: Option<(BuildingId, f64)> = None;
        for id in &self.dropoffs {
            let Some(dropoff) = self.buildings.get(id) else {
                continue;
            };
            let dist = origin.distance(dropoff.origin);
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((*id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn nearest_matching(
        &self,
        origin: GridPos,
        mut predicate: impl FnMut(&Building) -> bool,
    ) -> Option<BuildingId> {
        let mut best: Option<(BuildingId, f64)> = None;
        for building in self.buildings.values() {
            if !predicate(building) {
                continue;
            }
            let dist = origin.distance(building.origin);
            if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                best = Some((building.id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    /// The drop-off serving `id`: itself for a drop-off, the cached nearest
    /// otherwise.
    pub fn dropoff_for(&self, id: BuildingId) -> Option<BuildingId> {
        let building = self.buildings.get(&id)?;
        if building.is_dropoff() {
            Some(id)
        } else {
            building.dropoff
        }
    }

    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(&id)
    }

    pub fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.get_mut(&id)
    }

    pub fn contains(&self, id: BuildingId) -> bool {
        self.buildings.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn dropoffs(&self) -> &[BuildingId] {
        &self.dropoffs
    }

    pub fn current_population(&self) -> u32 {
        self.current_population
    }

    pub fn max_population(&self) -> u32 {
        self.max_population
    }

    pub fn total_assigned_workers(&self) -> u32 {
        self.buildings.values().map(|b| b.assigned_workers).sum()
    }

    pub fn idle_workers(&self) -> u32 {
        self.current_population.saturating_sub(self.total_assigned_workers())
    }

    /// Buildings with open worker slots, in id order.
    pub fn understaffed(&self) -> Vec<BuildingId> {
        self.buildings
            .values()
            .filter(|b| b.def.needs_workers() && !b.is_fully_staffed())
            .map(|b| b.id)
            .collect()
    }

    /// Count one more worker against `id`. Fails when the building is gone
    /// or already fully staffed.
    pub(crate) fn record_assignment(&mut self, id: BuildingId) -> bool {
        let Some(building) = self.buildings.get_mut(&id) else {
            return false;
        };
        if building.is_fully_staffed() {
            return false;
        }
        building.assigned_workers += 1;
        let event = RegistryEvent::WorkersAssigned {
            building: id,
            assigned: building.assigned_workers,
            required: building.def.required_workers,
        };
        info!(
            building = %id,
            name = building.name(),
            assigned = building.assigned_workers,
            required = building.def.required_workers,
            "worker assigned"
        );
        self.listeners.emit(&event);
        true
    }

    pub(crate) fn release_worker(&mut self, id: BuildingId) {
        if let Some(building) = self.buildings.get_mut(&id) {
            building.assigned_workers = building.assigned_workers.saturating_sub(1);
        }
    }

    fn emit_population(&mut self) {
        debug!(
            current = self.current_population,
            max = self.max_population,
            "population changed"
        );
        self.listeners.emit(&RegistryEvent::PopulationChanged {
            current: self.current_population,
            max: self.max_population,
        });
    }
}
