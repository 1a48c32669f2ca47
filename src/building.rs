//! Building definitions (shared, immutable) and building instances (mutable
//! runtime state).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::GridPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Wood,
    Stone,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Food, ResourceKind::Wood, ResourceKind::Stone];

    pub fn index(self) -> usize {
        match self {
            ResourceKind::Food => 0,
            ResourceKind::Wood => 1,
            ResourceKind::Stone => 2,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Food => "food",
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
        };
        f.write_str(name)
    }
}

/// Whole units of the three resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceAmounts {
    #[serde(default)]
    pub food: i32,
    #[serde(default)]
    pub wood: i32,
    #[serde(default)]
    pub stone: i32,
}

impl ResourceAmounts {
    pub const ZERO: ResourceAmounts = ResourceAmounts {
        food: 0,
        wood: 0,
        stone: 0,
    };

    pub const fn new(food: i32, wood: i32, stone: i32) -> Self {
        Self { food, wood, stone }
    }

    pub fn get(&self, kind: ResourceKind) -> i32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut i32 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Stone => &mut self.stone,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn any_negative(&self) -> bool {
        self.food < 0 || self.wood < 0 || self.stone < 0
    }
}

/// Fractional per-resource quantities (rates, batch yields).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceRates {
    #[serde(default)]
    pub food: f64,
    #[serde(default)]
    pub wood: f64,
    #[serde(default)]
    pub stone: f64,
}

impl ResourceRates {
    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
        }
    }

    pub fn any_positive(&self) -> bool {
        self.food > 0.0 || self.wood > 0.0 || self.stone > 0.0
    }

    fn any_negative(&self) -> bool {
        self.food < 0.0 || self.wood < 0.0 || self.stone < 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Production {
    None,
    /// Units per second; each work cycle yields `ceil(max(1, rate × seconds))`.
    Continuous { per_second: ResourceRates },
    /// A batch per harvest cycle, split evenly across the required workers.
    Harvest {
        per_cycle: ResourceRates,
        cycle_seconds: f64,
    },
}

impl Production {
    pub fn is_productive(&self) -> bool {
        !matches!(self, Production::None)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DefinitionError {
    #[error("building '{0}' configures both per-second and per-harvest production")]
    AmbiguousProduction(String),
    #[error("building '{0}' has an empty footprint")]
    EmptyFootprint(String),
    #[error("building '{name}' has a negative {field}")]
    Negative { name: String, field: &'static str },
    #[error("building '{0}' needs a positive harvest cycle length")]
    InvalidHarvestCycle(String),
    #[error("building definition needs a name")]
    MissingName,
    #[error("building '{0}' is defined more than once")]
    Duplicate(String),
}

fn default_footprint() -> (u32, u32) {
    (1, 1)
}

fn default_harvest_seconds() -> f64 {
    2.0
}

/// Catalog entry as written in a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    #[serde(default)]
    pub cost: ResourceAmounts,
    #[serde(default = "default_footprint")]
    pub footprint: (u32, u32),
    #[serde(default)]
    pub per_second: ResourceRates,
    #[serde(default)]
    pub per_harvest: ResourceRates,
    #[serde(default = "default_harvest_seconds")]
    pub harvest_seconds: f64,
    #[serde(default)]
    pub population_capacity: u32,
    #[serde(default)]
    pub required_workers: u32,
    #[serde(default)]
    pub dropoff: bool,
    #[serde(default)]
    pub storage_bonus: i32,
}

/// Static attributes shared by every instance of a building type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingDef {
    pub name: String,
    pub cost: ResourceAmounts,
    pub footprint: (u32, u32),
    pub production: Production,
    pub population_capacity: u32,
    pub required_workers: u32,
    pub is_dropoff: bool,
    /// Added to every store cap when an instance is registered.
    pub storage_bonus: i32,
}

impl BuildingDef {
    /// A bare 1×1 definition with no production, capacity or workers.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cost: ResourceAmounts::ZERO,
            footprint: (1, 1),
            production: Production::None,
            population_capacity: 0,
            required_workers: 0,
            is_dropoff: false,
            storage_bonus: 0,
        }
    }

    pub fn with_cost(mut self, cost: ResourceAmounts) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_footprint(mut self, width: u32, height: u32) -> Self {
        self.footprint = (width, height);
        self
    }

    pub fn with_production(mut self, production: Production) -> Self {
        self.production = production;
        self
    }

    pub fn with_population_capacity(mut self, capacity: u32) -> Self {
        self.population_capacity = capacity;
        self
    }

    pub fn with_required_workers(mut self, workers: u32) -> Self {
        self.required_workers = workers;
        self
    }

    pub fn as_dropoff(mut self, storage_bonus: i32) -> Self {
        self.is_dropoff = true;
        self.storage_bonus = storage_bonus;
        self
    }

    pub fn into_shared(self) -> Arc<BuildingDef> {
        Arc::new(self)
    }

    pub fn needs_workers(&self) -> bool {
        self.required_workers > 0
    }
}

impl TryFrom<BuildingSpec> for BuildingDef {
    type Error = DefinitionError;

    fn try_from(spec: BuildingSpec) -> Result<Self, Self::Error> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(DefinitionError::MissingName);
        }
        if spec.footprint.0 == 0 || spec.footprint.1 == 0 {
            return Err(DefinitionError::EmptyFootprint(name));
        }
        if spec.cost.any_negative() {
            return Err(DefinitionError::Negative { name, field: "cost" });
        }
        if spec.per_second.any_negative() || spec.per_harvest.any_negative() {
            return Err(DefinitionError::Negative {
                name,
                field: "production rate",
            });
        }
        if spec.storage_bonus < 0 {
            return Err(DefinitionError::Negative {
                name,
                field: "storage bonus",
            });
        }

        let production = match (spec.per_second.any_positive(), spec.per_harvest.any_positive()) {
            (true, true) => return Err(DefinitionError::AmbiguousProduction(name)),
            (true, false) => Production::Continuous {
                per_second: spec.per_second,
            },
            (false, true) => {
                if !(spec.harvest_seconds > 0.0) {
                    return Err(DefinitionError::InvalidHarvestCycle(name));
                }
                Production::Harvest {
                    per_cycle: spec.per_harvest,
                    cycle_seconds: spec.harvest_seconds,
                }
            }
            (false, false) => Production::None,
        };

        Ok(Self {
            name,
            cost: spec.cost,
            footprint: spec.footprint,
            production,
            population_capacity: spec.population_capacity,
            required_workers: spec.required_workers,
            is_dropoff: spec.dropoff,
            storage_bonus: spec.storage_bonus,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub(crate) u64);

impl BuildingId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A placed building.
#[derive(Debug, Clone)]
pub struct Building {
    pub id: BuildingId,
    pub def: Arc<BuildingDef>,
    pub origin: GridPos,
    pub assigned_workers: u32,
    pub working_agents: u32,
    pub(crate) dropoff: Option<BuildingId>,
    harvest_remainder: [f64; 3],
}

impl Building {
    pub(crate) fn new(id: BuildingId, def: Arc<BuildingDef>, origin: GridPos) -> Self {
        Self {
            id,
            def,
            origin,
            assigned_workers: 0,
            working_agents: 0,
            dropoff: None,
            harvest_remainder: [0.0; 3],
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn footprint(&self) -> (u32, u32) {
        self.def.footprint
    }

    pub fn is_dropoff(&self) -> bool {
        self.def.is_dropoff
    }

    pub fn open_worker_slots(&self) -> u32 {
        self.def.required_workers.saturating_sub(self.assigned_workers)
    }

    pub fn is_fully_staffed(&self) -> bool {
        self.open_worker_slots() == 0
    }

    pub fn notify_work_started(&mut self) {
        self.working_agents += 1;
    }

    pub fn notify_work_stopped(&mut self) {
        self.working_agents = self.working_agents.saturating_sub(1);
    }

    pub fn harvest_remainder(&self, kind: ResourceKind) -> f64 {
        self.harvest_remainder[kind.index()]
    }

    /// Credit one worker's share of a harvest batch and return the whole
    /// units now due. The fractional part stays on the building so the
    /// combined output of all co-workers adds up over time.
    pub(crate) fn take_harvest_share(&mut self, kind: ResourceKind, share: f64) -> i32 {
        const EPS: f64 = 1e-9;
        let slot = &mut self.harvest_remainder[kind.index()];
        *slot += share;
        let whole = (*slot + EPS).floor();
        if whole < 1.0 {
            return 0;
        }
        *slot = (*slot - whole).max(0.0);
        whole as i32
    }
}
