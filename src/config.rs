//! Tunables for the town simulation.
//!
//! Every field has a serde default so scenario files only spell out what
//! they change.

use serde::{Deserialize, Serialize};

use crate::building::ResourceAmounts;

fn default_grid_size() -> u32 {
    10
}

fn default_cell_size() -> f64 {
    1.0
}

fn default_initial_resources() -> ResourceAmounts {
    ResourceAmounts::new(20, 30, 0)
}

fn default_caps() -> ResourceAmounts {
    ResourceAmounts::new(100, 100, 100)
}

fn default_pool_size() -> usize {
    5
}

fn default_move_speed() -> f64 {
    2.0
}

fn default_ground_speed_multiplier() -> f64 {
    0.5
}

fn default_waypoint_tolerance() -> f64 {
    0.05
}

fn default_work_seconds() -> f64 {
    2.0
}

fn default_deposit_seconds() -> f64 {
    1.0
}

fn default_carry_capacity() -> i32 {
    5
}

fn default_road_search_radius() -> i32 {
    2
}

fn default_day_length() -> f64 {
    60.0
}

fn default_food_per_capita() -> u32 {
    2
}

fn default_road_wood_cost() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_size")]
    pub width: u32,
    #[serde(default = "default_grid_size")]
    pub height: u32,
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_size(),
            height: default_grid_size(),
            cell_size: default_cell_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_initial_resources")]
    pub initial: ResourceAmounts,
    #[serde(default = "default_caps")]
    pub caps: ResourceAmounts,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_resources(),
            caps: default_caps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Parked agents created up front.
    #[serde(default = "default_pool_size")]
    pub initial_pool_size: usize,
    /// World units per second on a road.
    #[serde(default = "default_move_speed")]
    pub move_speed: f64,
    /// Fraction of `move_speed` used off-road.
    #[serde(default = "default_ground_speed_multiplier")]
    pub ground_speed_multiplier: f64,
    #[serde(default = "default_waypoint_tolerance")]
    pub waypoint_tolerance: f64,
    /// Length of one work cycle at buildings with per-second production.
    #[serde(default = "default_work_seconds")]
    pub work_seconds: f64,
    #[serde(default = "default_deposit_seconds")]
    pub deposit_seconds: f64,
    /// Units of a single resource an agent can hold.
    #[serde(default = "default_carry_capacity")]
    pub carry_capacity: i32,
    /// Cells around a footprint searched for a road approach tile.
    #[serde(default = "default_road_search_radius")]
    pub road_search_radius: i32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: default_pool_size(),
            move_speed: default_move_speed(),
            ground_speed_multiplier: default_ground_speed_multiplier(),
            waypoint_tolerance: default_waypoint_tolerance(),
            work_seconds: default_work_seconds(),
            deposit_seconds: default_deposit_seconds(),
            carry_capacity: default_carry_capacity(),
            road_search_radius: default_road_search_radius(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayConfig {
    #[serde(default = "default_day_length")]
    pub length_seconds: f64,
    #[serde(default = "default_food_per_capita")]
    pub food_per_capita: u32,
}

impl Default for DayConfig {
    fn default() -> Self {
        Self {
            length_seconds: default_day_length(),
            food_per_capita: default_food_per_capita(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Citizens housed before any building exists.
    #[serde(default)]
    pub initial: u32,
}

/// Everything needed to construct a [`crate::world::World`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TownConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub agents: AgentConfig,
    #[serde(default)]
    pub day: DayConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default = "default_road_wood_cost")]
    pub road_wood_cost: i32,
}

impl Default for TownConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            store: StoreConfig::default(),
            agents: AgentConfig::default(),
            day: DayConfig::default(),
            population: PopulationConfig::default(),
            road_wood_cost: default_road_wood_cost(),
        }
    }
}

impl TownConfig {
    pub fn road_cost(&self) -> ResourceAmounts {
        ResourceAmounts::new(0, self.road_wood_cost, 0)
    }
}
