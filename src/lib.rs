pub mod agent;
pub mod building;
pub mod config;
pub mod day;
pub mod engine;
pub mod events;
pub mod grid;
pub mod pathfinding;
pub mod quest;
pub mod registry;
pub mod scenario;
pub mod store;
pub mod systems;
pub mod workforce;
pub mod world;

pub use building::{BuildingDef, BuildingId, Production, ResourceAmounts, ResourceKind};
pub use config::TownConfig;
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use grid::{Grid, GridPos, WorldPos};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{PlacementError, TownSnapshot, World};
