use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    building::{BuildingDef, BuildingSpec, DefinitionError},
    config::TownConfig,
    engine::EngineSettings,
    grid::GridPos,
    quest::{QuestDef, QuestGoal},
    world::{PlacementError, World},
};

fn default_tick_seconds() -> f64 {
    0.1
}

#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    #[error("tick length must be positive, got {0}")]
    InvalidTickLength(f64),
    #[error("day length must be positive, got {0}")]
    InvalidDayLength(f64),
    #[error("grid must have at least one cell, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(f64),
    #[error("agent move speed must be positive, got {0}")]
    InvalidMoveSpeed(f64),
    #[error("agent carry capacity must be positive, got {0}")]
    InvalidCarryCapacity(i32),
    #[error("{context} refers to unknown building '{name}'")]
    UnknownBuilding { name: String, context: String },
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("cannot place '{name}': {source}")]
    Placement {
        name: String,
        #[source]
        source: PlacementError,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub town: TownConfig,
    #[serde(default)]
    pub buildings: Vec<BuildingSpec>,
    #[serde(default)]
    pub layout: ScenarioLayout,
    #[serde(default)]
    pub quests: Vec<QuestDef>,
}

/// Roads and buildings present when the scenario starts. They are not paid
/// for.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioLayout {
    #[serde(default)]
    pub roads: Vec<(i32, i32)>,
    #[serde(default)]
    pub buildings: Vec<LayoutBuilding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutBuilding {
    pub building: String,
    pub at: (i32, i32),
}

/// Validated building definitions by name.
#[derive(Debug, Clone, Default)]
pub struct BuildingCatalog {
    defs: BTreeMap<String, Arc<BuildingDef>>,
}

impl BuildingCatalog {
    pub fn from_specs(specs: &[BuildingSpec]) -> Result<Self, DefinitionError> {
        let mut defs = BTreeMap::new();
        for spec in specs {
            let def = BuildingDef::try_from(spec.clone())?;
            if defs.contains_key(&def.name) {
                return Err(DefinitionError::Duplicate(def.name));
            }
            defs.insert(def.name.clone(), def.into_shared());
        }
        Ok(Self { defs })
    }

    pub fn get(&self, name: &str) -> Option<Arc<BuildingDef>> {
        self.defs.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn catalog(&self) -> Result<BuildingCatalog, ScenarioError> {
        Ok(BuildingCatalog::from_specs(&self.buildings)?)
    }

    pub fn validate(&self) -> Result<BuildingCatalog, ScenarioError> {
        if !(self.tick_seconds > 0.0 && self.tick_seconds.is_finite()) {
            return Err(ScenarioError::InvalidTickLength(self.tick_seconds));
        }
        if !(self.town.day.length_seconds > 0.0) {
            return Err(ScenarioError::InvalidDayLength(self.town.day.length_seconds));
        }
        let grid = &self.town.grid;
        if grid.width == 0 || grid.height == 0 {
            return Err(ScenarioError::EmptyGrid {
                width: grid.width,
                height: grid.height,
            });
        }
        if !(grid.cell_size > 0.0 && grid.cell_size.is_finite()) {
            return Err(ScenarioError::InvalidCellSize(grid.cell_size));
        }
        let agents = &self.town.agents;
        if !(agents.move_speed > 0.0 && agents.move_speed.is_finite()) {
            return Err(ScenarioError::InvalidMoveSpeed(agents.move_speed));
        }
        if agents.carry_capacity <= 0 {
            return Err(ScenarioError::InvalidCarryCapacity(agents.carry_capacity));
        }

        let catalog = self.catalog()?;
        for placed in &self.layout.buildings {
            if !catalog.contains(&placed.building) {
                return Err(ScenarioError::UnknownBuilding {
                    name: placed.building.clone(),
                    context: "layout".into(),
                });
            }
        }
        for quest in &self.quests {
            if let QuestGoal::BuildSpecific { building, .. } = &quest.goal {
                if !catalog.contains(building) {
                    return Err(ScenarioError::UnknownBuilding {
                        name: building.clone(),
                        context: format!("quest '{}'", quest.title),
                    });
                }
            }
        }
        Ok(catalog)
    }

    pub fn build_world(&self) -> Result<World> {
        let catalog = self.validate()?;
        let mut world = World::new(self.town.clone(), self.tick_seconds);

        for &(x, y) in &self.layout.roads {
            world
                .spawn_road(GridPos::new(x, y))
                .with_context(|| format!("Failed to lay road at ({x}, {y})"))?;
        }
        for placed in &self.layout.buildings {
            let def = catalog
                .get(&placed.building)
                .ok_or_else(|| ScenarioError::UnknownBuilding {
                    name: placed.building.clone(),
                    context: "layout".into(),
                })?;
            world
                .spawn_building(def, GridPos::from(placed.at))
                .map_err(|source| ScenarioError::Placement {
                    name: placed.building.clone(),
                    source,
                })?;
        }
        if !self.quests.is_empty() {
            world.attach_quests(self.quests.clone());
        }
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(600)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            scenario_name: self.name.clone(),
            tick_seconds: self.tick_seconds,
        }
    }
}
