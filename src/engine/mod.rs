use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::world::{TownSnapshot, World};

pub struct EngineSettings {
    pub scenario_name: String,
    /// Simulated seconds per tick.
    pub tick_seconds: f64,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            systems: self.systems,
            settings: self.settings,
        }
    }
}

pub struct Engine {
    systems: Vec<Box<dyn System>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    /// Run `ticks` ticks, handing `hook` a snapshot after each one.
    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&TownSnapshot),
    {
        info!(
            scenario = %self.settings.scenario_name,
            ticks,
            tick_seconds = self.settings.tick_seconds,
            "engine starting"
        );
        for _ in 0..ticks {
            self.step(world)?;
            hook(&world.snapshot());
        }
        Ok(())
    }

    /// Run every system once, in registration order, then advance the clock.
    pub fn step(&mut self, world: &mut World) -> Result<()> {
        let ctx = SystemContext {
            tick: world.tick(),
            dt_seconds: self.settings.tick_seconds,
            scenario_name: &self.settings.scenario_name,
        };
        for system in &mut self.systems {
            system
                .run(&ctx, world)
                .with_context(|| format!("system '{}' failed at tick {}", system.name(), ctx.tick))?;
        }
        world.advance_time();
        debug!(tick = world.tick(), "tick complete");
        Ok(())
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub dt_seconds: f64,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, world: &mut World) -> Result<()>;
}
