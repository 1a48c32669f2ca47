use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    world::World,
};

/// Moves every active agent through its work loop and returns the ones
/// that went idle to the pool.
pub struct AgentSystem;

impl AgentSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AgentSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for AgentSystem {
    fn name(&self) -> &str {
        "agents"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World) -> Result<()> {
        world.advance_agents(ctx.dt_seconds);
        Ok(())
    }
}
