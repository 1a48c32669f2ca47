use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    world::World,
};

pub struct DayCycleSystem {
    days_completed: u32,
}

impl DayCycleSystem {
    pub fn new() -> Self {
        Self { days_completed: 0 }
    }

    pub fn days_completed(&self) -> u32 {
        self.days_completed
    }
}

impl Default for DayCycleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DayCycleSystem {
    fn name(&self) -> &str {
        "day_cycle"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World) -> Result<()> {
        if world.advance_day(ctx.dt_seconds) {
            self.days_completed += 1;
            debug!(tick = ctx.tick, day = world.clock().day(), "day boundary settled");
        }
        Ok(())
    }
}
