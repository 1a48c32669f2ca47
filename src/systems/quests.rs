use std::rc::Rc;

use anyhow::Result;
use tracing::info;

use crate::{
    engine::{System, SystemContext},
    world::World,
};

/// Pays out quest rewards queued since the previous tick.
pub struct QuestSystem;

impl QuestSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QuestSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for QuestSystem {
    fn name(&self) -> &str {
        "quests"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World) -> Result<()> {
        let Some(log) = world.quest_log().map(Rc::clone) else {
            return Ok(());
        };
        let rewards = log.borrow_mut().take_rewards();
        if rewards.is_zero() {
            return Ok(());
        }
        let applied = world.store_mut().add(rewards);
        info!(tick = ctx.tick, ?rewards, ?applied, "quest rewards granted");
        Ok(())
    }
}
