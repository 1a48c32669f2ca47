mod agents;
mod day_cycle;
mod quests;

pub use agents::AgentSystem;
pub use day_cycle::DayCycleSystem;
pub use quests::QuestSystem;
