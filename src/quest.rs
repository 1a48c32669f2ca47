//! Quest chain driven entirely by town notifications.
//!
//! The log is shared behind `Rc<RefCell<_>>` so listener closures on the
//! registry, store, and day cycle can update it. Rewards are only queued
//! here; granting them would re-enter the store from inside its own
//! notification, so [`crate::systems::QuestSystem`] pays them out on the
//! following tick.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::building::{BuildingId, ResourceAmounts, ResourceKind};
use crate::events::{DayEvent, RegistryEvent, StoreEvent};

pub type SharedQuestLog = Rc<RefCell<QuestLog>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestGoal {
    /// Register `count` buildings of the named type.
    BuildSpecific { building: String, count: u32 },
    ReachPopulation { count: u32 },
    /// Collect `count` units, counting only what the store actually credited.
    CollectResource { resource: ResourceKind, count: i32 },
    /// Have `count` distinct buildings with at least one assigned worker.
    AssignWorkers { count: u32 },
    SurviveDays { count: u32 },
}

impl QuestGoal {
    pub fn target(&self) -> i64 {
        match self {
            QuestGoal::BuildSpecific { count, .. }
            | QuestGoal::ReachPopulation { count }
            | QuestGoal::AssignWorkers { count }
            | QuestGoal::SurviveDays { count } => i64::from(*count),
            QuestGoal::CollectResource { count, .. } => i64::from(*count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDef {
    pub title: String,
    pub goal: QuestGoal,
    #[serde(default)]
    pub reward: ResourceAmounts,
    /// Completing this quest wins the scenario.
    #[serde(default)]
    pub victory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestStatus {
    pub title: String,
    pub progress: i64,
    pub target: i64,
}

#[derive(Debug)]
pub struct QuestLog {
    quests: Vec<QuestDef>,
    current: usize,
    progress: i64,
    completed: Vec<String>,
    pending_rewards: ResourceAmounts,
    victory: bool,
    population: u32,
    staffed: BTreeSet<BuildingId>,
    days_survived: u32,
}

impl QuestLog {
    pub fn new(quests: Vec<QuestDef>) -> Self {
        let mut log = Self {
            quests,
            current: 0,
            progress: 0,
            completed: Vec::new(),
            pending_rewards: ResourceAmounts::ZERO,
            victory: false,
            population: 0,
            staffed: BTreeSet::new(),
            days_survived: 0,
        };
        log.sync_with_state();
        log
    }

    pub fn shared(quests: Vec<QuestDef>) -> SharedQuestLog {
        Rc::new(RefCell::new(Self::new(quests)))
    }

    pub fn active(&self) -> Option<&QuestDef> {
        self.quests.get(self.current)
    }

    pub fn status(&self) -> Option<QuestStatus> {
        self.active().map(|quest| QuestStatus {
            title: quest.title.clone(),
            progress: self.progress,
            target: quest.goal.target(),
        })
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.quests.len()
    }

    pub fn victory(&self) -> bool {
        self.victory
    }

    /// Drain rewards earned since the last call.
    pub fn take_rewards(&mut self) -> ResourceAmounts {
        std::mem::take(&mut self.pending_rewards)
    }

    pub fn on_registry_event(&mut self, event: &RegistryEvent) {
        match event {
            RegistryEvent::BuildingRegistered { name, .. } => {
                let wanted = matches!(
                    self.active().map(|q| &q.goal),
                    Some(QuestGoal::BuildSpecific { building, .. }) if building == name
                );
                if wanted {
                    self.progress += 1;
                }
            }
            RegistryEvent::PopulationChanged { current, .. } => {
                self.population = *current;
                if self.goal_is(|goal| matches!(goal, QuestGoal::ReachPopulation { .. })) {
                    self.progress = i64::from(*current);
                }
            }
            RegistryEvent::WorkersAssigned {
                building, assigned, ..
            } => {
                if *assigned > 0 {
                    self.staffed.insert(*building);
                }
                if self.goal_is(|goal| matches!(goal, QuestGoal::AssignWorkers { .. })) {
                    self.progress = self.staffed.len() as i64;
                }
            }
        }
        self.check_completion();
    }

    pub fn on_store_event(&mut self, event: &StoreEvent) {
        let StoreEvent::ResourcesAdded(applied) = event else {
            return;
        };
        let resource = match self.active().map(|q| &q.goal) {
            Some(QuestGoal::CollectResource { resource, .. }) => Some(*resource),
            _ => None,
        };
        if let Some(resource) = resource {
            self.progress += i64::from(applied.get(resource).max(0));
        }
        self.check_completion();
    }

    pub fn on_day_event(&mut self, event: &DayEvent) {
        let DayEvent::DayEnded { day } = event else {
            return;
        };
        self.days_survived = *day;
        if self.goal_is(|goal| matches!(goal, QuestGoal::SurviveDays { .. })) {
            self.progress = i64::from(*day);
        }
        self.check_completion();
    }

    fn goal_is(&self, predicate: impl Fn(&QuestGoal) -> bool) -> bool {
        self.active().map_or(false, |quest| predicate(&quest.goal))
    }

    /// Forget that `building` was staffed, e.g. after it is removed.
    pub fn forget_building(&mut self, building: BuildingId) {
        self.staffed.remove(&building);
    }

    fn check_completion(&mut self) {
        while let Some(quest) = self.quests.get(self.current) {
            if self.progress < quest.goal.target() {
                return;
            }
            info!(title = %quest.title, reward = ?quest.reward, "quest completed");
            self.pending_rewards.food += quest.reward.food;
            self.pending_rewards.wood += quest.reward.wood;
            self.pending_rewards.stone += quest.reward.stone;
            if quest.victory {
                info!(title = %quest.title, "victory");
                self.victory = true;
            }
            self.completed.push(quest.title.clone());
            self.current += 1;
            self.sync_with_state();
        }
    }

    /// Seed progress for state-based goals from what has already been
    /// observed; event-counted goals start from zero.
    fn sync_with_state(&mut self) {
        self.progress = match self.active().map(|q| &q.goal) {
            Some(QuestGoal::ReachPopulation { .. }) => i64::from(self.population),
            Some(QuestGoal::AssignWorkers { .. }) => self.staffed.len() as i64,
            Some(QuestGoal::SurviveDays { .. }) => i64::from(self.days_survived),
            _ => 0,
        };
    }
}
