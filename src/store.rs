//! Shared stockpile of food, wood and stone.
//!
//! Amounts change only through [`ResourceStore::spend`] and
//! [`ResourceStore::add`]; caps only through [`ResourceStore::increase_cap`].
//! Production efficiency is stored here but applied by producers, never by
//! `add` or `spend`.

use tracing::debug;

use crate::building::{ResourceAmounts, ResourceKind};
use crate::events::{ListenerId, Listeners, StoreEvent};

pub struct ResourceStore {
    current: ResourceAmounts,
    caps: ResourceAmounts,
    efficiency: f64,
    listeners: Listeners<StoreEvent>,
}

impl ResourceStore {
    /// Initial amounts above their cap are clamped down.
    pub fn new(initial: ResourceAmounts, caps: ResourceAmounts) -> Self {
        let mut current = initial;
        for kind in ResourceKind::ALL {
            let cap = caps.get(kind);
            let value = current.get_mut(kind);
            *value = (*value).clamp(0, cap.max(0));
        }
        Self {
            current,
            caps,
            efficiency: 1.0,
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&StoreEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn amounts(&self) -> ResourceAmounts {
        self.current
    }

    pub fn caps(&self) -> ResourceAmounts {
        self.caps
    }

    pub fn get(&self, kind: ResourceKind) -> i32 {
        self.current.get(kind)
    }

    pub fn cap(&self, kind: ResourceKind) -> i32 {
        self.caps.get(kind)
    }

    pub fn can_afford(&self, cost: ResourceAmounts) -> bool {
        self.current.food >= cost.food
            && self.current.wood >= cost.wood
            && self.current.stone >= cost.stone
    }

    /// Unconditional decrement; callers check [`Self::can_afford`] first.
    pub fn spend(&mut self, cost: ResourceAmounts) {
        self.current.food -= cost.food;
        self.current.wood -= cost.wood;
        self.current.stone -= cost.stone;
        debug!(?cost, remaining = ?self.current, "resources spent");
        self.listeners.emit(&StoreEvent::ResourcesChanged(self.current));
    }

    /// Credit `amounts`, clamping each resource to its cap. Returns the delta
    /// actually applied.
    pub fn add(&mut self, amounts: ResourceAmounts) -> ResourceAmounts {
        let mut applied = ResourceAmounts::ZERO;
        for kind in ResourceKind::ALL {
            let cap = self.caps.get(kind);
            let value = self.current.get_mut(kind);
            let before = *value;
            let request = amounts.get(kind).max(0);
            let after = if before >= cap {
                before
            } else {
                before.saturating_add(request).min(cap)
            };
            *value = after;
            *applied.get_mut(kind) = after - before;
        }
        debug!(requested = ?amounts, ?applied, "resources added");
        self.listeners.emit(&StoreEvent::ResourcesAdded(applied));
        self.listeners.emit(&StoreEvent::ResourcesChanged(self.current));
        applied
    }

    /// Raises all three caps by the same amount.
    pub fn increase_cap(&mut self, amount: i32) {
        self.caps.food += amount;
        self.caps.wood += amount;
        self.caps.stone += amount;
        self.listeners.emit(&StoreEvent::ResourcesChanged(self.current));
    }

    pub fn production_efficiency(&self) -> f64 {
        self.efficiency
    }

    pub fn set_production_efficiency(&mut self, efficiency: f64) {
        self.efficiency = if efficiency.is_nan() {
            1.0
        } else {
            efficiency.clamp(0.0, 1.0)
        };
    }
}
