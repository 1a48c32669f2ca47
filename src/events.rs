//! Synchronous publish/subscribe lists.
//!
//! Each subsystem owns the `Listeners` for its own notifications and calls
//! [`Listeners::emit`] before the mutating method returns. Listeners run in
//! subscription order. A single mutation may emit several events back to back
//! (the store emits `ResourcesAdded` and then `ResourcesChanged`), so every
//! listener sees them in that order.

use serde::Serialize;

use crate::building::{BuildingId, ResourceAmounts};

type Handler<E> = Box<dyn FnMut(&E)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct Listeners<E> {
    next_id: u64,
    handlers: Vec<(ListenerId, Handler<E>)>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StoreEvent {
    /// Amounts actually credited by one `add`, after cap clamping.
    ResourcesAdded(ResourceAmounts),
    /// Any change to amounts or caps; carries the new amounts.
    ResourcesChanged(ResourceAmounts),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RegistryEvent {
    BuildingRegistered {
        building: BuildingId,
        name: String,
    },
    WorkersAssigned {
        building: BuildingId,
        assigned: u32,
        required: u32,
    },
    PopulationChanged {
        current: u32,
        max: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DayEvent {
    DayEnded { day: u32 },
    DayStarted { day: u32 },
}
