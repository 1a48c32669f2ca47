//! Repeating day timer and the food bill paid at each day boundary.

use serde::Serialize;
use tracing::{info, warn};

use crate::building::ResourceAmounts;
use crate::events::{DayEvent, ListenerId, Listeners};
use crate::store::ResourceStore;

pub struct DayCycle {
    day: u32,
    elapsed: f64,
    length: f64,
    paused: bool,
    listeners: Listeners<DayEvent>,
}

impl DayCycle {
    pub fn new(length_seconds: f64) -> Self {
        Self {
            day: 1,
            elapsed: 0.0,
            length: length_seconds,
            paused: false,
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&DayEvent) + 'static) -> ListenerId {
        self.listeners.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn time_left(&self) -> f64 {
        (self.length - self.elapsed).max(0.0)
    }

    /// Accumulate `dt`. When the day is over, announces `DayEnded` and
    /// returns true; the caller settles the day and then calls
    /// [`Self::roll_over`].
    pub fn advance(&mut self, dt: f64) -> bool {
        if self.paused {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed < self.length {
            return false;
        }
        info!(day = self.day, "day ended");
        self.listeners.emit(&DayEvent::DayEnded { day: self.day });
        true
    }

    /// Start the next day. Time past the boundary is dropped.
    pub fn roll_over(&mut self) {
        self.elapsed = 0.0;
        self.day += 1;
        self.listeners.emit(&DayEvent::DayStarted { day: self.day });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsumptionReport {
    pub needed: i32,
    pub consumed: i32,
    pub deficit: i32,
    pub hungry: u32,
    pub efficiency: f64,
}

pub struct FoodConsumption {
    per_capita: u32,
    hungry: u32,
    warning: bool,
    last: Option<ConsumptionReport>,
}

impl FoodConsumption {
    pub fn new(per_capita: u32) -> Self {
        Self {
            per_capita,
            hungry: 0,
            warning: false,
            last: None,
        }
    }

    pub fn per_capita(&self) -> u32 {
        self.per_capita
    }

    pub fn hungry(&self) -> u32 {
        self.hungry
    }

    pub fn hunger_warning(&self) -> bool {
        self.warning
    }

    pub fn last_report(&self) -> Option<ConsumptionReport> {
        self.last
    }

    /// Feed `population` from the store and set the production efficiency
    /// that holds until the next boundary.
    pub fn apply(&mut self, population: u32, store: &mut ResourceStore) -> ConsumptionReport {
        let needed = (population as i32).saturating_mul(self.per_capita as i32);
        let consumed = store.amounts().food.max(0).min(needed);
        if consumed > 0 {
            store.spend(ResourceAmounts::new(consumed, 0, 0));
        }
        let deficit = needed - consumed;

        let report = if deficit > 0 {
            let hungry = (deficit as f64 / self.per_capita as f64).ceil() as u32;
            let hungry = hungry.min(population);
            let efficiency = if population == 0 {
                1.0
            } else {
                f64::from(population - hungry) / f64::from(population)
            };
            warn!(population, deficit, hungry, efficiency, "not enough food");
            self.warning = true;
            self.hungry = hungry;
            ConsumptionReport {
                needed,
                consumed,
                deficit,
                hungry,
                efficiency,
            }
        } else {
            self.warning = false;
            self.hungry = 0;
            ConsumptionReport {
                needed,
                consumed,
                deficit: 0,
                hungry: 0,
                efficiency: 1.0,
            }
        };
        store.set_production_efficiency(report.efficiency);
        info!(needed, consumed, efficiency = report.efficiency, "daily food consumed");
        self.last = Some(report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with_food(food: i32) -> ResourceStore {
        ResourceStore::new(ResourceAmounts::new(food, 0, 0), ResourceAmounts::new(100, 100, 100))
    }

    #[test]
    fn rollover_announces_end_before_start() {
        let mut clock = DayCycle::new(10.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        clock.subscribe(move |event| sink.borrow_mut().push(*event));

        assert!(!clock.advance(6.0));
        assert!((clock.time_left() - 4.0).abs() < 1e-9);
        assert!(clock.advance(6.0));
        clock.roll_over();
        assert_eq!(clock.day(), 2);
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(
            *seen.borrow(),
            vec![DayEvent::DayEnded { day: 1 }, DayEvent::DayStarted { day: 2 }]
        );
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut clock = DayCycle::new(1.0);
        clock.set_paused(true);
        assert!(!clock.advance(5.0));
        assert_eq!(clock.elapsed(), 0.0);
        clock.set_paused(false);
        assert!(clock.advance(5.0));
    }

    #[test]
    fn shortage_cuts_efficiency_until_fed_again() {
        let mut store = store_with_food(5);
        let mut consumption = FoodConsumption::new(2);

        let report = consumption.apply(5, &mut store);
        assert_eq!(report.consumed, 5);
        assert_eq!(report.deficit, 5);
        assert_eq!(report.hungry, 3);
        assert!((report.efficiency - 0.4).abs() < 1e-9);
        assert!(consumption.hunger_warning());
        assert_eq!(store.amounts().food, 0);
        assert!((store.production_efficiency() - 0.4).abs() < 1e-9);

        store.add(ResourceAmounts::new(20, 0, 0));
        let report = consumption.apply(5, &mut store);
        assert_eq!(report.deficit, 0);
        assert_eq!(store.amounts().food, 10);
        assert!(!consumption.hunger_warning());
        assert_eq!(store.production_efficiency(), 1.0);
    }

    #[test]
    fn empty_town_eats_nothing() {
        let mut store = store_with_food(0);
        let mut consumption = FoodConsumption::new(2);
        let report = consumption.apply(0, &mut store);
        assert_eq!(report.needed, 0);
        assert_eq!(report.efficiency, 1.0);
        assert!(!consumption.hunger_warning());
    }

    #[test]
    fn hungry_count_never_exceeds_population() {
        let mut store = store_with_food(0);
        let mut consumption = FoodConsumption::new(3);
        let report = consumption.apply(2, &mut store);
        assert_eq!(report.hungry, 2);
        assert_eq!(report.efficiency, 0.0);
    }
}
