//! Shared test doubles and fixtures.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::household::{HouseholdId, HouseholdName, HouseholdType, NewHousehold};
use crate::domain::ports::HouseholdStore;
use crate::domain::profile::{CurrencyCode, UserId};
use crate::outbound::memory::MemoryStore;

/// A manually advanced clock for deterministic time-based tests.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Seed a household with an active owner membership into the memory store.
pub async fn seed_household(
    store: &Arc<MemoryStore>,
    name: &str,
    owner: UserId,
) -> HouseholdId {
    let name = match HouseholdName::new(name) {
        Ok(name) => name,
        Err(error) => panic!("invalid fixture household name: {error}"),
    };
    let result = store
        .create_household_with_owner(
            NewHousehold {
                name,
                household_type: HouseholdType::Household,
                base_currency: CurrencyCode::default_sek(),
                created_by: owner,
            },
            Utc::now(),
        )
        .await;
    match result {
        Ok((household, _)) => household.id,
        Err(error) => panic!("failed to seed household: {error}"),
    }
}
