//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use household_sim::appliances::Appliance;
use household_sim::household::Household;
use household_sim::occupancy::{Person, Status};
use household_sim::params::HouseholdParams;
use household_sim::rng::RandomStream;
use household_sim::tariff::{PowerType, RateTariff, TariffBook, TariffId};
use household_sim::time::{Tick, TimeGrid};
use household_sim::village::{GroupSizes, Village};

pub const BASE_TARIFF: TariffId = TariffId(1);
pub const CONTROLLABLE_TARIFF: TariffId = TariffId(2);

/// Monday, midnight UTC.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2011, 1, 3, 0, 0, 0).unwrap()
}

/// Two-week grid starting at [`start`].
pub fn grid() -> TimeGrid {
    TimeGrid::new(start(), 14)
}

/// Market with flat default tariffs (0.12 consumption, 0.10 interruptible).
pub fn default_market() -> TariffBook {
    let mut book = TariffBook::new();
    book.publish_default(RateTariff::flat(BASE_TARIFF, "default", PowerType::Consumption, 0.12));
    book.publish_default(RateTariff::flat(
        CONTROLLABLE_TARIFF,
        "default",
        PowerType::InterruptibleConsumption,
        0.10,
    ));
    book
}

/// Village with default household parameters.
pub fn village(sizes: GroupSizes, tick: Tick, seed: u64) -> Village {
    Village::new("Village 1", 0, &sizes, &HouseholdParams::default(), grid(), tick, seed).unwrap()
}

/// One household per group.
pub fn small_sizes() -> GroupSizes {
    GroupSizes {
        ns: 1,
        ras: 1,
        res: 1,
        ss: 1,
    }
}

/// Household of one person with a constant status and the given appliances.
pub fn household_with(appliances: Vec<Appliance>, status: Status, seed: u64) -> Household {
    let days = grid().horizon_days();
    Household::from_parts(
        "Test Household",
        vec![Person::constant("Test Person", status, days)],
        appliances,
        days,
        RandomStream::new(seed),
    )
    .unwrap()
}

/// Households generated from default parameters with consecutive seeds.
pub fn generated_households(count: usize, seed: u64) -> Vec<Household> {
    let params = HouseholdParams::default();
    (0..count)
        .map(|i| {
            Household::generate(
                format!("Household {i}"),
                &params,
                grid().horizon_days(),
                RandomStream::derive(seed, i as u64),
            )
            .unwrap()
        })
        .collect()
}
