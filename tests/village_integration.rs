//! Village subscriptions, activation and billing.

mod common;

use approx::assert_relative_eq;
use chrono::Duration;

use household_sim::error::EngineError;
use household_sim::tariff::{
    Ledger, PowerType, RateTariff, TariffId, TariffMarket, TransactionKind,
};
use household_sim::time::Tick;
use household_sim::village::{
    ForecastEvaluator, GroupSizes, HostContext, ShiftingGroup, Village, VillageStep,
};
use household_sim::weather::ConstantWeather;

use common::{BASE_TARIFF, CONTROLLABLE_TARIFF};

const CHALLENGER: TariffId = TariffId(5);

fn subscribed_village(sizes: GroupSizes, tick: Tick, seed: u64) -> Village {
    let mut village = common::village(sizes, tick, seed);
    village.subscribe_default(&common::default_market()).unwrap();
    village
}

fn activate(
    village: &mut Village,
    market: &dyn TariffMarket,
    ledger: &mut Ledger,
    hours: i64,
    timeslot: usize,
) -> VillageStep {
    let weather = ConstantWeather(10.0);
    let mut ctx = HostContext {
        market,
        accounting: ledger,
        weather: &weather,
    };
    village
        .activate(common::start() + Duration::hours(hours), timeslot, &mut ctx)
        .unwrap()
}

#[test]
fn default_subscription_covers_every_household() {
    let village = subscribed_village(common::small_sizes(), Tick::Hour, 1);
    for pt in PowerType::ALL {
        let tariff = if pt == PowerType::Consumption {
            BASE_TARIFF
        } else {
            CONTROLLABLE_TARIFF
        };
        assert_eq!(village.subscriptions().population(pt, tariff), village.population());
    }
    assert_eq!(village.customers().len(), 2);
}

#[test]
fn partial_change_conserves_population() {
    let sizes = GroupSizes {
        ns: 2,
        ras: 2,
        res: 2,
        ss: 4,
    };
    let mut village = subscribed_village(sizes, Tick::Hour, 2);
    let pt = PowerType::Consumption;
    let before_old = village.subscriptions().population(pt, BASE_TARIFF) as i64;
    let before_new = village.subscriptions().population(pt, CHALLENGER) as i64;

    let moved = village
        .change_subscription_count(BASE_TARIFF, CHALLENGER, ShiftingGroup::Ss, pt, 3)
        .unwrap();

    let delta_old = village.subscriptions().population(pt, BASE_TARIFF) as i64 - before_old;
    let delta_new = village.subscriptions().population(pt, CHALLENGER) as i64 - before_new;
    assert_eq!(moved, 3);
    assert_eq!(delta_old, -delta_new);
    assert_eq!(delta_new, 3);
}

#[test]
fn group_scoped_change_only_moves_that_group() {
    let mut village = subscribed_village(common::small_sizes(), Tick::Hour, 3);
    let pt = PowerType::InterruptibleConsumption;
    let moved =
        village.change_group_subscription(CONTROLLABLE_TARIFF, CHALLENGER, ShiftingGroup::Ns, pt);
    assert_eq!(moved, 1);
    let subs = village.subscriptions();
    assert_eq!(subs.customers(ShiftingGroup::Ns, pt, CHALLENGER), 1);
    for group in [ShiftingGroup::Ras, ShiftingGroup::Res, ShiftingGroup::Ss] {
        assert_eq!(subs.customers(group, pt, CHALLENGER), 0);
        assert_eq!(subs.customers(group, pt, CONTROLLABLE_TARIFF), 1);
    }
}

#[test]
fn over_draw_is_rejected_and_unsubscribe_clamps() {
    let mut village = subscribed_village(common::small_sizes(), Tick::Hour, 4);
    let pt = PowerType::Consumption;
    let err = village.change_subscription_count(BASE_TARIFF, CHALLENGER, ShiftingGroup::Res, pt, 2);
    assert!(matches!(err, Err(EngineError::Subscription(_))));
    assert_eq!(village.subscriptions().customers(ShiftingGroup::Res, pt, BASE_TARIFF), 1);

    assert_eq!(village.unsubscribe(BASE_TARIFF, ShiftingGroup::Res, pt, 5), 1);
    assert_eq!(village.subscriptions().customers(ShiftingGroup::Res, pt, BASE_TARIFF), 0);
}

#[test]
fn unknown_group_label_is_an_error() {
    let village = common::village(common::small_sizes(), Tick::Hour, 5);
    assert_eq!(village.group("ReS").unwrap(), ShiftingGroup::Res);
    assert!(matches!(village.group("XS"), Err(EngineError::UnknownGroup(_))));
}

#[test]
fn revoked_tariff_subscribers_return_to_default() {
    let mut market = common::default_market();
    market.publish(RateTariff::flat(
        CHALLENGER,
        "challenger",
        PowerType::InterruptibleConsumption,
        0.05,
    ));
    let mut village = subscribed_village(common::small_sizes(), Tick::Hour, 6);
    let pt = PowerType::InterruptibleConsumption;
    village.change_subscription(CONTROLLABLE_TARIFF, CHALLENGER, pt);
    assert_eq!(village.subscriptions().population(pt, CHALLENGER), 4);

    market.revoke(CHALLENGER).unwrap();
    let mut ledger = Ledger::new();
    activate(&mut village, &market, &mut ledger, 0, 0);

    assert!(village.subscriptions().iter().all(|s| s.tariff != CHALLENGER));
    assert_eq!(village.subscriptions().population(pt, CONTROLLABLE_TARIFF), 4);
    let kinds: Vec<TransactionKind> = ledger
        .transactions()
        .iter()
        .filter(|t| t.kind != TransactionKind::Consume)
        .map(|t| t.kind)
        .collect();
    assert!(kinds.contains(&TransactionKind::Withdraw));
    assert!(kinds.contains(&TransactionKind::Signup));
}

#[test]
fn activation_reports_household_energy() {
    let market = common::default_market();
    let mut village = subscribed_village(common::small_sizes(), Tick::Hour, 7);
    let mut ledger = Ledger::new();
    for hour in 0..24 {
        let step = activate(&mut village, &market, &mut ledger, hour, hour as usize);
        let mut base = 0;
        let mut controllable = 0;
        for household in village.all_households() {
            let load = household.tick_load(0, hour as usize * 4, Tick::Hour).unwrap();
            base += load.base;
            controllable += load.controllable;
        }
        assert_relative_eq!(step.base_kwh, base as f64 / 4000.0, epsilon = 1e-9);
        assert_relative_eq!(step.controllable_kwh, controllable as f64 / 4000.0, epsilon = 1e-9);
        assert_eq!(step.failures, 0);
    }
}

#[test]
fn consumption_is_billed_per_group_and_power_type() {
    let market = common::default_market();
    let mut village = subscribed_village(common::small_sizes(), Tick::Hour, 8);
    let mut ledger = Ledger::new();
    let step = activate(&mut village, &market, &mut ledger, 19, 19);

    let consumes: Vec<_> = ledger
        .transactions()
        .iter()
        .filter(|t| t.kind == TransactionKind::Consume)
        .collect();
    // four groups, two power types, one tariff each
    assert_eq!(consumes.len(), 8);
    let kwh: f64 = consumes.iter().map(|t| t.kwh).sum();
    let charge: f64 = consumes.iter().map(|t| t.charge).sum();
    assert_relative_eq!(kwh, step.base_kwh + step.controllable_kwh, epsilon = 1e-9);
    assert_relative_eq!(charge, step.charge, epsilon = 1e-9);
    assert_relative_eq!(
        step.charge,
        step.base_kwh * 0.12 + step.controllable_kwh * 0.10,
        epsilon = 1e-9
    );
}

#[test]
fn split_subscription_bills_proportional_shares() {
    let mut market = common::default_market();
    market.publish(RateTariff::flat(CHALLENGER, "challenger", PowerType::Consumption, 0.06));
    let sizes = GroupSizes { ns: 4, ras: 0, res: 0, ss: 0 };
    let mut village = subscribed_village(sizes, Tick::Hour, 9);
    village
        .change_subscription_count(
            BASE_TARIFF,
            CHALLENGER,
            ShiftingGroup::Ns,
            PowerType::Consumption,
            1,
        )
        .unwrap();
    let mut ledger = Ledger::new();
    let step = activate(&mut village, &market, &mut ledger, 8, 8);

    let on_challenger: f64 = ledger
        .transactions()
        .iter()
        .filter(|t| t.kind == TransactionKind::Consume && t.tariff == CHALLENGER)
        .map(|t| t.kwh)
        .sum();
    assert_relative_eq!(on_challenger, step.base_kwh / 4.0, epsilon = 1e-9);
}

#[test]
fn cheaper_tariff_attracts_every_group() {
    let mut market = common::default_market();
    let sizes = GroupSizes {
        ns: 2,
        ras: 2,
        res: 2,
        ss: 2,
    };
    let mut village = subscribed_village(sizes, Tick::Hour, 10);
    let mut ledger = Ledger::new();
    activate(&mut village, &market, &mut ledger, 0, 0);

    market.publish(RateTariff::flat(
        CHALLENGER,
        "challenger",
        PowerType::InterruptibleConsumption,
        0.01,
    ));
    let moved = village
        .publish_new_tariffs(&market, &ForecastEvaluator::default(), common::start())
        .unwrap();
    assert_eq!(moved, 8);
    for group in ShiftingGroup::ALL {
        assert_eq!(
            village
                .subscriptions()
                .dominant_tariff(group, PowerType::InterruptibleConsumption),
            Some(CHALLENGER)
        );
    }
}

#[test]
fn pricier_tariff_is_ignored() {
    let mut market = common::default_market();
    market.publish(RateTariff::flat(CHALLENGER, "challenger", PowerType::Consumption, 0.5));
    let mut village = subscribed_village(common::small_sizes(), Tick::Hour, 11);
    let moved = village
        .publish_new_tariffs(&market, &ForecastEvaluator::default(), common::start())
        .unwrap();
    assert_eq!(moved, 0);
}

#[test]
fn quarter_ticks_add_up_to_the_hour() {
    let market = common::default_market();
    let mut hourly = subscribed_village(common::small_sizes(), Tick::Hour, 12);
    let mut quarterly = subscribed_village(common::small_sizes(), Tick::Quarter, 12);
    let mut ledger = Ledger::new();

    let hour = activate(&mut hourly, &market, &mut ledger, 7, 7);
    let weather = ConstantWeather(10.0);
    let mut total = 0.0;
    for q in 0..4 {
        let mut ctx = HostContext {
            market: &market,
            accounting: &mut ledger,
            weather: &weather,
        };
        let at = common::start() + Duration::hours(7) + Duration::minutes(15 * q);
        let step = quarterly.activate(at, 28 + q as usize, &mut ctx).unwrap();
        total += step.base_kwh + step.controllable_kwh;
    }
    assert_relative_eq!(total, hour.base_kwh + hour.controllable_kwh, epsilon = 1e-9);
}

#[test]
fn same_seed_same_steps() {
    let market = common::default_market();
    let mut a = subscribed_village(common::small_sizes(), Tick::Hour, 13);
    let mut b = subscribed_village(common::small_sizes(), Tick::Hour, 13);
    let mut ledger_a = Ledger::new();
    let mut ledger_b = Ledger::new();
    for hour in 0..48 {
        let x = activate(&mut a, &market, &mut ledger_a, hour, hour as usize);
        let y = activate(&mut b, &market, &mut ledger_b, hour, hour as usize);
        assert_eq!(x, y);
    }
    assert_eq!(ledger_a.transactions(), ledger_b.transactions());
}

#[test]
fn activation_before_start_is_rejected() {
    let market = common::default_market();
    let mut village = subscribed_village(common::small_sizes(), Tick::Hour, 14);
    let mut ledger = Ledger::new();
    let weather = ConstantWeather(10.0);
    let mut ctx = HostContext {
        market: &market,
        accounting: &mut ledger,
        weather: &weather,
    };
    let err = village.activate(common::start() - Duration::hours(1), 0, &mut ctx);
    assert!(matches!(err, Err(EngineError::BeforeStart(_))));
}
