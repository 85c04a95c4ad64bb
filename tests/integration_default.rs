//! Integration tests for complete scenario runs.

use approx::assert_relative_eq;

use household_sim::config::{OFFER_TARIFF, ScenarioConfig};
use household_sim::io::export::export_csv;
use household_sim::runner::{build_engine, run_scenario};
use household_sim::tariff::{PowerType, TransactionKind};
use household_sim::village::GroupSizes;

/// Two-day baseline with small villages.
fn short_baseline() -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.days_of_bootstrap = 1;
    cfg.simulation.days_of_competition = 1;
    cfg.village = GroupSizes {
        ns: 1,
        ras: 1,
        res: 1,
        ss: 2,
    };
    cfg
}

#[test]
fn full_run_produces_one_step_per_village_and_timeslot() {
    let cfg = short_baseline();
    let result = run_scenario(&cfg).unwrap();
    assert_eq!(result.config.total_steps(), 48);
    assert_eq!(result.steps.len(), 48 * cfg.simulation.villages);
    assert_eq!(result.days.len(), 2);
    for (i, pair) in result.steps.chunks(cfg.simulation.villages).enumerate() {
        assert!(pair.iter().all(|s| s.timeslot == i));
    }
}

#[test]
fn report_agrees_with_steps() {
    let result = run_scenario(&short_baseline()).unwrap();
    let base: f64 = result.steps.iter().map(|s| s.base_kwh).sum();
    let controllable: f64 = result.steps.iter().map(|s| s.controllable_kwh).sum();
    let charge: f64 = result.steps.iter().map(|s| s.charge).sum();

    assert_relative_eq!(result.report.base_kwh, base, epsilon = 1e-6);
    assert_relative_eq!(result.report.controllable_kwh, controllable, epsilon = 1e-6);
    assert_relative_eq!(result.report.total_charge, charge, epsilon = 1e-6);
    assert!(result.report.base_kwh > 0.0);
    assert!(result.report.controllable_kwh > 0.0);
    assert!(result.report.controllable_pct > 0.0 && result.report.controllable_pct < 100.0);
    assert_eq!(result.report.failure_count, 0);

    let day_total: f64 = result.days.iter().map(|d| d.base_kwh + d.controllable_kwh).sum();
    assert_relative_eq!(day_total, base + controllable, epsilon = 1e-6);
}

#[test]
fn same_seed_reproduces_the_run() {
    let a = run_scenario(&short_baseline()).unwrap();
    let b = run_scenario(&short_baseline()).unwrap();
    assert_eq!(a.steps, b.steps);

    let mut other = short_baseline();
    other.simulation.seed = 7;
    let c = run_scenario(&other).unwrap();
    assert_ne!(a.steps, c.steps);
}

#[test]
fn every_household_stays_subscribed() {
    let result = run_scenario(&short_baseline()).unwrap();
    for village in &result.villages {
        for power_type in PowerType::ALL {
            let subscribed: usize = village
                .subscriptions
                .iter()
                .filter(|s| s.power_type == power_type)
                .map(|s| s.customers)
                .sum();
            assert_eq!(subscribed, village.population, "{}", village.name);
        }
        assert_eq!(village.customers.len(), 2);
    }
}

#[test]
fn csv_export_writes_header_and_rows() {
    let result = run_scenario(&short_baseline()).unwrap();
    let path = std::env::temp_dir().join("household_sim_integration_export.csv");
    export_csv(&result.steps, &path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some(concat!(
            "timeslot,at,village,day,quarter,temperature,",
            "base_kwh,controllable_kwh,charge,failures"
        ))
    );
    assert_eq!(lines.count(), result.steps.len());
}

#[test]
fn offer_is_adopted_and_revoked_subscribers_return_to_default() {
    let cfg = ScenarioConfig::smart_village();
    let mut engine = build_engine(&cfg).unwrap();
    engine.run().unwrap();

    let ledger = engine.ledger().transactions();
    assert!(
        ledger
            .iter()
            .any(|t| t.kind == TransactionKind::Consume && t.tariff == OFFER_TARIFF),
        "offer tariff was never billed"
    );
    assert!(
        ledger
            .iter()
            .any(|t| t.kind == TransactionKind::Withdraw && t.tariff == OFFER_TARIFF)
    );
    assert!(ledger.iter().any(|t| t.kind == TransactionKind::Signup));
    for village in engine.villages() {
        assert!(village.subscriptions().iter().all(|s| s.tariff != OFFER_TARIFF));
    }
}
