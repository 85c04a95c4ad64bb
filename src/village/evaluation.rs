//! Tariff evaluation for subscription decisions.

use chrono::{DateTime, Duration, Utc};

use crate::forecast::NaiveForecast;
use crate::tariff::{Tariff, TariffId};
use crate::time::HOURS_OF_DAY;

/// Prices an expected demand series under a tariff.
pub trait CostEvaluator {
    /// Expected cost of consuming `demand` (kWh per hour, first entry at
    /// `start`) under `tariff`.
    fn expected_cost(&self, tariff: &dyn Tariff, start: DateTime<Utc>, demand: &[f64]) -> f64;

    /// Hourly demand series the evaluation runs over, built from sampled days.
    fn demand(&self, sampled_days: &[[f64; HOURS_OF_DAY]]) -> Vec<f64>;

    /// Number of days of the current week sampled for the forecast.
    fn sample_days(&self) -> usize;
}

/// Default evaluator: repeats the average of a few sampled days over the
/// lookahead horizon and sums the hourly usage charges.
#[derive(Debug, Clone, Copy)]
pub struct ForecastEvaluator {
    pub horizon_days: usize,
    pub sample_days: usize,
}

impl Default for ForecastEvaluator {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            sample_days: 3,
        }
    }
}

impl CostEvaluator for ForecastEvaluator {
    fn expected_cost(&self, tariff: &dyn Tariff, start: DateTime<Utc>, demand: &[f64]) -> f64 {
        let mut cumulative = 0.0;
        let mut cost = 0.0;
        for (h, &kwh) in demand.iter().enumerate() {
            cost += tariff.usage_charge(start + Duration::hours(h as i64), kwh, cumulative);
            cumulative += kwh;
        }
        cost
    }

    fn demand(&self, sampled_days: &[[f64; HOURS_OF_DAY]]) -> Vec<f64> {
        let day = NaiveForecast.average_day(sampled_days);
        NaiveForecast.forecast(&day, self.horizon_days * HOURS_OF_DAY)
    }

    fn sample_days(&self) -> usize {
        self.sample_days
    }
}

/// Picks the candidate that is strictly cheaper than the current tariff.
///
/// Among equally cheap candidates the first one wins, so the outcome only
/// depends on the order of `candidates`.
pub fn cheaper_tariff(
    evaluator: &dyn CostEvaluator,
    current: &dyn Tariff,
    candidates: &[&dyn Tariff],
    start: DateTime<Utc>,
    demand: &[f64],
) -> Option<TariffId> {
    let mut best_cost = evaluator.expected_cost(current, start, demand);
    let mut best = None;
    for candidate in candidates {
        if candidate.id() == current.id() || candidate.is_revoked() {
            continue;
        }
        let cost = evaluator.expected_cost(*candidate, start, demand);
        if cost < best_cost {
            best_cost = cost;
            best = Some(candidate.id());
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::{PowerType, RateTariff};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2011, 1, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn cheaper_flat_rate_is_chosen() {
        let current = RateTariff::flat(TariffId(1), "d", PowerType::Consumption, 0.10);
        let cheap = RateTariff::flat(TariffId(2), "b", PowerType::Consumption, 0.05);
        let eval = ForecastEvaluator::default();
        let demand = eval.demand(&[[0.5; 24]]);
        let pick = cheaper_tariff(&eval, &current, &[&current, &cheap], start(), &demand);
        assert_eq!(pick, Some(TariffId(2)));
    }

    #[test]
    fn equal_cost_keeps_current() {
        let current = RateTariff::flat(TariffId(1), "d", PowerType::Consumption, 0.10);
        let same = RateTariff::flat(TariffId(2), "b", PowerType::Consumption, 0.10);
        let eval = ForecastEvaluator::default();
        let demand = eval.demand(&[[0.5; 24]]);
        assert_eq!(cheaper_tariff(&eval, &current, &[&same], start(), &demand), None);
    }

    #[test]
    fn demand_covers_horizon() {
        let eval = ForecastEvaluator {
            horizon_days: 2,
            sample_days: 1,
        };
        assert_eq!(eval.demand(&[[1.0; 24]]).len(), 48);
    }
}
