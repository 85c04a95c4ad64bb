//! Villages: groups of households, their tariff subscriptions, and the
//! per-tick activation cycle.
//!
//! Each village models two customers, one for the fixed load of its
//! households and one for their interruptible load. Households are split into
//! shifting groups; a group's population can be spread over several tariffs
//! per power type, and a group's tick demand is billed to each of its
//! subscriptions in proportion to the customers on it.

pub mod evaluation;
pub mod subscription;

pub use evaluation::{CostEvaluator, ForecastEvaluator};
pub use subscription::{Subscription, SubscriptionBook};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{EngineError, EngineResult};
use crate::household::{Household, TickLoad};
use crate::params::HouseholdParams;
use crate::rng::RandomStream;
use crate::shifting::{HourlyPrices, ShiftingPolicy};
use crate::tariff::{
    Accounting, PowerType, Tariff, TariffId, TariffMarket, TariffTransaction, TransactionKind,
};
use crate::time::{DAYS_OF_WEEK, HOURS_OF_DAY, QUARTERS_OF_HOUR, Tick, TimeGrid};
use crate::weather::WeatherFeed;

/// Watt-quarters per kWh.
const WATT_QUARTERS_PER_KWH: f64 = 4000.0;

/// Household group sharing one shifting behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShiftingGroup {
    /// Not shifting.
    #[serde(rename = "NS")]
    Ns,
    /// Random shifting.
    #[serde(rename = "RaS")]
    Ras,
    /// Regular shifting.
    #[serde(rename = "ReS")]
    Res,
    /// Smart shifting.
    #[serde(rename = "SS")]
    Ss,
}

impl ShiftingGroup {
    pub const ALL: [ShiftingGroup; 4] = [
        ShiftingGroup::Ns,
        ShiftingGroup::Ras,
        ShiftingGroup::Res,
        ShiftingGroup::Ss,
    ];

    pub fn policy(self) -> ShiftingPolicy {
        match self {
            ShiftingGroup::Ns => ShiftingPolicy::None,
            ShiftingGroup::Ras => ShiftingPolicy::Random,
            ShiftingGroup::Res => ShiftingPolicy::Regular,
            ShiftingGroup::Ss => ShiftingPolicy::Smart,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ShiftingGroup::Ns => "NS",
            ShiftingGroup::Ras => "RaS",
            ShiftingGroup::Res => "ReS",
            ShiftingGroup::Ss => "SS",
        }
    }
}

impl fmt::Display for ShiftingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ShiftingGroup {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShiftingGroup::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| EngineError::UnknownGroup(s.to_string()))
    }
}

/// Number of households per shifting group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupSizes {
    pub ns: usize,
    pub ras: usize,
    pub res: usize,
    pub ss: usize,
}

impl Default for GroupSizes {
    fn default() -> Self {
        Self {
            ns: 2,
            ras: 2,
            res: 2,
            ss: 2,
        }
    }
}

impl GroupSizes {
    pub fn get(&self, group: ShiftingGroup) -> usize {
        match group {
            ShiftingGroup::Ns => self.ns,
            ShiftingGroup::Ras => self.ras,
            ShiftingGroup::Res => self.res,
            ShiftingGroup::Ss => self.ss,
        }
    }

    pub fn total(&self) -> usize {
        self.ns + self.ras + self.res + self.ss
    }
}

/// Customer identity published to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerInfo {
    pub name: String,
    pub power_type: PowerType,
    pub population: usize,
}

/// Collaborators supplied by the host for one activation.
pub struct HostContext<'a> {
    pub market: &'a dyn TariffMarket,
    pub accounting: &'a mut dyn Accounting,
    pub weather: &'a dyn WeatherFeed,
}

/// Demand and charge of one group during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupStep {
    pub group: ShiftingGroup,
    pub base_kwh: f64,
    pub controllable_kwh: f64,
    pub charge: f64,
}

/// Outcome of one activation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VillageStep {
    pub village: String,
    pub timeslot: usize,
    pub at: DateTime<Utc>,
    pub day: usize,
    pub quarter: usize,
    pub temperature: Option<f64>,
    pub base_kwh: f64,
    pub controllable_kwh: f64,
    pub charge: f64,
    pub groups: Vec<GroupStep>,
    /// Households skipped this tick because of an error.
    pub failures: usize,
}

/// A village of households.
#[derive(Debug, Clone)]
pub struct Village {
    name: String,
    grid: TimeGrid,
    tick: Tick,
    groups: BTreeMap<ShiftingGroup, Vec<Household>>,
    subscriptions: SubscriptionBook,
    rng: RandomStream,
    prepared_day: Option<usize>,
}

impl Village {
    /// Builds `sizes.total()` households from `params`.
    ///
    /// Household `i` of village `index` draws from its own stream derived
    /// from `seed`, so one household's draws never shift another's.
    pub fn new(
        name: impl Into<String>,
        index: usize,
        sizes: &GroupSizes,
        params: &HouseholdParams,
        grid: TimeGrid,
        tick: Tick,
        seed: u64,
    ) -> EngineResult<Self> {
        let name = name.into();
        let village_key = (index as u64) << 32;
        let mut groups = BTreeMap::new();
        let mut counter = 0u64;
        for group in ShiftingGroup::ALL {
            let mut households = Vec::with_capacity(sizes.get(group));
            for i in 0..sizes.get(group) {
                let rng = RandomStream::derive(seed, village_key | counter);
                counter += 1;
                households.push(Household::generate(
                    format!("{name} {group} Household {}", i + 1),
                    params,
                    grid.horizon_days(),
                    rng,
                )?);
            }
            groups.insert(group, households);
        }
        info!(village = %name, households = counter, "village created");
        Ok(Self::from_households(
            name,
            grid,
            tick,
            groups,
            RandomStream::derive(seed, village_key | 0xffff_ffff),
        ))
    }

    /// Wraps already built households.
    pub fn from_households(
        name: impl Into<String>,
        grid: TimeGrid,
        tick: Tick,
        groups: BTreeMap<ShiftingGroup, Vec<Household>>,
        rng: RandomStream,
    ) -> Self {
        Self {
            name: name.into(),
            grid,
            tick,
            groups,
            subscriptions: SubscriptionBook::new(),
            rng,
            prepared_day: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn households(&self, group: ShiftingGroup) -> &[Household] {
        self.groups.get(&group).map_or(&[], |v| v.as_slice())
    }

    pub fn all_households(&self) -> impl Iterator<Item = &Household> {
        self.groups.values().flatten()
    }

    pub fn group_size(&self, group: ShiftingGroup) -> usize {
        self.households(group).len()
    }

    /// Total number of households.
    pub fn population(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn subscriptions(&self) -> &SubscriptionBook {
        &self.subscriptions
    }

    /// Customer name for a group's subscriptions of a power type.
    pub fn customer_name(&self, group: ShiftingGroup, power_type: PowerType) -> String {
        format!("{} {group} {}", self.name, customer_suffix(power_type))
    }

    /// The two customers this village represents.
    pub fn customers(&self) -> Vec<CustomerInfo> {
        PowerType::ALL
            .into_iter()
            .map(|power_type| CustomerInfo {
                name: format!("{} {}", self.name, customer_suffix(power_type)),
                power_type,
                population: self.population(),
            })
            .collect()
    }

    /// Resolves a group label such as `"SS"`.
    pub fn group(&self, label: &str) -> EngineResult<ShiftingGroup> {
        label.parse()
    }

    /// Puts every household on the market's default tariff for both power types.
    ///
    /// # Errors
    ///
    /// `StateInconsistency` if the market has no default for a power type.
    pub fn subscribe_default(&mut self, market: &dyn TariffMarket) -> EngineResult<()> {
        for power_type in PowerType::ALL {
            let tariff = default_id(market, power_type)?;
            for group in ShiftingGroup::ALL {
                let size = self.group_size(group);
                self.subscriptions.subscribe(group, power_type, tariff, size);
            }
        }
        Ok(())
    }

    /// Moves every customer on `old` to `new`, across all groups.
    pub fn change_subscription(
        &mut self,
        old: TariffId,
        new: TariffId,
        power_type: PowerType,
    ) -> usize {
        let moved: usize = ShiftingGroup::ALL
            .into_iter()
            .map(|g| self.subscriptions.transfer_all(g, power_type, old, new))
            .sum();
        info!(village = %self.name, %old, %new, %power_type, moved, "subscription changed");
        moved
    }

    /// Moves the customers of one group on `old` to `new`.
    pub fn change_group_subscription(
        &mut self,
        old: TariffId,
        new: TariffId,
        group: ShiftingGroup,
        power_type: PowerType,
    ) -> usize {
        let moved = self.subscriptions.transfer_all(group, power_type, old, new);
        info!(village = %self.name, %group, %old, %new, moved, "group subscription changed");
        moved
    }

    /// Moves exactly `count` customers of one group.
    ///
    /// # Errors
    ///
    /// `Subscription` when fewer than `count` customers are on `old`.
    pub fn change_subscription_count(
        &mut self,
        old: TariffId,
        new: TariffId,
        group: ShiftingGroup,
        power_type: PowerType,
        count: usize,
    ) -> EngineResult<usize> {
        let moved = self.subscriptions.transfer(group, power_type, old, new, count)?;
        info!(village = %self.name, %group, %old, %new, moved, "partial subscription change");
        Ok(moved)
    }

    /// Withdraws up to `count` customers; the population never drops below zero.
    pub fn unsubscribe(
        &mut self,
        tariff: TariffId,
        group: ShiftingGroup,
        power_type: PowerType,
        count: usize,
    ) -> usize {
        self.subscriptions.unsubscribe(group, power_type, tariff, count)
    }

    /// Moves subscribers of revoked or unknown tariffs to the current default.
    ///
    /// # Returns
    ///
    /// The number of customers migrated.
    pub fn migrate_revoked(
        &mut self,
        market: &dyn TariffMarket,
        accounting: &mut dyn Accounting,
        now: DateTime<Utc>,
    ) -> EngineResult<usize> {
        let mut migrated = 0;
        for (power_type, tariff) in self.subscriptions.tariffs() {
            let revoked = market.tariff(tariff).is_none_or(|t| t.is_revoked());
            if !revoked {
                continue;
            }
            let default = default_id(market, power_type)?;
            if default == tariff {
                return Err(EngineError::StateInconsistency(format!(
                    "default {power_type} tariff {tariff} is revoked"
                )));
            }
            for group in ShiftingGroup::ALL {
                let moved = self.subscriptions.transfer_all(group, power_type, tariff, default);
                if moved == 0 {
                    continue;
                }
                let customer = self.customer_name(group, power_type);
                for (kind, id) in [
                    (TransactionKind::Withdraw, tariff),
                    (TransactionKind::Signup, default),
                ] {
                    accounting.add_tariff_transaction(TariffTransaction {
                        kind,
                        at: now,
                        tariff: id,
                        customer: customer.clone(),
                        customer_count: moved,
                        kwh: 0.0,
                        charge: 0.0,
                    });
                }
                migrated += moved;
            }
            info!(
                village = %self.name,
                %tariff,
                %default,
                "migrated subscribers of revoked tariff"
            );
        }
        Ok(migrated)
    }

    /// Re-evaluates every group's tariff against the active ones and switches
    /// groups to a strictly cheaper tariff.
    ///
    /// # Returns
    ///
    /// The number of customers that changed tariff.
    pub fn publish_new_tariffs(
        &mut self,
        market: &dyn TariffMarket,
        evaluator: &dyn CostEvaluator,
        now: DateTime<Utc>,
    ) -> EngineResult<usize> {
        let slot = self.grid.slot_at(now)?;
        let start = self.grid.day_start(slot.day + 1);
        let mut moved = 0;
        for power_type in PowerType::ALL {
            let candidates = market.active_tariffs(power_type);
            for group in ShiftingGroup::ALL {
                let Some(current_id) = self.subscriptions.dominant_tariff(group, power_type) else {
                    continue;
                };
                let Some(current) = market.tariff(current_id) else {
                    continue;
                };
                let days = sample_weekdays(evaluator.sample_days(), &mut self.rng);
                let sampled: Vec<[f64; HOURS_OF_DAY]> = days
                    .iter()
                    .map(|&d| self.group_demand(group, power_type, d))
                    .collect();
                let demand = evaluator.demand(&sampled);
                if let Some(best) =
                    evaluation::cheaper_tariff(evaluator, current, &candidates, start, &demand)
                {
                    moved += self.change_group_subscription(current_id, best, group, power_type);
                }
            }
        }
        Ok(moved)
    }

    /// Mean hourly demand (kWh) of one household of `group` on a weekday.
    fn group_demand(
        &self,
        group: ShiftingGroup,
        power_type: PowerType,
        weekday: usize,
    ) -> [f64; HOURS_OF_DAY] {
        let households = self.households(group);
        let mut out = [0.0; HOURS_OF_DAY];
        if households.is_empty() {
            return out;
        }
        for household in households {
            let hourly = match power_type {
                PowerType::Consumption => household.base_hourly(weekday),
                PowerType::InterruptibleConsumption => household.controllable_hourly(weekday),
            };
            for (o, e) in out.iter_mut().zip(hourly) {
                *o += e as f64 / WATT_QUARTERS_PER_KWH;
            }
        }
        for o in &mut out {
            *o /= households.len() as f64;
        }
        out
    }

    /// Tariff whose prices drive a group's shifting.
    fn shifting_tariff<'m>(
        &self,
        market: &'m dyn TariffMarket,
        group: ShiftingGroup,
    ) -> EngineResult<&'m dyn Tariff> {
        let power_type = PowerType::InterruptibleConsumption;
        match self
            .subscriptions
            .dominant_tariff(group, power_type)
            .and_then(|id| market.tariff(id))
        {
            Some(tariff) => Ok(tariff),
            None => market.default_tariff(power_type).ok_or_else(|| no_default(power_type)),
        }
    }

    /// Refreshes and shifts every household for `day`, once per day.
    ///
    /// A household that fails keeps no plan for `day`; its tick loads then
    /// fail and are counted there.
    fn prepare_day(&mut self, day: usize, market: &dyn TariffMarket) -> EngineResult<()> {
        if self.prepared_day == Some(day) {
            return Ok(());
        }
        let day_start = self.grid.day_start(day);
        for group in ShiftingGroup::ALL {
            let tariff = self.shifting_tariff(market, group)?;
            let prices = HourlyPrices::from_tariff(tariff, day_start);
            let Some(households) = self.groups.get_mut(&group) else {
                continue;
            };
            for household in households.iter_mut() {
                if let Err(e) = household.prepare_day(day, &prices, group.policy()) {
                    error!(household = household.name(), error = %e, "daily preparation failed");
                }
            }
        }
        debug!(village = %self.name, day, "day prepared");
        self.prepared_day = Some(day);
        Ok(())
    }

    /// Runs one tick: migrates revoked subscriptions, prepares the day if it
    /// changed, applies the weather and bills every group's demand.
    ///
    /// # Arguments
    ///
    /// * `now` - Start of the tick
    /// * `timeslot` - Host timeslot index, echoed in the step record
    /// * `ctx` - Tariff market, accounting sink and weather feed
    ///
    /// # Errors
    ///
    /// `BeforeStart` when `now` precedes the grid, or a market-level error.
    /// Failures of single households are logged and counted once per
    /// household in the step.
    pub fn activate(
        &mut self,
        now: DateTime<Utc>,
        timeslot: usize,
        ctx: &mut HostContext<'_>,
    ) -> EngineResult<VillageStep> {
        let slot = self.grid.slot_at(now)?;
        self.migrate_revoked(ctx.market, ctx.accounting, now)?;
        self.prepare_day(slot.day, ctx.market)?;

        let temperature = ctx.weather.report(now).map(|r| r.temperature);
        if let Some(t) = temperature {
            for household in self.groups.values_mut().flatten() {
                household.apply_weather(slot.day, slot.hour(), t);
            }
        }

        let quarter = match self.tick {
            Tick::Hour => slot.hour() * QUARTERS_OF_HOUR,
            Tick::Quarter => slot.quarter,
        };
        let mut step = VillageStep {
            village: self.name.clone(),
            timeslot,
            at: now,
            day: slot.day,
            quarter,
            temperature,
            base_kwh: 0.0,
            controllable_kwh: 0.0,
            charge: 0.0,
            groups: Vec::with_capacity(ShiftingGroup::ALL.len()),
            failures: 0,
        };
        let mut failures = 0;

        for group in ShiftingGroup::ALL {
            let households = self.households(group);
            if households.is_empty() {
                continue;
            }
            let mut load = TickLoad::default();
            for household in households {
                match household.tick_load(slot.day, quarter, self.tick) {
                    Ok(l) => {
                        load.base += l.base;
                        load.controllable += l.controllable;
                    }
                    Err(e) => {
                        error!(household = household.name(), error = %e, "tick load failed");
                        failures += 1;
                    }
                }
            }
            let size = households.len() as f64;
            let mut group_step = GroupStep {
                group,
                base_kwh: load.base as f64 / WATT_QUARTERS_PER_KWH,
                controllable_kwh: load.controllable as f64 / WATT_QUARTERS_PER_KWH,
                charge: 0.0,
            };
            for (power_type, kwh) in [
                (PowerType::Consumption, group_step.base_kwh),
                (PowerType::InterruptibleConsumption, group_step.controllable_kwh),
            ] {
                let customer = self.customer_name(group, power_type);
                for sub in self.subscriptions.for_group_mut(group, power_type) {
                    let tariff = ctx
                        .market
                        .tariff(sub.tariff)
                        .ok_or(EngineError::UnknownTariff(sub.tariff))?;
                    let share = kwh * sub.customers as f64 / size;
                    let charge = tariff.usage_charge(now, share, sub.cumulative_kwh);
                    sub.cumulative_kwh += share;
                    group_step.charge += charge;
                    ctx.accounting.add_tariff_transaction(TariffTransaction {
                        kind: TransactionKind::Consume,
                        at: now,
                        tariff: sub.tariff,
                        customer: customer.clone(),
                        customer_count: sub.customers,
                        kwh: share,
                        charge,
                    });
                }
            }
            step.base_kwh += group_step.base_kwh;
            step.controllable_kwh += group_step.controllable_kwh;
            step.charge += group_step.charge;
            step.groups.push(group_step);
        }
        step.failures = failures;
        Ok(step)
    }
}

fn customer_suffix(power_type: PowerType) -> &'static str {
    match power_type {
        PowerType::Consumption => "Base",
        PowerType::InterruptibleConsumption => "Controllable",
    }
}

fn no_default(power_type: PowerType) -> EngineError {
    EngineError::StateInconsistency(format!("no default tariff for {power_type}"))
}

fn default_id(market: &dyn TariffMarket, power_type: PowerType) -> EngineResult<TariffId> {
    market
        .default_tariff(power_type)
        .map(|t| t.id())
        .ok_or_else(|| no_default(power_type))
}

/// Distinct weekdays of the current week to sample for a forecast.
fn sample_weekdays(count: usize, rng: &mut RandomStream) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..DAYS_OF_WEEK).collect();
    let mut days = Vec::with_capacity(count.min(DAYS_OF_WEEK));
    for _ in 0..count.min(DAYS_OF_WEEK) {
        days.push(pool.swap_remove(rng.below(pool.len())));
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::tariff::{Ledger, RateTariff, TariffBook};
    use crate::weather::ConstantWeather;

    #[test]
    fn group_labels_round_trip() {
        for group in ShiftingGroup::ALL {
            assert_eq!(group.label().parse::<ShiftingGroup>().unwrap(), group);
        }
        assert!(matches!(
            "XX".parse::<ShiftingGroup>(),
            Err(EngineError::UnknownGroup(_))
        ));
    }

    #[test]
    fn groups_map_to_policies() {
        assert_eq!(ShiftingGroup::Ns.policy(), ShiftingPolicy::None);
        assert_eq!(ShiftingGroup::Ss.policy(), ShiftingPolicy::Smart);
    }

    fn flat_market() -> TariffBook {
        let mut book = TariffBook::new();
        book.publish_default(RateTariff::flat(
            TariffId(1),
            "default",
            PowerType::Consumption,
            0.12,
        ));
        book.publish_default(RateTariff::flat(
            TariffId(2),
            "default",
            PowerType::InterruptibleConsumption,
            0.10,
        ));
        book
    }

    fn generated(count: usize, seed: u64, days: usize) -> Vec<Household> {
        let params = HouseholdParams::default();
        (0..count)
            .map(|i| {
                Household::generate(
                    format!("Household {i}"),
                    &params,
                    days,
                    RandomStream::derive(seed, i as u64),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn failing_household_is_counted_once_and_others_still_billed() {
        let start = Utc.with_ymd_and_hms(2011, 1, 3, 0, 0, 0).unwrap();
        let grid = TimeGrid::new(start, 7);
        let groups = BTreeMap::from([(ShiftingGroup::Ss, generated(3, 11, 7))]);
        let mut village =
            Village::from_households("Village 1", grid, Tick::Hour, groups, RandomStream::new(1));
        let market = flat_market();
        village.subscribe_default(&market).unwrap();
        let mut ledger = Ledger::new();
        let weather = ConstantWeather(10.0);
        let mut ctx = HostContext {
            market: &market,
            accounting: &mut ledger,
            weather: &weather,
        };
        let first = village.activate(start, 0, &mut ctx).unwrap();
        assert_eq!(first.failures, 0);

        // joins after the day was prepared, so it has no plan for day 0
        let late = generated(4, 11, 7).pop().unwrap();
        assert!(late.plan().is_none());
        village.groups.get_mut(&ShiftingGroup::Ss).unwrap().push(late);

        for hour in 1..24 {
            let at = start + Duration::hours(hour as i64);
            let step = village.activate(at, hour, &mut ctx).unwrap();
            assert_eq!(step.failures, 1, "hour {hour}");
            let base: i64 = village.households(ShiftingGroup::Ss)[..3]
                .iter()
                .map(|h| h.tick_load(0, hour * QUARTERS_OF_HOUR, Tick::Hour).unwrap().base)
                .sum();
            assert!((step.base_kwh - base as f64 / WATT_QUARTERS_PER_KWH).abs() < 1e-9);
        }
    }

    #[test]
    fn sampled_weekdays_are_distinct() {
        let mut rng = RandomStream::new(4);
        let mut days = sample_weekdays(3, &mut rng);
        days.sort_unstable();
        days.dedup();
        assert_eq!(days.len(), 3);
    }
}
