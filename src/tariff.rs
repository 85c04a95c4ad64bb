//! Tariffs, the tariff market and the accounting sink.
//!
//! The engine only ever reads a tariff through [`Tariff`]: its identity, its
//! power type, whether it was revoked, and the charge for a given amount of
//! energy at a given instant. [`RateTariff`] and [`TariffBook`] are the
//! in-memory implementations used by the binary and the tests.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Unique tariff identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TariffId(pub u64);

impl fmt::Display for TariffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tariff-{}", self.0)
    }
}

/// Kind of load a tariff applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerType {
    /// Fixed household consumption.
    Consumption,
    /// Shiftable load the customer can interrupt or move.
    InterruptibleConsumption,
}

impl PowerType {
    pub const ALL: [PowerType; 2] = [PowerType::Consumption, PowerType::InterruptibleConsumption];
}

impl fmt::Display for PowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerType::Consumption => write!(f, "CONSUMPTION"),
            PowerType::InterruptibleConsumption => write!(f, "INTERRUPTIBLE_CONSUMPTION"),
        }
    }
}

/// Read-only view of a tariff.
pub trait Tariff: fmt::Debug {
    fn id(&self) -> TariffId;

    fn broker(&self) -> &str;

    fn power_type(&self) -> PowerType;

    /// Cost of consuming `kwh` at instant `at`, given `cumulative_kwh`
    /// already consumed under this subscription. Always `>= 0`.
    fn usage_charge(&self, at: DateTime<Utc>, kwh: f64, cumulative_kwh: f64) -> f64;

    fn is_revoked(&self) -> bool;
}

/// A price applying to a range of hours `[start_hour, end_hour)`, wrapping past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeOfUse {
    pub start_hour: u32,
    pub end_hour: u32,
    pub price: f64,
}

impl TimeOfUse {
    fn covers(&self, hour: u32) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Flat, time-of-use and tiered energy prices (currency per kWh).
#[derive(Debug, Clone, PartialEq)]
pub struct RateTariff {
    id: TariffId,
    broker: String,
    power_type: PowerType,
    base_price: f64,
    time_of_use: Vec<TimeOfUse>,
    tier: Option<(f64, f64)>,
    revoked: bool,
}

impl RateTariff {
    /// A tariff charging `price` per kWh at all times.
    pub fn flat(
        id: TariffId,
        broker: impl Into<String>,
        power_type: PowerType,
        price: f64,
    ) -> Self {
        Self {
            id,
            broker: broker.into(),
            power_type,
            base_price: price.max(0.0),
            time_of_use: Vec::new(),
            tier: None,
            revoked: false,
        }
    }

    /// Adds a price for a window of hours; later windows take precedence.
    pub fn with_time_of_use(mut self, window: TimeOfUse) -> Self {
        self.time_of_use.push(window);
        self
    }

    /// Energy beyond `threshold_kwh` of cumulative usage is charged at `price`.
    pub fn with_tier(mut self, threshold_kwh: f64, price: f64) -> Self {
        self.tier = Some((threshold_kwh.max(0.0), price.max(0.0)));
        self
    }

    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    fn price_at(&self, at: DateTime<Utc>) -> f64 {
        let hour = at.hour();
        self.time_of_use
            .iter()
            .rev()
            .find(|w| w.covers(hour))
            .map_or(self.base_price, |w| w.price.max(0.0))
    }
}

impl Tariff for RateTariff {
    fn id(&self) -> TariffId {
        self.id
    }

    fn broker(&self) -> &str {
        &self.broker
    }

    fn power_type(&self) -> PowerType {
        self.power_type
    }

    fn usage_charge(&self, at: DateTime<Utc>, kwh: f64, cumulative_kwh: f64) -> f64 {
        let kwh = kwh.max(0.0);
        let price = self.price_at(at);
        match self.tier {
            Some((threshold, tier_price)) => {
                let below = (threshold - cumulative_kwh).clamp(0.0, kwh);
                below * price + (kwh - below) * tier_price
            }
            None => kwh * price,
        }
    }

    fn is_revoked(&self) -> bool {
        self.revoked
    }
}

/// Lookup of published tariffs.
pub trait TariffMarket {
    fn tariff(&self, id: TariffId) -> Option<&dyn Tariff>;

    fn default_tariff(&self, power_type: PowerType) -> Option<&dyn Tariff>;

    /// Published, non-revoked tariffs for `power_type`.
    fn active_tariffs(&self, power_type: PowerType) -> Vec<&dyn Tariff>;
}

/// In-memory tariff market.
#[derive(Debug, Clone, Default)]
pub struct TariffBook {
    tariffs: BTreeMap<TariffId, RateTariff>,
    defaults: BTreeMap<PowerType, TariffId>,
}

impl TariffBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a tariff, replacing any previous one with the same id.
    pub fn publish(&mut self, tariff: RateTariff) {
        self.tariffs.insert(tariff.id, tariff);
    }

    /// Publishes `tariff` and makes it the default for its power type.
    pub fn publish_default(&mut self, tariff: RateTariff) {
        self.defaults.insert(tariff.power_type, tariff.id);
        self.publish(tariff);
    }

    /// Marks a tariff as revoked.
    ///
    /// # Errors
    ///
    /// `UnknownTariff` if `id` was never published.
    pub fn revoke(&mut self, id: TariffId) -> EngineResult<()> {
        let tariff = self
            .tariffs
            .get_mut(&id)
            .ok_or(EngineError::UnknownTariff(id))?;
        tariff.revoke();
        Ok(())
    }

    /// Next unused identifier.
    pub fn next_id(&self) -> TariffId {
        TariffId(self.tariffs.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    pub fn len(&self) -> usize {
        self.tariffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tariffs.is_empty()
    }
}

impl TariffMarket for TariffBook {
    fn tariff(&self, id: TariffId) -> Option<&dyn Tariff> {
        self.tariffs.get(&id).map(|t| t as &dyn Tariff)
    }

    fn default_tariff(&self, power_type: PowerType) -> Option<&dyn Tariff> {
        self.defaults
            .get(&power_type)
            .and_then(|id| self.tariff(*id))
    }

    fn active_tariffs(&self, power_type: PowerType) -> Vec<&dyn Tariff> {
        self.tariffs
            .values()
            .filter(|t| t.power_type == power_type && !t.revoked)
            .map(|t| t as &dyn Tariff)
            .collect()
    }
}

/// Kind of a tariff transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Consume,
    Signup,
    Withdraw,
}

/// One record pushed to the accounting sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TariffTransaction {
    pub kind: TransactionKind,
    pub at: DateTime<Utc>,
    pub tariff: TariffId,
    /// Customer name, e.g. `"Village 1 NS Base"`.
    pub customer: String,
    pub customer_count: usize,
    /// Energy in kWh (0 for signup/withdraw).
    pub kwh: f64,
    /// Cost charged to the customer.
    pub charge: f64,
}

/// Sink for tariff transactions. The engine never reads results back.
pub trait Accounting {
    fn add_tariff_transaction(&mut self, transaction: TariffTransaction);
}

/// Accounting sink that keeps every transaction in memory.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    transactions: Vec<TariffTransaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transactions(&self) -> &[TariffTransaction] {
        &self.transactions
    }

    /// Total charge of all consumption transactions.
    pub fn total_charge(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.kind == TransactionKind::Consume)
            .map(|t| t.charge)
            .sum()
    }

    /// Takes all recorded transactions, leaving the ledger empty.
    pub fn drain(&mut self) -> Vec<TariffTransaction> {
        std::mem::take(&mut self.transactions)
    }
}

impl Accounting for Ledger {
    fn add_tariff_transaction(&mut self, transaction: TariffTransaction) {
        self.transactions.push(transaction);
    }
}
