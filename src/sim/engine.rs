//! Host-side driver: owns the villages, the tariff market and the ledger, and
//! activates every village once per timeslot.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::EngineResult;
use crate::tariff::{Ledger, RateTariff, Tariff, TariffBook};
use crate::village::{CostEvaluator, ForecastEvaluator, HostContext, Village, VillageStep};
use crate::weather::WeatherFeed;

use super::clock::Clock;
use super::event::{MarketAction, MarketEvent};
use super::types::SimConfig;

/// Simulation engine owning the villages and every host collaborator.
///
/// Generic over `W: WeatherFeed` for static dispatch; the cost evaluator is
/// boxed so callers can swap the tariff comparison without touching the type.
pub struct Engine<W: WeatherFeed> {
    config: SimConfig,
    villages: Vec<Village>,
    market: TariffBook,
    ledger: Ledger,
    weather: W,
    evaluator: Box<dyn CostEvaluator>,
    events: Vec<MarketEvent>,
    current_day: Option<usize>,
}

impl<W: WeatherFeed> Engine<W> {
    /// Creates an engine and subscribes every village to the default tariffs.
    ///
    /// # Arguments
    ///
    /// * `config` - Run configuration
    /// * `villages` - Villages built on `config.grid()`
    /// * `market` - Tariff book holding at least the default tariffs
    /// * `weather` - Weather feed read once per activation
    /// * `events` - Market changes applied at day boundaries
    ///
    /// # Errors
    ///
    /// `StateInconsistency` if the market lacks a default tariff.
    pub fn new(
        config: SimConfig,
        mut villages: Vec<Village>,
        market: TariffBook,
        weather: W,
        events: Vec<MarketEvent>,
    ) -> EngineResult<Self> {
        for village in &mut villages {
            village.subscribe_default(&market)?;
        }
        Ok(Self {
            config,
            villages,
            market,
            ledger: Ledger::new(),
            weather,
            evaluator: Box::new(ForecastEvaluator::default()),
            events,
            current_day: None,
        })
    }

    /// Replaces the tariff cost evaluator.
    pub fn with_evaluator(mut self, evaluator: impl CostEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Publishes a tariff and lets every village re-evaluate its subscriptions.
    ///
    /// # Returns
    ///
    /// The number of customers that switched.
    pub fn publish_tariff(
        &mut self,
        tariff: RateTariff,
        now: DateTime<Utc>,
    ) -> EngineResult<usize> {
        info!(tariff = %tariff.id(), power_type = %tariff.power_type(), "tariff published");
        self.market.publish(tariff);
        let mut moved = 0;
        for village in &mut self.villages {
            moved += village.publish_new_tariffs(&self.market, self.evaluator.as_ref(), now)?;
        }
        Ok(moved)
    }

    fn apply_events(&mut self, day: usize, now: DateTime<Utc>) -> EngineResult<()> {
        let due: Vec<MarketEvent> = self
            .events
            .iter()
            .filter(|e| e.is_due(day))
            .cloned()
            .collect();
        for event in due {
            match event.action {
                MarketAction::Publish(tariff) => {
                    self.publish_tariff(tariff, now)?;
                }
                MarketAction::Revoke(id) => {
                    self.market.revoke(id)?;
                    info!(tariff = %id, day, "tariff revoked");
                }
            }
        }
        Ok(())
    }

    /// Executes one timeslot for every village.
    ///
    /// # Arguments
    ///
    /// * `slot` - Timeslot index
    /// * `now` - Start of the timeslot
    ///
    /// # Returns
    ///
    /// One `VillageStep` per village, in village order.
    pub fn step(&mut self, slot: usize, now: DateTime<Utc>) -> EngineResult<Vec<VillageStep>> {
        let day = self.config.grid().slot_at(now)?.day;
        if self.current_day != Some(day) {
            self.apply_events(day, now)?;
            self.current_day = Some(day);
            debug!(day, "new day");
        }
        let mut ctx = HostContext {
            market: &self.market,
            accounting: &mut self.ledger,
            weather: &self.weather,
        };
        let mut steps = Vec::with_capacity(self.villages.len());
        for village in &mut self.villages {
            steps.push(village.activate(now, slot, &mut ctx)?);
        }
        Ok(steps)
    }

    /// Executes every timeslot of the horizon and returns all village steps.
    pub fn run(&mut self) -> EngineResult<Vec<VillageStep>> {
        let total = self.config.total_steps();
        let mut clock = Clock::new(self.config.start, self.config.tick, total);
        let mut results = Vec::with_capacity(total * self.villages.len());
        while let Some((slot, at)) = clock.tick() {
            results.extend(self.step(slot, at)?);
        }
        info!(
            steps = total,
            transactions = self.ledger.transactions().len(),
            "run complete"
        );
        Ok(results)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn villages(&self) -> &[Village] {
        &self.villages
    }

    pub fn villages_mut(&mut self) -> &mut [Village] {
        &mut self.villages
    }

    pub fn market(&self) -> &TariffBook {
        &self.market
    }

    pub fn market_mut(&mut self) -> &mut TariffBook {
        &mut self.market
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
