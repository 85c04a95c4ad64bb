//! Scenario wiring: builds villages, market and weather from a
//! [`ScenarioConfig`] and runs the engine over the whole horizon.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ScenarioConfig;
use crate::error::EngineResult;
use crate::sim::engine::Engine;
use crate::sim::kpi::RunReport;
use crate::sim::types::{DaySummary, SimConfig};
use crate::village::{CustomerInfo, Subscription, Village, VillageStep};
use crate::weather::SyntheticWeather;

/// Everything a finished run hands to the reporting layers.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub config: SimConfig,
    pub steps: Vec<VillageStep>,
    pub days: Vec<DaySummary>,
    pub report: RunReport,
    pub villages: Vec<VillageSummary>,
}

/// Customers and subscription counts of one village at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct VillageSummary {
    pub name: String,
    pub population: usize,
    pub customers: Vec<CustomerInfo>,
    pub subscriptions: Vec<Subscription>,
}

impl VillageSummary {
    pub fn from_village(village: &Village) -> Self {
        Self {
            name: village.name().to_string(),
            population: village.population(),
            customers: village.customers(),
            subscriptions: village.subscriptions().iter().cloned().collect(),
        }
    }
}

/// Builds the villages described by `cfg`.
///
/// Malformed household properties are logged and replaced by defaults.
pub fn build_villages(cfg: &ScenarioConfig) -> EngineResult<Vec<Village>> {
    let (params, errors) = cfg.household_params();
    if !errors.is_empty() {
        warn!(count = errors.len(), "household properties fell back to defaults");
    }
    let sim = cfg.sim_config();
    (0..cfg.simulation.villages)
        .map(|i| {
            Village::new(
                format!("Village {}", i + 1),
                i,
                &cfg.village,
                &params,
                sim.grid(),
                sim.tick,
                sim.seed,
            )
        })
        .collect()
}

/// Builds a ready-to-run engine for `cfg`.
pub fn build_engine(cfg: &ScenarioConfig) -> EngineResult<Engine<SyntheticWeather>> {
    let villages = build_villages(cfg)?;
    Engine::new(
        cfg.sim_config(),
        villages,
        cfg.market(),
        cfg.weather(),
        cfg.market_events(),
    )
}

/// Runs `cfg` to completion.
pub fn run_scenario(cfg: &ScenarioConfig) -> EngineResult<SimulationResult> {
    let mut engine = build_engine(cfg)?;
    info!(
        villages = engine.villages().len(),
        steps = engine.config().total_steps(),
        "starting run"
    );
    let steps = engine.run()?;
    let report = RunReport::from_steps(&steps, engine.ledger().transactions().len());
    Ok(SimulationResult {
        config: engine.config().clone(),
        days: DaySummary::from_steps(&steps),
        villages: engine.villages().iter().map(VillageSummary::from_village).collect(),
        steps,
        report,
    })
}
