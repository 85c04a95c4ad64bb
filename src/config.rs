//! TOML-based scenario configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::params::HouseholdParams;
use crate::sim::event::MarketEvent;
use crate::sim::types::SimConfig;
use crate::tariff::{PowerType, RateTariff, TariffBook, TariffId, TimeOfUse};
use crate::time::Tick;
use crate::village::GroupSizes;
use crate::weather::SyntheticWeather;

/// Identifier of the default consumption tariff.
pub const DEFAULT_CONSUMPTION_TARIFF: TariffId = TariffId(1);
/// Identifier of the default interruptible tariff.
pub const DEFAULT_INTERRUPTIBLE_TARIFF: TariffId = TariffId(2);
/// Identifier of the optional challenger offer.
pub const OFFER_TARIFF: TariffId = TariffId(3);

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Households per shifting group, for every village.
    #[serde(default)]
    pub village: GroupSizes,
    /// Synthetic weather parameters.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Default tariffs and the optional challenger offer.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Flat household property table, e.g. `DryerSaturation = "0.7"`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Run timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed.
    pub seed: u64,
    /// Days simulated before the competition.
    pub days_of_bootstrap: usize,
    /// Competition days (must be > 0 together with bootstrap).
    pub days_of_competition: usize,
    /// Activation granularity: `"hour"` or `"quarter"`.
    pub tick: Tick,
    /// Instant of timeslot 0 (RFC 3339, midnight UTC).
    pub start: DateTime<Utc>,
    /// Number of villages.
    pub villages: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            days_of_bootstrap: 1,
            days_of_competition: 6,
            tick: Tick::Hour,
            start: Utc
                .with_ymd_and_hms(2011, 1, 3, 0, 0, 0)
                .single()
                .unwrap_or_default(),
            villages: 2,
        }
    }
}

/// Synthetic weather parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Daily mean temperature on day 0 (°C).
    pub mean_temperature: f64,
    /// Half the spread between afternoon peak and night low (°C).
    pub daily_amplitude: f64,
    /// Change of the daily mean per day (°C).
    pub drift_per_day: f64,
    /// Hourly noise standard deviation (°C).
    pub noise: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            mean_temperature: 8.0,
            daily_amplitude: 4.0,
            drift_per_day: 0.0,
            noise: 1.0,
        }
    }
}

/// Default tariffs and the optional challenger offer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Flat price of the default consumption tariff (per kWh).
    pub default_price: f64,
    /// Flat price of the default interruptible tariff (per kWh).
    pub interruptible_price: f64,
    /// Optional peak price applied by both default tariffs.
    pub peak_price: Option<f64>,
    /// First hour of the peak window.
    pub peak_start_hour: u32,
    /// Hour after the peak window; may wrap past midnight.
    pub peak_end_hour: u32,
    /// Price of a challenger interruptible tariff, if one is offered.
    pub offer_price: Option<f64>,
    /// Day the offer is published.
    pub offer_day: usize,
    /// Day the offer is revoked, if ever.
    pub revoke_offer_day: Option<usize>,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            default_price: 0.12,
            interruptible_price: 0.10,
            peak_price: None,
            peak_start_hour: 17,
            peak_end_hour: 21,
            offer_price: None,
            offer_day: 1,
            revoke_offer_day: None,
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: flat default tariffs, mild winter weather.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            village: GroupSizes::default(),
            weather: WeatherConfig::default(),
            tariff: TariffConfig::default(),
            properties: BTreeMap::new(),
        }
    }

    /// Returns the smart-village preset: time-of-use defaults, a cheaper
    /// challenger offer that is later revoked, and mostly smart households.
    pub fn smart_village() -> Self {
        Self {
            simulation: SimulationConfig {
                tick: Tick::Quarter,
                ..SimulationConfig::default()
            },
            village: GroupSizes {
                ns: 1,
                ras: 1,
                res: 2,
                ss: 6,
            },
            tariff: TariffConfig {
                peak_price: Some(0.25),
                offer_price: Some(0.06),
                offer_day: 2,
                revoke_offer_day: Some(5),
                ..TariffConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the cold-snap preset: falling temperatures and more heaters.
    pub fn cold_snap() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("SpaceHeaterSaturation".to_string(), "0.4".to_string());
        properties.insert("StorageHeaterSaturation".to_string(), "0.5".to_string());
        Self {
            weather: WeatherConfig {
                mean_temperature: 2.0,
                daily_amplitude: 3.0,
                drift_per_day: -1.5,
                noise: 0.5,
            },
            tariff: TariffConfig {
                peak_price: Some(0.30),
                peak_start_hour: 16,
                peak_end_hour: 20,
                ..TariffConfig::default()
            },
            properties,
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "smart_village", "cold_snap"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "smart_village" => Ok(Self::smart_village()),
            "cold_snap" => Ok(Self::cold_snap()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. Malformed household
    /// properties are not reported here: they fall back to their defaults.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.days_of_bootstrap + s.days_of_competition == 0 {
            errors.push(ConfigError::new(
                "simulation.days_of_competition",
                "bootstrap and competition days must not both be 0",
            ));
        }
        if s.villages == 0 {
            errors.push(ConfigError::new("simulation.villages", "must be > 0"));
        }
        if s.start.timestamp() % 86_400 != 0 {
            errors.push(ConfigError::new("simulation.start", "must be midnight UTC"));
        }
        if self.village.total() == 0 {
            errors.push(ConfigError::new("village", "at least one household is required"));
        }

        let w = &self.weather;
        if w.daily_amplitude < 0.0 {
            errors.push(ConfigError::new("weather.daily_amplitude", "must be >= 0"));
        }
        if w.noise < 0.0 {
            errors.push(ConfigError::new("weather.noise", "must be >= 0"));
        }

        let t = &self.tariff;
        for (field, price) in [
            ("tariff.default_price", Some(t.default_price)),
            ("tariff.interruptible_price", Some(t.interruptible_price)),
            ("tariff.peak_price", t.peak_price),
            ("tariff.offer_price", t.offer_price),
        ] {
            if price.is_some_and(|p| p.is_nan() || p < 0.0) {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }
        if t.peak_start_hour > 23 || t.peak_end_hour > 24 {
            errors.push(ConfigError::new(
                "tariff.peak_start_hour",
                "peak hours must lie in [0, 24]",
            ));
        }
        if let Some(revoke) = t.revoke_offer_day {
            if t.offer_price.is_none() {
                errors.push(ConfigError::new(
                    "tariff.revoke_offer_day",
                    "requires tariff.offer_price",
                ));
            } else if revoke <= t.offer_day {
                errors.push(ConfigError::new(
                    "tariff.revoke_offer_day",
                    "must be > tariff.offer_day",
                ));
            }
        }

        errors
    }

    /// Run configuration derived from `[simulation]`.
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        SimConfig::new(s.start, s.days_of_bootstrap, s.days_of_competition, s.tick, s.seed)
    }

    /// Household parameters parsed from `[properties]`, with fallbacks.
    pub fn household_params(&self) -> (HouseholdParams, Vec<ConfigError>) {
        HouseholdParams::from_properties(&self.properties)
    }

    /// Tariff book holding the two default tariffs.
    pub fn market(&self) -> TariffBook {
        let t = &self.tariff;
        let mut book = TariffBook::new();
        for (id, power_type, price) in [
            (DEFAULT_CONSUMPTION_TARIFF, PowerType::Consumption, t.default_price),
            (
                DEFAULT_INTERRUPTIBLE_TARIFF,
                PowerType::InterruptibleConsumption,
                t.interruptible_price,
            ),
        ] {
            let mut tariff = RateTariff::flat(id, "default broker", power_type, price);
            if let Some(peak) = t.peak_price {
                tariff = tariff.with_time_of_use(TimeOfUse {
                    start_hour: t.peak_start_hour,
                    end_hour: t.peak_end_hour,
                    price: peak,
                });
            }
            book.publish_default(tariff);
        }
        book
    }

    /// Market changes scheduled by `[tariff]`.
    pub fn market_events(&self) -> Vec<MarketEvent> {
        let t = &self.tariff;
        let mut events = Vec::new();
        if let Some(price) = t.offer_price {
            events.push(MarketEvent::publish(
                t.offer_day,
                RateTariff::flat(
                    OFFER_TARIFF,
                    "challenger",
                    PowerType::InterruptibleConsumption,
                    price,
                ),
            ));
            if let Some(day) = t.revoke_offer_day {
                events.push(MarketEvent::revoke(day, OFFER_TARIFF));
            }
        }
        events
    }

    /// Synthetic weather feed for the run.
    pub fn weather(&self) -> SyntheticWeather {
        let w = &self.weather;
        SyntheticWeather::new(
            self.simulation.start,
            w.mean_temperature,
            w.daily_amplitude,
            w.drift_per_day,
            self.simulation.seed,
        )
        .with_noise(w.noise)
    }
}
