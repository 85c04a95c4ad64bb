//! Weather reports consumed by temperature-sensitive appliances.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use crate::rng::RandomStream;

/// Observed conditions for one timeslot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherReport {
    pub at: DateTime<Utc>,
    /// Outdoor temperature (°C).
    pub temperature: f64,
    /// Wind speed (m/s).
    pub wind_speed: f64,
    /// Cloud cover in `[0, 1]`.
    pub cloud_cover: f64,
}

/// Source of the latest weather report for an instant.
pub trait WeatherFeed {
    fn report(&self, at: DateTime<Utc>) -> Option<WeatherReport>;
}

/// Deterministic synthetic weather: daily sinusoid, seasonal drift and noise.
///
/// The temperature peaks at 15:00 and bottoms out at 03:00:
///
///   T(d, h) = mean + drift * d + amplitude * sin(2π (h - 9) / 24) + noise
#[derive(Debug, Clone)]
pub struct SyntheticWeather {
    start: DateTime<Utc>,
    mean: f64,
    amplitude: f64,
    drift_per_day: f64,
    noise: f64,
    seed: u64,
}

impl SyntheticWeather {
    pub fn new(
        start: DateTime<Utc>,
        mean: f64,
        amplitude: f64,
        drift_per_day: f64,
        seed: u64,
    ) -> Self {
        Self {
            start,
            mean,
            amplitude,
            drift_per_day,
            noise: 1.0,
            seed,
        }
    }

    /// Standard deviation of the hourly temperature noise (°C).
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(0.0);
        self
    }

    /// Temperature at `at`.
    pub fn temperature(&self, at: DateTime<Utc>) -> f64 {
        let elapsed_hours = (at - self.start).num_hours().max(0);
        let day = elapsed_hours / 24;
        let hour = f64::from(at.hour());
        let cycle = (2.0 * std::f64::consts::PI * (hour - 9.0) / 24.0).sin();
        let mut rng = RandomStream::derive(self.seed, elapsed_hours as u64);
        self.mean
            + self.drift_per_day * day as f64
            + self.amplitude * cycle
            + rng.normal(0.0, self.noise)
    }
}

impl WeatherFeed for SyntheticWeather {
    fn report(&self, at: DateTime<Utc>) -> Option<WeatherReport> {
        if at < self.start {
            return None;
        }
        let elapsed_hours = (at - self.start).num_hours() as u64;
        let mut rng = RandomStream::derive(self.seed ^ 0x5eed, elapsed_hours);
        Some(WeatherReport {
            at,
            temperature: self.temperature(at),
            wind_speed: rng.normal(4.0, 1.5).max(0.0),
            cloud_cover: rng.uniform(),
        })
    }
}

/// Weather feed returning the same temperature at every instant.
#[derive(Debug, Clone, Copy)]
pub struct ConstantWeather(pub f64);

impl WeatherFeed for ConstantWeather {
    fn report(&self, at: DateTime<Utc>) -> Option<WeatherReport> {
        Some(WeatherReport {
            at,
            temperature: self.0,
            wind_speed: 0.0,
            cloud_cover: 0.0,
        })
    }
}
