//! Demand forecasting used when comparing tariffs.

use crate::time::HOURS_OF_DAY;

/// Naive "tomorrow is like the sampled days" forecaster.
///
/// The baseline is repeated or truncated to the requested horizon.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveForecast;

impl NaiveForecast {
    /// Produce a naive forecast for the given horizon.
    ///
    /// # Arguments
    ///
    /// * `baseline` - Historical or baseline values used as the forecast template
    /// * `horizon` - Number of steps to forecast
    ///
    /// # Returns
    ///
    /// A vector of forecast values with length equal to `horizon`.
    pub fn forecast(&self, baseline: &[f64], horizon: usize) -> Vec<f64> {
        if horizon == 0 {
            return Vec::new();
        }
        if baseline.is_empty() {
            return vec![0.0; horizon];
        }
        baseline.iter().copied().cycle().take(horizon).collect()
    }

    /// Averages several sampled days into one hourly profile.
    ///
    /// Returns zeros when no day was sampled.
    pub fn average_day(&self, days: &[[f64; HOURS_OF_DAY]]) -> [f64; HOURS_OF_DAY] {
        let mut out = [0.0; HOURS_OF_DAY];
        if days.is_empty() {
            return out;
        }
        for day in days {
            for (o, v) in out.iter_mut().zip(day) {
                *o += v;
            }
        }
        for o in &mut out {
            *o /= days.len() as f64;
        }
        out
    }
}
