// crates/fishsoop-core/src/stats.rs

use chrono::{DateTime, Utc};

use crate::record::Sample;

/// Deployment summary quoted in the notification email.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentStats {
    pub temp_min: f64,
    pub temp_max: f64,
    pub temp_avg: f64,
    /// Depth of the sample holding the minimum temperature.
    pub depth_at_temp_min: f64,
    /// Depth of the sample holding the maximum temperature.
    pub depth_at_temp_max: f64,
    pub depth_avg: f64,
    pub depth_min: f64,
    pub depth_max: f64,
}

impl DeploymentStats {
    /// NaN values are ignored; ties resolve to the first occurrence.
    /// Returns `None` when no temperature is usable.
    pub fn compute(temperature: &[f64], depth: &[f64]) -> Option<Self> {
        let i_tmin = nan_argmin(temperature)?;
        let i_tmax = nan_argmax(temperature)?;
        let depth_at = |idx: usize| depth.get(idx).copied().unwrap_or(f64::NAN);

        Some(Self {
            temp_min: temperature[i_tmin],
            temp_max: temperature[i_tmax],
            temp_avg: nan_mean(temperature).unwrap_or(f64::NAN),
            depth_at_temp_min: depth_at(i_tmin),
            depth_at_temp_max: depth_at(i_tmax),
            depth_avg: nan_mean(depth).unwrap_or(f64::NAN),
            depth_min: nan_min(depth).unwrap_or(f64::NAN),
            depth_max: nan_max(depth).unwrap_or(f64::NAN),
        })
    }

    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let temperature: Vec<f64> = samples.iter().map(|s| s.temperature).collect();
        let depth: Vec<f64> = samples.iter().map(|s| s.depth).collect();
        Self::compute(&temperature, &depth)
    }
}

/// Fishing-phase figures printed under the plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStatistics {
    pub mean_temp: f64,
    pub mean_depth: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
}

impl PlotStatistics {
    /// Uses bottom-phase (`D`) samples, or every sample when there are none.
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let bottom: Vec<&Sample> = samples
            .iter()
            .filter(|s| s.phase.as_deref() == Some("D"))
            .collect();
        let basis: Vec<&Sample> = if bottom.is_empty() {
            samples.iter().collect()
        } else {
            bottom
        };

        let temperature: Vec<f64> = basis.iter().map(|s| s.temperature).collect();
        let depth: Vec<f64> = basis.iter().map(|s| s.depth).collect();

        Some(Self {
            mean_temp: round_to(nan_mean(&temperature)?, 2),
            mean_depth: round_to(nan_mean(&depth).unwrap_or(f64::NAN), 1),
            max_temp: round_to(nan_max(&temperature)?, 2),
            min_temp: round_to(nan_min(&temperature)?, 2),
            time_min: samples.iter().map(|s| s.time).min()?,
            time_max: samples.iter().map(|s| s.time).max()?,
        })
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn finite(values: &[f64]) -> impl Iterator<Item = (usize, f64)> + '_ {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
}

fn nan_argmin(values: &[f64]) -> Option<usize> {
    finite(values)
        .fold(None, |best: Option<(usize, f64)>, (idx, v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

fn nan_argmax(values: &[f64]) -> Option<usize> {
    finite(values)
        .fold(None, |best: Option<(usize, f64)>, (idx, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

pub(crate) fn nan_min(values: &[f64]) -> Option<f64> {
    nan_argmin(values).map(|idx| values[idx])
}

pub(crate) fn nan_max(values: &[f64]) -> Option<f64> {
    nan_argmax(values).map(|idx| values[idx])
}

fn nan_mean(values: &[f64]) -> Option<f64> {
    let (count, sum) = finite(values).fold((0usize, 0.0), |(n, s), (_, v)| (n + 1, s + v));
    (count > 0).then(|| sum / count as f64)
}
