// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{
    TrendFit, finite_or_none, fit_ols, interquartile_range, mean, sample_std, theil_sen,
};
use geotrend_core::{ComputationMethod, EngineConfig, ObservationSet, TimeseriesFeatureRecord};
use std::collections::BTreeSet;

/// Minimum covered years for a feature record to be emitted at all.
const MIN_COVERAGE_FOR_RECORD: usize = 2;
/// Minimum covered years for momentum and stability features.
const MIN_COVERAGE_FOR_TREND: usize = 3;

/// Derives level, momentum, and stability features per (geography, layer)
/// from the bounded observation window. No interpolation, no gap-filling.
#[derive(Clone, Copy, Debug)]
pub struct TimeseriesFeatureExtractor<'a> {
    config: &'a EngineConfig,
}

impl<'a> TimeseriesFeatureExtractor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Extracts one feature record, or `None` when fewer than 2 window years
    /// are covered for this geography and layer.
    pub fn extract(
        &self,
        observations: &ObservationSet,
        geography_id: &str,
        layer_name: &str,
    ) -> Option<TimeseriesFeatureRecord> {
        let first_year = self.config.window_start_year();
        let last_year = self.config.as_of_year;
        let window = observations.window(geography_id, layer_name, first_year, last_year);
        if window.len() < MIN_COVERAGE_FOR_RECORD {
            return None;
        }

        let years: Vec<i32> = window.iter().map(|(year, _)| *year).collect();
        let values: Vec<f64> = window.iter().map(|(_, value)| *value).collect();
        let coverage_years = window.len();
        let min_year = years[0];
        let max_year = years[years.len() - 1];
        let level_baseline = values[0];
        let level_latest = values[values.len() - 1];

        let covered: BTreeSet<i32> = years.iter().copied().collect();
        let data_gaps: BTreeSet<i32> = (first_year..=last_year)
            .filter(|year| !covered.contains(year))
            .collect();

        let momentum_delta = finite_or_none(level_latest - level_baseline);
        let momentum_pct_change = momentum_delta.and_then(|delta| {
            if level_baseline == 0.0 {
                None
            } else {
                finite_or_none(delta / level_baseline * 100.0)
            }
        });

        let (computation_method, trend) = if coverage_years >= MIN_COVERAGE_FOR_TREND {
            (ComputationMethod::RobustTrend, fit_trend(&years, &values))
        } else {
            (ComputationMethod::InsufficientData, None)
        };

        let stability = (coverage_years >= MIN_COVERAGE_FOR_TREND)
            .then(|| StabilityFeatures::from_window(&values));

        Some(TimeseriesFeatureRecord {
            geography_id: geography_id.to_string(),
            layer_name: layer_name.to_string(),
            as_of_year: self.config.as_of_year,
            level_latest,
            level_baseline,
            momentum_slope: trend.map(|fit| fit.slope),
            momentum_delta,
            momentum_pct_change,
            momentum_fit_quality: trend.map(|fit| fit.fit_quality),
            stability_volatility: stability.as_ref().and_then(|s| s.volatility),
            stability_cv: stability.as_ref().and_then(|s| s.cv),
            stability_consistency: stability.as_ref().and_then(|s| s.consistency),
            stability_persistence: stability.as_ref().and_then(|s| s.persistence),
            coverage_years,
            min_year,
            max_year,
            data_gaps,
            computation_method,
        })
    }
}

/// Robust trend with least-squares fallback when the estimator fails.
fn fit_trend(years: &[i32], values: &[f64]) -> Option<TrendFit> {
    theil_sen(years, values).or_else(|| fit_ols(years, values))
}

#[derive(Clone, Copy, Debug, Default)]
struct StabilityFeatures {
    volatility: Option<f64>,
    cv: Option<f64>,
    consistency: Option<f64>,
    persistence: Option<usize>,
}

impl StabilityFeatures {
    fn from_window(values: &[f64]) -> Self {
        let volatility = interquartile_range(values);

        let cv = match (sample_std(values), mean(values)) {
            (Some(std), Some(m)) if m != 0.0 => finite_or_none(std / m),
            _ => None,
        };

        let deltas: Vec<f64> = values.windows(2).map(|pair| pair[1] - pair[0]).collect();
        let (consistency, persistence) = if deltas.is_empty() {
            (None, None)
        } else {
            let positive = deltas.iter().filter(|delta| **delta > 0.0).count();
            let consistency = finite_or_none(positive as f64 / deltas.len() as f64);

            let mut longest = 0usize;
            let mut current = 0usize;
            for delta in &deltas {
                if *delta > 0.0 {
                    current += 1;
                    longest = longest.max(current);
                } else {
                    current = 0;
                }
            }
            (consistency, Some(longest))
        };

        Self {
            volatility,
            cv,
            consistency,
            persistence,
        }
    }
}
