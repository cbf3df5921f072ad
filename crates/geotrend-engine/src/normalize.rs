// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{finite_or_none, percentile_scores};
use geotrend_core::TimeseriesFeatureRecord;
use std::collections::BTreeMap;

/// Cross-sectional percentile scores keyed by `(geography, layer)`.
///
/// Built once per run from the full cohort; this stage is the hard
/// synchronization barrier of the pipeline and cannot be streamed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedScores {
    level: BTreeMap<(String, String), f64>,
    momentum: BTreeMap<(String, String), f64>,
    stability: BTreeMap<(String, String), f64>,
}

impl NormalizedScores {
    pub fn level_score(&self, geography_id: &str, layer_name: &str) -> Option<f64> {
        self.level
            .get(&(geography_id.to_string(), layer_name.to_string()))
            .copied()
    }

    pub fn momentum_score(&self, geography_id: &str, layer_name: &str) -> Option<f64> {
        self.momentum
            .get(&(geography_id.to_string(), layer_name.to_string()))
            .copied()
    }

    pub fn stability_score(&self, geography_id: &str, layer_name: &str) -> Option<f64> {
        self.stability
            .get(&(geography_id.to_string(), layer_name.to_string()))
            .copied()
    }
}

/// Converts raw level/momentum features into 0-1 percentile scores per
/// (layer, year) across the full geography cohort.
///
/// Orientation is assumed already handled upstream: higher raw values mean
/// higher scores. Stability consistency is already 0-1 and passes through
/// without re-ranking.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrossSectionalNormalizer;

impl CrossSectionalNormalizer {
    /// Normalizes one cohort of feature records (all for the same year).
    pub fn normalize(features: &[TimeseriesFeatureRecord]) -> NormalizedScores {
        let mut by_layer: BTreeMap<&str, Vec<&TimeseriesFeatureRecord>> = BTreeMap::new();
        for record in features {
            by_layer
                .entry(record.layer_name.as_str())
                .or_default()
                .push(record);
        }

        let mut scores = NormalizedScores::default();
        for (layer_name, records) in by_layer {
            rank_into(
                &mut scores.level,
                layer_name,
                records
                    .iter()
                    .filter_map(|r| {
                        finite_or_none(r.level_latest).map(|v| (r.geography_id.as_str(), v))
                    })
                    .collect(),
            );

            // Momentum is ranked only over the subset that has a slope;
            // everyone else keeps a null momentum score.
            rank_into(
                &mut scores.momentum,
                layer_name,
                records
                    .iter()
                    .filter_map(|r| {
                        r.momentum_slope
                            .and_then(finite_or_none)
                            .map(|v| (r.geography_id.as_str(), v))
                    })
                    .collect(),
            );

            for record in records {
                if let Some(consistency) = record.stability_consistency.and_then(finite_or_none) {
                    scores.stability.insert(
                        (record.geography_id.clone(), layer_name.to_string()),
                        consistency.clamp(0.0, 1.0),
                    );
                }
            }
        }

        scores
    }
}

fn rank_into(
    target: &mut BTreeMap<(String, String), f64>,
    layer_name: &str,
    cohort: Vec<(&str, f64)>,
) {
    if cohort.is_empty() {
        return;
    }
    let raw: Vec<f64> = cohort.iter().map(|(_, value)| *value).collect();
    for ((geography_id, _), score) in cohort.iter().zip(percentile_scores(&raw)) {
        target.insert((geography_id.to_string(), layer_name.to_string()), score);
    }
}

#[cfg(test)]
mod tests {
    use super::CrossSectionalNormalizer;
    use geotrend_core::{ComputationMethod, TimeseriesFeatureRecord};
    use std::collections::BTreeSet;

    fn record(
        geo: &str,
        layer: &str,
        level: f64,
        slope: Option<f64>,
        consistency: Option<f64>,
    ) -> TimeseriesFeatureRecord {
        TimeseriesFeatureRecord {
            geography_id: geo.to_string(),
            layer_name: layer.to_string(),
            as_of_year: 2023,
            level_latest: level,
            level_baseline: level,
            momentum_slope: slope,
            momentum_delta: None,
            momentum_pct_change: None,
            momentum_fit_quality: None,
            stability_volatility: None,
            stability_cv: None,
            stability_consistency: consistency,
            stability_persistence: None,
            coverage_years: 5,
            min_year: 2019,
            max_year: 2023,
            data_gaps: BTreeSet::new(),
            computation_method: ComputationMethod::RobustTrend,
        }
    }

    #[test]
    fn level_percentiles_are_monotone_in_raw_values() {
        let features = vec![
            record("g1", "employment", 10.0, None, None),
            record("g2", "employment", 30.0, None, None),
            record("g3", "employment", 20.0, None, None),
        ];
        let scores = CrossSectionalNormalizer::normalize(&features);

        let s1 = scores.level_score("g1", "employment").expect("g1 scored");
        let s2 = scores.level_score("g2", "employment").expect("g2 scored");
        let s3 = scores.level_score("g3", "employment").expect("g3 scored");
        assert!(s1 < s3 && s3 < s2);
        assert_eq!(s2, 1.0);
        for s in [s1, s2, s3] {
            assert!(s > 0.0 && s <= 1.0);
        }
    }

    #[test]
    fn equal_raw_values_share_an_averaged_rank() {
        let features = vec![
            record("g1", "housing", 5.0, None, None),
            record("g2", "housing", 5.0, None, None),
            record("g3", "housing", 9.0, None, None),
        ];
        let scores = CrossSectionalNormalizer::normalize(&features);

        let s1 = scores.level_score("g1", "housing").expect("g1 scored");
        let s2 = scores.level_score("g2", "housing").expect("g2 scored");
        assert_eq!(s1, s2);
        // Average of ranks 1 and 2 over a cohort of 3.
        assert!((s1 - 1.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn momentum_ranking_covers_only_the_slope_subset() {
        let features = vec![
            record("g1", "schools", 1.0, Some(0.5), None),
            record("g2", "schools", 2.0, None, None),
            record("g3", "schools", 3.0, Some(-0.5), None),
        ];
        let scores = CrossSectionalNormalizer::normalize(&features);

        assert!(scores.momentum_score("g1", "schools").is_some());
        assert_eq!(scores.momentum_score("g2", "schools"), None);
        let up = scores.momentum_score("g1", "schools").expect("g1 momentum");
        let down = scores.momentum_score("g3", "schools").expect("g3 momentum");
        assert!(down < up);
    }

    #[test]
    fn stability_consistency_passes_through_unranked() {
        let features = vec![
            record("g1", "mobility", 1.0, None, Some(0.75)),
            record("g2", "mobility", 2.0, None, None),
        ];
        let scores = CrossSectionalNormalizer::normalize(&features);

        assert_eq!(scores.stability_score("g1", "mobility"), Some(0.75));
        assert_eq!(scores.stability_score("g2", "mobility"), None);
    }

    #[test]
    fn layers_are_normalized_independently() {
        let features = vec![
            record("g1", "employment", 100.0, None, None),
            record("g2", "employment", 200.0, None, None),
            record("g1", "housing", 2.0, None, None),
            record("g2", "housing", 1.0, None, None),
        ];
        let scores = CrossSectionalNormalizer::normalize(&features);

        // g1 is bottom of employment but top of housing.
        let emp = scores.level_score("g1", "employment").expect("scored");
        let hou = scores.level_score("g1", "housing").expect("scored");
        assert!(emp < 1.0);
        assert_eq!(hou, 1.0);
    }

    #[test]
    fn single_geography_cohort_gets_top_percentile() {
        let features = vec![record("g1", "risk", 0.4, None, None)];
        let scores = CrossSectionalNormalizer::normalize(&features);
        assert_eq!(scores.level_score("g1", "risk"), Some(1.0));
    }
}
