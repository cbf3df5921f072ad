// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::normalize::NormalizedScores;
use geotrend_core::{LayerScoreRecord, TimeseriesFeatureRecord, WeightTriple};

/// At most half of a layer score can be lost to the missingness penalty.
const PENALTY_SCALE: f64 = 0.5;

/// Missingness penalty from covered years. Fixed breakpoints at 5 and 3
/// covered years, piecewise linear; the exact formula is a compatibility
/// contract pinned by regression tests.
pub fn missingness_penalty(coverage_years: usize) -> f64 {
    if coverage_years >= 5 {
        0.0
    } else if coverage_years >= 3 {
        0.2 * (5 - coverage_years) as f64 / 2.0
    } else {
        0.5 + 0.3 * (3 - coverage_years) as f64 / 3.0
    }
}

/// Combines normalized level/momentum/stability into one bounded layer score,
/// with the coverage penalty applied multiplicatively and capped.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayerScoreComposer;

impl LayerScoreComposer {
    /// Composes the layer score record for one feature record.
    pub fn compose(
        feature: &TimeseriesFeatureRecord,
        normalized: &NormalizedScores,
    ) -> LayerScoreRecord {
        let level = normalized.level_score(&feature.geography_id, &feature.layer_name);
        let momentum = normalized.momentum_score(&feature.geography_id, &feature.layer_name);
        let stability = normalized.stability_score(&feature.geography_id, &feature.layer_name);

        let (raw, weights) = match (level, momentum, stability) {
            (Some(l), Some(m), Some(s)) => {
                let w = WeightTriple::FULL;
                (
                    Some(w.level * l + w.momentum * m + w.stability * s),
                    w,
                )
            }
            (Some(l), Some(m), None) => {
                let w = WeightTriple::LEVEL_MOMENTUM;
                (Some(w.level * l + w.momentum * m), w)
            }
            (Some(l), None, _) => (Some(l), WeightTriple::LEVEL_ONLY),
            (None, _, _) => (None, WeightTriple::LEVEL_ONLY),
        };

        let penalty = missingness_penalty(feature.coverage_years);
        let overall = raw.map(|score| score * (1.0 - PENALTY_SCALE * penalty));

        LayerScoreRecord {
            geography_id: feature.geography_id.clone(),
            layer_name: feature.layer_name.clone(),
            as_of_year: feature.as_of_year,
            layer_level_score: level,
            layer_momentum_score: momentum,
            layer_stability_score: stability,
            layer_overall_score: overall,
            missingness_penalty: penalty,
            has_momentum: momentum.is_some(),
            has_stability: stability.is_some(),
            weights_used: weights,
        }
    }
}
