// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{finite_or_none, mean};
use geotrend_core::{EngineConfig, LayerRegistry, LayerScoreRecord, ScoreError};

/// Composite score for one geography, before and after the risk drag.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompositeScore {
    /// Mean of the available non-risk layer overall scores.
    pub raw: Option<f64>,
    /// Raw composite after the capped multiplicative risk drag.
    pub adjusted: Option<f64>,
    /// Overall score of the risk layer, when available.
    pub risk_score: Option<f64>,
}

/// Averages non-risk layer scores and applies the bounded risk drag.
///
/// Risk is subtractive only: it can pull the composite down to the
/// configured penalty floor but never adds to it.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompositeAggregator;

impl CompositeAggregator {
    /// Aggregates the layer scores of one geography.
    pub fn aggregate<'a>(
        layer_scores: impl IntoIterator<Item = &'a LayerScoreRecord>,
        registry: &LayerRegistry,
        config: &EngineConfig,
    ) -> Result<CompositeScore, ScoreError> {
        let mut evidence_scores = Vec::new();
        let mut risk_score = None;

        for record in layer_scores {
            // Point of use for layer names: unknown layers fail fast.
            let def = registry.get(&record.layer_name)?;
            let Some(overall) = record.layer_overall_score.and_then(finite_or_none) else {
                continue;
            };
            if def.name == registry.risk_layer() {
                risk_score = Some(overall);
            } else {
                evidence_scores.push(overall);
            }
        }

        let raw = mean(&evidence_scores);
        let adjusted = match (raw, risk_score) {
            (Some(raw), Some(risk)) => {
                finite_or_none(raw * (1.0 - risk).max(config.risk_drag_penalty_floor))
            }
            (Some(raw), None) => Some(raw),
            (None, _) => None,
        };

        Ok(CompositeScore {
            raw,
            adjusted,
            risk_score,
        })
    }
}
