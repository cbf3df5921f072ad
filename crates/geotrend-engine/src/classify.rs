// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::finite_or_none;
use geotrend_core::{
    ConfidenceLevel, DirectionalStatus, EngineConfig, LayerRegistry, LayerScoreRecord,
    ScoreError, TimeseriesFeatureRecord,
};
use std::collections::BTreeSet;

/// Minimum non-risk layer scores before any non-stable label is considered.
const MIN_EVIDENCE_LAYERS: usize = 3;
/// Low-performing layers tolerated by the improving branch.
const IMPROVING_LOW_TOLERANCE: usize = 1;
/// Momentum scores required to confirm or contradict a trajectory.
const MOMENTUM_MAJORITY_COUNT: usize = 2;

/// Inputs to the directional rule table, extracted from one geography's
/// layer score records. Momentum evidence is drawn from non-risk layers; the
/// risk layer contributes only its overall score.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirectionalEvidence {
    /// Non-null overall scores of non-risk layers, in layer-name order.
    pub evidence_scores: Vec<f64>,
    /// Non-null normalized momentum scores of non-risk layers.
    pub momentum_scores: Vec<f64>,
    /// Overall score of the risk layer, when available.
    pub risk_score: Option<f64>,
}

impl DirectionalEvidence {
    /// Collects evidence from one geography's layer scores.
    pub fn from_layer_scores<'a>(
        layer_scores: impl IntoIterator<Item = &'a LayerScoreRecord>,
        registry: &LayerRegistry,
    ) -> Result<Self, ScoreError> {
        let mut evidence = Self::default();
        for record in layer_scores {
            let def = registry.get(&record.layer_name)?;
            if def.name == registry.risk_layer() {
                evidence.risk_score = record.layer_overall_score.and_then(finite_or_none);
                continue;
            }
            if let Some(overall) = record.layer_overall_score.and_then(finite_or_none) {
                evidence.evidence_scores.push(overall);
            }
            if let Some(momentum) = record.layer_momentum_score.and_then(finite_or_none) {
                evidence.momentum_scores.push(momentum);
            }
        }
        Ok(evidence)
    }

    fn count_at_or_above(&self, threshold: f64) -> usize {
        self.evidence_scores
            .iter()
            .filter(|score| **score >= threshold)
            .count()
    }

    fn count_below(&self, threshold: f64) -> usize {
        self.evidence_scores
            .iter()
            .filter(|score| **score < threshold)
            .count()
    }

    fn momentum_at_or_above(&self, threshold: f64) -> usize {
        self.momentum_scores
            .iter()
            .filter(|score| **score >= threshold)
            .count()
    }

    fn momentum_below(&self, threshold: f64) -> usize {
        self.momentum_scores
            .iter()
            .filter(|score| **score < threshold)
            .count()
    }

    fn has_momentum_data(&self) -> bool {
        !self.momentum_scores.is_empty()
    }
}

/// One ordered directional rule: predicate plus resulting status.
pub struct DirectionalRule {
    pub name: &'static str,
    pub status: DirectionalStatus,
    applies: fn(&DirectionalEvidence, &EngineConfig) -> bool,
}

fn insufficient_evidence(evidence: &DirectionalEvidence, _config: &EngineConfig) -> bool {
    evidence.evidence_scores.len() < MIN_EVIDENCE_LAYERS
}

fn improving(evidence: &DirectionalEvidence, config: &EngineConfig) -> bool {
    let high_enough = evidence.count_at_or_above(config.threshold_improving_high)
        >= config.threshold_improving_min_layers;
    let few_low = evidence.count_below(config.threshold_improving_low) <= IMPROVING_LOW_TOLERANCE;
    let momentum_confirms = !evidence.has_momentum_data()
        || evidence.momentum_at_or_above(config.momentum_positive_threshold)
            >= MOMENTUM_MAJORITY_COUNT;
    high_enough && few_low && momentum_confirms
}

fn at_risk(evidence: &DirectionalEvidence, config: &EngineConfig) -> bool {
    let low_count = evidence.count_below(config.threshold_at_risk_low);
    if low_count >= config.threshold_at_risk_count {
        return true;
    }
    let severe_drag = evidence
        .risk_score
        .is_some_and(|risk| risk >= config.threshold_risk_drag_severe);
    if severe_drag && low_count >= 1 {
        return true;
    }
    evidence.momentum_below(config.momentum_negative_threshold) >= MOMENTUM_MAJORITY_COUNT
}

fn always(_evidence: &DirectionalEvidence, _config: &EngineConfig) -> bool {
    true
}

/// The canonical multi-year rule table, in strict precedence order.
///
/// The deprecated single-year rule set (at-risk low-layer cutoff 0.4 under
/// severe risk drag) is intentionally absent.
pub const DIRECTIONAL_RULES: &[DirectionalRule] = &[
    DirectionalRule {
        name: "insufficient_evidence",
        status: DirectionalStatus::Stable,
        applies: insufficient_evidence,
    },
    DirectionalRule {
        name: "improving",
        status: DirectionalStatus::Improving,
        applies: improving,
    },
    DirectionalRule {
        name: "at_risk",
        status: DirectionalStatus::AtRisk,
        applies: at_risk,
    },
    DirectionalRule {
        name: "stable_default",
        status: DirectionalStatus::Stable,
        applies: always,
    },
];

/// Rule-based trajectory label from the layer-score vector; first match wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectionalClassifier;

impl DirectionalClassifier {
    pub fn classify(evidence: &DirectionalEvidence, config: &EngineConfig) -> DirectionalStatus {
        Self::classify_with_rule(evidence, config).1
    }

    /// Also reports which rule fired, for diagnostics and rule-level tests.
    pub fn classify_with_rule(
        evidence: &DirectionalEvidence,
        config: &EngineConfig,
    ) -> (&'static str, DirectionalStatus) {
        for rule in DIRECTIONAL_RULES {
            if (rule.applies)(evidence, config) {
                return (rule.name, rule.status);
            }
        }
        // The table ends in a catch-all; this is unreachable by construction.
        ("stable_default", DirectionalStatus::Stable)
    }
}

/// Inputs to the confidence rule table: per-layer coverage counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoverageEvidence {
    pub coverages: Vec<usize>,
}

impl CoverageEvidence {
    pub fn from_features<'a>(
        features: impl IntoIterator<Item = &'a TimeseriesFeatureRecord>,
    ) -> Self {
        Self {
            coverages: features.into_iter().map(|f| f.coverage_years).collect(),
        }
    }

    fn average(&self) -> Option<f64> {
        if self.coverages.is_empty() {
            return None;
        }
        Some(self.coverages.iter().sum::<usize>() as f64 / self.coverages.len() as f64)
    }

    fn minimum(&self) -> Option<usize> {
        self.coverages.iter().copied().min()
    }
}

/// Confidence label plus machine-readable uncertainty reasons.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfidenceOutcome {
    pub level: ConfidenceLevel,
    pub reasons: BTreeSet<String>,
}

impl ConfidenceOutcome {
    fn new(level: ConfidenceLevel, reason: Option<&str>) -> Self {
        Self {
            level,
            reasons: reason.map(str::to_string).into_iter().collect(),
        }
    }
}

/// Rule-based reliability label from per-layer coverage completeness.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfidenceClassifier;

impl ConfidenceClassifier {
    pub fn classify(evidence: &CoverageEvidence, config: &EngineConfig) -> ConfidenceOutcome {
        let (Some(avg), Some(min)) = (evidence.average(), evidence.minimum()) else {
            return ConfidenceOutcome::new(ConfidenceLevel::Fragile, Some("no_coverage_data"));
        };

        if avg >= config.coverage_strong as f64 && min >= config.coverage_conditional {
            return ConfidenceOutcome::new(ConfidenceLevel::Strong, None);
        }
        if avg < config.coverage_conditional as f64 {
            return ConfidenceOutcome::new(ConfidenceLevel::Fragile, Some("sparse_coverage"));
        }
        if min < config.coverage_conditional {
            return ConfidenceOutcome::new(
                ConfidenceLevel::Conditional,
                Some("some_layers_sparse"),
            );
        }
        ConfidenceOutcome::new(ConfidenceLevel::Conditional, None)
    }
}
