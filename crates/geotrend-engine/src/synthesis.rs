// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use geotrend_core::{ConfidenceLevel, DirectionalStatus, FinalGrouping};
use std::collections::BTreeSet;

/// Uncertainty reasons at or above this count force the uncertain grouping.
const UNCERTAINTY_REASON_LIMIT: usize = 2;

/// Inputs to the synthesis decision table.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisInputs<'a> {
    pub directional: DirectionalStatus,
    pub confidence: ConfidenceLevel,
    pub uncertainty_reasons: &'a BTreeSet<String>,
}

/// Deterministic decision table combining trajectory, confidence, and
/// uncertainty into one user-facing category; first match wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct SynthesisGrouper;

impl SynthesisGrouper {
    pub fn group(inputs: &SynthesisInputs<'_>) -> FinalGrouping {
        if inputs.confidence == ConfidenceLevel::Fragile
            || inputs.uncertainty_reasons.len() >= UNCERTAINTY_REASON_LIMIT
        {
            return FinalGrouping::HighUncertainty;
        }
        match (inputs.directional, inputs.confidence) {
            (DirectionalStatus::AtRisk, _) => FinalGrouping::AtRiskHeadwinds,
            (DirectionalStatus::Improving, ConfidenceLevel::Strong) => {
                FinalGrouping::EmergingTailwinds
            }
            (DirectionalStatus::Improving, _) => FinalGrouping::ConditionalGrowth,
            (DirectionalStatus::Stable, _) => FinalGrouping::StableConstrained,
        }
    }
}
