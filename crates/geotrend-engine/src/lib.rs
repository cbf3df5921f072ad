// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Multi-year evidence scoring and classification engine.
//!
//! Turns sparse per-geography yearly observations into reliability-aware
//! trajectory classifications: robust trend and stability features, cohort
//! percentile normalization, penalized layer scores, a risk-adjusted
//! composite, and a deterministic rule-based classification. The whole
//! engine is a pure batch function over an in-memory snapshot; acquisition
//! and persistence belong to external collaborators.

mod aggregate;
mod classify;
mod compose;
mod features;
mod normalize;
mod pipeline;
mod stats;
mod synthesis;

pub use aggregate::{CompositeAggregator, CompositeScore};
pub use classify::{
    ConfidenceClassifier, ConfidenceOutcome, CoverageEvidence, DIRECTIONAL_RULES,
    DirectionalClassifier, DirectionalEvidence, DirectionalRule,
};
pub use compose::{LayerScoreComposer, missingness_penalty};
pub use features::TimeseriesFeatureExtractor;
pub use normalize::{CrossSectionalNormalizer, NormalizedScores};
pub use pipeline::{EngineOutput, run_engine};
pub use stats::{TrendFit, assign_average_ranks, percentile_scores, theil_sen};
pub use synthesis::{SynthesisGrouper, SynthesisInputs};
