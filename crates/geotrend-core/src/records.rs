// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::collections::BTreeSet;

/// How the momentum features of a record were computed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputationMethod {
    /// Robust trend fit (or its least-squares fallback) over >= 3 years.
    RobustTrend,
    /// Fewer than 3 covered years; trend features are null.
    InsufficientData,
}

impl ComputationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RobustTrend => "robust_trend",
            Self::InsufficientData => "insufficient_data",
        }
    }
}

/// Qualitative trajectory classification.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectionalStatus {
    Improving,
    Stable,
    AtRisk,
}

impl DirectionalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::AtRisk => "at_risk",
        }
    }
}

/// Qualitative reliability of a classification.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Strong,
    Conditional,
    Fragile,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Conditional => "conditional",
            Self::Fragile => "fragile",
        }
    }
}

/// Single user-facing synthesis category.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinalGrouping {
    EmergingTailwinds,
    ConditionalGrowth,
    StableConstrained,
    AtRiskHeadwinds,
    HighUncertainty,
}

impl FinalGrouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmergingTailwinds => "emerging_tailwinds",
            Self::ConditionalGrowth => "conditional_growth",
            Self::StableConstrained => "stable_constrained",
            Self::AtRiskHeadwinds => "at_risk_headwinds",
            Self::HighUncertainty => "high_uncertainty",
        }
    }
}

/// Per-(geography, layer) trend and stability features for one reference year.
///
/// Every nullable field is `None` exactly when the data could not support it;
/// no field ever carries NaN or infinity.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TimeseriesFeatureRecord {
    pub geography_id: String,
    pub layer_name: String,
    pub as_of_year: i32,
    /// Value at the most recent covered year in the window.
    pub level_latest: f64,
    /// Value at the earliest covered year in the window.
    pub level_baseline: f64,
    pub momentum_slope: Option<f64>,
    pub momentum_delta: Option<f64>,
    pub momentum_pct_change: Option<f64>,
    /// Median absolute residual (robust path) or slope standard error (fallback).
    pub momentum_fit_quality: Option<f64>,
    /// Interquartile range of windowed values.
    pub stability_volatility: Option<f64>,
    /// Sample standard deviation over mean; None when the mean is zero.
    pub stability_cv: Option<f64>,
    /// Fraction of year-over-year deltas that are strictly positive.
    pub stability_consistency: Option<f64>,
    /// Longest run of consecutive positive year-over-year deltas.
    pub stability_persistence: Option<usize>,
    pub coverage_years: usize,
    pub min_year: i32,
    pub max_year: i32,
    /// Window years with no observation; disjoint from covered years.
    pub data_gaps: BTreeSet<i32>,
    pub computation_method: ComputationMethod,
}

/// Exact composition weights applied to one layer score, for auditability.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightTriple {
    pub level: f64,
    pub momentum: f64,
    pub stability: f64,
}

impl WeightTriple {
    pub const FULL: Self = Self {
        level: 0.5,
        momentum: 0.3,
        stability: 0.2,
    };
    pub const LEVEL_MOMENTUM: Self = Self {
        level: 0.625,
        momentum: 0.375,
        stability: 0.0,
    };
    pub const LEVEL_ONLY: Self = Self {
        level: 1.0,
        momentum: 0.0,
        stability: 0.0,
    };
}

/// Per-(geography, layer) bounded scores for one reference year.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LayerScoreRecord {
    pub geography_id: String,
    pub layer_name: String,
    pub as_of_year: i32,
    pub layer_level_score: Option<f64>,
    pub layer_momentum_score: Option<f64>,
    pub layer_stability_score: Option<f64>,
    pub layer_overall_score: Option<f64>,
    pub missingness_penalty: f64,
    pub has_momentum: bool,
    pub has_stability: bool,
    pub weights_used: WeightTriple,
}

/// Final per-geography classification for one reference year.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationRecord {
    pub geography_id: String,
    pub as_of_year: i32,
    pub directional_status: DirectionalStatus,
    pub confidence_level: ConfidenceLevel,
    pub uncertainty_reasons: BTreeSet<String>,
    /// Risk-adjusted composite; classification thresholds operate on this.
    pub composite_score: Option<f64>,
    /// Cohort percentile of the composite, produced for display only.
    pub composite_display_rank: Option<f64>,
    pub final_grouping: FinalGrouping,
}
