// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared contracts for the geotrend scoring engine.
//!
//! This crate holds the types exchanged between the engine and its external
//! collaborators: the observation snapshot it consumes, the configuration it
//! is driven by, and the derived records it emits. It contains no algorithms.

mod config;
mod diagnostics;
mod error;
mod layer;
mod observation;
mod records;

pub use config::EngineConfig;
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, RunDiagnostics};
pub use error::ScoreError;
pub use layer::{LayerDef, LayerKind, LayerRegistry};
pub use observation::{MetricObservation, ObservationSet};
pub use records::{
    ClassificationRecord, ComputationMethod, ConfidenceLevel, DirectionalStatus, FinalGrouping,
    LayerScoreRecord, TimeseriesFeatureRecord, WeightTriple,
};
