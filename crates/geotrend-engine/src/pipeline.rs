// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::aggregate::CompositeAggregator;
use crate::classify::{
    ConfidenceClassifier, CoverageEvidence, DirectionalClassifier, DirectionalEvidence,
};
use crate::compose::LayerScoreComposer;
use crate::features::TimeseriesFeatureExtractor;
use crate::normalize::CrossSectionalNormalizer;
use crate::stats::percentile_scores;
use crate::synthesis::{SynthesisGrouper, SynthesisInputs};
use geotrend_core::{
    ClassificationRecord, ConfidenceLevel, DirectionalStatus, EngineConfig, FinalGrouping,
    LayerRegistry, LayerScoreRecord, ObservationSet, RunDiagnostics, ScoreError,
    TimeseriesFeatureRecord,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::warn;

/// Uncertainty reason attached when a geography hits the contained-failure path.
const PROCESSING_ERROR_REASON: &str = "processing_error";

/// Full-overwrite payload for one `as_of_year`, handed to the storage
/// collaborator. The core never emits partial or incremental updates.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct EngineOutput {
    pub features: Vec<TimeseriesFeatureRecord>,
    pub layer_scores: Vec<LayerScoreRecord>,
    pub classifications: Vec<ClassificationRecord>,
    pub diagnostics: RunDiagnostics,
}

/// Runs the seven pipeline components in dependency order over one
/// observation snapshot.
///
/// Deterministic by construction: geographies and layers are visited in
/// sorted order, and the parallel extraction stage collects in input order,
/// so identical inputs and configuration yield bit-identical outputs.
pub fn run_engine(
    observations: &ObservationSet,
    registry: &LayerRegistry,
    config: &EngineConfig,
) -> Result<EngineOutput, ScoreError> {
    config.validate()?;

    // Ingress is the point of use for observed layer names.
    for layer_name in observations.layer_names() {
        registry.get(&layer_name)?;
    }

    let geographies = observations.geography_ids();
    let mut diagnostics = RunDiagnostics::for_year(config.as_of_year);
    diagnostics.geographies_seen = geographies.len();

    // Per-geography extraction is embarrassingly parallel; the indexed
    // collect keeps results in sorted-geography order.
    let extractor = TimeseriesFeatureExtractor::new(config);
    let features: Vec<TimeseriesFeatureRecord> = geographies
        .par_iter()
        .map(|geography_id| {
            registry
                .names()
                .filter_map(|layer_name| extractor.extract(observations, geography_id, layer_name))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    diagnostics.feature_records_emitted = features.len();

    // Synchronization barrier: the whole cohort is needed before any
    // percentile can be assigned.
    let normalized = CrossSectionalNormalizer::normalize(&features);

    let layer_scores: Vec<LayerScoreRecord> = features
        .iter()
        .map(|feature| LayerScoreComposer::compose(feature, &normalized))
        .collect();
    diagnostics.layer_scores_emitted = layer_scores.len();

    let mut features_by_geo: BTreeMap<&str, Vec<&TimeseriesFeatureRecord>> = BTreeMap::new();
    for feature in &features {
        features_by_geo
            .entry(feature.geography_id.as_str())
            .or_default()
            .push(feature);
    }
    let mut scores_by_geo: BTreeMap<&str, Vec<&LayerScoreRecord>> = BTreeMap::new();
    for score in &layer_scores {
        scores_by_geo
            .entry(score.geography_id.as_str())
            .or_default()
            .push(score);
    }

    let mut classifications = Vec::with_capacity(geographies.len());
    for geography_id in &geographies {
        let geo_features = features_by_geo
            .get(geography_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let geo_scores = scores_by_geo
            .get(geography_id.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        match classify_geography(geography_id, geo_features, geo_scores, registry, config) {
            Ok(record) => classifications.push(record),
            Err(err) => {
                // One bad geography must not abort the batch.
                warn!(geography = geography_id.as_str(), error = %err, "classification degraded");
                diagnostics.geographies_degraded += 1;
                diagnostics
                    .warnings
                    .push(format!("{geography_id}: {err}"));
                classifications.push(fallback_classification(geography_id, config.as_of_year));
            }
        }
    }

    assign_display_ranks(&mut classifications);
    diagnostics.classifications_emitted = classifications.len();

    Ok(EngineOutput {
        features,
        layer_scores,
        classifications,
        diagnostics,
    })
}

fn classify_geography(
    geography_id: &str,
    features: &[&TimeseriesFeatureRecord],
    layer_scores: &[&LayerScoreRecord],
    registry: &LayerRegistry,
    config: &EngineConfig,
) -> Result<ClassificationRecord, ScoreError> {
    let composite =
        CompositeAggregator::aggregate(layer_scores.iter().copied(), registry, config)?;
    let evidence =
        DirectionalEvidence::from_layer_scores(layer_scores.iter().copied(), registry)?;
    let directional = DirectionalClassifier::classify(&evidence, config);
    let confidence = ConfidenceClassifier::classify(
        &CoverageEvidence::from_features(features.iter().copied()),
        config,
    );

    let final_grouping = SynthesisGrouper::group(&SynthesisInputs {
        directional,
        confidence: confidence.level,
        uncertainty_reasons: &confidence.reasons,
    });

    Ok(ClassificationRecord {
        geography_id: geography_id.to_string(),
        as_of_year: config.as_of_year,
        directional_status: directional,
        confidence_level: confidence.level,
        uncertainty_reasons: confidence.reasons,
        composite_score: composite.adjusted,
        composite_display_rank: None,
        final_grouping,
    })
}

/// Safe defaults for a geography whose processing failed: never optimistic,
/// always flagged uncertain.
fn fallback_classification(geography_id: &str, as_of_year: i32) -> ClassificationRecord {
    ClassificationRecord {
        geography_id: geography_id.to_string(),
        as_of_year,
        directional_status: DirectionalStatus::Stable,
        confidence_level: ConfidenceLevel::Fragile,
        uncertainty_reasons: [PROCESSING_ERROR_REASON.to_string()].into_iter().collect(),
        composite_score: None,
        composite_display_rank: None,
        final_grouping: FinalGrouping::HighUncertainty,
    }
}

/// Cohort percentile of the adjusted composite, for display only.
/// Classification thresholds never read this field.
fn assign_display_ranks(classifications: &mut [ClassificationRecord]) {
    let scored: Vec<(usize, f64)> = classifications
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| record.composite_score.map(|score| (idx, score)))
        .collect();
    if scored.is_empty() {
        return;
    }

    let raw: Vec<f64> = scored.iter().map(|(_, score)| *score).collect();
    for ((idx, _), rank) in scored.iter().zip(percentile_scores(&raw)) {
        classifications[*idx].composite_display_rank = Some(rank);
    }
}

#[cfg(test)]
mod tests {
    use super::{fallback_classification, run_engine};
    use geotrend_core::{
        ConfidenceLevel, DirectionalStatus, EngineConfig, FinalGrouping, LayerRegistry,
        MetricObservation, ObservationSet, ScoreError,
    };

    fn dense_set(geographies: &[(&str, f64)]) -> ObservationSet {
        // Every geography gets five years of every standard layer, with a
        // geography-specific slope so cross-sectional ranks are distinct.
        let registry = LayerRegistry::standard();
        let mut observations = Vec::new();
        for (geo, slope) in geographies {
            for layer in registry.names() {
                for (step, year) in (2019..=2023).enumerate() {
                    let value = 10.0 + slope * step as f64;
                    observations.push(MetricObservation::new(*geo, layer, year, value));
                }
            }
        }
        ObservationSet::from_observations(observations).expect("test observations valid")
    }

    #[test]
    fn run_is_idempotent_and_bit_identical() {
        let set = dense_set(&[("g1", 1.0), ("g2", 2.0), ("g3", -1.0), ("g4", 0.5)]);
        let registry = LayerRegistry::standard();
        let config = EngineConfig::for_year(2023);

        let first = run_engine(&set, &registry, &config).expect("first run succeeds");
        let second = run_engine(&set, &registry, &config).expect("second run succeeds");
        assert_eq!(first, second);
    }

    #[test]
    fn dense_cohort_classifies_every_geography_strong() {
        let set = dense_set(&[("g1", 1.0), ("g2", 2.0), ("g3", -1.0), ("g4", 0.5)]);
        let registry = LayerRegistry::standard();
        let config = EngineConfig::for_year(2023);

        let output = run_engine(&set, &registry, &config).expect("run succeeds");
        assert_eq!(output.diagnostics.geographies_seen, 4);
        assert_eq!(output.diagnostics.geographies_degraded, 0);
        assert_eq!(output.classifications.len(), 4);
        // 4 geographies x 6 layers, all with full coverage.
        assert_eq!(output.features.len(), 24);
        assert_eq!(output.layer_scores.len(), 24);
        for record in &output.classifications {
            assert_eq!(record.confidence_level, ConfidenceLevel::Strong);
            assert!(record.uncertainty_reasons.is_empty());
            assert!(record.composite_score.is_some());
            assert!(record.composite_display_rank.is_some());
        }
    }

    #[test]
    fn unknown_observed_layer_aborts_the_run() {
        let mut set = dense_set(&[("g1", 1.0)]);
        set.insert(MetricObservation::new("g1", "broadband", 2023, 1.0))
            .expect("insert succeeds");
        let registry = LayerRegistry::standard();
        let config = EngineConfig::for_year(2023);

        let err = run_engine(&set, &registry, &config).expect_err("unknown layer must abort");
        assert!(matches!(err, ScoreError::UnknownLayer(_)));
    }

    #[test]
    fn invalid_configuration_aborts_the_run() {
        let set = dense_set(&[("g1", 1.0)]);
        let registry = LayerRegistry::standard();
        let mut config = EngineConfig::for_year(2023);
        config.window_size = 1;

        let err = run_engine(&set, &registry, &config).expect_err("bad config must abort");
        assert!(matches!(err, ScoreError::InvalidConfig(_)));
    }

    #[test]
    fn empty_snapshot_yields_empty_output() {
        let set = ObservationSet::new();
        let registry = LayerRegistry::standard();
        let config = EngineConfig::for_year(2023);

        let output = run_engine(&set, &registry, &config).expect("run succeeds");
        assert!(output.features.is_empty());
        assert!(output.layer_scores.is_empty());
        assert!(output.classifications.is_empty());
        assert_eq!(output.diagnostics.geographies_seen, 0);
    }

    #[test]
    fn geography_with_single_year_everywhere_is_fragile() {
        let registry = LayerRegistry::standard();
        let observations: Vec<MetricObservation> = registry
            .names()
            .map(|layer| MetricObservation::new("g1", layer, 2023, 1.0))
            .collect();
        let set = ObservationSet::from_observations(observations).expect("valid");
        let config = EngineConfig::for_year(2023);

        let output = run_engine(&set, &registry, &config).expect("run succeeds");
        // One year per layer emits no feature records at all.
        assert!(output.features.is_empty());
        let record = &output.classifications[0];
        assert_eq!(record.directional_status, DirectionalStatus::Stable);
        assert_eq!(record.confidence_level, ConfidenceLevel::Fragile);
        assert!(record.uncertainty_reasons.contains("no_coverage_data"));
        assert_eq!(record.final_grouping, FinalGrouping::HighUncertainty);
        assert_eq!(record.composite_score, None);
    }

    #[test]
    fn display_ranks_span_the_scored_cohort() {
        let set = dense_set(&[("g1", 1.0), ("g2", 2.0), ("g3", 3.0)]);
        let registry = LayerRegistry::standard();
        let config = EngineConfig::for_year(2023);

        let output = run_engine(&set, &registry, &config).expect("run succeeds");
        let ranks: Vec<f64> = output
            .classifications
            .iter()
            .filter_map(|record| record.composite_display_rank)
            .collect();
        assert_eq!(ranks.len(), 3);
        for rank in &ranks {
            assert!(*rank > 0.0 && *rank <= 1.0);
        }
        assert!((ranks.iter().cloned().fold(f64::MIN, f64::max) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fallback_record_is_flagged_and_pessimistic() {
        let record = fallback_classification("g9", 2023);
        assert_eq!(record.directional_status, DirectionalStatus::Stable);
        assert_eq!(record.confidence_level, ConfidenceLevel::Fragile);
        assert!(record.uncertainty_reasons.contains("processing_error"));
        assert_eq!(record.final_grouping, FinalGrouping::HighUncertainty);
        assert_eq!(record.composite_score, None);
    }
}
