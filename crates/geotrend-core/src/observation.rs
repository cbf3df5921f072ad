// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::ScoreError;
use std::collections::{BTreeMap, BTreeSet};

/// One immutable yearly metric observation supplied by the ingestion collaborator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct MetricObservation {
    pub geography_id: String,
    pub layer_name: String,
    pub year: i32,
    pub value: f64,
}

impl MetricObservation {
    pub fn new(
        geography_id: impl Into<String>,
        layer_name: impl Into<String>,
        year: i32,
        value: f64,
    ) -> Self {
        Self {
            geography_id: geography_id.into(),
            layer_name: layer_name.into(),
            year,
            value,
        }
    }
}

/// Read-only snapshot of observations keyed by `(geography, layer, year)`.
///
/// Exactly zero or one value per key. Missing years are represented by
/// absence, never by sentinel floats; non-finite values are rejected at
/// insertion so NaN can never reach a downstream comparison.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObservationSet {
    values: BTreeMap<(String, String, i32), f64>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a batch of observations, rejecting duplicates.
    pub fn from_observations(
        observations: impl IntoIterator<Item = MetricObservation>,
    ) -> Result<Self, ScoreError> {
        let mut set = Self::new();
        for obs in observations {
            set.insert(obs)?;
        }
        Ok(set)
    }

    /// Inserts one observation; duplicate keys and non-finite values fail.
    pub fn insert(&mut self, obs: MetricObservation) -> Result<(), ScoreError> {
        if obs.geography_id.is_empty() {
            return Err(ScoreError::invalid_input(
                "observation geography_id must be non-empty",
            ));
        }
        if obs.layer_name.is_empty() {
            return Err(ScoreError::invalid_input(
                "observation layer_name must be non-empty",
            ));
        }
        if !obs.value.is_finite() {
            return Err(ScoreError::invalid_input(format!(
                "observation value must be finite: geography={}, layer={}, year={}, value={}",
                obs.geography_id, obs.layer_name, obs.year, obs.value
            )));
        }

        let key = (obs.geography_id, obs.layer_name, obs.year);
        if self.values.contains_key(&key) {
            return Err(ScoreError::invalid_input(format!(
                "duplicate observation key: geography={}, layer={}, year={}",
                key.0, key.1, key.2
            )));
        }
        self.values.insert(key, obs.value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for one `(geography, layer, year)` key, if observed.
    pub fn value(&self, geography_id: &str, layer_name: &str, year: i32) -> Option<f64> {
        self.values
            .get(&(geography_id.to_string(), layer_name.to_string(), year))
            .copied()
    }

    /// All distinct geography ids, in sorted order.
    pub fn geography_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&String> = self.values.keys().map(|(geo, _, _)| geo).collect();
        ids.into_iter().cloned().collect()
    }

    /// All distinct layer names present in the snapshot, in sorted order.
    pub fn layer_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.values.keys().map(|(_, layer, _)| layer).collect();
        names.into_iter().cloned().collect()
    }

    /// `(year, value)` pairs for one geography+layer with year inside
    /// `[first_year, last_year]`, sorted ascending by year. No gap-filling.
    pub fn window(
        &self,
        geography_id: &str,
        layer_name: &str,
        first_year: i32,
        last_year: i32,
    ) -> Vec<(i32, f64)> {
        let lo = (
            geography_id.to_string(),
            layer_name.to_string(),
            first_year,
        );
        let hi = (geography_id.to_string(), layer_name.to_string(), last_year);
        self.values
            .range(lo..=hi)
            .map(|((_, _, year), value)| (*year, *value))
            .collect()
    }
}
