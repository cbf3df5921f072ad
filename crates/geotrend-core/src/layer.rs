// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::ScoreError;
use std::collections::BTreeMap;

/// Role a layer plays in composite aggregation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    /// Contributes to the composite mean.
    Evidence,
    /// Applies a subtractive drag on the composite; never averaged in.
    Risk,
}

/// Definition of one analytical evidence category.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerDef {
    pub name: String,
    pub kind: LayerKind,
}

impl LayerDef {
    pub fn evidence(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Evidence,
        }
    }

    pub fn risk(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Risk,
        }
    }
}

/// Closed registry of known layers, iterated in sorted name order.
///
/// Exactly one risk layer is required. Any layer name outside the registry
/// fails fast with [`ScoreError::UnknownLayer`] wherever it is used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerRegistry {
    layers: BTreeMap<String, LayerDef>,
    risk_layer: String,
}

impl LayerRegistry {
    /// Builds a validated registry from layer definitions.
    pub fn new(defs: Vec<LayerDef>) -> Result<Self, ScoreError> {
        if defs.is_empty() {
            return Err(ScoreError::invalid_input(
                "LayerRegistry requires at least one layer definition",
            ));
        }

        let mut layers = BTreeMap::new();
        let mut risk_layers: Vec<String> = Vec::new();
        for def in defs {
            if def.name.is_empty() {
                return Err(ScoreError::invalid_input(
                    "LayerRegistry rejects empty layer names",
                ));
            }
            if def.kind == LayerKind::Risk {
                risk_layers.push(def.name.clone());
            }
            if layers.insert(def.name.clone(), def).is_some() {
                return Err(ScoreError::invalid_input(
                    "LayerRegistry rejects duplicate layer names",
                ));
            }
        }

        match risk_layers.as_slice() {
            [only] => Ok(Self {
                risk_layer: only.clone(),
                layers,
            }),
            [] => Err(ScoreError::invalid_input(
                "LayerRegistry requires exactly one risk layer; got none",
            )),
            many => Err(ScoreError::invalid_input(format!(
                "LayerRegistry requires exactly one risk layer; got {}",
                many.len()
            ))),
        }
    }

    /// The default six-layer registry used by the surrounding tooling.
    pub fn standard() -> Self {
        let defs = vec![
            LayerDef::evidence("employment"),
            LayerDef::evidence("mobility"),
            LayerDef::evidence("schools"),
            LayerDef::evidence("housing"),
            LayerDef::evidence("demographics"),
            LayerDef::risk("risk"),
        ];
        // The fixed standard set always validates.
        match Self::new(defs) {
            Ok(registry) => registry,
            Err(_) => unreachable!("standard registry definitions are valid"),
        }
    }

    /// Looks up a layer definition, failing fast on unknown names.
    pub fn get(&self, name: &str) -> Result<&LayerDef, ScoreError> {
        self.layers
            .get(name)
            .ok_or_else(|| ScoreError::unknown_layer(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Name of the single risk layer.
    pub fn risk_layer(&self) -> &str {
        &self.risk_layer
    }

    /// True when `name` is a registered non-risk layer.
    pub fn is_evidence(&self, name: &str) -> bool {
        self.layers
            .get(name)
            .is_some_and(|def| def.kind == LayerKind::Evidence)
    }

    /// Layer names in stable sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// Non-risk layer names in stable sorted order.
    pub fn evidence_names(&self) -> impl Iterator<Item = &str> {
        self.layers
            .values()
            .filter(|def| def.kind == LayerKind::Evidence)
            .map(|def| def.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
