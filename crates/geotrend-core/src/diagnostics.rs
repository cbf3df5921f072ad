// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Diagnostics schema version for engine run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from one engine run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunDiagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub as_of_year: i32,
    pub geographies_seen: usize,
    pub feature_records_emitted: usize,
    pub layer_scores_emitted: usize,
    pub classifications_emitted: usize,
    /// Geographies that hit the contained-failure fallback path.
    pub geographies_degraded: usize,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl RunDiagnostics {
    pub fn for_year(as_of_year: i32) -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            as_of_year,
            geographies_seen: 0,
            feature_records_emitted: 0,
            layer_scores_emitted: 0,
            classifications_emitted: 0,
            geographies_degraded: 0,
            notes: vec![],
            warnings: vec![],
        }
    }
}
