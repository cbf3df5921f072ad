// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Typed error for the scoring engine.
///
/// Missing data is never an error: sparse inputs flow through nullable record
/// fields. Errors are reserved for malformed inputs, unknown layer names, and
/// invalid configuration, which are fatal at the point they are detected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    /// Configuration rejected at pipeline start; fatal for the whole run.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A layer name with no registered definition; fatal at the point of use.
    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    /// Malformed observation input (duplicate key, non-finite value, bad shape).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ScoreError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn unknown_layer(msg: impl Into<String>) -> Self {
        Self::UnknownLayer(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
