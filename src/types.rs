//! Configuration and error types for the matching engine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dist::DistType;
use crate::mat::{ElemType, MatError};

/// Configuration for a [`BruteForceMatcher`](crate::BruteForceMatcher)
/// instance.
///
/// Cheap to clone and serde-friendly so it can be embedded in higher-level
/// configs or loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Configuration schema version.
    #[serde(default = "MatcherConfig::default_version")]
    pub version: String,
    /// Whether row-level work may run on the rayon pool. Ignored when the
    /// crate is built without the `parallel` feature.
    #[serde(default = "MatcherConfig::default_use_parallel")]
    pub use_parallel: bool,
    /// Minimum query count before the parallel path is taken. Below this,
    /// pool scheduling costs more than it saves.
    #[serde(default = "MatcherConfig::default_min_parallel_queries")]
    pub min_parallel_queries: usize,
}

impl MatcherConfig {
    pub(crate) fn default_version() -> String {
        "v1".to_string()
    }

    pub(crate) fn default_use_parallel() -> bool {
        true
    }

    pub(crate) fn default_min_parallel_queries() -> usize {
        32
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn with_min_parallel_queries(mut self, min: usize) -> Self {
        self.min_parallel_queries = min;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.version.trim().is_empty() {
            return Err(MatchError::InvalidConfig(
                "config.version must not be empty".into(),
            ));
        }
        if self.min_parallel_queries == 0 {
            return Err(MatchError::InvalidConfig(
                "min_parallel_queries must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON document on disk and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let cfg: MatcherConfig = serde_json::from_str(&text)?;
        cfg.validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(cfg)
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            use_parallel: Self::default_use_parallel(),
            min_parallel_queries: Self::default_min_parallel_queries(),
        }
    }
}

/// Errors that can occur when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Errors produced by the matching engine.
///
/// These are what the engine raises for contract violations; the C export
/// layer above it performs no validation of its own and treats any of these
/// as fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// Invalid matcher configuration.
    #[error("invalid matcher config: {0}")]
    InvalidConfig(String),
    /// `k` must be at least 1.
    #[error("k must be at least 1, got {0}")]
    InvalidK(usize),
    /// Descriptor element type does not fit the configured metric.
    #[error("{dist_type:?} matching requires {expected:?} descriptors, got {actual:?}")]
    DescriptorType {
        dist_type: DistType,
        expected: ElemType,
        actual: ElemType,
    },
    /// Descriptor matrices must have at least one column.
    #[error("descriptor matrices must have at least one column")]
    EmptyDescriptors,
    /// Query and train descriptor widths disagree.
    #[error("query descriptors have {query} columns, train descriptors have {train}")]
    DimensionMismatch { query: usize, train: usize },
    /// Mask shape or element type does not match the descriptor sets.
    #[error("mask must be a {rows}x{cols} u8 matrix, got {actual_rows}x{actual_cols} {actual_elem:?}")]
    MaskShape {
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
        actual_elem: ElemType,
    },
    /// Matrix access failed.
    #[error("matrix error: {0}")]
    Mat(#[from] MatError),
}
