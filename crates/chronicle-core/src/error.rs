// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chronicle report pipeline.

use thiserror::Error;

/// The primary error type used across all Chronicle adapter traits and pipeline operations.
#[derive(Debug, Error)]
pub enum ChronicleError {
    /// Configuration errors (invalid values detected after loading).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Analysis collaborator errors (process failure, malformed output, rate limiting).
    #[error("analyzer error: {message}")]
    Analyzer {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A persisted record could not be encoded or decoded.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// A required service is disabled or failed to start.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChronicleError {
    /// Shorthand for an analyzer error without an underlying source.
    pub fn analyzer(message: impl Into<String>) -> Self {
        Self::Analyzer {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` for errors that a retry might resolve.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Analyzer { .. } | Self::Timeout { .. })
    }
}
