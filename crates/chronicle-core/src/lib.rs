// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chronicle chat report pipeline.
//!
//! This crate provides the error type, the domain types that flow between
//! the pipeline and its collaborators, and the adapter traits those
//! collaborators implement.

pub mod error;
pub mod service;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChronicleError;
pub use service::ServiceState;
pub use types::{
    AdapterType, Analysis, AnalysisInput, AnalysisMode, ChatStats, GroupId, HealthStatus,
    Message, Participant, Quote, Report, TokenUsage, Topic, UserActivity, UserTitle,
};

pub use traits::{
    AnalyzerAdapter, KvStore, MessageSource, PluginAdapter, ReportSink, StorageAdapter,
};
