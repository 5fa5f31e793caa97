// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the pipeline's external collaborators.
//!
//! Long-lived adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod analyzer;
pub mod sink;
pub mod storage;

pub use adapter::PluginAdapter;
pub use analyzer::AnalyzerAdapter;
pub use sink::ReportSink;
pub use storage::{KvStore, MessageSource, StorageAdapter};
