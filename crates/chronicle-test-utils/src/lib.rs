// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Chronicle integration tests.
//!
//! Provides mock adapters (analyzer, key-value store, message source, sink)
//! and message fixtures so pipeline tests run without SQLite or an external
//! analysis program.

pub mod fixtures;
pub mod memory;
pub mod mock_analyzer;

pub use fixtures::{day, make_messages, message};
pub use memory::{MemoryKvStore, MemoryMessageSource, RecordingSink};
pub use mock_analyzer::{AnalyzerCall, CallKind, MockAnalyzer};
