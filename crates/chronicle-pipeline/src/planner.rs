// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch planning: how a day's messages split into cached batches and a remainder.

use std::ops::Range;

/// Split of `total` messages into complete batches plus a trailing remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub total: usize,
    pub batch_size: usize,
    pub completed_batches: usize,
    pub remainder: usize,
}

/// Plan `total` messages into batches of `batch_size`. A zero size is treated as one.
pub fn plan_batches(total: usize, batch_size: usize) -> BatchPlan {
    let batch_size = batch_size.max(1);
    BatchPlan {
        total,
        batch_size,
        completed_batches: total / batch_size,
        remainder: total % batch_size,
    }
}

impl BatchPlan {
    /// `false` when the whole day fits in one analysis pass.
    pub fn needs_batching(&self) -> bool {
        self.total > self.batch_size
    }

    /// Message indices covered by batch `index`.
    pub fn batch_range(&self, index: usize) -> Range<usize> {
        let start = index * self.batch_size;
        start..start + self.batch_size
    }

    /// Message indices after the last complete batch.
    pub fn remainder_range(&self) -> Range<usize> {
        self.completed_batches * self.batch_size..self.total
    }
}

/// The `overlap` indices immediately before `start`.
pub fn context_range(start: usize, overlap: usize) -> Range<usize> {
    start.saturating_sub(overlap)..start
}
