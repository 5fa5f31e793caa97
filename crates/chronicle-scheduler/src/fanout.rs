// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-concurrency fan-out with per-item failure isolation.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::{FutureExt, StreamExt, stream};
use tracing::error;

use chronicle_core::ChronicleError;

/// Run `handler` for every item with at most `limit` invocations outstanding.
///
/// Returns one result per item, in input order, after every item has
/// finished. An error or panic in one handler is captured in that item's
/// slot and never cancels the others. A `limit` of zero is treated as one.
pub async fn run_with_concurrency<I, T, F, Fut>(
    items: Vec<I>,
    limit: usize,
    handler: F,
) -> Vec<Result<T, ChronicleError>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, ChronicleError>>,
{
    let total = items.len();
    let mut results: Vec<(usize, Result<T, ChronicleError>)> =
        stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| {
                let fut = handler(item);
                async move {
                    let result = match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(result) => result,
                        Err(panic) => {
                            let message = panic_message(panic.as_ref());
                            error!(index, panic = message.as_str(), "fan-out handler panicked");
                            Err(ChronicleError::Internal(format!("handler panicked: {message}")))
                        }
                    };
                    (index, result)
                }
            })
            .buffer_unordered(limit.max(1))
            .collect()
            .await;

    debug_assert_eq!(results.len(), total);
    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, result)| result).collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
