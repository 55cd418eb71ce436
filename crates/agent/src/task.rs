//! Panic-isolated task fan-out.
//!
//! Every background unit of work runs in its own tokio task so a panic in
//! one probe never takes down a discovery run: the panicking slot is left
//! empty and the rest of the results survive.

use std::future::Future;

use tracing::error;

/// Fire-and-forget background task. Panics are logged and swallowed.
pub fn spawn_safe<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!("Background task failed with panic: {}", e);
            }
        }
    });
}

/// Run all futures concurrently and join them, preserving input order.
/// A panicking task yields `None` in its slot.
pub async fn join_all_safe<F, T>(futures: Vec<F>) -> Vec<Option<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(value) => results.push(Some(value)),
            Err(e) => {
                error!("Task failed with panic: {}", e);
                results.push(None);
            }
        }
    }
    results
}
