use std::future::Future;

use futures::future::join_all;

/// Runs `op` over `items` in consecutive chunks of `batch_size`, waiting for
/// a whole chunk before starting the next. Results come back in input order.
/// Failures are the caller's to contain inside `op`.
pub async fn process_in_batches<T, R, F, Fut>(items: Vec<T>, batch_size: usize, op: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut items = items.into_iter().peekable();

    while items.peek().is_some() {
        let chunk: Vec<T> = items.by_ref().take(batch_size).collect();
        results.extend(join_all(chunk.into_iter().map(&op)).await);
    }

    results
}
