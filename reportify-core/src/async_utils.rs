//! Async utilities
//!
//! Bounded-parallelism helper used by the orchestrator's fan-out step.

use crate::error::{ReportError, ReportResult};

/// Run `processor` over `items` with at most `max_concurrent` tasks in
/// flight. Results come back in completion order; callers that need a stable
/// order must restore it themselves.
pub async fn process_concurrently<T, R, F, Fut>(
    items: Vec<T>,
    max_concurrent: usize,
    processor: F,
) -> Vec<ReportResult<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: std::future::Future<Output = ReportResult<R>> + Send + 'static,
{
    use futures::stream::{self, StreamExt};

    stream::iter(items)
        .map(|item| {
            let processor = processor.clone();
            tokio::spawn(async move { processor(item).await })
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|join_result| match join_result {
            Ok(result) => result,
            Err(join_error) => Err(ReportError::internal(format!(
                "Task join error: {}",
                join_error
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn processes_every_item() {
        let results = process_concurrently(vec![1u32, 2, 3, 4], 2, |n| async move {
            Ok::<_, ReportError>(n * 10)
        })
        .await;

        let mut values: Vec<u32> = results.into_iter().map(|r| r.unwrap()).collect();
        values.sort_unstable();
        assert_eq!(values, vec![10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn failures_stay_per_item() {
        let results = process_concurrently(vec![1u32, 2], 2, |n| async move {
            if n == 1 {
                Err(ReportError::internal("boom"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }
}
