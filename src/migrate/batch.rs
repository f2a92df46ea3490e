//! Generic chunked batch processing
//!
//! Chunks bound memory and transaction-log growth when tens of thousands
//! of rows are processed inside one transaction; they are not a commit
//! boundary. Chunks run strictly sequentially, in input order, because
//! the surrounding transaction is not safe for concurrent writers and
//! later entities depend on mappings written by earlier ones.

use std::ops::AddAssign;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::errors::MigrationError;

/// Per-chunk outcome, accumulated across a whole entity pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub migrated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl AddAssign for BatchStats {
    fn add_assign(&mut self, other: Self) {
        self.migrated += other.migrated;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

impl BatchStats {
    pub fn migrated(count: usize) -> Self {
        Self {
            migrated: count,
            ..Default::default()
        }
    }
}

pub struct BatchProcessor {
    batch_size: usize,
    base_delay: Duration,
}

impl BatchProcessor {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            base_delay: Duration::from_millis(1000),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Run `handler` over fixed-size chunks of `items`, sequentially and
    /// in input order, threading `state` (typically the open transaction
    /// plus the id mapping directory) through every call.
    pub async fn process<T, S, F>(
        &self,
        items: &[T],
        state: &mut S,
        mut handler: F,
    ) -> Result<BatchStats, MigrationError>
    where
        F: for<'a> FnMut(&'a mut S, &'a [T], usize) -> BoxFuture<'a, Result<BatchStats, MigrationError>>,
    {
        let total_batches = items.len().div_ceil(self.batch_size);
        let mut totals = BatchStats::default();
        let mut processed = 0usize;

        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            debug!("Processing batch {}/{}", index + 1, total_batches);
            totals += handler(state, chunk, index).await?;
            processed += chunk.len();
            if total_batches > 1 {
                info!("  progress: {}/{}", processed, items.len());
            }
        }

        Ok(totals)
    }

    /// Like [`process`](Self::process), but each chunk gets up to
    /// `max_retries` attempts with linearly increasing backoff. A chunk
    /// that exhausts its budget aborts the whole run.
    pub async fn process_with_retry<T, S, F>(
        &self,
        items: &[T],
        state: &mut S,
        mut handler: F,
        max_retries: u32,
    ) -> Result<BatchStats, MigrationError>
    where
        F: for<'a> FnMut(&'a mut S, &'a [T], usize) -> BoxFuture<'a, Result<BatchStats, MigrationError>>,
    {
        let total_batches = items.len().div_ceil(self.batch_size);
        let mut totals = BatchStats::default();
        let mut processed = 0usize;

        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            let mut attempt = 1u32;
            loop {
                debug!(
                    "Processing batch {}/{} (attempt {})",
                    index + 1,
                    total_batches,
                    attempt
                );
                match handler(state, chunk, index).await {
                    Ok(stats) => {
                        totals += stats;
                        break;
                    }
                    Err(error) if attempt >= max_retries.max(1) => {
                        return Err(MigrationError::BatchExhausted {
                            batch: index,
                            attempts: attempt,
                            message: error.to_string(),
                        });
                    }
                    Err(error) => {
                        warn!(
                            "Batch {} failed on attempt {}: {}, retrying",
                            index + 1,
                            attempt,
                            error
                        );
                        tokio::time::sleep(self.base_delay * attempt).await;
                        attempt += 1;
                    }
                }
            }
            processed += chunk.len();
            if total_batches > 1 {
                info!("  progress: {}/{}", processed, items.len());
            }
        }

        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_preserve_size_and_order() {
        let processor = BatchProcessor::new(3);
        let items: Vec<i32> = (0..8).collect();
        let mut seen: Vec<Vec<i32>> = Vec::new();

        let totals = processor
            .process(&items, &mut seen, |seen, chunk, _| {
                Box::pin(async move {
                    seen.push(chunk.to_vec());
                    Ok(BatchStats::migrated(chunk.len()))
                })
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7]]);
        assert_eq!(totals.migrated, 8);
    }

    #[tokio::test]
    async fn stats_accumulate_across_chunks() {
        let processor = BatchProcessor::new(2);
        let items = [1, 2, 3, 4];
        let mut state = ();

        let totals = processor
            .process(&items, &mut state, |_, chunk, _| {
                let len = chunk.len();
                Box::pin(async move {
                    Ok(BatchStats {
                        migrated: len - 1,
                        skipped: 1,
                        errors: 0,
                    })
                })
            })
            .await
            .unwrap();

        assert_eq!(totals.migrated, 2);
        assert_eq!(totals.skipped, 2);
    }

    #[tokio::test]
    async fn retry_policy_is_taken_from_config() {
        let config = crate::config::Config::default();
        let processor = BatchProcessor::new(config.migration.client_batch_size)
            .with_base_delay(Duration::from_millis(config.migration.retry_base_delay_ms.min(1)));
        let items = [1, 2];
        let mut failures_left = 1u32;

        let totals = processor
            .process_with_retry(
                &items,
                &mut failures_left,
                |failures_left, chunk, _| {
                    let len = chunk.len();
                    Box::pin(async move {
                        if *failures_left > 0 {
                            *failures_left -= 1;
                            return Err(MigrationError::configuration("transient"));
                        }
                        Ok(BatchStats::migrated(len))
                    })
                },
                config.migration.max_retries,
            )
            .await
            .unwrap();

        assert_eq!(totals.migrated, 2);
    }

    #[tokio::test]
    async fn retry_recovers_from_transient_failures() {
        let processor =
            BatchProcessor::new(10).with_base_delay(Duration::from_millis(1));
        let items = [1, 2, 3];
        let mut failures_left = 2u32;

        let totals = processor
            .process_with_retry(
                &items,
                &mut failures_left,
                |failures_left, chunk, _| {
                    let len = chunk.len();
                    Box::pin(async move {
                        if *failures_left > 0 {
                            *failures_left -= 1;
                            return Err(MigrationError::configuration("transient"));
                        }
                        Ok(BatchStats::migrated(len))
                    })
                },
                3,
            )
            .await
            .unwrap();

        assert_eq!(totals.migrated, 3);
        assert_eq!(failures_left, 0);
    }

    #[tokio::test]
    async fn exhausted_retries_abort_with_batch_index() {
        let processor =
            BatchProcessor::new(2).with_base_delay(Duration::from_millis(1));
        let items = [1, 2, 3, 4];
        let mut state = ();

        let err = processor
            .process_with_retry(
                &items,
                &mut state,
                |_, chunk, index| {
                    let fail = index == 1;
                    let len = chunk.len();
                    Box::pin(async move {
                        if fail {
                            Err(MigrationError::configuration("broken chunk"))
                        } else {
                            Ok(BatchStats::migrated(len))
                        }
                    })
                },
                2,
            )
            .await
            .unwrap_err();

        match err {
            MigrationError::BatchExhausted { batch, attempts, .. } => {
                assert_eq!(batch, 1);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected BatchExhausted, got {other}"),
        }
    }
}
