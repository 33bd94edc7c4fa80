use std::time::{Duration, Instant};

use lastgang_client::{
    db::{SinkError, StorageSink},
    domain::{Batch, QueryResult},
};

/// Retries failed batch writes with linear backoff.
///
/// Only `write` is retried; every other call is passed through unchanged.
pub struct RetryingSink<S> {
    inner: S,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<S> RetryingSink<S> {
    pub fn new(inner: S, max_retries: u32, retry_backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            retry_backoff,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn is_retryable(e: &SinkError) -> bool {
    matches!(e, SinkError::Unavailable(_))
}

#[async_trait::async_trait]
impl<S> StorageSink for RetryingSink<S>
where
    S: StorageSink,
{
    async fn ping(&self) -> Result<String, SinkError> {
        self.inner.ping().await
    }

    async fn create_database(&self, name: &str) -> Result<(), SinkError> {
        self.inner.create_database(name).await
    }

    async fn delete_database(&self, name: &str) -> Result<(), SinkError> {
        self.inner.delete_database(name).await
    }

    async fn list_databases(&self) -> Result<Vec<String>, SinkError> {
        self.inner.list_databases().await
    }

    async fn write(&self, batch: &Batch) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            match self.inner.write(batch).await {
                Ok(()) => {
                    metrics::histogram!("lastgang_batch_write_seconds")
                        .record(started.elapsed().as_secs_f64());
                    return Ok(());
                }
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        database = %batch.database,
                        "batch write failed, retrying with backoff"
                    );
                    metrics::counter!("lastgang_sink_retry_total").increment(1);
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt, "batch write failed, giving up");
                    metrics::counter!("lastgang_sink_errors_total").increment(1);
                    return Err(e);
                }
            }
        }
    }

    async fn query(&self, statement: &str, database: &str) -> Result<QueryResult, SinkError> {
        self.inner.query(statement, database).await
    }
}
