use futures::StreamExt;
use lastgang_client::{
    db::{SinkError, StorageSink},
    domain::{Batch, SeriesDescriptor},
};
use rand::Rng;

use crate::{
    generator::{self, GeneratorError},
    transform::{validate_descriptor, ValidationError},
};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("generate error: {0}")]
    Generate(#[from] GeneratorError),
    #[error("validation error: {0}")]
    Validate(#[from] ValidationError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub batches: usize,
    pub points: usize,
}

/// Validates descriptors, generates their load curves and writes the
/// batches to a sink, at most `concurrency` writes in flight.
pub struct Pipeline<K> {
    pub sink: K,
    concurrency: usize,
}

impl<K> Pipeline<K>
where
    K: StorageSink,
{
    pub fn new(sink: K, concurrency: usize) -> Self {
        Self {
            sink,
            concurrency: concurrency.max(1),
        }
    }

    /// Write every batch; the first failed batch fails the whole run.
    pub async fn write_all(&self, batches: &[Batch]) -> Result<WriteReport, PipelineError> {
        let mut writes = futures::stream::iter(batches)
            .map(|b| async move { self.sink.write(b).await.map(|()| b.len()) })
            .buffer_unordered(self.concurrency);

        let mut report = WriteReport::default();
        while let Some(res) = writes.next().await {
            let points = res?;
            report.batches += 1;
            report.points += points;

            metrics::counter!("lastgang_written_batches_total").increment(1);
            metrics::counter!("lastgang_written_points_total").increment(points as u64);
        }

        tracing::debug!(batches = report.batches, points = report.points, "batches written");
        Ok(report)
    }

    pub async fn run<R>(
        &self,
        rng: &mut R,
        database: &str,
        chunk_size: Option<usize>,
        descriptors: &[SeriesDescriptor],
    ) -> Result<WriteReport, PipelineError>
    where
        R: Rng + ?Sized,
    {
        for d in descriptors {
            validate_descriptor(d)?;
            if d.range_end < d.range_start {
                tracing::warn!(
                    identifier = %d.identifier,
                    start = %d.range_start,
                    end = %d.range_end,
                    "series range ends before it starts, nothing to generate"
                );
            }
        }

        let batches = generator::generate(rng, database, chunk_size, descriptors)?;
        self.write_all(&batches).await
    }
}
