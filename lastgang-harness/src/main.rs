use anyhow::Result;
use lastgang_client::{db::InMemoryStore, domain::render_series};
use lastgang_harness::{
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    scenario,
    sinks::RetryingSink,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;
    let descriptors = cfg.descriptors()?;
    let prefix = cfg.database.name_prefix.as_str();
    let retention_policy = cfg.database.retention_policy.as_str();

    let sink = RetryingSink::new(
        InMemoryStore::new(),
        cfg.sink.max_retries,
        Duration::from_millis(cfg.sink.retry_backoff_ms),
    );
    let pipeline = Pipeline::new(sink, cfg.sink.concurrency);
    let sink = &pipeline.sink;

    let version = scenario::ping(sink).await?;
    tracing::info!(version = %version, "ping");

    scenario::create_describe_delete(sink, prefix).await?;
    tracing::info!("create, describe and delete database");

    let res = scenario::write_point(sink, prefix, retention_policy).await?;
    tracing::info!(rows = res.row_count(), "write single point");
    tracing::debug!("\n{}", render_series(&res));

    let res = scenario::write_multiple_points(sink, prefix, retention_policy).await?;
    tracing::info!(rows = res.row_count(), "write batch of points");
    tracing::debug!("\n{}", render_series(&res));

    let mut rng = rand::thread_rng();
    let report = scenario::load_curve(
        &pipeline,
        &mut rng,
        prefix,
        cfg.generator.chunk_size,
        &descriptors,
    )
    .await?;
    tracing::info!(
        series = descriptors.len(),
        batches = report.written.batches,
        written = report.written.points,
        expected = report.expected,
        stored = report.stored,
        months = report.monthly.len(),
        "load curve round trip"
    );
    for ((year, month), rows) in &report.monthly {
        tracing::debug!(year, month, rows, "load curve month");
    }

    Ok(())
}
