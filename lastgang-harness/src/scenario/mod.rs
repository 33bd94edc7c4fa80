//! End-to-end exercises of a store: ping, database lifecycle, single and
//! batched writes, and a full load-curve round trip.
//!
//! Every scenario works in its own freshly created database and drops it
//! again, whether or not the scenario succeeded.

use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

use lastgang_client::{
    db::{SinkError, StorageSink},
    domain::{Batch, Point, QueryResult, SeriesDescriptor},
};
use rand::Rng;

use crate::{
    generator::{MEASUREMENT, TAG_MONTH, TAG_YEAR},
    pipeline::{Pipeline, PipelineError, WriteReport},
    transform::expected_point_count,
};

#[derive(thiserror::Error, Debug)]
pub enum ScenarioError {
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("check failed: {0}")]
    Check(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCurveReport {
    pub written: WriteReport,
    pub expected: usize,
    pub stored: usize,
    /// Stored rows per (year, month), read back from the tags of each series.
    pub monthly: BTreeMap<(i32, u8), usize>,
}

impl LoadCurveReport {
    pub fn is_complete(&self) -> bool {
        self.stored == self.expected
    }
}

/// `<prefix><unix millis>`.
pub fn unique_database_name(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{prefix}{millis}")
}

fn cpu_point() -> Point {
    Point::measurement("cpu")
        .tag("atag", "test")
        .field("idle", 90_i64)
        .field("usertime", 9_i64)
        .field("system", 1_i64)
        .build()
}

fn disk_point() -> Point {
    Point::measurement("disk")
        .tag("atag", "test")
        .field("used", 80_i64)
        .field("free", 1_i64)
        .build()
}

async fn database_exists<S>(sink: &S, name: &str) -> Result<bool, SinkError>
where
    S: StorageSink + ?Sized,
{
    Ok(sink.list_databases().await?.iter().any(|d| d == name))
}

pub async fn ping<S>(sink: &S) -> Result<String, ScenarioError>
where
    S: StorageSink + ?Sized,
{
    let version = sink.ping().await?;
    if version.is_empty() || version == "unknown" {
        return Err(ScenarioError::Check(format!("unexpected server version '{version}'")));
    }
    Ok(version)
}

pub async fn create_describe_delete<S>(sink: &S, prefix: &str) -> Result<(), ScenarioError>
where
    S: StorageSink + ?Sized,
{
    let db = unique_database_name(prefix);

    sink.create_database(&db).await?;
    let found_after_create = database_exists(sink, &db).await;
    sink.delete_database(&db).await?;
    let found_after_create = found_after_create?;
    let found_after_delete = database_exists(sink, &db).await?;

    if !found_after_create {
        return Err(ScenarioError::Check(format!("database {db} missing after create")));
    }
    if found_after_delete {
        return Err(ScenarioError::Check(format!("database {db} still listed after delete")));
    }
    Ok(())
}

async fn write_and_select_cpu<S>(sink: &S, batch: &Batch) -> Result<QueryResult, ScenarioError>
where
    S: StorageSink + ?Sized,
{
    sink.write(batch).await?;
    let res = sink.query("SELECT * FROM cpu GROUP BY *", &batch.database).await?;
    if res.is_empty() {
        return Err(ScenarioError::Check("no cpu series after write".to_string()));
    }
    Ok(res)
}

pub async fn write_point<S>(sink: &S, prefix: &str, retention_policy: &str) -> Result<QueryResult, ScenarioError>
where
    S: StorageSink + ?Sized,
{
    let db = unique_database_name(prefix);
    sink.create_database(&db).await?;

    let batch = Batch::new(db.as_str())
        .retention_policy(retention_policy)
        .point(cpu_point());
    let res = write_and_select_cpu(sink, &batch).await;

    sink.delete_database(&db).await?;
    res
}

pub async fn write_multiple_points<S>(
    sink: &S,
    prefix: &str,
    retention_policy: &str,
) -> Result<QueryResult, ScenarioError>
where
    S: StorageSink + ?Sized,
{
    let db = unique_database_name(prefix);
    sink.create_database(&db).await?;

    let batch = Batch::new(db.as_str())
        .tag("async", "true")
        .retention_policy(retention_policy)
        .point(cpu_point())
        .point(disk_point());
    let res = write_and_select_cpu(sink, &batch).await;

    sink.delete_database(&db).await?;
    res
}

async fn generate_and_count<K, R>(
    pipeline: &Pipeline<K>,
    rng: &mut R,
    db: &str,
    chunk_size: Option<usize>,
    descriptors: &[SeriesDescriptor],
) -> Result<LoadCurveReport, ScenarioError>
where
    K: StorageSink,
    R: Rng + ?Sized,
{
    let written = pipeline.run(rng, db, chunk_size, descriptors).await?;
    let res = pipeline
        .sink
        .query(&format!("SELECT * FROM {MEASUREMENT} GROUP BY *"), db)
        .await?;
    let expected = descriptors.iter().map(expected_point_count).sum();

    Ok(LoadCurveReport {
        written,
        expected,
        stored: res.row_count(),
        monthly: rows_per_month(&res)?,
    })
}

fn rows_per_month(res: &QueryResult) -> Result<BTreeMap<(i32, u8), usize>, ScenarioError> {
    let mut monthly = BTreeMap::new();
    for s in res.series() {
        let tag = |key: &str| {
            s.tags
                .get(key)
                .ok_or_else(|| ScenarioError::Check(format!("series {} lacks tag '{key}'", s.name)))
        };
        let year = tag(TAG_YEAR)?;
        let month = tag(TAG_MONTH)?;
        let year: i32 = year
            .parse()
            .map_err(|_| ScenarioError::Check(format!("bad year tag '{year}'")))?;
        let month: u8 = month
            .parse()
            .map_err(|_| ScenarioError::Check(format!("bad month tag '{month}'")))?;

        *monthly.entry((year, month)).or_insert(0) += s.values.len();
    }
    Ok(monthly)
}

/// Generate, write and read back the given load curves.
///
/// A stored row count differing from the closed-form grid size is logged
/// as a warning; it means the descriptors overlap or the write path lost
/// points.
pub async fn load_curve<K, R>(
    pipeline: &Pipeline<K>,
    rng: &mut R,
    prefix: &str,
    chunk_size: Option<usize>,
    descriptors: &[SeriesDescriptor],
) -> Result<LoadCurveReport, ScenarioError>
where
    K: StorageSink,
    R: Rng + ?Sized,
{
    let db = unique_database_name(prefix);
    pipeline.sink.create_database(&db).await?;

    let res = generate_and_count(pipeline, rng, &db, chunk_size, descriptors).await;

    pipeline.sink.delete_database(&db).await?;

    let report = res?;
    if !report.is_complete() {
        tracing::warn!(
            expected = report.expected,
            stored = report.stored,
            written = report.written.points,
            "stored load curve differs from expected grid size"
        );
    }
    Ok(report)
}
