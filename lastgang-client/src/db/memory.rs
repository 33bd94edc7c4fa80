use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard},
};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{
    db::{SinkError, StorageSink},
    domain::{Batch, FieldValue, QueryResult, Series, StatementResult},
};

type Tags = BTreeMap<String, String>;
type Fields = BTreeMap<String, FieldValue>;

/// measurement + tag set -> rows keyed by timestamp.
type SeriesMap = BTreeMap<(String, Tags), BTreeMap<OffsetDateTime, Fields>>;

const VERSION: &str = "in-memory-1";

/// Process-local store for tests and dry runs.
///
/// Points sharing measurement, tag set and timestamp are merged field by
/// field, later writes winning. Only `SELECT * FROM <measurement>` with an
/// optional `GROUP BY *` is understood.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    databases: Mutex<BTreeMap<String, SeriesMap>>,
}

/// A parsed `SELECT * FROM m [GROUP BY *]`.
#[derive(Debug, PartialEq, Eq)]
struct SelectAll {
    measurement: String,
    group_by_tags: bool,
}

fn parse_select_all(statement: &str) -> Option<SelectAll> {
    let tokens: Vec<&str> = statement.trim().trim_end_matches(';').split_whitespace().collect();
    let keyword = |idx: usize, kw: &str| tokens.get(idx).is_some_and(|t| t.eq_ignore_ascii_case(kw));

    if !(keyword(0, "select") && tokens.get(1) == Some(&"*") && keyword(2, "from")) {
        return None;
    }
    let measurement = tokens.get(3)?.trim_matches('"').to_string();
    if measurement.is_empty() {
        return None;
    }

    let group_by_tags = match tokens.len() {
        4 => false,
        7 if keyword(4, "group") && keyword(5, "by") && tokens[6] == "*" => true,
        _ => return None,
    };

    Some(SelectAll {
        measurement,
        group_by_tags,
    })
}

fn format_time(ts: OffsetDateTime) -> serde_json::Value {
    ts.format(&Rfc3339)
        .map(serde_json::Value::String)
        .unwrap_or(serde_json::Value::Null)
}

fn field_columns<'a>(rows: impl Iterator<Item = &'a Fields>) -> Vec<String> {
    let keys: BTreeSet<&String> = rows.flat_map(|f| f.keys()).collect();
    keys.into_iter().cloned().collect()
}

fn row(ts: OffsetDateTime, tag_values: Vec<serde_json::Value>, fields: &Fields, columns: &[String]) -> Vec<serde_json::Value> {
    let mut out = Vec::with_capacity(1 + tag_values.len() + columns.len());
    out.push(format_time(ts));
    out.extend(tag_values);
    out.extend(
        columns
            .iter()
            .map(|c| fields.get(c).map(FieldValue::to_json).unwrap_or(serde_json::Value::Null)),
    );
    out
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, SeriesMap>>, SinkError> {
        self.databases
            .lock()
            .map_err(|_| SinkError::Unavailable("in-memory store lock poisoned".to_string()))
    }

    fn grouped_series(series: &SeriesMap, measurement: &str) -> Vec<Series> {
        series
            .iter()
            .filter(|((m, _), _)| m == measurement)
            .map(|((m, tags), rows)| {
                let fields = field_columns(rows.values());
                let mut columns = vec!["time".to_string()];
                columns.extend(fields.iter().cloned());

                Series {
                    name: m.clone(),
                    tags: tags.clone(),
                    columns,
                    values: rows
                        .iter()
                        .map(|(ts, f)| row(*ts, Vec::new(), f, &fields))
                        .collect(),
                }
            })
            .collect()
    }

    fn flat_series(series: &SeriesMap, measurement: &str) -> Vec<Series> {
        let matching: Vec<_> = series.iter().filter(|((m, _), _)| m == measurement).collect();
        if matching.is_empty() {
            return Vec::new();
        }

        let mut tag_keys: BTreeSet<String> = BTreeSet::new();
        for ((_, tags), _) in &matching {
            tag_keys.extend(tags.keys().cloned());
        }
        let tag_keys: Vec<String> = tag_keys.into_iter().collect();
        let fields = field_columns(matching.iter().flat_map(|&(_, rows)| rows.values()));

        let mut rows: Vec<(OffsetDateTime, Vec<serde_json::Value>)> = Vec::new();
        for ((_, tags), series_rows) in &matching {
            for (ts, f) in series_rows.iter() {
                let tag_values = tag_keys
                    .iter()
                    .map(|k| {
                        tags.get(k)
                            .map(|v| serde_json::Value::String(v.clone()))
                            .unwrap_or(serde_json::Value::Null)
                    })
                    .collect();
                rows.push((*ts, row(*ts, tag_values, f, &fields)));
            }
        }
        rows.sort_by_key(|(ts, _)| *ts);

        let mut columns = vec!["time".to_string()];
        columns.extend(tag_keys);
        columns.extend(fields);

        vec![Series {
            name: measurement.to_string(),
            tags: BTreeMap::new(),
            columns,
            values: rows.into_iter().map(|(_, r)| r).collect(),
        }]
    }
}

#[async_trait::async_trait]
impl StorageSink for InMemoryStore {
    async fn ping(&self) -> Result<String, SinkError> {
        Ok(VERSION.to_string())
    }

    async fn create_database(&self, name: &str) -> Result<(), SinkError> {
        self.lock()?.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_database(&self, name: &str) -> Result<(), SinkError> {
        self.lock()?.remove(name);
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    async fn write(&self, batch: &Batch) -> Result<(), SinkError> {
        if let Some(p) = batch.points.iter().find(|p| p.fields.is_empty()) {
            return Err(SinkError::InvalidPoint(format!(
                "point in measurement '{}' has no fields",
                p.measurement
            )));
        }

        let mut dbs = self.lock()?;
        let series = dbs
            .get_mut(&batch.database)
            .ok_or_else(|| SinkError::DatabaseNotFound(batch.database.clone()))?;

        let received_at = OffsetDateTime::now_utc();
        for p in &batch.points {
            let key = (p.measurement.clone(), batch.effective_tags(p));
            let ts = p.timestamp.unwrap_or(received_at);
            series
                .entry(key)
                .or_default()
                .entry(ts)
                .or_default()
                .extend(p.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Ok(())
    }

    async fn query(&self, statement: &str, database: &str) -> Result<QueryResult, SinkError> {
        let select = parse_select_all(statement)
            .ok_or_else(|| SinkError::UnsupportedQuery(statement.to_string()))?;

        let dbs = self.lock()?;
        let series = dbs
            .get(database)
            .ok_or_else(|| SinkError::DatabaseNotFound(database.to_string()))?;

        let found = if select.group_by_tags {
            Self::grouped_series(series, &select.measurement)
        } else {
            Self::flat_series(series, &select.measurement)
        };

        Ok(QueryResult {
            results: vec![StatementResult {
                series: found,
                error: None,
            }],
        })
    }
}
