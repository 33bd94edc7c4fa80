use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response to a query, one entry per statement.
///
/// Mirrors the JSON body of an InfluxDB 1.x `/query` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub results: Vec<StatementResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Rows for one measurement and one tag combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.results.iter().flat_map(|r| r.series.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.series().next().is_none()
    }

    pub fn row_count(&self) -> usize {
        self.series().map(|s| s.values.len()).sum()
    }
}

/// Render every series as a `name:` / `tags:` / `values:` listing.
pub fn render_series(result: &QueryResult) -> String {
    let mut out = String::new();
    for s in result.series() {
        out.push_str(&format!("name:{}\n", s.name));

        out.push_str("tags:\n");
        for (k, v) in &s.tags {
            out.push_str(&format!("  {k}:{v}\n"));
        }

        out.push_str("values:\n");
        for row in &s.values {
            for (column, value) in s.columns.iter().zip(row) {
                out.push_str(&format!("  {column}:{value}\n"));
            }
        }
    }
    out
}
