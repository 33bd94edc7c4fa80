use anyhow::Context;
use lastgang_client::domain::{parse_instant, SeriesDescriptor, DEFAULT_RETENTION_POLICY};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Scenario databases are named `<name_prefix><unix millis>`.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    #[serde(default = "default_retention_policy")]
    pub retention_policy: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratorConfig {
    /// Unset writes every generated point in one batch.
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesConfig {
    pub identifier: String,
    pub commodity: String,
    pub method: String,
    /// RFC 3339 or `dd.MM.yyyy HH:mm` (UTC).
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
}

fn default_name_prefix() -> String {
    "lastgang".to_string()
}

fn default_retention_policy() -> String {
    DEFAULT_RETENTION_POLICY.to_string()
}

fn default_concurrency() -> usize {
    4
}

impl SeriesConfig {
    pub fn to_descriptor(&self) -> anyhow::Result<SeriesDescriptor> {
        let start = parse_instant(&self.start)
            .with_context(|| format!("series '{}': start", self.identifier))?;
        let end = parse_instant(&self.end)
            .with_context(|| format!("series '{}': end", self.identifier))?;
        Ok(SeriesDescriptor::new(
            self.identifier.as_str(),
            self.commodity.as_str(),
            self.method.as_str(),
            start,
            end,
        ))
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("LASTGANG_CONFIG").unwrap_or_else(|_| "lastgang.toml".to_string());
        let contents =
            fs::read_to_string(&path).with_context(|| format!("failed to read config file {path}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.generator.chunk_size == Some(0) {
            anyhow::bail!("generator.chunk_size must be positive");
        }
        Ok(cfg)
    }

    pub fn descriptors(&self) -> anyhow::Result<Vec<SeriesDescriptor>> {
        self.series.iter().map(SeriesConfig::to_descriptor).collect()
    }
}
