//! Worker configuration
//!
//! Loaded from a TOML file (every key optional, defaults below) and then
//! overridden by `HARVEST_*` environment variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harvest_sparql::RequestContext;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to do with the remaining batches once one batch exhausts its attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Insert every batch; record one failure at the end
    #[default]
    Continue,
    /// Stop issuing batches after the first exhausted one
    Abort,
}

/// Top-level worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Turtle shape profile
    pub shapes_path: PathBuf,
    /// Directory with `*.sparql` files overriding built-in queries
    pub query_overrides: Option<PathBuf>,
    /// Store access
    pub store: StoreConfig,
    /// Paging, batching and concurrency
    pub pipeline: PipelineConfig,
    /// Shared file storage
    pub storage: StorageConfig,
    /// IRI prefixes of generated resources
    pub prefixes: PrefixConfig,
    /// HTTP listener
    pub server: ServerConfig,
}

impl WorkerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Apply `HARVEST_*` overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `HARVEST_*` overrides from `lookup`
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("HARVEST_SHAPES_PATH") {
            self.shapes_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("HARVEST_QUERY_OVERRIDES") {
            self.query_overrides = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("HARVEST_SPARQL_ENDPOINT") {
            self.store.endpoint = v;
        }
        if let Some(v) = lookup("HARVEST_SPARQL_HIGH_LOAD_ENDPOINT") {
            self.store.high_load_endpoint = Some(v);
        }
        if let Some(v) = lookup("HARVEST_SHARE_PATH") {
            self.storage.share_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("HARVEST_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        let numeric = |key: &str| -> Result<Option<usize>, ConfigError> {
            lookup(key)
                .map(|value| {
                    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnv {
                        key: key.to_string(),
                        value,
                    })
                })
                .transpose()
        };
        if let Some(v) = numeric("HARVEST_PAGE_SIZE")? {
            self.pipeline.page_size = v;
        }
        if let Some(v) = numeric("HARVEST_BATCH_SIZE")? {
            self.pipeline.batch_size = v;
        }
        if let Some(v) = numeric("HARVEST_UNIT_PAGE_SIZE")? {
            self.pipeline.unit_page_size = v;
        }
        if let Some(v) = numeric("HARVEST_MAX_CONCURRENT_UNITS")? {
            self.pipeline.max_concurrent_units = v;
        }
        if let Some(v) = numeric("HARVEST_MAX_RETRY")? {
            self.pipeline.max_retry = v;
        }
        if let Some(value) = lookup("HARVEST_BATCH_FAILURE_POLICY") {
            self.pipeline.batch_failure_policy = match value.as_str() {
                "continue" => BatchFailurePolicy::Continue,
                "abort" => BatchFailurePolicy::Abort,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "HARVEST_BATCH_FAILURE_POLICY".into(),
                        value,
                    })
                }
            };
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pipeline;
        for (name, value) in [
            ("pipeline.page_size", p.page_size),
            ("pipeline.batch_size", p.batch_size),
            ("pipeline.unit_page_size", p.unit_page_size),
            ("pipeline.max_concurrent_units", p.max_concurrent_units),
            ("pipeline.insert_concurrency", p.insert_concurrency),
            ("pipeline.max_retry", p.max_retry),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// With shape profile path
    #[inline]
    #[must_use]
    pub fn with_shapes_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.shapes_path = path.into();
        self
    }

    /// With shared storage root
    #[inline]
    #[must_use]
    pub fn with_share_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.share_path = path.into();
        self
    }

    /// With pipeline settings
    #[inline]
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            shapes_path: PathBuf::from("/config/application-profile.ttl"),
            query_overrides: None,
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
            storage: StorageConfig::default(),
            prefixes: PrefixConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Triple store access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SPARQL endpoint for writes and small reads
    pub endpoint: String,
    /// Endpoint for paginated reads; `endpoint` when unset
    pub high_load_endpoint: Option<String>,
    /// Headers sent with every call
    pub headers: BTreeMap<String, String>,
    /// Form field carrying updates
    pub update_field: String,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl StoreConfig {
    /// Request context carrying the configured headers
    #[must_use]
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new().with_headers(self.headers.clone())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://database:8890/sparql".to_string(),
            high_load_endpoint: None,
            headers: BTreeMap::from([("mu-auth-sudo".to_string(), "true".to_string())]),
            update_field: "query".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 300,
        }
    }
}

/// Paging, batching and concurrency limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Triples per SELECT page
    pub page_size: usize,
    /// Triples per INSERT DATA batch
    pub batch_size: usize,
    /// Units fetched per fan-out page
    pub unit_page_size: usize,
    /// Units processed concurrently
    pub max_concurrent_units: usize,
    /// Pause between unit starts within a page, in milliseconds
    pub unit_start_delay_ms: u64,
    /// Batches inserted concurrently
    pub insert_concurrency: usize,
    /// Attempts per batch
    pub max_retry: usize,
    /// Pause between attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Behavior once a batch exhausts its attempts
    pub batch_failure_policy: BatchFailurePolicy,
}

impl PipelineConfig {
    /// Pause between unit starts
    #[inline]
    #[must_use]
    pub fn unit_start_delay(&self) -> Duration {
        Duration::from_millis(self.unit_start_delay_ms)
    }

    /// Pause between insert attempts
    #[inline]
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// With page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// With batch size
    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// With unit page size
    #[inline]
    #[must_use]
    pub fn with_unit_page_size(mut self, size: usize) -> Self {
        self.unit_page_size = size;
        self
    }

    /// With max concurrent units
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_units(mut self, max: usize) -> Self {
        self.max_concurrent_units = max;
        self
    }

    /// With max attempts per batch
    #[inline]
    #[must_use]
    pub fn with_max_retry(mut self, max: usize) -> Self {
        self.max_retry = max;
        self
    }

    /// With delay between attempts
    #[inline]
    #[must_use]
    pub fn with_retry_delay_ms(mut self, delay: u64) -> Self {
        self.retry_delay_ms = delay;
        self
    }

    /// With batch failure policy
    #[inline]
    #[must_use]
    pub fn with_batch_failure_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.batch_failure_policy = policy;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            batch_size: 100,
            unit_page_size: 100,
            max_concurrent_units: 8,
            unit_start_delay_ms: 0,
            insert_concurrency: 4,
            max_retry: 5,
            retry_delay_ms: 1000,
            batch_failure_policy: BatchFailurePolicy::Continue,
        }
    }
}

/// Shared file storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory behind `share://` IRIs
    pub share_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            share_path: PathBuf::from("/share"),
        }
    }
}

/// IRI prefixes of generated resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefixConfig {
    /// Data containers: `{prefix}{id}`
    pub data_container: String,
    /// Logical files: `{prefix}{id}`
    pub logical_file: String,
    /// Error records: `{prefix}{id}`
    pub error: String,
    /// Filtered graphs: `{prefix}/{task id}`
    pub filter_graph: String,
    /// Validation graphs: `{prefix}/{task id}`
    pub validating_graph: String,
    /// Skolemized report blank nodes: `{prefix}{label}`
    pub blank_node: String,
}

impl PrefixConfig {
    /// Graph receiving the conforming triples of a task
    #[must_use]
    pub fn filter_graph_for(&self, task_id: &str) -> String {
        format!("{}/{task_id}", self.filter_graph)
    }

    /// Graph receiving the validation report of a task
    #[must_use]
    pub fn validating_graph_for(&self, task_id: &str) -> String {
        format!("{}/{task_id}", self.validating_graph)
    }
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            data_container: "http://redpencil.data.gift/id/dataContainers/".to_string(),
            logical_file: "http://data.lblod.info/id/files/".to_string(),
            error: "http://redpencil.data.gift/id/jobs/error/".to_string(),
            filter_graph: "http://mu.semte.ch/graphs/harvesting/tasks/filtering".to_string(),
            validating_graph: "http://mu.semte.ch/graphs/harvesting/tasks/validating".to_string(),
            blank_node: harvest_shacl::DEFAULT_BLANK_PREFIX.to_string(),
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
        }
    }
}
