//! In-memory scan backend shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pgsieve_core::{AppConfig, ColumnDescriptor, SequenceBorder};
use pgsieve_db::{ColumnSampler, DatabaseError, ScanBackend};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Counters observed by the tests.
#[derive(Debug, Default)]
pub struct BackendStats {
    pub catalog_queries: AtomicUsize,
    pub samplers_opened: AtomicUsize,
    pub samplers_closed: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub sampled: Mutex<Vec<String>>,
}

impl BackendStats {
    pub fn sampled(&self) -> Vec<String> {
        self.sampled.lock().unwrap().clone()
    }

    pub fn was_sampled(&self, qualified_name: &str) -> bool {
        self.sampled().iter().any(|name| name == qualified_name)
    }
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<ColumnDescriptor>,
    values: HashMap<String, Vec<Option<String>>>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    pool_unavailable: bool,
}

/// Fake catalog plus canned column samples.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    data: Arc<Table>,
    pub stats: Arc<BackendStats>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn data_mut(&mut self) -> &mut Table {
        Arc::get_mut(&mut self.data).expect("backend is configured before use")
    }

    /// Register a column with the values its sample returns.
    pub fn column(
        mut self,
        schema: &str,
        table: &str,
        column: &str,
        declared_type: &str,
        values: &[Option<&str>],
    ) -> Self {
        let descriptor = ColumnDescriptor::new(schema, table, column, declared_type);
        let data = self.data_mut();
        data.values.insert(
            descriptor.qualified_name(),
            values.iter().map(|v| v.map(ToString::to_string)).collect(),
        );
        data.columns.push(descriptor);
        self
    }

    /// Make sampling of a column fail.
    pub fn failing(mut self, qualified_name: &str) -> Self {
        self.data_mut().failing.insert(qualified_name.to_string());
        self
    }

    /// Make every `open_sampler` call fail.
    pub fn pool_unavailable(mut self) -> Self {
        self.data_mut().pool_unavailable = true;
        self
    }

    /// Delay sampling of a column.
    pub fn slow(mut self, qualified_name: &str, delay: Duration) -> Self {
        self.data_mut()
            .delays
            .insert(qualified_name.to_string(), delay);
        self
    }

    /// Delay sampling of every registered column.
    pub fn slow_all(mut self, delay: Duration) -> Self {
        let names: Vec<String> = self
            .data
            .columns
            .iter()
            .map(ColumnDescriptor::qualified_name)
            .collect();
        let data = self.data_mut();
        for name in names {
            data.delays.insert(name, delay);
        }
        self
    }

    pub fn columns(&self) -> Vec<ColumnDescriptor> {
        self.data.columns.clone()
    }

    pub fn into_shared(self) -> (Arc<dyn ScanBackend>, Arc<BackendStats>) {
        let stats = Arc::clone(&self.stats);
        (Arc::new(self), stats)
    }
}

#[async_trait]
impl ScanBackend for MemoryBackend {
    async fn eligible_columns(&self) -> pgsieve_db::Result<Vec<ColumnDescriptor>> {
        self.stats.catalog_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.columns.clone())
    }

    async fn sequence_borders(&self) -> pgsieve_db::Result<Vec<SequenceBorder>> {
        Ok(Vec::new())
    }

    async fn open_sampler(&self, _pool_size: u32) -> pgsieve_db::Result<Box<dyn ColumnSampler>> {
        if self.data.pool_unavailable {
            return Err(DatabaseError::Connect(
                "failed to open scan pool: connection refused".to_string(),
            ));
        }

        self.stats.samplers_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySampler {
            data: Arc::clone(&self.data),
            stats: Arc::clone(&self.stats),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }))
    }
}

struct MemorySampler {
    data: Arc<Table>,
    stats: Arc<BackendStats>,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the sampler's in-flight count even when the scan is dropped.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ColumnSampler for MemorySampler {
    async fn sample(
        &self,
        column: &ColumnDescriptor,
        _limit: u32,
    ) -> pgsieve_db::Result<Vec<Option<String>>> {
        let name = column.qualified_name();
        self.stats.sampled.lock().unwrap().push(name.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(Arc::clone(&self.in_flight));
        self.stats.max_in_flight.fetch_max(now, Ordering::SeqCst);

        match self.data.delays.get(&name) {
            Some(delay) => tokio::time::sleep(*delay).await,
            None => tokio::task::yield_now().await,
        }

        if self.data.failing.contains(&name) {
            return Err(DatabaseError::Sqlx(sqlx::Error::Protocol(format!(
                "relation \"{}\" does not exist",
                column.table
            ))));
        }

        Ok(self.data.values.get(&name).cloned().unwrap_or_default())
    }

    async fn close(&self) {
        self.stats.samplers_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Write a JSON rule document under `<base>/dict/rules.json`.
pub fn write_rules(base: &Path, rules: &serde_json::Value) {
    let dict = base.join("dict");
    std::fs::create_dir_all(&dict).unwrap();
    std::fs::write(dict.join("rules.json"), rules.to_string()).unwrap();
}

/// Config rooted at a temp dir with `workers` units.
pub fn config_in(dir: &TempDir, workers: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.paths.base_dir = dir.path().to_path_buf();
    config.scanning.workers = workers;
    config
}

pub fn read_output(config: &AppConfig) -> serde_json::Value {
    let contents = std::fs::read_to_string(config.paths.output_path()).unwrap();
    serde_json::from_str(&contents).unwrap()
}
