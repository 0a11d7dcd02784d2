//! Execution units.
//!
//! A unit owns one chunk of candidate columns and a private sampler. It
//! drives at most `min(workers, pool_size)` column scans at a time on a
//! single-threaded runtime and reports back to the orchestrator over a channel: one batch of
//! matches followed by [`UnitMessage::Done`].

use crate::error::{Result, ScanError};
use futures::stream::{FuturesUnordered, StreamExt};
use pgsieve_core::{ColumnDescriptor, ColumnMatch, ScanningConfig};
use pgsieve_db::{ColumnSampler, ScanBackend};
use pgsieve_discovery::{RuleSet, SensitiveValueDetector};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Message sent from a unit to the orchestrator.
#[derive(Debug)]
pub enum UnitMessage {
    /// Every match the unit produced
    Batch(Vec<ColumnMatch>),
    /// The unit has nothing more to send
    Done,
}

/// How a unit finished, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// All columns were scanned and the matches delivered
    Completed {
        /// Columns sampled
        scanned: usize,
        /// Columns flagged
        matched: usize,
    },
    /// The scheduling loop hit the unit timeout; nothing was delivered
    TimedOut,
}

/// Knobs shared by every unit of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Unit count, and the in-flight window per unit when the pool is large enough
    pub workers: usize,
    /// Connections in each unit's pool
    pub pool_size: u32,
    /// Maximum distinct values sampled per column
    pub sample_limit: u32,
    /// Bound on a unit's scheduling loop
    pub unit_timeout: Option<Duration>,
}

impl ScanSettings {
    /// Derive settings from the `[scanning]` configuration section.
    #[must_use]
    pub fn from_config(config: &ScanningConfig) -> Self {
        Self {
            workers: config.workers.max(1) as usize,
            pool_size: config.effective_pool_size(),
            sample_limit: config.sample_limit,
            unit_timeout: config.unit_timeout(),
        }
    }

    /// In-flight scans admitted per unit.
    ///
    /// Never wider than the pool, so admitted scans do not queue on a
    /// connection and run into the acquire timeout.
    #[must_use]
    pub fn window(&self) -> usize {
        let pool_size = usize::try_from(self.pool_size).unwrap_or(usize::MAX);
        self.workers.min(pool_size).max(1)
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from_config(&ScanningConfig::default())
    }
}

/// Sample one column and classify it.
///
/// Returns `Ok(None)` when the column is not sensitive.
pub async fn scan_column(
    sampler: &dyn ColumnSampler,
    detector: SensitiveValueDetector<'_>,
    column: &ColumnDescriptor,
    sample_limit: u32,
) -> Result<Option<ColumnMatch>> {
    let values = sampler
        .sample(column, sample_limit)
        .await
        .map_err(|source| {
            error!(column = %column.qualified_name(), error = %source, "Failed to sample column");
            ScanError::ColumnScan {
                column: column.qualified_name(),
                source,
            }
        })?;

    let Some(reason) = detector.detect(&values) else {
        return Ok(None);
    };

    debug!(
        column = %column.qualified_name(),
        object_id = %column.object_id,
        reason = %reason,
        sampled = values.len(),
        "column matched by content"
    );

    Ok(Some(ColumnMatch {
        column: column.clone(),
        reason,
    }))
}

/// Scan a chunk with at most `window` column scans in flight.
///
/// Once the window is full the next column is admitted only after one
/// in-flight scan completes. The first failing scan aborts the chunk and
/// the scans still in flight are dropped.
pub async fn scan_chunk(
    sampler: &dyn ColumnSampler,
    rules: &RuleSet,
    columns: &[ColumnDescriptor],
    window: usize,
    sample_limit: u32,
) -> Result<Vec<ColumnMatch>> {
    let detector = SensitiveValueDetector::new(rules);
    let window = window.max(1);
    let mut in_flight = FuturesUnordered::new();
    let mut matches = Vec::new();

    for column in columns {
        in_flight.push(scan_column(sampler, detector, column, sample_limit));

        while in_flight.len() >= window {
            if let Some(result) = in_flight.next().await {
                matches.extend(result?);
            }
        }
    }

    while let Some(result) = in_flight.next().await {
        matches.extend(result?);
    }

    Ok(matches)
}

/// One chunk of work together with everything needed to run it.
pub struct UnitJob {
    /// Unit index, used for logging and thread naming
    pub unit: usize,
    /// Columns owned by this unit
    pub columns: Vec<ColumnDescriptor>,
    /// Backend the unit opens its sampler from
    pub backend: Arc<dyn ScanBackend>,
    /// Shared read-only rules
    pub rules: Arc<RuleSet>,
    /// Run-wide settings
    pub settings: ScanSettings,
}

impl UnitJob {
    /// Scan the chunk and report to `tx`.
    ///
    /// On success the unit sends its batch then [`UnitMessage::Done`]. On a
    /// timeout it sends only `Done`. On error it sends nothing and the
    /// channel closes when `tx` is dropped.
    pub async fn execute(self, tx: UnboundedSender<UnitMessage>) -> Result<UnitOutcome> {
        let started = Instant::now();
        info!(unit = self.unit, columns = self.columns.len(), "Scan unit started");

        let sampler = self
            .backend
            .open_sampler(self.settings.pool_size)
            .await
            .map_err(|source| {
                error!(unit = self.unit, error = %source, "Failed to open scan pool");
                ScanError::SamplerOpen {
                    unit: self.unit,
                    source,
                }
            })?;

        let scan = scan_chunk(
            sampler.as_ref(),
            &self.rules,
            &self.columns,
            self.settings.window(),
            self.settings.sample_limit,
        );

        let result = match self.settings.unit_timeout {
            Some(limit) => tokio::time::timeout(limit, scan).await.ok(),
            None => Some(scan.await),
        };

        sampler.close().await;

        match result {
            Some(Ok(matches)) => {
                let outcome = UnitOutcome::Completed {
                    scanned: self.columns.len(),
                    matched: matches.len(),
                };

                if !matches.is_empty() {
                    deliver(&tx, self.unit, UnitMessage::Batch(matches));
                }
                deliver(&tx, self.unit, UnitMessage::Done);

                info!(
                    unit = self.unit,
                    elapsed_ms = started.elapsed().as_millis(),
                    ?outcome,
                    "Scan unit finished"
                );
                Ok(outcome)
            }
            Some(Err(e)) => {
                error!(unit = self.unit, error = %e, "Scan unit failed");
                Err(e)
            }
            None => {
                error!(
                    unit = self.unit,
                    elapsed_ms = started.elapsed().as_millis(),
                    columns = self.columns.len(),
                    "Scan unit timed out, discarding its results"
                );
                deliver(&tx, self.unit, UnitMessage::Done);
                Ok(UnitOutcome::TimedOut)
            }
        }
    }
}

/// Send a message to the orchestrator, warning when nobody is listening.
fn deliver(tx: &UnboundedSender<UnitMessage>, unit: usize, message: UnitMessage) -> bool {
    match tx.send(message) {
        Ok(()) => true,
        Err(SendError(message)) => {
            let lost = match &message {
                UnitMessage::Batch(matches) => matches.len(),
                UnitMessage::Done => 0,
            };
            warn!(unit, lost, "Orchestrator stopped listening; unit message dropped");
            false
        }
    }
}

/// Run a unit to completion on a dedicated single-threaded runtime.
///
/// Intended as the body of the unit's OS thread.
pub fn run_unit(job: UnitJob, tx: UnboundedSender<UnitMessage>) -> Result<UnitOutcome> {
    let unit = job.unit;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| ScanError::UnitRuntime { unit, source })?;

    runtime.block_on(job.execute(tx))
}
