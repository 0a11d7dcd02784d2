//! Scan orchestrator for running execution units.
//!
//! This module provides the `ScanOrchestrator`, which launches one isolated
//! unit per non-empty chunk, drains each unit's channel until its terminator
//! and waits for every unit to exit before handing results to aggregation.

use crate::error::{Result, ScanError};
use crate::worker::{run_unit, ScanSettings, UnitJob, UnitMessage, UnitOutcome};
use futures::future::join_all;
use pgsieve_core::{ColumnDescriptor, ColumnMatch};
use pgsieve_db::ScanBackend;
use pgsieve_discovery::RuleSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Result of running a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    /// Unit index (the chunk position)
    pub unit: usize,
    /// Columns assigned to the unit
    pub columns: usize,
    /// How the unit finished
    pub outcome: UnitOutcome,
}

/// Combined result of every unit of a run.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Content matches delivered by all units
    pub matches: Vec<ColumnMatch>,
    /// Per-unit results, ordered by unit index
    pub units: Vec<UnitReport>,
}

impl ScanReport {
    /// Units that hit their timeout and delivered nothing.
    #[must_use]
    pub fn timed_out_units(&self) -> Vec<usize> {
        self.units
            .iter()
            .filter(|report| report.outcome == UnitOutcome::TimedOut)
            .map(|report| report.unit)
            .collect()
    }
}

/// A launched unit the orchestrator has not yet collected.
struct PendingUnit {
    unit: usize,
    columns: usize,
    rx: UnboundedReceiver<UnitMessage>,
    handle: JoinHandle<Result<UnitOutcome>>,
}

/// Orchestrates scanning across execution units.
pub struct ScanOrchestrator {
    /// Backend each unit opens its sampler from
    backend: Arc<dyn ScanBackend>,
    /// Rules shared read-only by all units
    rules: Arc<RuleSet>,
    /// Run-wide settings
    settings: ScanSettings,
}

impl ScanOrchestrator {
    /// Create a new scan orchestrator.
    #[must_use]
    pub fn new(backend: Arc<dyn ScanBackend>, rules: Arc<RuleSet>, settings: ScanSettings) -> Self {
        Self {
            backend,
            rules,
            settings,
        }
    }

    /// Run one unit per non-empty chunk and collect their matches.
    ///
    /// All launched units are drained and joined even when one fails; the
    /// first failure by unit index is then returned.
    pub async fn execute(&self, chunks: Vec<Vec<ColumnDescriptor>>) -> Result<ScanReport> {
        let mut pending = Vec::new();
        let mut spawn_error = None;

        for (unit, columns) in chunks.into_iter().enumerate() {
            if columns.is_empty() {
                tracing::debug!(unit, "Skipping empty chunk");
                continue;
            }

            match self.spawn_unit(unit, columns) {
                Ok(launched) => pending.push(launched),
                Err(e) => {
                    tracing::error!(unit, error = %e, "Failed to launch scan unit");
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        tracing::info!(units = pending.len(), "Scan units launched");

        let collected = join_all(pending.into_iter().map(collect_unit)).await;

        let mut report = ScanReport::default();
        let mut first_error = None;

        for result in collected {
            match result {
                Ok((unit_report, matches)) => {
                    report.matches.extend(matches);
                    report.units.push(unit_report);
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error.or(spawn_error) {
            return Err(e);
        }

        Ok(report)
    }

    fn spawn_unit(&self, unit: usize, columns: Vec<ColumnDescriptor>) -> Result<PendingUnit> {
        let (tx, rx) = mpsc::unbounded_channel();
        let column_count = columns.len();

        let job = UnitJob {
            unit,
            columns,
            backend: Arc::clone(&self.backend),
            rules: Arc::clone(&self.rules),
            settings: self.settings,
        };

        let handle = thread::Builder::new()
            .name(format!("scan-unit-{unit}"))
            .spawn(move || run_unit(job, tx))
            .map_err(|source| ScanError::UnitSpawn { unit, source })?;

        Ok(PendingUnit {
            unit,
            columns: column_count,
            rx,
            handle,
        })
    }
}

/// Drain a unit's channel until its terminator, then wait for it to exit.
async fn collect_unit(pending: PendingUnit) -> Result<(UnitReport, Vec<ColumnMatch>)> {
    let PendingUnit {
        unit,
        columns,
        mut rx,
        handle,
    } = pending;

    let mut matches = Vec::new();
    while let Some(message) = rx.recv().await {
        match message {
            UnitMessage::Batch(batch) => matches.extend(batch),
            UnitMessage::Done => break,
        }
    }

    let outcome = match tokio::task::spawn_blocking(move || handle.join()).await {
        Ok(Ok(result)) => result?,
        Ok(Err(_)) | Err(_) => {
            tracing::error!(unit, "Scan unit panicked");
            return Err(ScanError::UnitPanicked { unit });
        }
    };

    Ok((
        UnitReport {
            unit,
            columns,
            outcome,
        },
        matches,
    ))
}
