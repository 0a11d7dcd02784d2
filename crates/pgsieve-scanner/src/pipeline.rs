//! End-to-end dictionary creation.
//!
//! Rules are loaded before the catalog is touched, so a bad rule document
//! fails the run without issuing any query. The dictionary is written only
//! after every unit has been joined and aggregation has finished.

use crate::aggregator::RuleAggregator;
use crate::distributor::chunkify;
use crate::error::{Result, ScanError};
use crate::orchestrator::ScanOrchestrator;
use crate::worker::ScanSettings;
use crate::writer::DictionaryWriter;
use pgsieve_core::{AppConfig, ResultCode};
use pgsieve_db::ScanBackend;
use pgsieve_discovery::{filter_by_name, NameFilterOutcome, RuleSet};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Counts reported at the end of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Identifier attached to every log line of the run
    pub run_id: Uuid,
    /// Eligible columns returned by the catalog
    pub candidate_columns: usize,
    /// Columns flagged by name
    pub name_matches: usize,
    /// Columns flagged by sampled content
    pub value_matches: usize,
    /// Table groups in the dictionary
    pub tables: usize,
    /// Units that timed out and delivered nothing
    pub timed_out_units: Vec<usize>,
    /// Where the dictionary was written
    pub output_path: PathBuf,
}

/// Discover sensitive columns and write the dictionary.
pub async fn create_dictionary(
    config: &AppConfig,
    backend: Arc<dyn ScanBackend>,
) -> Result<RunSummary> {
    let run_id = Uuid::new_v4();
    let span = info_span!("create_dictionary", %run_id);

    async move {
        let started = Instant::now();
        config.validate()?;

        let rules = RuleSet::load(&config.paths.rules_path())?;

        let columns = backend.eligible_columns().await?;
        if columns.is_empty() {
            return Err(ScanError::NoColumns);
        }
        let candidate_columns = columns.len();

        let NameFilterOutcome {
            remaining,
            matches: name_matches,
        } = filter_by_name(columns, &rules);
        info!(
            candidates = candidate_columns,
            by_name = name_matches.len(),
            to_sample = remaining.len(),
            "Field name filter applied"
        );

        let settings = ScanSettings::from_config(&config.scanning);
        let chunks = chunkify(remaining, settings.workers);
        let report = ScanOrchestrator::new(backend, Arc::new(rules), settings)
            .execute(chunks)
            .await?;

        let mut aggregator = RuleAggregator::new();
        aggregator.extend(&name_matches);
        aggregator.extend(&report.matches);
        let dictionary = aggregator.into_dictionary();

        let output_path = config.paths.output_path();
        DictionaryWriter::write(&dictionary, &output_path)?;

        info!(elapsed_ms = started.elapsed().as_millis(), "Dictionary created");

        Ok(RunSummary {
            run_id,
            candidate_columns,
            name_matches: name_matches.len(),
            value_matches: report.matches.len(),
            tables: dictionary.dictionary.len(),
            timed_out_units: report.timed_out_units(),
            output_path,
        })
    }
    .instrument(span)
    .await
}

/// Run [`create_dictionary`] and reduce the outcome to a result code.
pub async fn run(config: &AppConfig, backend: Arc<dyn ScanBackend>) -> ResultCode {
    match create_dictionary(config, backend).await {
        Ok(summary) => {
            if !summary.timed_out_units.is_empty() {
                tracing::warn!(
                    units = ?summary.timed_out_units,
                    "Some scan units timed out; their columns are missing from the dictionary"
                );
            }
            info!(
                run_id = %summary.run_id,
                candidates = summary.candidate_columns,
                name_matches = summary.name_matches,
                value_matches = summary.value_matches,
                tables = summary.tables,
                path = %summary.output_path.display(),
                "Run finished"
            );
            ResultCode::Done
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ResultCode::Fail
        }
    }
}
