//! Run report and summary types.

use chrono::{DateTime, Utc};
use platewatch_core::{CitationRecord, ProcessingError, Provider};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Totals for one completed run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Identifier correlating this run's log lines and report
    pub run_id: Uuid,
    /// Vehicles in the sweep
    pub total_vehicles: usize,
    /// Providers the sweep queried
    pub total_providers: usize,
    /// Cells that completed with a successful read
    pub successful_operations: usize,
    /// Cells that completed with a failure
    pub failed_operations: usize,
    /// Citations found across all cells
    pub total_citations: usize,
    /// Records accepted by the sink
    pub sink_submitted: usize,
    /// Records the sink rejected or could not be reached for
    pub sink_failed: usize,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Citations found, by originating provider
    pub citations_by_provider: HashMap<Provider, usize>,
    /// Cell failures, by provider
    pub errors_by_provider: HashMap<Provider, usize>,
    /// Whether the sweep was cut short by cancellation
    pub cancelled: bool,
}

impl RunSummary {
    /// Wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Share of cells that succeeded, as a percentage.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let cells = self.total_vehicles * self.total_providers;
        if cells == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            self.successful_operations as f64 / cells as f64 * 100.0
        }
    }
}

/// Everything a completed run produced.
///
/// A run that found zero citations is still a successful run; fatal
/// aborts never produce a report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Normalized citations, in no particular order
    pub citations: Vec<CitationRecord>,
    /// Per-cell failures collected during the sweep
    pub errors: Vec<ProcessingError>,
    /// Totals
    pub summary: RunSummary,
}
