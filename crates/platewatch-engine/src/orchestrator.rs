//! Run orchestration across the vehicle×provider matrix.
//!
//! A run moves through fixed phases: authorize, fetch vehicles, dispatch
//! one task per (vehicle, provider) cell, aggregate, then hand the
//! results to the sink dispatcher. Only authorization failure and an
//! empty/unreachable vehicle list are fatal; every other failure is
//! collected as a [`ProcessingError`] while the sweep continues.
//!
//! Cells fan in over a channel: each task sends its outcome and drops
//! its sender when it finishes (or observes cancellation), so the
//! aggregation loop doubles as the wait-group and one cell's failure can
//! never halt another's append.

use crate::dispatcher::{DispatchStats, SinkDispatcher};
use crate::error::{EngineError, Result};
use crate::limiter::RateLimiter;
use crate::report::{RunReport, RunSummary};
use chrono::Utc;
use platewatch_client::{Authorizer, VehicleSource, ViolationSink};
use platewatch_core::{
    CitationRecord, EngineConfig, ProcessingError, ProgressTracker, Provider, Vehicle,
};
use platewatch_readers::{CitationReader, ReaderRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

enum CellOutcome {
    Success {
        provider: Provider,
        records: Vec<CitationRecord>,
    },
    Failure(ProcessingError),
}

/// Drives bounded-concurrency, rate-limited, failure-isolated citation
/// sweeps and forwards the results to the violation sink.
pub struct Orchestrator {
    authorizer: Arc<dyn Authorizer>,
    vehicles: Arc<dyn VehicleSource>,
    sink: Arc<dyn ViolationSink>,
    readers: Arc<ReaderRegistry>,
    limiter: Arc<RateLimiter>,
    progress: Arc<ProgressTracker>,
    enabled_providers: Vec<Provider>,
    global_permits: usize,
    sink_permits: usize,
    lookup_timeout: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("readers", &self.readers)
            .field("global_permits", &self.global_permits)
            .field("sink_permits", &self.sink_permits)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators with default
    /// engine settings.
    #[must_use]
    pub fn new(
        authorizer: Arc<dyn Authorizer>,
        vehicles: Arc<dyn VehicleSource>,
        sink: Arc<dyn ViolationSink>,
        readers: Arc<ReaderRegistry>,
        progress: Arc<ProgressTracker>,
    ) -> Self {
        let config = EngineConfig::default();
        Self {
            authorizer,
            vehicles,
            sink,
            readers,
            limiter: Arc::new(RateLimiter::new()),
            progress,
            enabled_providers: config.enabled_providers(),
            global_permits: config.global_permits(),
            sink_permits: config.sink_concurrency,
            lookup_timeout: config.lookup_timeout(),
        }
    }

    /// Apply provider enablement, concurrency, and timeout settings from
    /// configuration.
    #[must_use]
    pub fn with_engine_config(mut self, config: &EngineConfig) -> Self {
        self.enabled_providers = config.enabled_providers();
        self.global_permits = config.global_permits().max(1);
        self.sink_permits = config.sink_concurrency.max(1);
        self.lookup_timeout = config.lookup_timeout();
        self
    }

    /// Override the global concurrency cap.
    #[must_use]
    pub fn with_global_concurrency(mut self, permits: usize) -> Self {
        self.global_permits = permits.max(1);
        self
    }

    /// Override the sink dispatch concurrency cap.
    #[must_use]
    pub fn with_sink_concurrency(mut self, permits: usize) -> Self {
        self.sink_permits = permits.max(1);
        self
    }

    /// Override the ad hoc lookup timeout.
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Replace the rate limiter (tests tighten budgets through this).
    #[must_use]
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    /// Run a full sweep over every enabled provider with a registered
    /// reader.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunReport> {
        let providers = self.enabled_providers.clone();
        self.run_providers(&providers, cancel).await
    }

    /// Run a sweep restricted to the given providers.
    ///
    /// Requested providers without a registered reader are skipped with
    /// a warning, never a fatal error.
    pub async fn run_providers(
        &self,
        providers: &[Provider],
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "starting citation run");
        self.progress.start();

        let result = self.sweep(providers, cancel, run_id, started_at).await;
        self.progress.stop();

        match &result {
            Ok(report) => info!(
                citations = report.summary.total_citations,
                errors = report.errors.len(),
                cancelled = report.summary.cancelled,
                "citation run finished"
            ),
            Err(e) => error!(error = %e, "citation run aborted"),
        }
        result
    }

    /// Ad hoc lookup of one plate against one provider, bounded by the
    /// configured wall-clock timeout.
    ///
    /// The lookup still passes through the provider's rate limiter so a
    /// concurrent bulk run cannot be crowded out. Timeout surfaces as
    /// [`EngineError::Cancelled`], never a hang.
    pub async fn lookup_plate(
        &self,
        provider: Provider,
        plate: &str,
        state: &str,
    ) -> Result<Vec<CitationRecord>> {
        let reader = self
            .readers
            .get(provider)
            .ok_or(EngineError::NoReader(provider))?;

        info!(plate, state, %provider, "ad hoc citation lookup");
        let cancel = CancellationToken::new();

        let lookup = async {
            let _slot = self.limiter.acquire(provider, &cancel).await?;
            reader
                .read_citations(plate, state)
                .await
                .map_err(EngineError::from)
        };

        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => {
                warn!(plate, %provider, "lookup timed out");
                Err(EngineError::Cancelled)
            }
        }
    }

    async fn sweep(
        &self,
        providers: &[Provider],
        cancel: &CancellationToken,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
    ) -> Result<RunReport> {
        info!("authorizing against fleet backend");
        let authorized = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            ok = self.authorizer.try_authorize() => ok,
        };
        if !authorized {
            error!("authorization failed, aborting run");
            return Err(EngineError::AuthorizationFailed);
        }

        info!("fetching fleet vehicles");
        let vehicles = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = self.vehicles.vehicles() => result.map_err(EngineError::VehicleFetch)?,
        };
        if vehicles.is_empty() {
            error!("fleet vehicle list is empty, aborting run");
            return Err(EngineError::NoVehicles);
        }

        let active = self.active_providers(providers);
        self.progress.reset(vehicles.len());
        info!(
            vehicles = vehicles.len(),
            providers = active.len(),
            cells = vehicles.len() * active.len(),
            "dispatching vehicle-provider matrix"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<CellOutcome>();
        let global = Arc::new(Semaphore::new(self.global_permits));

        for vehicle in &vehicles {
            for &provider in &active {
                let Some(reader) = self.readers.get(provider) else {
                    continue;
                };
                tokio::spawn(run_cell(
                    reader,
                    vehicle.clone(),
                    provider,
                    Arc::clone(&self.limiter),
                    Arc::clone(&self.progress),
                    Arc::clone(&global),
                    cancel.clone(),
                    tx.clone(),
                ));
            }
        }
        drop(tx);

        // Fan-in: the loop ends once every cell task has finished (or
        // bailed on cancellation) and dropped its sender.
        let mut citations: Vec<CitationRecord> = Vec::new();
        let mut errors: Vec<ProcessingError> = Vec::new();
        let mut successful_operations = 0usize;
        let mut failed_operations = 0usize;
        let mut citations_by_provider: HashMap<Provider, usize> = HashMap::new();
        let mut errors_by_provider: HashMap<Provider, usize> = HashMap::new();

        while let Some(outcome) = rx.recv().await {
            match outcome {
                CellOutcome::Success { provider, records } => {
                    successful_operations += 1;
                    if !records.is_empty() {
                        *citations_by_provider.entry(provider).or_insert(0) += records.len();
                    }
                    citations.extend(records);
                }
                CellOutcome::Failure(failure) => {
                    failed_operations += 1;
                    *errors_by_provider.entry(failure.provider).or_insert(0) += 1;
                    errors.push(failure);
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        for (provider, count) in &errors_by_provider {
            warn!(%provider, errors = count, "provider finished with errors");
        }
        for (provider, count) in &citations_by_provider {
            info!(%provider, citations = count, "provider finished with citations");
        }
        if citations.is_empty() && !cancelled {
            info!("run produced no citations");
        }

        let dispatch = if cancelled || citations.is_empty() {
            DispatchStats::default()
        } else {
            SinkDispatcher::new(Arc::clone(&self.sink), self.sink_permits)
                .dispatch(&citations, &vehicles, cancel)
                .await
        };

        let summary = RunSummary {
            run_id,
            total_vehicles: vehicles.len(),
            total_providers: active.len(),
            successful_operations,
            failed_operations,
            total_citations: citations.len(),
            sink_submitted: dispatch.submitted,
            sink_failed: dispatch.failed,
            started_at,
            finished_at: Utc::now(),
            citations_by_provider,
            errors_by_provider,
            cancelled,
        };

        info!(
            %run_id,
            duration_ms = summary.duration().num_milliseconds(),
            citations = summary.total_citations,
            errors = summary.failed_operations,
            vehicles = summary.total_vehicles,
            providers = summary.total_providers,
            "citation processing completed"
        );

        Ok(RunReport {
            citations,
            errors,
            summary,
        })
    }

    /// Deduplicate the requested providers and drop those without a
    /// registered reader.
    fn active_providers(&self, requested: &[Provider]) -> Vec<Provider> {
        let mut active = Vec::new();
        for &provider in requested {
            if active.contains(&provider) {
                continue;
            }
            if self.readers.contains(provider) {
                active.push(provider);
            } else {
                warn!(%provider, "no reader registered for provider, skipping");
            }
        }
        active
    }
}

/// One (vehicle, provider) cell: global slot, provider slot, read,
/// emit. Cancellation is observed before every wait; a cancelled cell
/// exits without emitting an outcome for its cell.
#[allow(clippy::too_many_arguments)]
async fn run_cell(
    reader: Arc<dyn CitationReader>,
    vehicle: Vehicle,
    provider: Provider,
    limiter: Arc<RateLimiter>,
    progress: Arc<ProgressTracker>,
    global: Arc<Semaphore>,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<CellOutcome>,
) {
    if cancel.is_cancelled() {
        return;
    }

    let _global = tokio::select! {
        () = cancel.cancelled() => return,
        permit = global.acquire_owned() => permit.expect("global semaphore never closed"),
    };

    let _slot = match limiter.acquire(provider, &cancel).await {
        Ok(permit) => permit,
        Err(_) => return,
    };

    debug!(vehicle = %vehicle.describe(), %provider, "processing cell");

    let result = tokio::select! {
        () = cancel.cancelled() => return,
        result = reader.read_citations(&vehicle.tag, &vehicle.state) => result,
    };

    match result {
        Ok(records) => {
            if !records.is_empty() {
                debug!(
                    count = records.len(),
                    vehicle = %vehicle.describe(),
                    %provider,
                    "citations found"
                );
                progress.add_violations(records.len());
            }
            let _ = tx.send(CellOutcome::Success { provider, records });
        }
        Err(e) => {
            warn!(
                vehicle = %vehicle.describe(),
                %provider,
                error = %e,
                "cell failed"
            );
            let _ = tx.send(CellOutcome::Failure(ProcessingError::new(
                vehicle.tag.clone(),
                vehicle.state.clone(),
                provider,
                e.message,
                e.code,
            )));
        }
    }

    progress.mark_vehicle_processed(&vehicle.key());
}
