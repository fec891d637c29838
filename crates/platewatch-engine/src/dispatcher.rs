//! Result sink dispatcher.
//!
//! Fans normalized citation records out to the violation sink with its
//! own small concurrency cap, independent of the fetch phase. Each
//! record resolves its originating vehicle to pick up the backend
//! context code the sink requires; a record with no vehicle match still
//! submits with the default context. Per-record failures are counted,
//! never retried.

use futures::stream::{self, StreamExt};
use platewatch_client::{ViolationSink, ViolationSubmission};
use platewatch_core::{CitationRecord, Vehicle, VehicleKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Backend context used when a citation resolves to no known vehicle.
const DEFAULT_VEHICLE_CONTEXT: i32 = 0;

/// Per-record outcome counts from one dispatch phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Records the sink accepted
    pub submitted: usize,
    /// Records the sink rejected or could not be reached for
    pub failed: usize,
}

/// Pushes citation records to the violation sink.
pub struct SinkDispatcher {
    sink: Arc<dyn ViolationSink>,
    max_concurrent: usize,
}

impl std::fmt::Debug for SinkDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkDispatcher")
            .field("max_concurrent", &self.max_concurrent)
            .finish()
    }
}

impl SinkDispatcher {
    /// Create a dispatcher over the sink with the given concurrency cap.
    #[must_use]
    pub fn new(sink: Arc<dyn ViolationSink>, max_concurrent: usize) -> Self {
        Self {
            sink,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Submit every record, resolving vehicle context by `(tag, state)`.
    ///
    /// Cancellation stops new submissions promptly; records already
    /// counted stay counted.
    pub async fn dispatch(
        &self,
        citations: &[CitationRecord],
        vehicles: &[Vehicle],
        cancel: &CancellationToken,
    ) -> DispatchStats {
        let lookup: HashMap<VehicleKey, &Vehicle> =
            vehicles.iter().map(|v| (v.key(), v)).collect();

        let submitted = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        stream::iter(citations)
            .for_each_concurrent(Some(self.max_concurrent), |record| {
                let lookup = &lookup;
                let submitted = &submitted;
                let failed = &failed;
                async move {
                    if cancel.is_cancelled() {
                        return;
                    }

                    let key = VehicleKey::new(&record.tag, &record.state);
                    let context = match lookup.get(&key) {
                        Some(vehicle) => vehicle.provider,
                        None => {
                            warn!(
                                tag = %record.tag,
                                state = %record.state,
                                "no matching vehicle for citation, submitting with default context"
                            );
                            DEFAULT_VEHICLE_CONTEXT
                        }
                    };

                    let submission = ViolationSubmission::from_record(record, context);
                    let result = tokio::select! {
                        () = cancel.cancelled() => return,
                        result = self.sink.submit(&submission) => result,
                    };

                    match result {
                        Ok(()) => {
                            debug!(tag = %record.tag, "violation submitted");
                            submitted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            warn!(tag = %record.tag, error = %e, "violation submission failed");
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
            .await;

        let stats = DispatchStats {
            submitted: submitted.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        };
        info!(
            submitted = stats.submitted,
            failed = stats.failed,
            "sink dispatch complete"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use platewatch_client::error::Result as ClientResult;
    use platewatch_client::ClientError;
    use platewatch_core::{FineType, PaymentStatus, Provider, CURRENCY};
    use std::sync::Mutex;

    struct RecordingSink {
        submissions: Mutex<Vec<ViolationSubmission>>,
        fail: bool,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
                fail,
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ViolationSink for RecordingSink {
        async fn submit(&self, violation: &ViolationSubmission) -> ClientResult<()> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                return Err(ClientError::api(503, "Service unavailable"));
            }
            self.submissions
                .lock()
                .expect("submissions lock")
                .push(violation.clone());
            Ok(())
        }
    }

    fn record(tag: &str, state: &str) -> CitationRecord {
        CitationRecord {
            id: None,
            citation_number: Some(format!("C-{tag}")),
            notice_number: None,
            agency: Provider::Vanguard.display_name().to_string(),
            address: None,
            tag: tag.to_string(),
            state: state.to_string(),
            issue_date: None,
            start_date: None,
            end_date: None,
            amount: 10.0,
            currency: CURRENCY.to_string(),
            payment_status: PaymentStatus::New,
            fine_type: FineType::Parking,
            note: None,
            link: Provider::Vanguard.link().to_string(),
            is_active: true,
            provider: Provider::Vanguard,
        }
    }

    fn vehicle(tag: &str, context: i32) -> Vehicle {
        Vehicle {
            id: 1,
            label: None,
            tag: tag.to_string(),
            state: "FL".to_string(),
            provider: context,
            vin: None,
            is_active: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_vehicle_context() {
        let sink = Arc::new(RecordingSink::new(false));
        let dispatcher = SinkDispatcher::new(Arc::clone(&sink) as Arc<dyn ViolationSink>, 4);

        let stats = dispatcher
            .dispatch(
                &[record("ABC123", "FL")],
                &[vehicle("ABC123", 7)],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(stats, DispatchStats { submitted: 1, failed: 0 });
        let submissions = sink.submissions.lock().expect("submissions lock");
        assert_eq!(submissions[0].provider, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmatched_vehicle_uses_default_context() {
        let sink = Arc::new(RecordingSink::new(false));
        let dispatcher = SinkDispatcher::new(Arc::clone(&sink) as Arc<dyn ViolationSink>, 4);

        let stats = dispatcher
            .dispatch(
                &[record("UNKNOWN", "FL")],
                &[vehicle("ABC123", 7)],
                &CancellationToken::new(),
            )
            .await;

        // Missing vehicle is a warning, not a failure.
        assert_eq!(stats, DispatchStats { submitted: 1, failed: 0 });
        let submissions = sink.submissions.lock().expect("submissions lock");
        assert_eq!(submissions[0].provider, DEFAULT_VEHICLE_CONTEXT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_counted_not_retried() {
        let sink = Arc::new(RecordingSink::new(true));
        let dispatcher = SinkDispatcher::new(Arc::clone(&sink) as Arc<dyn ViolationSink>, 4);

        let stats = dispatcher
            .dispatch(
                &[record("ABC123", "FL"), record("XYZ789", "FL")],
                &[],
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(stats, DispatchStats { submitted: 0, failed: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_capped() {
        let sink = Arc::new(RecordingSink::new(false));
        let dispatcher = SinkDispatcher::new(Arc::clone(&sink) as Arc<dyn ViolationSink>, 2);

        let citations: Vec<_> = (0..10).map(|i| record(&format!("TAG{i}"), "FL")).collect();
        let stats = dispatcher
            .dispatch(&citations, &[], &CancellationToken::new())
            .await;

        assert_eq!(stats.submitted, 10);
        assert!(sink.peak_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_new_submissions() {
        let sink = Arc::new(RecordingSink::new(false));
        let dispatcher = SinkDispatcher::new(Arc::clone(&sink) as Arc<dyn ViolationSink>, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = dispatcher
            .dispatch(&[record("ABC123", "FL")], &[], &cancel)
            .await;

        assert_eq!(stats, DispatchStats::default());
    }
}
