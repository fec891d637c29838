//! Process-wide run progress, readable by an external observer.
//!
//! The tracker outlives any single run: it is created once at process
//! start, reset when a run begins, and mutated throughout. Every mutator
//! takes the internal mutex for the duration of the field update only;
//! observers read an atomic snapshot and never block the engine for long.

use crate::types::VehicleKey;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

/// Point-in-time view of run progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Whether a run is currently in flight
    pub running: bool,
    /// When the current run started, if one is running
    pub started_at: Option<DateTime<Utc>>,
    /// Vehicles with at least one completed provider cell
    pub processed_vehicles: usize,
    /// Total vehicles in the current run
    pub total_vehicles: usize,
    /// Citations found so far
    pub violation_count: usize,
}

#[derive(Debug, Default)]
struct ProgressInner {
    running: bool,
    started_at: Option<DateTime<Utc>>,
    processed_vehicles: usize,
    total_vehicles: usize,
    violation_count: usize,
    seen_vehicles: HashSet<VehicleKey>,
}

/// Shared, thread-safe progress counters for the citation run.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    inner: Mutex<ProgressInner>,
}

impl ProgressTracker {
    /// Create a tracker with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a run as started.
    pub fn start(&self) {
        let mut inner = self.inner.lock().expect("progress lock");
        inner.running = true;
        inner.started_at = Some(Utc::now());
    }

    /// Mark the run as finished. Counters keep their final values so an
    /// observer can still read the last run's totals.
    pub fn stop(&self) {
        let mut inner = self.inner.lock().expect("progress lock");
        inner.running = false;
        inner.started_at = None;
    }

    /// Reset counters and seed the vehicle total for a new run.
    pub fn reset(&self, total_vehicles: usize) {
        let mut inner = self.inner.lock().expect("progress lock");
        inner.processed_vehicles = 0;
        inner.total_vehicles = total_vehicles;
        inner.violation_count = 0;
        inner.seen_vehicles.clear();
    }

    /// Record that a provider cell finished for the given vehicle.
    ///
    /// The processed count increments only the first time a vehicle is
    /// seen, no matter how many providers were tried against it. Returns
    /// whether this call performed the increment.
    pub fn mark_vehicle_processed(&self, key: &VehicleKey) -> bool {
        let mut inner = self.inner.lock().expect("progress lock");
        if inner.seen_vehicles.insert(key.clone()) {
            inner.processed_vehicles += 1;
            true
        } else {
            false
        }
    }

    /// Add found citations to the running total.
    pub fn add_violations(&self, count: usize) {
        let mut inner = self.inner.lock().expect("progress lock");
        inner.violation_count += count;
    }

    /// Non-blocking-ish snapshot read for observers.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let inner = self.inner.lock().expect("progress lock");
        ProgressSnapshot {
            running: inner.running,
            started_at: inner.started_at,
            processed_vehicles: inner.processed_vehicles,
            total_vehicles: inner.total_vehicles,
            violation_count: inner.violation_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop() {
        let tracker = ProgressTracker::new();
        assert!(!tracker.snapshot().running);

        tracker.start();
        let snap = tracker.snapshot();
        assert!(snap.running);
        assert!(snap.started_at.is_some());

        tracker.stop();
        let snap = tracker.snapshot();
        assert!(!snap.running);
        assert!(snap.started_at.is_none());
    }

    #[test]
    fn test_vehicle_processed_add_once() {
        let tracker = ProgressTracker::new();
        tracker.reset(2);

        let key = VehicleKey::new("ABC123", "FL");
        assert!(tracker.mark_vehicle_processed(&key));
        assert!(!tracker.mark_vehicle_processed(&key));
        assert!(!tracker.mark_vehicle_processed(&key));
        assert_eq!(tracker.snapshot().processed_vehicles, 1);

        assert!(tracker.mark_vehicle_processed(&VehicleKey::new("XYZ789", "FL")));
        assert_eq!(tracker.snapshot().processed_vehicles, 2);
    }

    #[test]
    fn test_reset_clears_seen_vehicles() {
        let tracker = ProgressTracker::new();
        tracker.reset(1);

        let key = VehicleKey::new("ABC123", "FL");
        tracker.mark_vehicle_processed(&key);
        tracker.add_violations(3);

        tracker.reset(5);
        let snap = tracker.snapshot();
        assert_eq!(snap.processed_vehicles, 0);
        assert_eq!(snap.total_vehicles, 5);
        assert_eq!(snap.violation_count, 0);
        // Seen set was cleared, so the same vehicle counts again.
        assert!(tracker.mark_vehicle_processed(&key));
    }

    #[test]
    fn test_concurrent_marking() {
        use std::sync::Arc;

        let tracker = Arc::new(ProgressTracker::new());
        tracker.reset(1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    tracker.mark_vehicle_processed(&VehicleKey::new("ABC123", "FL"))
                })
            })
            .collect();

        let increments = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .filter(|did| *did)
            .count();

        assert_eq!(increments, 1);
        assert_eq!(tracker.snapshot().processed_vehicles, 1);
    }
}
