//! Per-provider request rate limiting.
//!
//! Two independent limits per provider: a semaphore capping concurrent
//! in-flight requests, and a timing gate enforcing minimum spacing
//! between consecutive grants. The spacing check-then-update runs under
//! a per-provider lock held across the wait, so two concurrent callers
//! can never both observe a stale last-granted time. Locks are
//! per-provider so unrelated providers never serialize each other.

use crate::error::{EngineError, Result};
use platewatch_core::{Provider, ProviderLimits};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

struct ProviderLimiterState {
    semaphore: Arc<Semaphore>,
    last_granted: Mutex<Option<Instant>>,
    limits: ProviderLimits,
}

impl ProviderLimiterState {
    fn new(limits: ProviderLimits) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limits.max_concurrent)),
            last_granted: Mutex::new(None),
            limits,
        }
    }
}

/// RAII grant from [`RateLimiter::acquire`].
///
/// Dropping the permit returns the concurrency slot, so release happens
/// exactly once on every exit path.
#[derive(Debug)]
pub struct RateLimiterPermit {
    _permit: OwnedSemaphorePermit,
}

/// Per-provider concurrency and spacing limiter.
///
/// Owns one [`ProviderLimiterState`] per provider, initialized from
/// [`Provider::limits`]. Construct a fresh instance per engine (or per
/// test); there is no process-wide state.
pub struct RateLimiter {
    providers: HashMap<Provider, ProviderLimiterState>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Create a limiter from the static provider budget table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(Provider::ALL.into_iter().map(|p| (p, p.limits())))
    }

    /// Create a limiter with explicit budgets. Providers not listed fall
    /// back to their table budget.
    #[must_use]
    pub fn with_limits(limits: impl IntoIterator<Item = (Provider, ProviderLimits)>) -> Self {
        let mut providers: HashMap<Provider, ProviderLimiterState> = Provider::ALL
            .into_iter()
            .map(|p| (p, ProviderLimiterState::new(p.limits())))
            .collect();

        for (provider, limit) in limits {
            providers.insert(provider, ProviderLimiterState::new(limit));
        }

        Self { providers }
    }

    /// Block until a concurrency slot is free for the provider and its
    /// minimum spacing has elapsed since the last grant.
    ///
    /// Cancellation during either wait returns [`EngineError::Cancelled`]
    /// without claiming a slot or advancing the spacing gate.
    pub async fn acquire(
        &self,
        provider: Provider,
        cancel: &CancellationToken,
    ) -> Result<RateLimiterPermit> {
        // The map is seeded with every provider variant at construction.
        let state = self
            .providers
            .get(&provider)
            .expect("limiter state initialized for every provider");

        let permit = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            permit = Arc::clone(&state.semaphore).acquire_owned() => {
                permit.expect("provider semaphore never closed")
            }
        };

        // Spacing gate: the lock is held across the wait so the
        // check-then-update is atomic per provider.
        let mut last_granted = tokio::select! {
            () = cancel.cancelled() => return Err(EngineError::Cancelled),
            guard = state.last_granted.lock() => guard,
        };

        if let Some(previous) = *last_granted {
            let due = previous + state.limits.min_spacing;
            if due > Instant::now() {
                trace!(%provider, "spacing gate: waiting");
                tokio::select! {
                    () = cancel.cancelled() => return Err(EngineError::Cancelled),
                    () = tokio::time::sleep_until(due) => {}
                }
            }
        }

        *last_granted = Some(Instant::now());
        drop(last_granted);

        Ok(RateLimiterPermit { _permit: permit })
    }

    /// Currently free concurrency slots for the provider.
    #[must_use]
    pub fn available_permits(&self, provider: Provider) -> usize {
        self.providers
            .get(&provider)
            .map_or(0, |state| state.semaphore.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    fn limiter(provider: Provider, max_concurrent: usize, spacing_ms: u64) -> RateLimiter {
        RateLimiter::with_limits([(
            provider,
            ProviderLimits {
                max_concurrent,
                min_spacing: Duration::from_millis(spacing_ms),
            },
        )])
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_enforced_under_load() {
        let limiter = Arc::new(limiter(Provider::Vanguard, 3, 100));
        let cancel = CancellationToken::new();
        let grants: Arc<StdMutex<Vec<Instant>>> = Arc::new(StdMutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            let grants = Arc::clone(&grants);
            handles.push(tokio::spawn(async move {
                let _permit = limiter
                    .acquire(Provider::Vanguard, &cancel)
                    .await
                    .expect("acquire");
                grants.lock().expect("grants lock").push(Instant::now());
                // Hold briefly so the cap matters too.
                tokio::time::sleep(Duration::from_millis(10)).await;
            }));
        }

        for handle in handles {
            handle.await.expect("task join");
        }

        let mut grants = grants.lock().expect("grants lock").clone();
        grants.sort();
        assert_eq!(grants.len(), 5);
        for pair in grants.windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(100),
                "grants closer than the minimum spacing: {:?}",
                pair[1] - pair[0]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap() {
        let limiter = limiter(Provider::CityOfKeyWest, 1, 0);
        let cancel = CancellationToken::new();

        let first = limiter
            .acquire(Provider::CityOfKeyWest, &cancel)
            .await
            .expect("first acquire");
        assert_eq!(limiter.available_permits(Provider::CityOfKeyWest), 0);

        // Second acquire must still be pending while the slot is held.
        let second = tokio::time::timeout(
            Duration::from_millis(50),
            limiter.acquire(Provider::CityOfKeyWest, &cancel),
        )
        .await;
        assert!(second.is_err(), "cap of 1 allowed a second grant");

        drop(first);
        let _second = limiter
            .acquire(Provider::CityOfKeyWest, &cancel)
            .await
            .expect("acquire after release");
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_providers_do_not_serialize() {
        let limiter = RateLimiter::with_limits([
            (
                Provider::Vanguard,
                ProviderLimits {
                    max_concurrent: 1,
                    min_spacing: Duration::from_secs(60),
                },
            ),
            (
                Provider::Metropolis,
                ProviderLimits {
                    max_concurrent: 1,
                    min_spacing: Duration::from_secs(60),
                },
            ),
        ]);
        let cancel = CancellationToken::new();

        // First grant on each provider sets its own gate.
        let _a = limiter
            .acquire(Provider::Vanguard, &cancel)
            .await
            .expect("vanguard acquire");
        let start = Instant::now();
        let _b = limiter
            .acquire(Provider::Metropolis, &cancel)
            .await
            .expect("metropolis acquire");
        assert!(Instant::now() - start < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_leaks_no_permits() {
        let limiter = Arc::new(limiter(Provider::MiamiParking, 1, 10_000));
        let cancel = CancellationToken::new();

        // Prime the spacing gate, then release the slot.
        let first = limiter
            .acquire(Provider::MiamiParking, &cancel)
            .await
            .expect("first acquire");
        drop(first);

        // Second caller is stuck in the spacing wait; cancel it.
        let waiting = {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            tokio::spawn(async move { limiter.acquire(Provider::MiamiParking, &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let result = waiting.await.expect("task join");
        assert!(matches!(result, Err(EngineError::Cancelled)));

        // No phantom hold: a fresh caller can acquire immediately.
        assert_eq!(limiter.available_permits(Provider::MiamiParking), 1);
        let fresh_cancel = CancellationToken::new();
        let _again = limiter
            .acquire(Provider::MiamiParking, &fresh_cancel)
            .await
            .expect("acquire after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_acquire() {
        let limiter = limiter(Provider::Vanguard, 1, 0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = limiter.acquire(Provider::Vanguard, &cancel).await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
        assert_eq!(limiter.available_permits(Provider::Vanguard), 1);
    }
}
