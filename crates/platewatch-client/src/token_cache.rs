//! In-memory bearer token cache.
//!
//! The auth client populates the cache on sign-in; the other backend
//! clients read it to attach `Authorization` headers. Expired tokens are
//! cleared on read so a stale credential is never attached.

use chrono::{DateTime, Utc};
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Thread-safe cache holding at most one bearer token.
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token with its expiry.
    ///
    /// Empty tokens are rejected with a warning rather than cached.
    pub fn cache(&self, token: impl Into<String>, expires_at: DateTime<Utc>) {
        let token = token.into();
        if token.is_empty() {
            tracing::warn!("attempted to cache an empty token");
            return;
        }

        tracing::debug!(%expires_at, "caching bearer token");
        let mut slot = self.inner.write().expect("token cache lock");
        *slot = Some(CachedToken { token, expires_at });
    }

    /// Get the cached token if present and not expired.
    ///
    /// An expired token is cleared as a side effect.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        {
            let slot = self.inner.read().expect("token cache lock");
            match slot.as_ref() {
                Some(cached) if Utc::now() < cached.expires_at => {
                    return Some(cached.token.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        tracing::debug!("cached token expired, clearing");
        self.clear();
        None
    }

    /// Drop any cached token.
    pub fn clear(&self) {
        let mut slot = self.inner.write().expect("token cache lock");
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_cache_and_get() {
        let cache = TokenCache::new();
        assert!(cache.get().is_none());

        cache.cache("tok-1", Utc::now() + Duration::minutes(5));
        assert_eq!(cache.get().as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_expired_token_cleared_on_read() {
        let cache = TokenCache::new();
        cache.cache("tok-1", Utc::now() - Duration::seconds(1));
        assert!(cache.get().is_none());
        // Second read hits the already-cleared slot.
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_empty_token_rejected() {
        let cache = TokenCache::new();
        cache.cache("", Utc::now() + Duration::minutes(5));
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_clear() {
        let cache = TokenCache::new();
        cache.cache("tok-1", Utc::now() + Duration::minutes(5));
        cache.clear();
        assert!(cache.get().is_none());
    }
}
