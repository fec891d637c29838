//! Sign-in client for the fleet backend.

use crate::error::Result;
use crate::http::{HttpExecutor, RetryPolicy};
use crate::token_cache::TokenCache;
use crate::traits::{Authorizer, TokenRefresher};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platewatch_core::BackendConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthToken {
    token: String,
    token_expired: DateTime<Utc>,
}

/// Signs in against the fleet backend and populates the token cache.
///
/// The auth client never refreshes its own credential on 401: a failed
/// sign-in is simply a failed sign-in.
pub struct AuthClient {
    executor: HttpExecutor,
    config: BackendConfig,
    cache: Arc<TokenCache>,
}

impl AuthClient {
    /// Create an auth client over the shared token cache.
    #[must_use]
    pub fn new(config: BackendConfig, cache: Arc<TokenCache>) -> Self {
        Self {
            executor: HttpExecutor::new(RetryPolicy::api()),
            config,
            cache,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/UserAuth/signin",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn sign_in(&self) -> Result<AuthToken> {
        let url = self.endpoint();
        info!(email = %self.config.email, "signing in to fleet backend");

        self.executor
            .execute_enveloped::<AuthToken, _>(None, || {
                self.executor.client().post(&url).json(&SignInRequest {
                    email: &self.config.email,
                    password: &self.config.password,
                })
            })
            .await
    }
}

#[async_trait]
impl Authorizer for AuthClient {
    async fn try_authorize(&self) -> bool {
        self.cache.clear();

        match self.sign_in().await {
            Ok(auth) => {
                info!(email = %self.config.email, "sign-in successful");
                self.cache.cache(auth.token, auth.token_expired);
                true
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                false
            }
        }
    }
}

#[async_trait]
impl TokenRefresher for AuthClient {
    async fn refresh(&self) -> bool {
        self.try_authorize().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_request_shape() {
        let body = serde_json::to_value(SignInRequest {
            email: "ops@example.com",
            password: "hunter2",
        })
        .expect("serialize sign-in request");

        assert_eq!(body["email"], "ops@example.com");
        assert_eq!(body["password"], "hunter2");
    }

    #[test]
    fn test_auth_token_shape() {
        let token: AuthToken = serde_json::from_str(
            r#"{"token": "abc", "tokenExpired": "2026-01-01T00:00:00Z"}"#,
        )
        .expect("parse auth token");
        assert_eq!(token.token, "abc");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let config = BackendConfig {
            base_url: "https://backend.test/api/".to_string(),
            ..BackendConfig::default()
        };
        let client = AuthClient::new(config, Arc::new(TokenCache::new()));
        assert_eq!(client.endpoint(), "https://backend.test/api/UserAuth/signin");
    }
}
