//! Vehicle list client for the fleet backend.

use crate::error::Result;
use crate::http::{HttpExecutor, RetryPolicy};
use crate::token_cache::TokenCache;
use crate::traits::{TokenRefresher, VehicleSource};
use async_trait::async_trait;
use platewatch_core::Vehicle;
use std::sync::Arc;
use tracing::info;

/// Fetches the fleet's vehicle snapshot.
pub struct VehicleClient {
    executor: HttpExecutor,
    base_url: String,
    cache: Arc<TokenCache>,
}

impl VehicleClient {
    /// Create a vehicle client. The refresher handles 401s from an
    /// expired credential mid-run.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        cache: Arc<TokenCache>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            executor: HttpExecutor::new(RetryPolicy::api()).with_refresher(refresher),
            base_url: base_url.into(),
            cache,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/ExternalVehicles", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl VehicleSource for VehicleClient {
    async fn vehicles(&self) -> Result<Vec<Vehicle>> {
        let url = self.endpoint();
        info!("fetching fleet vehicles");

        self.executor
            .execute_enveloped::<Vec<Vehicle>, _>(None, || {
                let mut request = self.executor.client().get(&url);
                if let Some(token) = self.cache.get() {
                    request = request.bearer_auth(token);
                }
                request
            })
            .await
    }
}
