//! Violation submission client and wire shape for the fleet backend.

use crate::error::Result;
use crate::http::{HttpExecutor, RetryPolicy};
use crate::token_cache::TokenCache;
use crate::traits::{TokenRefresher, ViolationSink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platewatch_core::CitationRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Wire shape the backend expects for one violation record.
///
/// Built from a normalized [`CitationRecord`] plus the backend context
/// code of the vehicle it resolved to. Enum fields are flattened to the
/// backend's numeric codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationSubmission {
    /// Provider-side identifier, when one exists
    #[serde(default)]
    pub id: Option<String>,
    /// Citation number
    #[serde(default)]
    pub citation_number: Option<String>,
    /// Notice number
    #[serde(default)]
    pub notice_number: Option<String>,
    /// Backend vehicle context code; `0` when no vehicle matched
    pub provider: i32,
    /// Issuing agency display name
    pub agency: String,
    /// Location the citation was issued at
    #[serde(default)]
    pub address: Option<String>,
    /// Plate the citation was matched against
    pub tag: String,
    /// Issuing jurisdiction
    pub state: String,
    /// Date the citation was issued
    #[serde(default)]
    pub issue_date: Option<DateTime<Utc>>,
    /// Parking session start
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Parking session end
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Amount due
    pub amount: f64,
    /// Currency code for `amount`
    pub currency: String,
    /// Numeric payment status code
    pub payment_status: i32,
    /// Numeric fine type code
    pub fine_type: i32,
    /// Free-text note from the provider
    #[serde(default)]
    pub note: Option<String>,
    /// Link back to the source portal
    pub link: String,
    /// Whether the citation is still actionable
    pub is_active: bool,
}

impl ViolationSubmission {
    /// Flatten a normalized record into the wire shape.
    #[must_use]
    pub fn from_record(record: &CitationRecord, vehicle_context: i32) -> Self {
        Self {
            id: record.id.clone(),
            citation_number: record.citation_number.clone(),
            notice_number: record.notice_number.clone(),
            provider: vehicle_context,
            agency: record.agency.clone(),
            address: record.address.clone(),
            tag: record.tag.clone(),
            state: record.state.clone(),
            issue_date: record.issue_date,
            start_date: record.start_date,
            end_date: record.end_date,
            amount: record.amount,
            currency: record.currency.clone(),
            payment_status: record.payment_status.code(),
            fine_type: record.fine_type.code(),
            note: record.note.clone(),
            link: record.link.clone(),
            is_active: record.is_active,
        }
    }
}

/// Submits violation records to the fleet backend.
pub struct ViolationClient {
    executor: HttpExecutor,
    base_url: String,
    cache: Arc<TokenCache>,
}

impl ViolationClient {
    /// Create a violation client with 401 refresh through the given
    /// refresher.
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
        format!(
            "{}/ExternalViolation/create",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ViolationSink for ViolationClient {
    async fn submit(&self, violation: &ViolationSubmission) -> Result<()> {
        let url = self.endpoint();
        info!(
            tag = %violation.tag,
            state = %violation.state,
            "submitting parking violation"
        );

        self.executor
            .execute_enveloped::<ViolationSubmission, _>(None, || {
                let mut request = self.executor.client().post(&url).json(violation);
                if let Some(token) = self.cache.get() {
                    request = request.bearer_auth(token);
                }
                request
            })
            .await
            .map(|_| ())
    }
}
