//! JSON API reader for the Vanguard parking-notice service.
//!
//! Vanguard exposes a plate lookup endpoint returning notice records as
//! JSON. This reader maps those notices onto normalized citation
//! records. Its "no data" replies (404, or a lookup with zero notices)
//! are empty successes; every other failure is a reader error.

use crate::error::{ReaderError, Result};
use crate::reader::CitationReader;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use platewatch_client::{ClientError, HttpExecutor, RetryPolicy};
use platewatch_core::{CitationRecord, FineType, PaymentStatus, Provider, CURRENCY};
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

const DEFAULT_BASE_URL: &str = "https://www.payparkingnotice.com/api";

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d{1,2})?").expect("amount regex is hardcoded and valid")
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    records_found: u32,
    #[serde(default)]
    notices: Vec<Notice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Notice {
    #[serde(rename = "notice")]
    notice_number: String,
    #[serde(default)]
    notice_date: Option<NoticeDate>,
    #[serde(default)]
    entry_time: Option<String>,
    #[serde(default)]
    exit_time: Option<String>,
    #[serde(default)]
    ticket_status: String,
    lpn: String,
    lpn_state: String,
    #[serde(default)]
    lot_address: Option<String>,
    #[serde(default)]
    amount_due: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NoticeDate {
    ts: i64,
}

/// Reader for the Vanguard JSON API.
#[derive(Debug)]
pub struct VanguardReader {
    executor: HttpExecutor,
    base_url: String,
}

impl Default for VanguardReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VanguardReader {
    /// Create a reader against the production endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a reader against a custom endpoint (test harnesses).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            executor: HttpExecutor::new(RetryPolicy::api()),
            base_url: base_url.into(),
        }
    }

    fn lookup_url(&self) -> String {
        format!("{}/lookup", self.base_url.trim_end_matches('/'))
    }

    /// Whether a classified failure is Vanguard's way of saying "no
    /// records for this plate".
    fn is_no_data(err: &ClientError) -> bool {
        match err {
            ClientError::Api { status, .. } => matches!(status, 404 | 204),
            ClientError::Cancelled => false,
        }
    }

    fn map_notice(&self, notice: &Notice) -> CitationRecord {
        let settled = notice.ticket_status.eq_ignore_ascii_case("paid")
            || notice.ticket_status.eq_ignore_ascii_case("closed");

        CitationRecord {
            id: None,
            citation_number: None,
            notice_number: Some(notice.notice_number.clone()),
            agency: Provider::Vanguard.display_name().to_string(),
            address: notice.lot_address.clone(),
            tag: notice.lpn.clone(),
            state: notice.lpn_state.clone(),
            issue_date: notice
                .notice_date
                .as_ref()
                .and_then(|d| Utc.timestamp_millis_opt(d.ts).single()),
            start_date: parse_portal_datetime(notice.entry_time.as_deref()),
            end_date: parse_portal_datetime(notice.exit_time.as_deref()),
            amount: notice
                .amount_due
                .as_deref()
                .and_then(parse_amount)
                .unwrap_or(0.0),
            currency: CURRENCY.to_string(),
            payment_status: if settled {
                PaymentStatus::Paid
            } else {
                PaymentStatus::New
            },
            fine_type: FineType::Parking,
            note: Some(notice.ticket_status.clone()),
            link: Provider::Vanguard.link().to_string(),
            is_active: !settled,
            provider: Provider::Vanguard,
        }
    }
}

#[async_trait]
impl CitationReader for VanguardReader {
    fn provider(&self) -> Provider {
        Provider::Vanguard
    }

    async fn read_citations(&self, plate: &str, state: &str) -> Result<Vec<CitationRecord>> {
        let url = self.lookup_url();
        let state = state.to_uppercase();

        let response = self
            .executor
            .execute_json::<LookupResponse, _>(None, || {
                self.executor.client().get(&url).query(&[
                    ("method", "lpnLookup"),
                    ("lpn", plate),
                    ("lpnState", state.as_str()),
                    ("includeAll", "true"),
                ])
            })
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if Self::is_no_data(&e) => {
                info!(plate, state = %state, "no Vanguard records for plate");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(plate, state = %state, error = %e, "Vanguard lookup failed");
                return Err(ReaderError::from(e));
            }
        };

        if response.notices.is_empty() {
            info!(plate, state = %state, "no citations found");
            return Ok(Vec::new());
        }

        let citations: Vec<CitationRecord> = response
            .notices
            .iter()
            .map(|notice| self.map_notice(notice))
            .collect();

        info!(
            plate,
            state = %state,
            count = citations.len(),
            records_found = response.records_found,
            "found citations"
        );

        Ok(citations)
    }
}

/// Pull a dollar amount out of the display strings portals emit, like
/// `"$45.00"` or `"45.00 USD"`.
fn parse_amount(raw: &str) -> Option<f64> {
    AMOUNT_PATTERN.find(raw)?.as_str().parse().ok()
}

/// Parse the loose datetime strings portals emit.
fn parse_portal_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}
