//! Shared domain types used across the platewatch crates.
//!
//! These are the normalized shapes the engine moves around: vehicles from
//! the fleet backend, citation records produced by readers, and the
//! per-cell processing errors collected during a run.

use crate::provider::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Currency code applied to every normalized amount.
pub const CURRENCY: &str = "USD";

/// Identity key for a vehicle: uppercased `TAG_STATE`.
///
/// Used for add-once processed tracking and for resolving a citation back
/// to its vehicle during sink dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VehicleKey(String);

impl VehicleKey {
    /// Build a key from a plate tag and issuing state.
    #[must_use]
    pub fn new(tag: &str, state: &str) -> Self {
        Self(format!(
            "{}_{}",
            tag.trim().to_uppercase(),
            state.trim().to_uppercase()
        ))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fleet vehicle as reported by the backend.
///
/// Immutable snapshot for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Backend identifier
    pub id: i64,
    /// Optional display label
    #[serde(default)]
    pub label: Option<String>,
    /// License plate
    pub tag: String,
    /// Issuing jurisdiction
    pub state: String,
    /// Backend context code the sink expects on submissions
    #[serde(default)]
    pub provider: i32,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

impl Vehicle {
    /// Identity key for processed tracking and sink lookup.
    #[must_use]
    pub fn key(&self) -> VehicleKey {
        VehicleKey::new(&self.tag, &self.state)
    }

    /// Short human-readable form, e.g. `ABC123 (FL)`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} ({})", self.tag, self.state)
    }
}

/// Payment status of a citation, with the backend's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Open and unpaid
    New,
    /// Settled (paid, voided, or closed)
    Paid,
    /// Under dispute
    Disputed,
    /// Partially paid
    Partial,
    /// Status not recognized
    Unknown,
}

impl PaymentStatus {
    /// Numeric code the backend stores.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::New => 0,
            Self::Paid => 1,
            Self::Disputed => 2,
            Self::Partial => 4,
            Self::Unknown => 5,
        }
    }

    /// Map a portal status string onto a payment status.
    ///
    /// Portals report free-text statuses; anything unrecognized maps to
    /// `Unknown` rather than failing the record.
    #[must_use]
    pub fn from_portal_status(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return Self::Unknown;
        };
        if status.is_empty() {
            return Self::Unknown;
        }

        match status.to_uppercase().as_str() {
            "OPEN" | "UNPAID" | "OVERDUE" => Self::New,
            "PAID" | "VOID" | "PENDING" | "CLOSED VOID" | "CLOSED WARNING" | "CLOSED PAID" => {
                Self::Paid
            }
            _ => Self::Unknown,
        }
    }
}

/// Category of fine, with the backend's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FineType {
    /// Parking violation
    Parking,
}

impl FineType {
    /// Numeric code the backend stores.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Parking => 1,
        }
    }
}

/// The normalized unit of output: one citation matched to one vehicle.
///
/// Created by a reader, consumed read-only by the engine and the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRecord {
    /// Provider-side identifier, when one exists
    #[serde(default)]
    pub id: Option<String>,
    /// Citation number
    #[serde(default)]
    pub citation_number: Option<String>,
    /// Notice number
    #[serde(default)]
    pub notice_number: Option<String>,
    /// Issuing agency display name
    pub agency: String,
    /// Location the citation was issued at
    #[serde(default)]
    pub address: Option<String>,
    /// Plate the citation was matched against
    pub tag: String,
    /// Issuing jurisdiction the lookup used
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
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Fine category
    pub fine_type: FineType,
    /// Free-text note from the provider
    #[serde(default)]
    pub note: Option<String>,
    /// Link back to the source portal
    pub link: String,
    /// Whether the citation is still actionable
    pub is_active: bool,
    /// Originating provider
    pub provider: Provider,
}

/// A record of one failed (vehicle, provider) attempt.
///
/// Purely diagnostic; collecting one never aborts the run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    /// Plate of the vehicle being looked up
    pub vehicle_tag: String,
    /// State of the vehicle being looked up
    pub vehicle_state: String,
    /// Provider the attempt was made against
    pub provider: Provider,
    /// What went wrong
    pub message: String,
    /// Numeric error code (HTTP status or provider-specific)
    pub code: i32,
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
    /// Optional key/value detail bag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

impl ProcessingError {
    /// Record a failed attempt.
    #[must_use]
    pub fn new(
        vehicle_tag: impl Into<String>,
        vehicle_state: impl Into<String>,
        provider: Provider,
        message: impl Into<String>,
        code: i32,
    ) -> Self {
        Self {
            vehicle_tag: vehicle_tag.into(),
            vehicle_state: vehicle_state.into(),
            provider,
            message: message.into(),
            code,
            timestamp: Utc::now(),
            details: None,
        }
    }

    /// Attach a key/value detail to the error.
    pub fn add_detail(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }
}
