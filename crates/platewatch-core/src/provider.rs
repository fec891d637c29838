//! Provider identities and per-provider request budgets.
//!
//! Every external citation source is one [`Provider`] variant with a fixed
//! display name, a public portal link, and a request budget. The budget
//! table is the single source of truth the engine's rate limiter is built
//! from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One external citation data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Vanguard parking notices (JSON API)
    Vanguard,
    /// Professional Parking Management (form-submission portal)
    ProfessionalParkingManagement,
    /// Metropolis garages (JSON API)
    Metropolis,
    /// City of Fort Lauderdale citation portal (scraped)
    CityOfFortLauderdale,
    /// Miami Parking Authority (JSON API)
    MiamiParking,
    /// City of Key West citation portal (scraped)
    CityOfKeyWest,
}

/// Request budget for one provider.
///
/// Two independent limits: a cap on concurrent in-flight requests and a
/// floor on the spacing between consecutive granted requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderLimits {
    /// Maximum concurrent in-flight requests.
    pub max_concurrent: usize,
    /// Minimum spacing between consecutive granted requests.
    pub min_spacing: Duration,
}

impl Provider {
    /// Every known provider, in display order.
    pub const ALL: [Provider; 6] = [
        Provider::Vanguard,
        Provider::ProfessionalParkingManagement,
        Provider::Metropolis,
        Provider::CityOfFortLauderdale,
        Provider::MiamiParking,
        Provider::CityOfKeyWest,
    ];

    /// Human-readable display name, also used as the issuing agency on
    /// normalized records.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vanguard => "Vanguard",
            Self::ProfessionalParkingManagement => "Professional Parking Management",
            Self::Metropolis => "Metropolis",
            Self::CityOfFortLauderdale => "City of Fort Lauderdale",
            Self::MiamiParking => "Miami Parking Authority",
            Self::CityOfKeyWest => "City of Key West",
        }
    }

    /// Public portal for the provider, linked back from records.
    #[must_use]
    pub fn link(&self) -> &'static str {
        match self {
            Self::Vanguard => "https://www.payparkingnotice.com/",
            Self::ProfessionalParkingManagement => "https://paymyviolations.com/",
            Self::Metropolis => "https://www.metropolis.io/",
            Self::CityOfFortLauderdale => "https://fortlauderdale.aimsparking.com/",
            Self::MiamiParking => "https://parkingviolations.miamiparking.com/",
            Self::CityOfKeyWest => "https://keywest.aimsparking.com/",
        }
    }

    /// Per-provider request budget.
    ///
    /// JSON APIs tolerate short bursts; scraped portals are held to one
    /// in-flight request with multi-second spacing.
    #[must_use]
    pub fn limits(&self) -> ProviderLimits {
        match self {
            Self::Vanguard | Self::Metropolis => ProviderLimits {
                max_concurrent: 4,
                min_spacing: Duration::from_millis(250),
            },
            Self::MiamiParking => ProviderLimits {
                max_concurrent: 2,
                min_spacing: Duration::from_millis(500),
            },
            Self::ProfessionalParkingManagement => ProviderLimits {
                max_concurrent: 1,
                min_spacing: Duration::from_millis(2500),
            },
            Self::CityOfFortLauderdale | Self::CityOfKeyWest => ProviderLimits {
                max_concurrent: 1,
                min_spacing: Duration::from_millis(3000),
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
