//! Credit and subscription entities: the money-like side of the system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{JobId, TenantId};

/// Subscription tier. Limits and monthly credit grants derive from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Starter,
    Pro,
    Team,
}

impl Tier {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Team => "team",
        }
    }

    /// Capitalized display form used in user-facing upgrade messages.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Starter => "Starter",
            Self::Pro => "Pro",
            Self::Team => "Team",
        }
    }

    /// The next tier up, if any (used to suggest upgrades).
    #[must_use]
    pub fn next(&self) -> Option<Tier> {
        match self {
            Self::Free => Some(Self::Starter),
            Self::Starter => Some(Self::Pro),
            Self::Pro => Some(Self::Team),
            Self::Team => None,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Self::Free
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "starter" => Ok(Self::Starter),
            "pro" => Ok(Self::Pro),
            "team" => Ok(Self::Team),
            _ => Err(format!("Unknown tier: {s}")),
        }
    }
}

/// Quota limits derived from a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Longest single media the tier may ingest, in minutes
    pub max_video_minutes: i64,
    /// Total stored media allowance, in megabytes
    pub storage_limit_mb: i64,
    /// Credits granted at the top of each monthly period
    pub monthly_credits: i64,
}

/// A tenant's subscription row. Lazily created on first billing touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub tenant: TenantId,
    pub tier: Tier,
    /// Credits remaining from the current monthly allocation
    pub monthly_remaining: i64,
    /// Purchased top-up credits, consumed after monthly
    pub topup_balance: i64,
    /// Start of the current monthly period
    pub period_start: DateTime<Utc>,
}

impl Subscription {
    /// Combined spendable balance.
    #[must_use]
    pub fn balance(&self) -> i64 {
        self.monthly_remaining + self.topup_balance
    }
}

/// Kind of ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Monthly allocation grant
    Grant,
    /// Work charged against the balance
    Deduct,
    /// Restoration for undelivered work
    Refund,
    /// Purchased top-up pack
    TopupPurchase,
}

impl TransactionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Deduct => "deduct",
            Self::Refund => "refund",
            Self::TopupPurchase => "topup_purchase",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grant" => Ok(Self::Grant),
            "deduct" => Ok(Self::Deduct),
            "refund" => Ok(Self::Refund),
            "topup_purchase" => Ok(Self::TopupPurchase),
            _ => Err(format!("Unknown transaction kind: {s}")),
        }
    }
}

/// One append-only ledger row.
///
/// `delta` is positive for grant/refund/topup and negative for deduct, so
/// the balance is always the plain sum of deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: i64,
    pub tenant: TenantId,
    pub kind: TransactionKind,
    pub delta: i64,
    /// Machine-readable reason ("video_processing")
    pub reason: String,
    /// Job this transaction settles, when applicable. Together with `kind`
    /// this forms the natural key that deduplicates refunds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Content this transaction relates to, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Human-readable description ("Video processing (12 min)")
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a duration feature gate check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationCheck {
    pub allowed: bool,
    /// The tier's duration ceiling in minutes
    pub max_duration_minutes: i64,
    /// Cheapest tier that would allow this duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_tier: Option<Tier>,
}

/// Outcome of a storage quota check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageCheck {
    pub allowed: bool,
    /// Megabytes currently used
    pub used_mb: f64,
    /// The tier's storage ceiling in megabytes
    pub limit_mb: i64,
}
