//! Credit/quota controller: ledger-backed balances and tier gates.
//!
//! Balances live on the subscription row; the append-only ledger is the
//! audit trail. Every deduct/refund appends exactly one ledger row, and a
//! refund's `(job_id, kind)` natural key suppresses duplicates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use vmem_domain::constants::credits::{
    tier_for_duration, tier_limits, MONTHLY_PERIOD_DAYS,
};
use vmem_domain::entities::{
    CreditTransaction, DurationCheck, StorageCheck, Subscription, Tier, TransactionKind,
};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{BillingInterface, ContentRepository, CreditRepository};
use vmem_domain::value_objects::{JobId, TenantId};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Concrete billing service over the credit and content repositories (the
/// latter for storage accounting).
pub struct BillingService {
    credits: Arc<dyn CreditRepository>,
    contents: Arc<dyn ContentRepository>,
}

impl BillingService {
    pub fn new(credits: Arc<dyn CreditRepository>, contents: Arc<dyn ContentRepository>) -> Self {
        Self { credits, contents }
    }

    fn ledger_row(
        tenant: TenantId,
        kind: TransactionKind,
        delta: i64,
        reason: &str,
        job_id: Option<JobId>,
        description: &str,
    ) -> CreditTransaction {
        CreditTransaction {
            id: 0, // server-assigned
            tenant,
            kind,
            delta,
            reason: reason.to_owned(),
            job_id,
            content_id: None,
            description: description.to_owned(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl BillingInterface for BillingService {
    async fn ensure_subscription(&self, tenant: TenantId) -> Result<Subscription> {
        if let Some(existing) = self.credits.get_subscription(tenant).await? {
            return Ok(existing);
        }

        let limits = tier_limits(Tier::Free);
        let subscription = Subscription {
            tenant,
            tier: Tier::Free,
            monthly_remaining: limits.monthly_credits,
            topup_balance: 0,
            period_start: Utc::now(),
        };
        self.credits.insert_subscription(&subscription).await?;
        self.credits
            .append_transaction(&Self::ledger_row(
                tenant,
                TransactionKind::Grant,
                limits.monthly_credits,
                "signup_grant",
                None,
                "Initial monthly credit allocation",
            ))
            .await?;
        info!(%tenant, credits = limits.monthly_credits, "created free-tier subscription");
        Ok(subscription)
    }

    async fn balance(&self, tenant: TenantId) -> Result<i64> {
        Ok(self.ensure_subscription(tenant).await?.balance())
    }

    async fn check_duration(&self, tenant: TenantId, minutes: f64) -> Result<DurationCheck> {
        let subscription = self.ensure_subscription(tenant).await?;
        let limits = tier_limits(subscription.tier);
        let allowed = minutes <= limits.max_video_minutes as f64;
        Ok(DurationCheck {
            allowed,
            max_duration_minutes: limits.max_video_minutes,
            required_tier: if allowed {
                None
            } else {
                tier_for_duration(minutes)
            },
        })
    }

    async fn check_storage(
        &self,
        tenant: TenantId,
        additional_bytes: i64,
    ) -> Result<StorageCheck> {
        let subscription = self.ensure_subscription(tenant).await?;
        let limits = tier_limits(subscription.tier);
        let used_bytes = self.contents.storage_used_bytes(tenant).await?;
        let used_mb = used_bytes as f64 / BYTES_PER_MB;
        let projected_mb = (used_bytes + additional_bytes) as f64 / BYTES_PER_MB;
        Ok(StorageCheck {
            allowed: projected_mb <= limits.storage_limit_mb as f64,
            used_mb,
            limit_mb: limits.storage_limit_mb,
        })
    }

    async fn deduct(
        &self,
        tenant: TenantId,
        amount: i64,
        reason: &str,
        job_id: Option<JobId>,
        description: &str,
    ) -> Result<()> {
        if amount <= 0 {
            return Err(Error::invalid_argument("Deduction amount must be positive"));
        }
        let subscription = self.ensure_subscription(tenant).await?;
        let available = subscription.balance();
        if available < amount {
            return Err(Error::InsufficientCredits {
                required: amount,
                available,
            });
        }

        // Conditional decrement: rejects when a concurrent deduct drained
        // the balance between the read above and this write.
        if !self.credits.try_deduct(tenant, amount).await? {
            let available = self.balance(tenant).await?;
            return Err(Error::InsufficientCredits {
                required: amount,
                available,
            });
        }

        self.credits
            .append_transaction(&Self::ledger_row(
                tenant,
                TransactionKind::Deduct,
                -amount,
                reason,
                job_id,
                description,
            ))
            .await?;
        debug!(%tenant, amount, "credits deducted");
        Ok(())
    }

    async fn refund(
        &self,
        tenant: TenantId,
        amount: i64,
        reason: &str,
        job_id: Option<JobId>,
        description: &str,
    ) -> Result<()> {
        if amount <= 0 {
            return Ok(());
        }

        // Idempotency: one refund per (job, kind). A queue retry that
        // crashes between refund and fail must not refund twice.
        if let Some(job) = &job_id {
            if self
                .credits
                .has_transaction(tenant, job, TransactionKind::Refund)
                .await?
            {
                debug!(%tenant, %job, "duplicate refund suppressed");
                return Ok(());
            }
        }

        let subscription = self.ensure_subscription(tenant).await?;
        let monthly_cap = tier_limits(subscription.tier).monthly_credits;
        self.credits.credit_back(tenant, amount, monthly_cap).await?;

        self.credits
            .append_transaction(&Self::ledger_row(
                tenant,
                TransactionKind::Refund,
                amount,
                reason,
                job_id,
                description,
            ))
            .await?;
        info!(%tenant, amount, "credits refunded");
        Ok(())
    }

    async fn topup(&self, tenant: TenantId, credits: i64, description: &str) -> Result<()> {
        if credits <= 0 {
            return Err(Error::invalid_argument("Top-up amount must be positive"));
        }
        let mut subscription = self.ensure_subscription(tenant).await?;
        subscription.topup_balance += credits;
        self.credits.update_subscription(&subscription).await?;
        self.credits
            .append_transaction(&Self::ledger_row(
                tenant,
                TransactionKind::TopupPurchase,
                credits,
                "topup_purchase",
                None,
                description,
            ))
            .await?;
        Ok(())
    }

    async fn monthly_reset(&self, tenant: TenantId) -> Result<()> {
        let mut subscription = self.ensure_subscription(tenant).await?;
        let now = Utc::now();
        if now - subscription.period_start < Duration::days(MONTHLY_PERIOD_DAYS) {
            return Ok(());
        }

        let monthly_cap = tier_limits(subscription.tier).monthly_credits;
        let granted = monthly_cap - subscription.monthly_remaining;
        subscription.monthly_remaining = monthly_cap;
        subscription.period_start = now;
        self.credits.update_subscription(&subscription).await?;

        if granted > 0 {
            self.credits
                .append_transaction(&Self::ledger_row(
                    tenant,
                    TransactionKind::Grant,
                    granted,
                    "monthly_reset",
                    None,
                    "Monthly credit allocation",
                ))
                .await?;
        }
        info!(%tenant, granted, "monthly credits reset");
        Ok(())
    }
}
