//! SQLite credit repository: subscriptions plus the append-only ledger.
//!
//! The balance mutations are single conditional UPDATEs, so concurrent
//! workers cannot drive a balance negative, and the `(job_id, kind)` probe
//! backs the refund idempotency rule.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use vmem_domain::entities::{CreditTransaction, Subscription, Tier, TransactionKind};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{CreditRepository, DatabaseExecutor, SqlParam, SqlRow};
use vmem_domain::utils::epoch_secs;
use vmem_domain::value_objects::{JobId, TenantId};

use super::row_helpers::{required_i64, required_string};

/// SQLite-backed [`CreditRepository`].
pub struct SqliteCreditRepository {
    executor: Arc<dyn DatabaseExecutor>,
}

impl SqliteCreditRepository {
    pub fn new(executor: Arc<dyn DatabaseExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl CreditRepository for SqliteCreditRepository {
    async fn get_subscription(&self, tenant: TenantId) -> Result<Option<Subscription>> {
        let row = self
            .executor
            .query_one(
                "SELECT tenant_id, tier, monthly_remaining, topup_balance, period_start
                 FROM subscriptions WHERE tenant_id = ?",
                &[SqlParam::I64(tenant.as_i64())],
            )
            .await?;
        row.map(|r| row_to_subscription(r.as_ref())).transpose()
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.executor
            .execute(
                "INSERT OR IGNORE INTO tenants (id) VALUES (?)",
                &[SqlParam::I64(subscription.tenant.as_i64())],
            )
            .await?;
        self.executor
            .execute(
                r"
                INSERT INTO subscriptions
                    (tenant_id, tier, monthly_remaining, topup_balance, period_start)
                VALUES (?, ?, ?, ?, ?)
                ",
                &[
                    SqlParam::I64(subscription.tenant.as_i64()),
                    SqlParam::String(subscription.tier.as_str().to_owned()),
                    SqlParam::I64(subscription.monthly_remaining),
                    SqlParam::I64(subscription.topup_balance),
                    SqlParam::I64(subscription.period_start.timestamp()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.executor
            .execute(
                r"
                UPDATE subscriptions
                SET tier = ?, monthly_remaining = ?, topup_balance = ?, period_start = ?
                WHERE tenant_id = ?
                ",
                &[
                    SqlParam::String(subscription.tier.as_str().to_owned()),
                    SqlParam::I64(subscription.monthly_remaining),
                    SqlParam::I64(subscription.topup_balance),
                    SqlParam::I64(subscription.period_start.timestamp()),
                    SqlParam::I64(subscription.tenant.as_i64()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn try_deduct(&self, tenant: TenantId, amount: i64) -> Result<bool> {
        // Both column expressions read the row's pre-update values, so the
        // split between monthly and top-up is consistent and the guard in
        // the WHERE clause keeps the combined balance non-negative.
        let affected = self
            .executor
            .execute(
                r"
                UPDATE subscriptions
                SET monthly_remaining = MAX(0, monthly_remaining - ?1),
                    topup_balance = topup_balance - MAX(0, ?1 - monthly_remaining)
                WHERE tenant_id = ?2 AND monthly_remaining + topup_balance >= ?1
                ",
                &[SqlParam::I64(amount), SqlParam::I64(tenant.as_i64())],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn credit_back(&self, tenant: TenantId, amount: i64, monthly_cap: i64) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                r"
                UPDATE subscriptions
                SET monthly_remaining = MIN(?2, monthly_remaining + ?1),
                    topup_balance = topup_balance + MAX(0, monthly_remaining + ?1 - ?2)
                WHERE tenant_id = ?3
                ",
                &[
                    SqlParam::I64(amount),
                    SqlParam::I64(monthly_cap),
                    SqlParam::I64(tenant.as_i64()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn append_transaction(&self, tx: &CreditTransaction) -> Result<()> {
        self.executor
            .execute(
                r"
                INSERT INTO credit_transactions
                    (tenant_id, kind, delta, reason, job_id, content_id, description, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
                &[
                    SqlParam::I64(tx.tenant.as_i64()),
                    SqlParam::String(tx.kind.as_str().to_owned()),
                    SqlParam::I64(tx.delta),
                    SqlParam::String(tx.reason.clone()),
                    tx.job_id
                        .map_or(SqlParam::Null, |j| SqlParam::String(j.as_str())),
                    tx.content_id
                        .clone()
                        .map_or(SqlParam::Null, SqlParam::String),
                    SqlParam::String(tx.description.clone()),
                    SqlParam::I64(epoch_secs()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn has_transaction(
        &self,
        tenant: TenantId,
        job_id: &JobId,
        kind: TransactionKind,
    ) -> Result<bool> {
        let row = self
            .executor
            .query_one(
                "SELECT 1 AS present FROM credit_transactions
                 WHERE tenant_id = ? AND job_id = ? AND kind = ? LIMIT 1",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(job_id.as_str()),
                    SqlParam::String(kind.as_str().to_owned()),
                ],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn list_transactions(
        &self,
        tenant: TenantId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let rows = self
            .executor
            .query_all(
                "SELECT * FROM credit_transactions
                 WHERE tenant_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                &[SqlParam::I64(tenant.as_i64()), SqlParam::I64(limit as i64)],
            )
            .await?;
        rows.iter().map(|r| row_to_transaction(r.as_ref())).collect()
    }
}

fn row_to_subscription(row: &dyn SqlRow) -> Result<Subscription> {
    Ok(Subscription {
        tenant: TenantId::new(required_i64(row, "tenant_id")?),
        tier: Tier::from_str(&required_string(row, "tier")?).map_err(Error::database)?,
        monthly_remaining: required_i64(row, "monthly_remaining")?,
        topup_balance: required_i64(row, "topup_balance")?,
        period_start: Utc
            .timestamp_opt(required_i64(row, "period_start")?, 0)
            .single()
            .unwrap_or_default(),
    })
}

fn row_to_transaction(row: &dyn SqlRow) -> Result<CreditTransaction> {
    Ok(CreditTransaction {
        id: required_i64(row, "id")?,
        tenant: TenantId::new(required_i64(row, "tenant_id")?),
        kind: TransactionKind::from_str(&required_string(row, "kind")?)
            .map_err(Error::database)?,
        delta: required_i64(row, "delta")?,
        reason: required_string(row, "reason")?,
        job_id: row
            .try_get_string("job_id")?
            .map(|s| JobId::from_string(&s)),
        content_id: row.try_get_string("content_id")?,
        description: required_string(row, "description")?,
        created_at: Utc
            .timestamp_opt(required_i64(row, "created_at")?, 0)
            .single()
            .unwrap_or_default(),
    })
}
