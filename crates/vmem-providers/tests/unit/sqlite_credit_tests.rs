//! Credit repository semantics: atomic balance updates, refund dedup key.

use chrono::Utc;

use vmem_domain::entities::{CreditTransaction, Subscription, Tier, TransactionKind};
use vmem_domain::ports::CreditRepository;
use vmem_domain::value_objects::{JobId, TenantId};
use vmem_providers::{SqliteCreditRepository, SqliteExecutor};

const TENANT: TenantId = TenantId::new(7);

async fn repo_with_subscription(monthly: i64, topup: i64) -> SqliteCreditRepository {
    let executor = SqliteExecutor::connect_in_memory().await.unwrap();
    let repo = SqliteCreditRepository::new(executor);
    repo.insert_subscription(&Subscription {
        tenant: TENANT,
        tier: Tier::Free,
        monthly_remaining: monthly,
        topup_balance: topup,
        period_start: Utc::now(),
    })
    .await
    .unwrap();
    repo
}

fn tx(kind: TransactionKind, delta: i64, job_id: Option<JobId>) -> CreditTransaction {
    CreditTransaction {
        id: 0,
        tenant: TENANT,
        kind,
        delta,
        reason: "video_processing".to_owned(),
        job_id,
        content_id: None,
        description: String::new(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn try_deduct_splits_across_monthly_then_topup() {
    let repo = repo_with_subscription(10, 20).await;

    assert!(repo.try_deduct(TENANT, 15).await.unwrap());

    let sub = repo.get_subscription(TENANT).await.unwrap().unwrap();
    assert_eq!(sub.monthly_remaining, 0);
    assert_eq!(sub.topup_balance, 15);
}

#[tokio::test]
async fn try_deduct_rejects_when_combined_balance_is_short() {
    let repo = repo_with_subscription(5, 5).await;

    assert!(!repo.try_deduct(TENANT, 11).await.unwrap());

    // Balances untouched by the rejected attempt.
    let sub = repo.get_subscription(TENANT).await.unwrap().unwrap();
    assert_eq!(sub.monthly_remaining, 5);
    assert_eq!(sub.topup_balance, 5);
}

#[tokio::test]
async fn balance_never_goes_negative_under_repeated_deducts() {
    let repo = repo_with_subscription(10, 0).await;

    assert!(repo.try_deduct(TENANT, 6).await.unwrap());
    assert!(!repo.try_deduct(TENANT, 6).await.unwrap());
    assert!(repo.try_deduct(TENANT, 4).await.unwrap());

    let sub = repo.get_subscription(TENANT).await.unwrap().unwrap();
    assert_eq!(sub.monthly_remaining + sub.topup_balance, 0);
}

#[tokio::test]
async fn credit_back_fills_monthly_to_its_cap_then_spills_to_topup() {
    let repo = repo_with_subscription(95, 0).await;

    // Cap 100: 5 go to monthly, 7 spill into top-up.
    assert!(repo.credit_back(TENANT, 12, 100).await.unwrap());

    let sub = repo.get_subscription(TENANT).await.unwrap().unwrap();
    assert_eq!(sub.monthly_remaining, 100);
    assert_eq!(sub.topup_balance, 7);
}

#[tokio::test]
async fn credit_back_without_a_subscription_reports_false() {
    let executor = SqliteExecutor::connect_in_memory().await.unwrap();
    let repo = SqliteCreditRepository::new(executor);
    assert!(!repo.credit_back(TENANT, 5, 100).await.unwrap());
}

#[tokio::test]
async fn has_transaction_keys_on_job_and_kind() {
    let repo = repo_with_subscription(100, 0).await;
    let job = JobId::new();

    repo.append_transaction(&tx(TransactionKind::Deduct, -5, Some(job)))
        .await
        .unwrap();

    assert!(repo
        .has_transaction(TENANT, &job, TransactionKind::Deduct)
        .await
        .unwrap());
    assert!(!repo
        .has_transaction(TENANT, &job, TransactionKind::Refund)
        .await
        .unwrap());
    assert!(!repo
        .has_transaction(TENANT, &JobId::new(), TransactionKind::Deduct)
        .await
        .unwrap());
}

#[tokio::test]
async fn transactions_list_newest_first_with_round_tripped_fields() {
    let repo = repo_with_subscription(100, 0).await;
    let job = JobId::new();

    repo.append_transaction(&tx(TransactionKind::Deduct, -5, Some(job)))
        .await
        .unwrap();
    repo.append_transaction(&tx(TransactionKind::Refund, 5, Some(job)))
        .await
        .unwrap();

    let listed = repo.list_transactions(TENANT, 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].kind, TransactionKind::Refund);
    assert_eq!(listed[0].delta, 5);
    assert_eq!(listed[0].job_id, Some(job));
    assert_eq!(listed[1].kind, TransactionKind::Deduct);
    assert_eq!(listed[1].delta, -5);

    // Ledger sums to the expected net.
    let net: i64 = listed.iter().map(|t| t.delta).sum();
    assert_eq!(net, 0);
}

#[tokio::test]
async fn update_subscription_overwrites_tier_and_balances() {
    let repo = repo_with_subscription(100, 0).await;
    let mut sub = repo.get_subscription(TENANT).await.unwrap().unwrap();
    sub.tier = Tier::Pro;
    sub.monthly_remaining = 2000;
    sub.topup_balance = 50;
    repo.update_subscription(&sub).await.unwrap();

    let reloaded = repo.get_subscription(TENANT).await.unwrap().unwrap();
    assert_eq!(reloaded.tier, Tier::Pro);
    assert_eq!(reloaded.monthly_remaining, 2000);
    assert_eq!(reloaded.topup_balance, 50);
}
