//! Schema initialisation. Idempotent: every statement is CREATE IF NOT
//! EXISTS, run on every connect.

use vmem_domain::error::Result;
use vmem_domain::ports::DatabaseExecutor;

const STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS tenants (
        id INTEGER PRIMARY KEY
    )",
    r"
    CREATE TABLE IF NOT EXISTS subscriptions (
        tenant_id INTEGER PRIMARY KEY REFERENCES tenants(id),
        tier TEXT NOT NULL DEFAULT 'free',
        monthly_remaining INTEGER NOT NULL DEFAULT 0,
        topup_balance INTEGER NOT NULL DEFAULT 0,
        period_start INTEGER NOT NULL
    )",
    r"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        tenant_id INTEGER NOT NULL,
        source TEXT NOT NULL,
        source_kind TEXT NOT NULL DEFAULT 'url',
        mode TEXT NOT NULL DEFAULT 'general',
        settings TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'queued',
        progress REAL NOT NULL DEFAULT 0,
        status_text TEXT,
        title TEXT NOT NULL DEFAULT '',
        error TEXT,
        credits_deducted INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        started_at INTEGER,
        completed_at INTEGER,
        result TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_jobs_tenant_created ON jobs (tenant_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_tenant_status ON jobs (tenant_id, status)",
    r"
    CREATE TABLE IF NOT EXISTS content_vectors (
        id TEXT NOT NULL,
        tenant_id INTEGER NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        content_type TEXT NOT NULL DEFAULT 'other',
        mode TEXT NOT NULL DEFAULT 'general',
        summary TEXT NOT NULL DEFAULT '',
        topics TEXT NOT NULL DEFAULT '[]',
        tags TEXT NOT NULL DEFAULT '[]',
        collections TEXT NOT NULL DEFAULT '[]',
        source_url TEXT NOT NULL DEFAULT '',
        has_transcript INTEGER NOT NULL DEFAULT 0,
        full_content TEXT NOT NULL,
        searchable_text TEXT NOT NULL DEFAULT '',
        embedding TEXT NOT NULL DEFAULT '[]',
        file_size_bytes INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (tenant_id, id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_content_tenant_created ON content_vectors (tenant_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_content_source_url ON content_vectors (tenant_id, source_url)",
    r"
    CREATE TABLE IF NOT EXISTS entity_vectors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        content_id TEXT NOT NULL,
        entity_name TEXT NOT NULL,
        entity_type TEXT NOT NULL DEFAULT '',
        embedding TEXT NOT NULL DEFAULT '[]'
    )",
    "CREATE INDEX IF NOT EXISTS idx_entity_tenant_content ON entity_vectors (tenant_id, content_id)",
    r"
    CREATE TABLE IF NOT EXISTS collections (
        id TEXT NOT NULL,
        tenant_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL,
        PRIMARY KEY (tenant_id, id)
    )",
    r"
    CREATE TABLE IF NOT EXISTS credit_transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        delta INTEGER NOT NULL,
        reason TEXT NOT NULL DEFAULT '',
        job_id TEXT,
        content_id TEXT,
        description TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_credit_tx_tenant ON credit_transactions (tenant_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_credit_tx_job_kind ON credit_transactions (tenant_id, job_id, kind)",
    r"
    CREATE TABLE IF NOT EXISTS credit_topups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tenant_id INTEGER NOT NULL,
        credits INTEGER NOT NULL,
        purchased_at INTEGER NOT NULL
    )",
];

/// Create every table and index this deployment needs.
pub async fn initialize_schema(executor: &dyn DatabaseExecutor) -> Result<()> {
    for statement in STATEMENTS {
        executor.execute(statement, &[]).await?;
    }
    Ok(())
}
