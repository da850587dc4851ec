//! Broadcast Audit Log
//!
//! One immutable row per broadcast run, written at the end of the run
//! whether it completed cleanly or partially. Persistence is best-effort:
//! a write failure is logged and swallowed, because the in-memory result
//! already returned to the caller is the authoritative delivery report.

use super::engine::{BroadcastResult, DeliveryFailure};
use crate::clock::unix_now;
use sqlx::{Row, SqlitePool};
use tracing::error;

/// One persisted broadcast run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditRecord {
    pub id: i64,
    pub message: String,
    pub total_recipients: i64,
    pub successful_sends: i64,
    pub failed_sends: i64,
    pub failures: Vec<DeliveryFailure>,
    pub started_at: i64,
    pub completed_at: i64,
    pub created_at: i64,
}

/// Append-only audit log over the operator database.
#[derive(Clone)]
pub struct BroadcastAudit {
    pool: SqlitePool,
}

impl BroadcastAudit {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the audit table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS broadcast_logs ( \
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 message_content TEXT NOT NULL, \
                 total_recipients INTEGER NOT NULL, \
                 successful_sends INTEGER NOT NULL, \
                 failed_sends INTEGER NOT NULL, \
                 failures TEXT NOT NULL DEFAULT '[]', \
                 started_at INTEGER NOT NULL, \
                 completed_at INTEGER NOT NULL, \
                 created_at INTEGER NOT NULL \
             )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist one run. Never fails toward the caller: an insert error is
    /// logged and dropped.
    pub async fn record(&self, message: &str, result: &BroadcastResult) {
        if let Err(e) = self.insert(message, result).await {
            error!(error = %e, "failed to persist broadcast audit record");
        }
    }

    async fn insert(&self, message: &str, result: &BroadcastResult) -> Result<(), sqlx::Error> {
        let failures =
            serde_json::to_string(&result.failures).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO broadcast_logs ( \
                 message_content, total_recipients, successful_sends, failed_sends, \
                 failures, started_at, completed_at, created_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(message)
        .bind(result.total_recipients as i64)
        .bind(result.success_count as i64)
        .bind(result.failure_count as i64)
        .bind(failures)
        .bind(result.started_at as i64)
        .bind(result.completed_at as i64)
        .bind(unix_now() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent runs first. The read-back side of the audit trail.
    pub async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, message_content, total_recipients, successful_sends, failed_sends, \
                    failures, started_at, completed_at, created_at \
             FROM broadcast_logs ORDER BY id DESC LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let failures_json: String = row.try_get("failures")?;
            records.push(AuditRecord {
                id: row.try_get("id")?,
                message: row.try_get("message_content")?,
                total_recipients: row.try_get("total_recipients")?,
                successful_sends: row.try_get("successful_sends")?,
                failed_sends: row.try_get("failed_sends")?,
                failures: serde_json::from_str(&failures_json).unwrap_or_default(),
                started_at: row.try_get("started_at")?,
                completed_at: row.try_get("completed_at")?,
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(records)
    }
}
