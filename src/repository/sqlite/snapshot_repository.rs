//! Snapshot writes and pruning, owned by the Scheduler's maintenance job.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use sqlx::SqlitePool;

use super::fmt_ts;

/// Rolling retention for 6-hour snapshots.
pub const SNAPSHOT_RETENTION_DAYS: i64 = 90;

pub struct SnapshotRepository {
    pool: SqlitePool,
}

impl SnapshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Point-in-time copy of every company's aggregate counts.
    pub async fn create_6h(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO snapshots_6h (snapshot_time, company_id, job_count,
                                      remote_count, hybrid_count, onsite_count)
            SELECT ?1, id, job_count, remote_count, hybrid_count, onsite_count
            FROM companies
            "#,
        )
        .bind(fmt_ts(now))
        .execute(&self.pool)
        .await
        .context("Failed to create 6h snapshots")?;

        Ok(result.rows_affected())
    }

    pub async fn prune_6h(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM snapshots_6h WHERE julianday(snapshot_time) < julianday(?1) - ?2",
        )
        .bind(fmt_ts(now))
        .bind(SNAPSHOT_RETENTION_DAYS)
        .execute(&self.pool)
        .await
        .context("Failed to prune 6h snapshots")?;

        Ok(result.rows_affected())
    }

    /// Upsert this month's aggregate row per company; re-running within the
    /// same calendar month overwrites, never duplicates.
    pub async fn upsert_monthly(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO monthly_snapshots (company_id, year, month, job_count,
                                           remote_count, hybrid_count, onsite_count)
            SELECT id, ?1, ?2, job_count, remote_count, hybrid_count, onsite_count
            FROM companies
            ON CONFLICT(company_id, year, month) DO UPDATE SET
                job_count = excluded.job_count,
                remote_count = excluded.remote_count,
                hybrid_count = excluded.hybrid_count,
                onsite_count = excluded.onsite_count
            "#,
        )
        .bind(now.year())
        .bind(now.month() as i64)
        .execute(&self.pool)
        .await
        .context("Failed to upsert monthly snapshots")?;

        Ok(result.rows_affected())
    }
}
