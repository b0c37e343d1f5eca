//! Job archive reads plus the maintenance purge. Collection-pass writes to
//! this table belong to the Reconciler's transaction.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::{fmt_ts, map_job_status, map_work_type, parse_ts};
use crate::domain::models::JobRecord;

pub struct JobArchiveRepository {
    pool: SqlitePool,
}

impl JobArchiveRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_for_company(&self, company_id: &str) -> Result<Vec<JobRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT job_hash, company_id, job_title, city, region, country,
                   work_type, skills, first_seen, last_seen, status, time_to_fill
            FROM job_archive
            WHERE company_id = ?
            ORDER BY first_seen ASC, job_hash ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch jobs for company")?;

        rows.iter().map(map_job).collect()
    }

    pub async fn count_by_status(&self, status: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM job_archive WHERE status = ?")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count jobs by status")?;
        Ok(row.try_get("count")?)
    }

    /// Maintenance: drop closed postings whose last sighting is older than
    /// the retention window. Returns the purged row count.
    pub async fn purge_closed_older_than(&self, now: DateTime<Utc>, days: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM job_archive
            WHERE status = 'closed'
              AND julianday(last_seen) < julianday(?1) - ?2
            "#,
        )
        .bind(fmt_ts(now))
        .bind(days)
        .execute(&self.pool)
        .await
        .context("Failed to purge closed job archive")?;

        Ok(result.rows_affected())
    }
}

fn map_job(row: &sqlx::sqlite::SqliteRow) -> Result<JobRecord> {
    let skills: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("skills")?).unwrap_or_default();

    Ok(JobRecord {
        job_hash: row.try_get("job_hash")?,
        company_id: row.try_get("company_id")?,
        job_title: row.try_get::<Option<String>, _>("job_title")?.unwrap_or_default(),
        city: row.try_get("city")?,
        region: row.try_get("region")?,
        country: row.try_get("country")?,
        work_type: map_work_type(&row.try_get::<Option<String>, _>("work_type")?.unwrap_or_default()),
        skills,
        first_seen: parse_ts(&row.try_get::<String, _>("first_seen")?),
        last_seen: parse_ts(&row.try_get::<String, _>("last_seen")?),
        status: map_job_status(&row.try_get::<String, _>("status")?),
        time_to_fill: row.try_get("time_to_fill")?,
    })
}
