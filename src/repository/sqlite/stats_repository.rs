//! Read-side analytics backing the dashboard and the market-intel report.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::fmt_ts;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GlobalStats {
    pub total_seeds: i64,
    pub untested_seeds: i64,
    pub total_jobs: i64,
    pub total_companies: i64,
    pub total_closed_jobs: i64,
    pub remote_jobs: i64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TtfMetrics {
    pub overall_avg_days: Option<f64>,
    pub by_work_type: Vec<(String, f64)>,
    pub by_country: Vec<(String, f64)>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub total_jobs: i64,
    pub remote_jobs: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CountChange {
    pub company_id: String,
    pub company_name: String,
    pub change_amount: i64,
    pub current_jobs: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStats {
    pub source: String,
    pub total_seeds: i64,
    pub hits: i64,
    pub avg_hit_rate: f64,
}

/// A company currently hiring across several countries; the raw material
/// for location-expansion reporting (read off the companies row).
#[derive(Debug, Clone, serde::Serialize)]
pub struct LocationSpread {
    pub company_name: String,
    pub countries: Vec<String>,
    pub job_count: i64,
}

pub struct StatsRepository {
    pool: SqlitePool,
}

impl StatsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_stats(&self) -> Result<GlobalStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM seeds) AS total_seeds,
                (SELECT COUNT(*) FROM seeds WHERE last_tested IS NULL) AS untested_seeds,
                (SELECT COALESCE(SUM(job_count), 0) FROM companies) AS total_jobs,
                (SELECT COUNT(*) FROM companies) AS total_companies,
                (SELECT COUNT(*) FROM job_archive WHERE status = 'closed') AS total_closed_jobs,
                (SELECT COUNT(*) FROM job_archive WHERE status = 'open' AND work_type = 'remote') AS remote_jobs
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch global stats")?;

        Ok(GlobalStats {
            total_seeds: row.try_get("total_seeds")?,
            untested_seeds: row.try_get("untested_seeds")?,
            total_jobs: row.try_get("total_jobs")?,
            total_companies: row.try_get("total_companies")?,
            total_closed_jobs: row.try_get("total_closed_jobs")?,
            remote_jobs: row.try_get("remote_jobs")?,
        })
    }

    /// Time-to-fill over the closed archive: overall, by work type (min 5
    /// closures), and for the ten countries with the most closures.
    pub async fn get_time_to_fill_metrics(&self) -> Result<TtfMetrics> {
        let overall = sqlx::query(
            r#"
            SELECT AVG(time_to_fill) AS avg_ttf
            FROM job_archive
            WHERE status = 'closed' AND time_to_fill IS NOT NULL AND time_to_fill > 0
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch overall time-to-fill")?;

        let by_work_type = sqlx::query(
            r#"
            SELECT work_type, AVG(time_to_fill) AS avg_ttf
            FROM job_archive
            WHERE status = 'closed' AND time_to_fill IS NOT NULL AND time_to_fill > 0
            GROUP BY work_type
            HAVING COUNT(*) >= 5
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch time-to-fill by work type")?;

        let by_country = sqlx::query(
            r#"
            SELECT country, AVG(time_to_fill) AS avg_ttf, COUNT(*) AS closed_count
            FROM job_archive
            WHERE status = 'closed' AND time_to_fill IS NOT NULL AND time_to_fill > 0
              AND country IS NOT NULL
            GROUP BY country
            ORDER BY closed_count DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch time-to-fill by country")?;

        Ok(TtfMetrics {
            overall_avg_days: overall.try_get("avg_ttf")?,
            by_work_type: by_work_type
                .iter()
                .map(|r| {
                    Ok((
                        r.try_get::<Option<String>, _>("work_type")?.unwrap_or_default(),
                        r.try_get("avg_ttf")?,
                    ))
                })
                .collect::<Result<_>>()?,
            by_country: by_country
                .iter()
                .map(|r| Ok((r.try_get::<String, _>("country")?, r.try_get("avg_ttf")?)))
                .collect::<Result<_>>()?,
        })
    }

    /// Most-demanded skills across open postings.
    pub async fn top_skills(&self, limit: i64) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT je.value AS skill, COUNT(*) AS count
            FROM job_archive, json_each(job_archive.skills) AS je
            WHERE job_archive.status = 'open'
            GROUP BY je.value
            ORDER BY count DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch top skills")?;

        rows.iter()
            .map(|r| Ok((r.try_get("skill")?, r.try_get("count")?)))
            .collect()
    }

    pub async fn top_hiring_countries(&self, limit: i64) -> Result<Vec<(String, i64)>> {
        self.top_archive_column("country", limit).await
    }

    pub async fn top_hiring_cities(&self, limit: i64) -> Result<Vec<(String, i64)>> {
        self.top_archive_column("city", limit).await
    }

    async fn top_archive_column(&self, column: &str, limit: i64) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {col} AS value, COUNT(*) AS count
            FROM job_archive
            WHERE status = 'open' AND {col} IS NOT NULL
            GROUP BY {col}
            ORDER BY count DESC
            LIMIT ?
            "#,
            col = column
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch top archive column")?;

        rows.iter()
            .map(|r| Ok((r.try_get("value")?, r.try_get("count")?)))
            .collect()
    }

    /// Daily open-posting totals derived from the 6 h snapshots.
    pub async fn market_trends(&self, now: DateTime<Utc>, days: i64) -> Result<Vec<TrendPoint>> {
        let rows = sqlx::query(
            r#"
            SELECT substr(snapshot_time, 1, 10) AS date,
                   SUM(job_count) AS total_jobs,
                   SUM(remote_count) AS remote_jobs
            FROM snapshots_6h
            WHERE julianday(snapshot_time) >= julianday(?1) - ?2
            GROUP BY substr(snapshot_time, 1, 10)
            ORDER BY date
            "#,
        )
        .bind(fmt_ts(now))
        .bind(days)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch market trends")?;

        rows.iter()
            .map(|r| {
                Ok(TrendPoint {
                    date: r.try_get("date")?,
                    total_jobs: r.try_get("total_jobs")?,
                    remote_jobs: r.try_get("remote_jobs")?,
                })
            })
            .collect()
    }

    /// Companies whose job counts moved by at least 3 over the window,
    /// split into surges and declines (top 15 each).
    pub async fn job_count_changes(
        &self,
        now: DateTime<Utc>,
        days: i64,
    ) -> Result<(Vec<CountChange>, Vec<CountChange>)> {
        let rows = sqlx::query(
            r#"
            WITH windowed AS (
                SELECT company_id, job_count, snapshot_time,
                       ROW_NUMBER() OVER (PARTITION BY company_id ORDER BY snapshot_time DESC) AS rn_latest,
                       ROW_NUMBER() OVER (PARTITION BY company_id ORDER BY snapshot_time ASC) AS rn_oldest
                FROM snapshots_6h
                WHERE julianday(snapshot_time) >= julianday(?1) - ?2
            )
            SELECT c.company_name,
                   c.id AS company_id,
                   (latest.job_count - oldest.job_count) AS change_amount,
                   latest.job_count AS current_jobs
            FROM windowed latest
            JOIN windowed oldest ON latest.company_id = oldest.company_id
            JOIN companies c ON c.id = latest.company_id
            WHERE latest.rn_latest = 1 AND oldest.rn_oldest = 1
              AND ABS(latest.job_count - oldest.job_count) >= 3
            ORDER BY ABS(change_amount) DESC
            "#,
        )
        .bind(fmt_ts(now))
        .bind(days)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch job count changes")?;

        let changes: Vec<CountChange> = rows
            .iter()
            .map(|r| {
                Ok(CountChange {
                    company_id: r.try_get("company_id")?,
                    company_name: r.try_get("company_name")?,
                    change_amount: r.try_get("change_amount")?,
                    current_jobs: r.try_get("current_jobs")?,
                })
            })
            .collect::<Result<_>>()?;

        let surges = changes
            .iter()
            .filter(|c| c.change_amount > 0)
            .take(15)
            .cloned()
            .collect();
        let declines = changes
            .iter()
            .filter(|c| c.change_amount < 0)
            .take(15)
            .cloned()
            .collect();

        Ok((surges, declines))
    }

    /// Seed-source quality rollup for the dashboard.
    pub async fn source_stats(&self) -> Result<Vec<SourceStats>> {
        let rows = sqlx::query(
            r#"
            SELECT source,
                   COUNT(*) AS total_seeds,
                   SUM(CASE WHEN is_hit THEN 1 ELSE 0 END) AS hits,
                   AVG(hit_rate) AS avg_hit_rate
            FROM seeds
            GROUP BY source
            ORDER BY hits DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch source stats")?;

        rows.iter()
            .map(|r| {
                Ok(SourceStats {
                    source: r.try_get("source")?,
                    total_seeds: r.try_get("total_seeds")?,
                    hits: r.try_get("hits")?,
                    avg_hit_rate: r.try_get::<Option<f64>, _>("avg_hit_rate")?.unwrap_or(0.0),
                })
            })
            .collect()
    }

    /// Multi-country companies touched within the window, read off the
    /// companies row (snapshots carry no location breakdown).
    pub async fn location_spreads(
        &self,
        now: DateTime<Utc>,
        days: i64,
        limit: usize,
    ) -> Result<Vec<LocationSpread>> {
        let rows = sqlx::query(
            r#"
            SELECT company_name, normalized_locations, job_count
            FROM companies
            WHERE julianday(last_updated) >= julianday(?1) - ?2
            ORDER BY job_count DESC
            "#,
        )
        .bind(fmt_ts(now))
        .bind(days)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch location spreads")?;

        let mut spreads = Vec::new();
        for row in &rows {
            let countries: std::collections::BTreeMap<String, i64> =
                serde_json::from_str(&row.try_get::<String, _>("normalized_locations")?)
                    .unwrap_or_default();
            if countries.len() > 1 {
                spreads.push(LocationSpread {
                    company_name: row.try_get("company_name")?,
                    countries: countries.into_keys().collect(),
                    job_count: row.try_get("job_count")?,
                });
            }
            if spreads.len() >= limit {
                break;
            }
        }
        Ok(spreads)
    }
}
