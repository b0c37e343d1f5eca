//! Archive reconciler.
//!
//! Applies one CollectionResult to the store inside a single transaction:
//! upsert the company aggregate, insert/refresh jobs, and — only for
//! complete results — close everything the pass did not observe.
//!
//! Guarantees:
//! - replaying a result is a no-op (idempotence)
//! - `last_seen` never regresses, so out-of-order results converge to the
//!   timestamp-order state
//! - per-company serialization via a keyed async mutex

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use crate::domain::models::{CollectionResult, ReconcileOutcome};
use crate::error::{CoreError, Result};
use crate::repository::sqlite::fmt_ts;

pub struct Reconciler {
    pool: SqlitePool,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: DashMap::new(),
        }
    }

    /// Apply a collection result. `StoreConflict` is retried once; any
    /// other failure is surfaced to fail this company's slice of the pass.
    pub async fn apply(&self, result: &CollectionResult) -> Result<ReconcileOutcome> {
        let lock = self
            .locks
            .entry(result.company_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        match self.apply_tx(result).await {
            Err(CoreError::StoreConflict(msg)) => {
                log::warn!(
                    "[RECONCILE] Store conflict for {}, retrying once: {}",
                    result.company_id,
                    msg
                );
                self.apply_tx(result).await
            }
            other => other,
        }
    }

    async fn apply_tx(&self, result: &CollectionResult) -> Result<ReconcileOutcome> {
        let ts = fmt_ts(result.collected_at);
        let mut tx = self.pool.begin().await?;

        // 1. Company aggregate. Insert keeps first_discovered; update
        //    refreshes counts and advances last_updated monotonically.
        sqlx::query(
            r#"
            INSERT INTO companies (
                id, company_name, ats_type, token,
                job_count, remote_count, hybrid_count, onsite_count,
                locations, departments, normalized_locations, extracted_skills,
                careers_url, first_discovered, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
            ON CONFLICT(id) DO UPDATE SET
                job_count = excluded.job_count,
                remote_count = excluded.remote_count,
                hybrid_count = excluded.hybrid_count,
                onsite_count = excluded.onsite_count,
                locations = excluded.locations,
                departments = excluded.departments,
                normalized_locations = excluded.normalized_locations,
                extracted_skills = excluded.extracted_skills,
                careers_url = excluded.careers_url,
                last_updated = CASE
                    WHEN julianday(excluded.last_updated) > julianday(companies.last_updated)
                    THEN excluded.last_updated
                    ELSE companies.last_updated
                END
            "#,
        )
        .bind(&result.company_id)
        .bind(&result.company_name)
        .bind(&result.ats_type)
        .bind(&result.token)
        .bind(result.aggregates.job_count)
        .bind(result.aggregates.remote_count)
        .bind(result.aggregates.hybrid_count)
        .bind(result.aggregates.onsite_count)
        .bind(serde_json::to_string(&result.aggregates.locations).unwrap_or_default())
        .bind(serde_json::to_string(&result.aggregates.departments).unwrap_or_default())
        .bind(serde_json::to_string(&result.aggregates.normalized_locations).unwrap_or_default())
        .bind(serde_json::to_string(&result.aggregates.extracted_skills).unwrap_or_default())
        .bind(&result.careers_url)
        .bind(&ts)
        .execute(&mut *tx)
        .await?;

        // 2. Job upserts. Count adds against the pre-existing hash set.
        let existing: HashSet<String> =
            sqlx::query("SELECT job_hash FROM job_archive WHERE company_id = ?")
                .bind(&result.company_id)
                .fetch_all(&mut *tx)
                .await?
                .iter()
                .filter_map(|r| r.try_get::<String, _>("job_hash").ok())
                .collect();

        let mut jobs_added = 0u64;
        let mut jobs_refreshed = 0u64;

        for job in &result.jobs {
            if existing.contains(&job.job_hash) {
                jobs_refreshed += 1;
            } else {
                jobs_added += 1;
            }

            sqlx::query(
                r#"
                INSERT INTO job_archive (
                    job_hash, company_id, job_title, city, region, country,
                    work_type, skills, first_seen, last_seen, status, time_to_fill
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 'open', NULL)
                ON CONFLICT(job_hash) DO UPDATE SET
                    last_seen = CASE
                        WHEN julianday(excluded.last_seen) > julianday(job_archive.last_seen)
                        THEN excluded.last_seen
                        ELSE job_archive.last_seen
                    END,
                    status = 'open',
                    time_to_fill = NULL
                "#,
            )
            .bind(&job.job_hash)
            .bind(&result.company_id)
            .bind(&job.title)
            .bind(&job.city)
            .bind(&job.region)
            .bind(&job.country)
            .bind(job.work_type.as_str())
            .bind(serde_json::to_string(&job.skills).unwrap_or_default())
            .bind(&ts)
            .execute(&mut *tx)
            .await?;
        }

        // 3. Closures, only when the pass observed the complete open set
        let mut jobs_closed = 0u64;
        if result.is_complete() {
            let closed = sqlx::query(
                r#"
                UPDATE job_archive SET
                    status = 'closed',
                    time_to_fill = CAST(julianday(?1) - julianday(first_seen) AS INTEGER)
                WHERE company_id = ?2
                  AND status = 'open'
                  AND julianday(last_seen) < julianday(?1)
                "#,
            )
            .bind(&ts)
            .bind(&result.company_id)
            .execute(&mut *tx)
            .await?;
            jobs_closed = closed.rows_affected();
        }

        tx.commit().await?;

        if jobs_added + jobs_closed > 0 {
            log::info!(
                "[RECONCILE] {}: +{} jobs, {} refreshed, {} closed",
                result.company_name,
                jobs_added,
                jobs_refreshed,
                jobs_closed
            );
        }

        Ok(ReconcileOutcome {
            jobs_added,
            jobs_refreshed,
            jobs_closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{JobStatus, PartialInfo};
    use crate::repository::sqlite::JobArchiveRepository;
    use crate::test_utils::fixtures::{collection_result, setup_test_db};
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_apply_inserts_company_and_jobs() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());

        let result = collection_result("acme", &["J1", "J2"], t0());
        let outcome = reconciler.apply(&result).await.unwrap();
        assert_eq!(outcome.jobs_added, 2);
        assert_eq!(outcome.jobs_closed, 0);

        let jobs = JobArchiveRepository::new(pool)
            .get_for_company(&result.company_id)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        for job in &jobs {
            assert_eq!(job.status, JobStatus::Open);
            assert_eq!(job.first_seen, t0());
            assert_eq!(job.last_seen, t0());
            assert!(job.time_to_fill.is_none());
        }
    }

    #[tokio::test]
    async fn test_replay_is_idempotent() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());

        let result = collection_result("acme", &["J1", "J2"], t0());
        reconciler.apply(&result).await.unwrap();
        let second = reconciler.apply(&result).await.unwrap();

        assert_eq!(second.jobs_added, 0);
        assert_eq!(second.jobs_refreshed, 2);
        assert_eq!(second.jobs_closed, 0);

        let jobs = JobArchiveRepository::new(pool)
            .get_for_company(&result.company_id)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.first_seen == t0() && j.last_seen == t0()));
    }

    #[tokio::test]
    async fn test_complete_result_closes_unobserved_jobs() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());

        let t1 = t0() + Duration::days(10);
        reconciler
            .apply(&collection_result("acme", &["J1", "J2", "J3"], t0()))
            .await
            .unwrap();
        let outcome = reconciler
            .apply(&collection_result("acme", &["J1", "J2"], t1))
            .await
            .unwrap();
        assert_eq!(outcome.jobs_closed, 1);

        let result = collection_result("acme", &[], t0());
        let jobs = JobArchiveRepository::new(pool)
            .get_for_company(&result.company_id)
            .await
            .unwrap();

        let j3 = jobs.iter().find(|j| j.job_title == "J3").unwrap();
        assert_eq!(j3.status, JobStatus::Closed);
        assert_eq!(j3.time_to_fill, Some(10));
        assert_eq!(j3.last_seen, t0());

        for alive in jobs.iter().filter(|j| j.job_title != "J3") {
            assert_eq!(alive.status, JobStatus::Open);
            assert_eq!(alive.last_seen, t1);
            assert_eq!(alive.first_seen, t0());
        }
    }

    #[tokio::test]
    async fn test_partial_result_never_closes() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());

        let t1 = t0() + Duration::days(3);
        reconciler
            .apply(&collection_result("acme", &["J1", "J2", "J3"], t0()))
            .await
            .unwrap();

        let mut partial = collection_result("acme", &["J1"], t1);
        partial.partial = Some(PartialInfo {
            pages_ok: 1,
            error: "HTTP 500".to_string(),
        });
        let outcome = reconciler.apply(&partial).await.unwrap();
        assert_eq!(outcome.jobs_closed, 0);

        let jobs = JobArchiveRepository::new(pool)
            .get_for_company(&partial.company_id)
            .await
            .unwrap();
        assert!(jobs.iter().all(|j| j.status == JobStatus::Open));

        let j1 = jobs.iter().find(|j| j.job_title == "J1").unwrap();
        assert_eq!(j1.last_seen, t1);
        for untouched in jobs.iter().filter(|j| j.job_title != "J1") {
            assert_eq!(untouched.last_seen, t0());
        }
    }

    #[tokio::test]
    async fn test_out_of_order_results_converge() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());

        let t1 = t0() + Duration::days(1);
        // Later pass lands first
        reconciler
            .apply(&collection_result("acme", &["J1"], t1))
            .await
            .unwrap();
        reconciler
            .apply(&collection_result("acme", &["J1"], t0()))
            .await
            .unwrap();

        let result = collection_result("acme", &[], t0());
        let jobs = JobArchiveRepository::new(pool)
            .get_for_company(&result.company_id)
            .await
            .unwrap();
        // last_seen never regresses
        assert_eq!(jobs[0].last_seen, t1);
        assert_eq!(jobs[0].status, JobStatus::Open);
    }

    #[tokio::test]
    async fn test_reopened_job_clears_time_to_fill() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());

        let t1 = t0() + Duration::days(5);
        let t2 = t0() + Duration::days(9);

        reconciler
            .apply(&collection_result("acme", &["J1"], t0()))
            .await
            .unwrap();
        // J1 disappears: closed with ttf
        reconciler
            .apply(&collection_result("acme", &[], t1))
            .await
            .unwrap();
        // J1 reappears: open again, ttf cleared
        reconciler
            .apply(&collection_result("acme", &["J1"], t2))
            .await
            .unwrap();

        let result = collection_result("acme", &[], t0());
        let jobs = JobArchiveRepository::new(pool)
            .get_for_company(&result.company_id)
            .await
            .unwrap();
        assert_eq!(jobs[0].status, JobStatus::Open);
        assert!(jobs[0].time_to_fill.is_none());
        // A re-sighting keeps the original first_seen
        assert_eq!(jobs[0].first_seen, t0());
        assert_eq!(jobs[0].last_seen, t2);
    }

    #[tokio::test]
    async fn test_company_aggregates_update() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());

        let result = collection_result("acme", &["J1", "J2"], t0());
        reconciler.apply(&result).await.unwrap();

        let company = crate::repository::sqlite::CompanyRepository::new(pool)
            .get_by_id(&result.company_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(company.job_count, 2);
        assert_eq!(company.ats_type, "greenhouse");
        assert_eq!(company.last_updated, t0());
    }
}
