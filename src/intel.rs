//! Market intelligence and store maintenance.
//!
//! The 6-hourly maintenance job snapshots every company's aggregates,
//! prunes old snapshots, purges the closed archive past retention, writes
//! the monthly rollup during the early-morning run, and refreshes the
//! cached analytics report.

use chrono::{DateTime, Timelike, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::repository::sqlite::{
    CountChange, GlobalStats, JobArchiveRepository, LocationSpread, SnapshotRepository,
    StatsRepository, TtfMetrics,
};

/// Closed postings older than this are purged from the archive.
pub const ARCHIVE_RETENTION_DAYS: i64 = 90;

/// Monthly snapshots are written by runs before this UTC hour.
const MONTHLY_WRITE_BEFORE_HOUR: u32 = 6;

#[derive(Debug, Clone, serde::Serialize)]
pub struct MarketIntelReport {
    pub generated_at: DateTime<Utc>,
    pub period_days: i64,
    pub stats: GlobalStats,
    pub time_to_fill: TtfMetrics,
    pub top_skills: Vec<(String, i64)>,
    pub top_hiring_regions: Vec<(String, i64)>,
    pub top_hiring_cities: Vec<(String, i64)>,
    pub expansions: Vec<LocationSpread>,
    pub surges: Vec<CountChange>,
    pub declines: Vec<CountChange>,
}

#[derive(Debug)]
pub struct MaintenanceSummary {
    pub snapshots_written: u64,
    pub snapshots_pruned: u64,
    pub archives_purged: u64,
    pub monthly_written: bool,
    pub report: MarketIntelReport,
}

pub struct MarketIntel {
    stats: StatsRepository,
    snapshots: SnapshotRepository,
    archive: JobArchiveRepository,
}

impl MarketIntel {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            stats: StatsRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            archive: JobArchiveRepository::new(pool),
        }
    }

    pub async fn run_maintenance(&self, now: DateTime<Utc>) -> Result<MaintenanceSummary> {
        log::info!("[INTEL] Starting maintenance run");

        let snapshots_written = self.snapshots.create_6h(now).await?;
        let snapshots_pruned = self.snapshots.prune_6h(now).await?;

        let monthly_written = now.hour() < MONTHLY_WRITE_BEFORE_HOUR;
        if monthly_written {
            self.snapshots.upsert_monthly(now).await?;
        }

        let archives_purged = self
            .archive
            .purge_closed_older_than(now, ARCHIVE_RETENTION_DAYS)
            .await?;

        let report = self.generate_report(now, 7).await?;

        let ttf = report
            .time_to_fill
            .overall_avg_days
            .map(|d| format!("{:.1}", d))
            .unwrap_or_else(|| "n/a".to_string());
        let top_skill = report
            .top_skills
            .first()
            .map(|(s, _)| s.as_str())
            .unwrap_or("n/a");
        log::info!(
            "[INTEL] Maintenance complete: {} snapshots, {} pruned, {} purged | TTF {} days, top skill {}",
            snapshots_written,
            snapshots_pruned,
            archives_purged,
            ttf,
            top_skill
        );

        Ok(MaintenanceSummary {
            snapshots_written,
            snapshots_pruned,
            archives_purged,
            monthly_written,
            report,
        })
    }

    /// The cached analytics the dashboard reads.
    pub async fn generate_report(&self, now: DateTime<Utc>, days: i64) -> Result<MarketIntelReport> {
        let stats = self.stats.get_stats().await?;
        let time_to_fill = self.stats.get_time_to_fill_metrics().await?;
        let top_skills = self.stats.top_skills(15).await?;
        let top_hiring_regions = self.stats.top_hiring_countries(10).await?;
        let top_hiring_cities = self.stats.top_hiring_cities(10).await?;
        let expansions = self.stats.location_spreads(now, 30, 20).await?;
        let (surges, declines) = self.stats.job_count_changes(now, days).await?;

        Ok(MarketIntelReport {
            generated_at: now,
            period_days: days,
            stats,
            time_to_fill,
            top_skills,
            top_hiring_regions,
            top_hiring_cities,
            expansions,
            surges,
            declines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::JobStatus;
    use crate::reconcile::Reconciler;
    use crate::test_utils::fixtures::{collection_result, setup_test_db};
    use chrono::{Duration, TimeZone};
    use sqlx::Row;

    #[tokio::test]
    async fn test_maintenance_snapshots_and_report() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());
        let intel = MarketIntel::new(pool.clone());

        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 3, 0, 0).unwrap();
        reconciler
            .apply(&collection_result("acme", &["Engineer", "Designer"], t0))
            .await
            .unwrap();

        let summary = intel.run_maintenance(t0).await.unwrap();
        assert_eq!(summary.snapshots_written, 1);
        // 03:00 UTC run writes the monthly rollup
        assert!(summary.monthly_written);
        assert_eq!(summary.report.stats.total_companies, 1);
        assert_eq!(summary.report.stats.total_jobs, 2);

        // Afternoon run does not touch monthly
        let afternoon = intel
            .run_maintenance(t0 + Duration::hours(12))
            .await
            .unwrap();
        assert!(!afternoon.monthly_written);
    }

    #[tokio::test]
    async fn test_maintenance_purges_old_closed_jobs() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());
        let intel = MarketIntel::new(pool.clone());

        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let t1 = t0 + Duration::days(2);
        reconciler
            .apply(&collection_result("acme", &["Old Role"], t0))
            .await
            .unwrap();
        // Role disappears: closed at t1
        reconciler
            .apply(&collection_result("acme", &[], t1))
            .await
            .unwrap();

        // Just inside retention: kept
        let summary = intel
            .run_maintenance(t0 + Duration::days(91))
            .await
            .unwrap();
        assert_eq!(summary.archives_purged, 0);

        // Past retention (measured from last_seen): purged
        let summary = intel
            .run_maintenance(t1 + Duration::days(91))
            .await
            .unwrap();
        assert_eq!(summary.archives_purged, 1);
    }

    #[tokio::test]
    async fn test_report_surfaces_skills_and_regions() {
        let pool = setup_test_db().await;
        let reconciler = Reconciler::new(pool.clone());
        let intel = MarketIntel::new(pool.clone());

        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 3, 0, 0).unwrap();
        let mut result = collection_result("acme", &[], t0);
        result.jobs = vec![crate::normalize::normalize_job(
            &result.company_id,
            &crate::domain::models::RawJob {
                title: "Rust Engineer".to_string(),
                location: Some("Berlin, Germany".to_string()),
                description: Some("Kubernetes, Rust, PostgreSQL".to_string()),
                ..Default::default()
            },
        )];
        result.aggregates = crate::collector::compute_aggregates(&result.jobs);
        reconciler.apply(&result).await.unwrap();

        let report = intel.generate_report(t0, 7).await.unwrap();
        assert!(report.top_skills.iter().any(|(s, _)| s == "Rust"));
        assert!(report
            .top_hiring_regions
            .iter()
            .any(|(c, _)| c == "Germany"));

        // Open job with status open counted in stats
        assert_eq!(report.stats.total_closed_jobs, 0);
        let status: String = sqlx::query("SELECT status FROM job_archive LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap()
            .try_get("status")
            .unwrap();
        assert_eq!(crate::repository::sqlite::map_job_status(&status), JobStatus::Open);
    }
}
