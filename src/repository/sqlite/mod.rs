//! Repository layer: pure persistence over the SQLite pool.
//!
//! Write ownership is split by component: the Reconciler owns company and
//! job-archive writes, the Probe engine owns seed probe state, and the
//! Scheduler's maintenance jobs own snapshots. Nothing here contains
//! business logic beyond the SQL expressing those transactions.

mod company_repository;
mod job_repository;
mod seed_repository;
mod snapshot_repository;
mod stats_repository;

pub use company_repository::CompanyRepository;
pub use job_repository::JobArchiveRepository;
pub use seed_repository::SeedRepository;
pub use snapshot_repository::SnapshotRepository;
pub use stats_repository::{
    CountChange, GlobalStats, LocationSpread, SourceStats, StatsRepository, TrendPoint, TtfMetrics,
};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::models::{JobStatus, WorkType};

/// Single timestamp format for every column: RFC 3339 UTC with fixed
/// microsecond precision, so both string ordering and `julianday()` agree.
pub fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub fn parse_ts_opt(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.map(parse_ts)
}

/// Map database string to JobStatus.
pub fn map_job_status(s: &str) -> JobStatus {
    s.parse().unwrap_or(JobStatus::Open)
}

/// Map database string to WorkType.
pub fn map_work_type(s: &str) -> WorkType {
    s.parse().unwrap_or(WorkType::Onsite)
}
