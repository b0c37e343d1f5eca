//! Domain models for the discovery and collection pipeline.
//!
//! Key entities:
//! - `Seed`: a candidate company not yet confirmed on any ATS
//! - `Company`: a confirmed (ats, token) board with aggregate counts
//! - `JobRecord`: one archived posting in the open/closed state machine
//! - `CollectionResult`: the complete observed-open set of one pass over
//!   one company, the unit the Reconciler consumes

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// WORK TYPE / JOB STATUS
// ============================================================================

/// Where a posting expects people to work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Remote,
    Hybrid,
    #[default]
    Onsite,
}

impl WorkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Hybrid => "hybrid",
            Self::Onsite => "onsite",
        }
    }
}

impl std::str::FromStr for WorkType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "hybrid" => Ok(Self::Hybrid),
            "onsite" | "on-site" => Ok(Self::Onsite),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for WorkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Archive state of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// SEED
// ============================================================================

/// A candidate company mined from a directory, awaiting (or past) probing.
/// Maps to the `seeds` table.
#[derive(Debug, Clone, Serialize)]
pub struct Seed {
    pub id: i64,
    pub company_name: String,
    pub token_slug: String,
    pub source: String,
    pub tier: i64,
    pub last_expanded: Option<DateTime<Utc>>,
    pub last_tested: Option<DateTime<Utc>>,
    pub is_hit: bool,
    pub enabled: bool,
    pub hit_rate: f64,
    pub total_tested: i64,
    pub total_hits: i64,
}

/// New seed to be inserted (without auto-generated fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSeed {
    pub company_name: String,
    pub token_slug: String,
    pub source: String,
    pub tier: i64,
}

// ============================================================================
// COMPANY
// ============================================================================

/// A confirmed job board and its aggregate counts.
/// Maps to the `companies` table; `id = md5("{ats}:{token}")`.
#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub id: String,
    pub company_name: String,
    pub ats_type: String,
    pub token: String,
    pub job_count: i64,
    pub remote_count: i64,
    pub hybrid_count: i64,
    pub onsite_count: i64,
    pub locations: Vec<String>,
    pub departments: Vec<String>,
    /// country -> open-posting count
    pub normalized_locations: BTreeMap<String, i64>,
    /// skill -> open-posting count
    pub extracted_skills: BTreeMap<String, i64>,
    pub careers_url: String,
    pub first_discovered: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

// ============================================================================
// JOB ARCHIVE
// ============================================================================

/// One archived posting. Maps to the `job_archive` table.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub job_hash: String,
    pub company_id: String,
    pub job_title: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub work_type: WorkType,
    pub skills: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: JobStatus,
    /// Days from first sighting to closure; set when status flips to closed
    pub time_to_fill: Option<i64>,
}

// ============================================================================
// RAW / NORMALIZED POSTINGS
// ============================================================================

/// Provider-shaped posting straight out of an ATS parser.
#[derive(Debug, Clone, Default)]
pub struct RawJob {
    pub title: String,
    pub location: Option<String>,
    pub department: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    /// Provider said remote explicitly (Lever workplaceType, Ashby isRemote,
    /// Workable telecommuting). Overrides location-cue detection.
    pub remote: Option<bool>,
}

/// One page of a job board listing, as parsed from a provider response.
#[derive(Debug, Clone, Default)]
pub struct BoardPage {
    pub board_name: Option<String>,
    pub jobs: Vec<RawJob>,
    /// Total postings across all pages, when the provider reports it
    pub total: Option<u64>,
}

/// A posting after normalization, ready for hashing and archival.
#[derive(Debug, Clone)]
pub struct CollectedJob {
    pub job_hash: String,
    pub title: String,
    pub location_raw: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub work_type: WorkType,
    pub department: String,
    pub skills: Vec<String>,
}

// ============================================================================
// COLLECTION RESULT
// ============================================================================

/// Aggregate counts derived from one pass over a company's open set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyAggregates {
    pub job_count: i64,
    pub remote_count: i64,
    pub hybrid_count: i64,
    pub onsite_count: i64,
    pub locations: Vec<String>,
    pub departments: Vec<String>,
    pub normalized_locations: BTreeMap<String, i64>,
    pub extracted_skills: BTreeMap<String, i64>,
}

/// Why a collection stopped early. A partial result must never close jobs.
#[derive(Debug, Clone)]
pub struct PartialInfo {
    pub pages_ok: u32,
    pub error: String,
}

/// The complete observed-open set for one company on one pass.
#[derive(Debug, Clone)]
pub struct CollectionResult {
    pub company_id: String,
    pub company_name: String,
    pub ats_type: String,
    pub token: String,
    pub careers_url: String,
    pub jobs: Vec<CollectedJob>,
    pub aggregates: CompanyAggregates,
    pub collected_at: DateTime<Utc>,
    /// Some(..) when pagination failed after k good pages
    pub partial: Option<PartialInfo>,
}

impl CollectionResult {
    pub fn is_complete(&self) -> bool {
        self.partial.is_none()
    }
}

// ============================================================================
// PASS STATE (scheduler <-> dashboard)
// ============================================================================

/// Which recurring activity a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassMode {
    Discovery,
    Refresh,
    Expansion,
}

impl PassMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Refresh => "refresh",
            Self::Expansion => "expansion",
        }
    }
}

impl std::fmt::Display for PassMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters published through the progress channel and kept as `last_stats`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PassStats {
    pub tested: u64,
    pub hits: u64,
    pub jobs_added: u64,
    pub jobs_closed: u64,
    pub companies_refreshed: u64,
    pub errors: u64,
}

/// Terminal state of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub mode: PassMode,
    pub completed: u64,
    pub total: u64,
    pub stats: PassStats,
    pub cancelled: bool,
}

/// Read-only snapshot of collection state for the dashboard surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub mode: Option<String>,
    pub current_progress: f64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_stats: Option<PassStats>,
    pub last_error: Option<String>,
}

// ============================================================================
// RECONCILE OUTCOME
// ============================================================================

/// What one reconcile transaction did.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOutcome {
    pub jobs_added: u64,
    pub jobs_refreshed: u64,
    pub jobs_closed: u64,
}
