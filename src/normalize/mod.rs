//! Pure normalization functions: slugs, hashes, departments, and the
//! raw-posting -> `CollectedJob` mapping. Everything here is deterministic;
//! no IO.

mod location;
mod skills;

pub use location::{parse_location, ParsedLocation};
pub use skills::extract_skills;

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::models::{CollectedJob, RawJob, WorkType};

// ============================================================================
// SLUG / HASHES
// ============================================================================

fn suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s-]+(inc|llc|ltd|co|corp|gmbh|sa)\.?$").unwrap())
}

/// Canonical slug of a company name: lowercase, trailing corporate suffix
/// stripped, non `[a-z0-9\s-]` dropped, whitespace/hyphen runs collapsed
/// to a single `-`. Idempotent.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = suffix_re().replace(&lowered, "");

    let cleaned: String = stripped
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();

    collapse_separators(&cleaned, "-")
}

/// Join whitespace/hyphen runs with the given separator and trim it from
/// both ends.
pub(crate) fn collapse_separators(s: &str, sep: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Stable company id for an (ats, token) pair. Re-observing the same pair
/// must yield the same id across passes.
pub fn company_id(ats_type: &str, token: &str) -> String {
    format!("{:x}", md5::compute(format!("{}:{}", ats_type, token)))
}

/// Stable posting key within one company: md5 of
/// `company_id|title|location` with title/location trimmed, lowercased and
/// inner whitespace collapsed, so case or spacing changes never fork a job.
pub fn job_hash(company_id: &str, title: &str, location: &str) -> String {
    let raw = format!(
        "{}|{}|{}",
        company_id,
        squash(title),
        squash(location)
    );
    format!("{:x}", md5::compute(raw))
}

fn squash(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// DEPARTMENTS
// ============================================================================

const DEPT_MAPPINGS: &[(&str, &str)] = &[
    ("engineering", "Engineering"),
    ("eng", "Engineering"),
    ("r&d", "Engineering"),
    ("dev", "Engineering"),
    ("software", "Engineering"),
    ("product", "Product"),
    ("product management", "Product"),
    ("design", "Design"),
    ("ux", "Design"),
    ("ui/ux", "Design"),
    ("sales", "Sales"),
    ("marketing", "Marketing"),
    ("growth", "Marketing"),
    ("customer success", "Customer Success"),
    ("support", "Customer Success"),
    ("finance", "Finance"),
    ("accounting", "Finance"),
    ("hr", "HR"),
    ("people", "HR"),
    ("talent", "HR"),
    ("recruiting", "HR"),
    ("operations", "Operations"),
    ("legal", "Legal"),
    ("it", "IT"),
    ("security", "IT"),
];

/// Normalize a raw department name to a standard category.
pub fn normalize_department(dept_name: &str) -> String {
    let clean = dept_name.trim().to_lowercase();
    if clean.is_empty() {
        return "Other".to_string();
    }

    let words: Vec<&str> = clean.split_whitespace().collect();
    for (key, value) in DEPT_MAPPINGS {
        if *key == clean || words.contains(key) {
            return (*value).to_string();
        }
    }

    "Other".to_string()
}

// ============================================================================
// POSTING NORMALIZATION
// ============================================================================

/// Map one provider-shaped posting into the unified record.
pub fn normalize_job(company_id: &str, raw: &RawJob) -> CollectedJob {
    let location_raw = raw.location.as_deref().unwrap_or("").trim().to_string();
    let mut parsed = parse_location(&location_raw);

    // Explicit provider remote flags beat location-cue detection
    if raw.remote == Some(true) {
        parsed.work_type = WorkType::Remote;
        parsed.city = None;
        parsed.region = None;
    }

    let haystack = match &raw.description {
        Some(d) => format!("{} {}", raw.title, d),
        None => raw.title.clone(),
    };

    CollectedJob {
        job_hash: job_hash(company_id, &raw.title, &location_raw),
        title: raw.title.trim().to_string(),
        location_raw,
        city: parsed.city,
        region: parsed.region,
        country: parsed.country,
        work_type: parsed.work_type,
        department: normalize_department(raw.department.as_deref().unwrap_or("")),
        skills: extract_skills(&haystack),
    }
}
