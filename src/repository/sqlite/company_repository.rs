//! Company reads. Writes happen inside the Reconciler's transaction, which
//! exclusively owns company and job-archive mutation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use super::parse_ts;
use crate::domain::models::Company;

pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, company_id: &str) -> Result<Option<Company>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COMPANY))
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch company")?;

        row.as_ref().map(map_company).transpose()
    }

    /// Companies whose last pass is older than `hours_since_update`,
    /// stalest first — the refresh pass worklist.
    pub async fn get_for_refresh(&self, hours_since_update: i64, limit: i64) -> Result<Vec<Company>> {
        let rows = sqlx::query(&format!(
            "{} WHERE julianday(last_updated) < julianday('now', ?) \
             ORDER BY last_updated ASC LIMIT ?",
            SELECT_COMPANY
        ))
        .bind(format!("-{} hours", hours_since_update))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch companies for refresh")?;

        rows.iter().map(map_company).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM companies")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count companies")?;
        Ok(row.try_get("count")?)
    }
}

const SELECT_COMPANY: &str = r#"
    SELECT id, company_name, ats_type, token, job_count, remote_count,
           hybrid_count, onsite_count, locations, departments,
           normalized_locations, extracted_skills, careers_url,
           first_discovered, last_updated
    FROM companies
"#;

fn map_company(row: &sqlx::sqlite::SqliteRow) -> Result<Company> {
    let locations: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("locations")?).unwrap_or_default();
    let departments: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("departments")?).unwrap_or_default();
    let normalized_locations: BTreeMap<String, i64> =
        serde_json::from_str(&row.try_get::<String, _>("normalized_locations")?).unwrap_or_default();
    let extracted_skills: BTreeMap<String, i64> =
        serde_json::from_str(&row.try_get::<String, _>("extracted_skills")?).unwrap_or_default();

    Ok(Company {
        id: row.try_get("id")?,
        company_name: row.try_get("company_name")?,
        ats_type: row.try_get("ats_type")?,
        token: row.try_get("token")?,
        job_count: row.try_get("job_count")?,
        remote_count: row.try_get("remote_count")?,
        hybrid_count: row.try_get("hybrid_count")?,
        onsite_count: row.try_get("onsite_count")?,
        locations,
        departments,
        normalized_locations,
        extracted_skills,
        careers_url: row.try_get("careers_url")?,
        first_discovered: parse_ts(&row.try_get::<String, _>("first_discovered")?),
        last_updated: parse_ts(&row.try_get::<String, _>("last_updated")?),
    })
}
