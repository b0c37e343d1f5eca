#[cfg(test)]
pub mod fixtures {
    use chrono::{DateTime, Utc};
    use sqlx::SqlitePool;

    use crate::collector::compute_aggregates;
    use crate::domain::models::{CollectedJob, CollectionResult, RawJob};
    use crate::normalize::{company_id, normalize_job};
    use crate::repository::sqlite::fmt_ts;

    /// Creates an in-memory SQLite database with migrations applied
    pub async fn setup_test_db() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    /// A complete greenhouse-flavored CollectionResult for `token` with one
    /// open posting per title.
    pub fn collection_result(
        token: &str,
        titles: &[&str],
        collected_at: DateTime<Utc>,
    ) -> CollectionResult {
        let cid = company_id("greenhouse", token);
        let jobs: Vec<CollectedJob> = titles
            .iter()
            .map(|title| {
                normalize_job(
                    &cid,
                    &RawJob {
                        title: (*title).to_string(),
                        location: Some("Berlin, Germany".to_string()),
                        department: Some("Engineering".to_string()),
                        ..Default::default()
                    },
                )
            })
            .collect();

        CollectionResult {
            company_id: cid,
            company_name: token.to_string(),
            ats_type: "greenhouse".to_string(),
            token: token.to_string(),
            careers_url: format!("https://boards.greenhouse.io/{}", token),
            aggregates: compute_aggregates(&jobs),
            jobs,
            collected_at,
            partial: None,
        }
    }

    /// Raw companies row for snapshot/stats tests.
    pub async fn insert_company_row(pool: &SqlitePool, id: &str, name: &str, job_count: i64) {
        let now = fmt_ts(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO companies (
                id, company_name, ats_type, token, job_count, remote_count,
                hybrid_count, onsite_count, careers_url, first_discovered, last_updated
            ) VALUES (?, ?, 'greenhouse', ?, ?, 0, 0, 0, '', ?, ?)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(name.to_lowercase())
        .bind(job_count)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("Failed to insert company row");
    }

}
