//! Seed persistence: candidate companies and their probe state.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::{fmt_ts, parse_ts_opt};
use crate::domain::models::{NewSeed, Seed};
use crate::normalize::slugify;

pub struct SeedRepository {
    pool: SqlitePool,
}

impl SeedRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a batch of new seeds, skipping names already present.
    /// Returns the number actually inserted.
    pub async fn insert_batch(&self, seeds: &[NewSeed]) -> Result<u64> {
        if seeds.is_empty() {
            return Ok(0);
        }

        const CHUNK_SIZE: usize = 200;
        let now = fmt_ts(Utc::now());
        let mut inserted = 0u64;

        for chunk in seeds.chunks(CHUNK_SIZE) {
            let mut qb = sqlx::QueryBuilder::new(
                "INSERT INTO seeds (company_name, token_slug, source, tier, last_expanded) ",
            );
            qb.push_values(chunk, |mut b, seed| {
                b.push_bind(&seed.company_name)
                    .push_bind(&seed.token_slug)
                    .push_bind(&seed.source)
                    .push_bind(seed.tier)
                    .push_bind(&now);
            });
            qb.push(" ON CONFLICT(company_name) DO NOTHING");

            let result = qb
                .build()
                .execute(&self.pool)
                .await
                .context("Failed to insert seed batch")?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Manual submission path: one curated tier-1 seed.
    pub async fn add_manual(&self, company_name: &str) -> Result<bool> {
        let seed = NewSeed {
            company_name: company_name.trim().to_string(),
            token_slug: slugify(company_name),
            source: "manual".to_string(),
            tier: 1,
        };
        let inserted = self.insert_batch(std::slice::from_ref(&seed)).await?;
        Ok(inserted > 0)
    }

    /// Untested, enabled seeds in `(tier, id)` order for the discovery pass.
    pub async fn get_untested(&self, limit: i64) -> Result<Vec<Seed>> {
        let rows = sqlx::query(
            r#"
            SELECT id, company_name, token_slug, source, tier,
                   last_expanded, last_tested, is_hit, enabled,
                   hit_rate, total_tested, total_hits
            FROM seeds
            WHERE enabled = 1 AND is_hit = 0 AND last_tested IS NULL
            ORDER BY tier ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch untested seeds")?;

        rows.iter().map(map_seed).collect()
    }

    /// Record one probe attempt, hit or miss.
    pub async fn mark_tested(&self, seed_id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE seeds SET
                last_tested = ?1,
                total_tested = total_tested + 1,
                hit_rate = CAST(total_hits AS REAL) / (total_tested + 1)
            WHERE id = ?2
            "#,
        )
        .bind(fmt_ts(at))
        .bind(seed_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark seed tested")?;

        Ok(())
    }

    /// Flip a seed to hit after the probe confirms a board.
    pub async fn mark_hit(&self, seed_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE seeds SET
                is_hit = 1,
                total_hits = total_hits + 1,
                hit_rate = CAST(total_hits + 1 AS REAL) / MAX(total_tested, 1)
            WHERE id = ?1
            "#,
        )
        .bind(seed_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark seed hit")?;

        Ok(())
    }

    pub async fn get_by_name(&self, company_name: &str) -> Result<Option<Seed>> {
        let row = sqlx::query(
            r#"
            SELECT id, company_name, token_slug, source, tier,
                   last_expanded, last_tested, is_hit, enabled,
                   hit_rate, total_tested, total_hits
            FROM seeds
            WHERE company_name = ?
            "#,
        )
        .bind(company_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch seed by name")?;

        row.as_ref().map(map_seed).transpose()
    }
}

fn map_seed(row: &sqlx::sqlite::SqliteRow) -> Result<Seed> {
    Ok(Seed {
        id: row.try_get("id")?,
        company_name: row.try_get("company_name")?,
        token_slug: row.try_get("token_slug")?,
        source: row.try_get("source")?,
        tier: row.try_get("tier")?,
        last_expanded: parse_ts_opt(row.try_get::<Option<String>, _>("last_expanded")?.as_deref()),
        last_tested: parse_ts_opt(row.try_get::<Option<String>, _>("last_tested")?.as_deref()),
        is_hit: row.try_get("is_hit")?,
        enabled: row.try_get("enabled")?,
        hit_rate: row.try_get("hit_rate")?,
        total_tested: row.try_get("total_tested")?,
        total_hits: row.try_get("total_hits")?,
    })
}
