//! Seed expander: mine candidate companies from external directories.
//!
//! One pass walks the enabled sources in priority order, fetching through
//! the Fetcher (robots honored, rate limited), validating and slugging the
//! names, then inserting whatever the store has not seen. A failing source
//! is isolated; the pass continues with the next one.

mod sources;

pub use sources::{default_sources, SourceKind, SourceSpec};

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::domain::models::NewSeed;
use crate::error::Result;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::normalize::slugify;
use crate::repository::sqlite::SeedRepository;

/// Words that cannot stand alone as a company name.
const STOP_WORDS: &[&str] = &[
    "inc", "llc", "corp", "ltd", "plc", "gmbh", "sa", "ag", "group", "holdings", "the", "company",
];

#[derive(Debug, Default)]
pub struct ExpansionSummary {
    pub per_source: Vec<(String, u64)>,
    pub total_inserted: u64,
    pub sources_failed: u64,
}

pub struct SeedExpander {
    fetcher: Arc<Fetcher>,
    seeds: SeedRepository,
    sources: Vec<SourceSpec>,
    min_length: usize,
    max_length: usize,
    max_words: usize,
    /// Inter-source politeness sleep, sampled uniformly from this range
    jitter: (u64, u64),
}

impl SeedExpander {
    pub fn new(fetcher: Arc<Fetcher>, pool: SqlitePool, config: &Config) -> Self {
        Self {
            fetcher,
            seeds: SeedRepository::new(pool),
            sources: default_sources(),
            min_length: config.seed_min_length,
            max_length: config.seed_max_length,
            max_words: config.seed_max_words,
            jitter: (2, 6),
        }
    }

    /// Replace the source registry (mock servers in tests).
    pub fn with_sources(mut self, sources: Vec<SourceSpec>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_jitter(mut self, jitter: (u64, u64)) -> Self {
        self.jitter = jitter;
        self
    }

    /// Run one expansion pass over the given tiers.
    pub async fn expand(&self, tiers: &[i64], cancel: &CancellationToken) -> Result<ExpansionSummary> {
        let mut active: Vec<&SourceSpec> = self
            .sources
            .iter()
            .filter(|s| tiers.contains(&s.tier))
            .collect();
        active.sort_by(|a, b| b.priority.cmp(&a.priority));

        log::info!("[EXPAND] Running {} sources for tiers {:?}", active.len(), tiers);

        let mut summary = ExpansionSummary::default();

        for source in active {
            if cancel.is_cancelled() {
                log::warn!("[EXPAND] Expansion cancelled after {} sources", summary.per_source.len());
                break;
            }

            match self.expand_source(source, cancel).await {
                Ok(names) => {
                    let seeds = self.process_names(&names, source);
                    match self.seeds.insert_batch(&seeds).await {
                        Ok(inserted) => {
                            log::info!(
                                "[EXPAND] {}: {} raw names, {} new seeds",
                                source.name,
                                names.len(),
                                inserted
                            );
                            summary.total_inserted += inserted;
                            summary.per_source.push((source.name.to_string(), inserted));
                        }
                        Err(e) => {
                            log::error!("[EXPAND] {}: insert failed: {:#}", source.name, e);
                            summary.sources_failed += 1;
                        }
                    }
                }
                Err(e) => {
                    log::error!("[EXPAND] {}: fetch failed: {}", source.name, e);
                    summary.sources_failed += 1;
                }
            }

            self.politeness_sleep(cancel).await;
        }

        Ok(summary)
    }

    async fn expand_source(
        &self,
        source: &SourceSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let names = match source.kind {
            SourceKind::CuratedAts => {
                sources::ATS_CURATED.iter().map(|s| s.to_string()).collect()
            }
            SourceKind::Unicorns => sources::UNICORNS.iter().map(|s| s.to_string()).collect(),
            SourceKind::YcDirectory => {
                let body = self.fetch_source(source, true, cancel).await?;
                sources::parse_yc_companies(&body)
            }
            SourceKind::AwesomeCareerPages => {
                let body = self.fetch_source(source, false, cancel).await?;
                sources::parse_awesome_career_pages(&body)
            }
            SourceKind::WikipediaSp500 => {
                let body = self.fetch_source(source, false, cancel).await?;
                sources::parse_wikipedia_sp500(&body)
            }
            SourceKind::SecTickers => {
                let body = self.fetch_source(source, true, cancel).await?;
                sources::parse_sec_tickers(&body)
            }
        };
        Ok(names)
    }

    async fn fetch_source(
        &self,
        source: &SourceSpec,
        accept_json: bool,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let url = source
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("source {} has no URL", source.name))?;
        let request = if accept_json {
            FetchRequest::json(url)
        } else {
            FetchRequest::get(url)
        };
        let response = self.fetcher.fetch(&request, cancel).await?;
        Ok(response.body)
    }

    /// Validate, sanitize and slug raw names; dedupe within the batch
    /// case-insensitively (cross-batch dedupe happens on insert).
    fn process_names(&self, names: &[String], source: &SourceSpec) -> Vec<NewSeed> {
        let mut seen = std::collections::HashSet::new();
        let mut seeds = Vec::new();

        for raw in names {
            let clean: String = raw
                .trim()
                .chars()
                .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
                .collect();
            let clean = clean.split_whitespace().collect::<Vec<_>>().join(" ");

            if !self.is_valid_name(&clean) {
                continue;
            }
            if !seen.insert(clean.to_lowercase()) {
                continue;
            }

            let token_slug = slugify(&clean);
            if token_slug.is_empty() {
                continue;
            }

            seeds.push(NewSeed {
                company_name: clean,
                token_slug,
                source: source.name.to_string(),
                tier: source.tier,
            });
        }

        seeds
    }

    fn is_valid_name(&self, name: &str) -> bool {
        if name.len() < self.min_length || name.len() > self.max_length {
            return false;
        }
        if !name.chars().any(|c| c.is_alphabetic()) {
            return false;
        }
        let words: Vec<String> = name
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches('.').to_string())
            .collect();
        if words.is_empty() || words.len() > self.max_words {
            return false;
        }
        // Names made only of corporate stop-words carry no identity
        if words.iter().all(|w| STOP_WORDS.contains(&w.as_str())) {
            return false;
        }
        true
    }

    async fn politeness_sleep(&self, cancel: &CancellationToken) {
        let (lo, hi) = self.jitter;
        if hi == 0 {
            return;
        }
        let millis = rand::thread_rng().gen_range(lo * 1000..=hi * 1000);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
