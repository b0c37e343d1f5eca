//! Multi-ATS probe engine.
//!
//! Given a company name, generate candidate board tokens and test each one
//! against every known provider in parallel until a live board is found.
//! Provider errors are indistinguishable from misses: a probe can only say
//! "board found" or "nothing here".

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::ats::{AtsRegistry, AtsType, ALL_PROVIDERS};
use crate::config::Config;
use crate::domain::models::BoardPage;
use crate::error::{CoreError, FetchError, Result};
use crate::fetcher::Fetcher;
use crate::normalize::slugify;

const MAX_TOKEN_VARIANTS: usize = 50;

/// A confirmed live board.
#[derive(Debug)]
pub struct ProbeHit {
    pub ats: AtsType,
    pub token: String,
    pub board: BoardPage,
}

/// Outcome of probing one seed across all candidates.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub hit: Option<ProbeHit>,
    /// True when every single probe errored (no definitive miss seen);
    /// kept as operational telemetry only
    pub all_errored: bool,
}

enum PairResult {
    Hit(ProbeHit),
    Miss,
    Errored,
}

#[derive(Clone, Copy)]
struct CacheEntry {
    at: Instant,
    is_hit: bool,
}

pub struct ProbeEngine {
    fetcher: Arc<Fetcher>,
    registry: Arc<AtsRegistry>,
    cache: DashMap<(AtsType, String), CacheEntry>,
    cache_ttl: Duration,
    max_concurrent: usize,
}

impl ProbeEngine {
    pub fn new(fetcher: Arc<Fetcher>, registry: Arc<AtsRegistry>, config: &Config) -> Self {
        Self {
            fetcher,
            registry,
            cache: DashMap::new(),
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            max_concurrent: config.max_concurrent_probes.max(1),
        }
    }

    /// Probe every (candidate token, provider) pair for this company,
    /// stopping at the first token that confirms a board. Within one token
    /// the providers race; ties go to registry priority.
    pub async fn probe(
        &self,
        company_name: &str,
        seed_slug: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutcome> {
        let tokens = candidate_tokens(company_name, seed_slug);
        if tokens.is_empty() {
            return Err(CoreError::NoCandidateTokens(company_name.to_string()));
        }

        log::debug!(
            "[PROBE] {} candidate tokens for '{}'",
            tokens.len(),
            company_name
        );

        let mut saw_definitive_miss = false;
        let mut saw_error = false;

        for token in &tokens {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let results = self.fan_out(token, cancel).await;

            let mut best: Option<ProbeHit> = None;
            for result in results {
                match result {
                    PairResult::Hit(hit) => {
                        let replace = best
                            .as_ref()
                            .map(|b| hit.ats.priority() > b.ats.priority())
                            .unwrap_or(true);
                        if replace {
                            best = Some(hit);
                        }
                    }
                    PairResult::Miss => saw_definitive_miss = true,
                    PairResult::Errored => saw_error = true,
                }
            }

            if let Some(hit) = best {
                log::info!(
                    "[PROBE] Hit for '{}': {} on token '{}' ({} postings)",
                    company_name,
                    hit.ats,
                    hit.token,
                    hit.board.jobs.len()
                );
                return Ok(ProbeOutcome {
                    hit: Some(hit),
                    all_errored: false,
                });
            }
        }

        log::debug!("[PROBE] No board found for '{}'", company_name);
        Ok(ProbeOutcome {
            hit: None,
            all_errored: saw_error && !saw_definitive_miss,
        })
    }

    /// Race one token across all providers, bounded by the probe
    /// concurrency limit.
    async fn fan_out(&self, token: &str, cancel: &CancellationToken) -> Vec<PairResult> {
        let probes = ALL_PROVIDERS.iter().map(|ats| {
            let token = token.to_string();
            async move { self.probe_pair(*ats, &token, cancel).await }
        });

        stream::iter(probes)
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }

    async fn probe_pair(&self, ats: AtsType, token: &str, cancel: &CancellationToken) -> PairResult {
        let key = (ats, token.to_string());
        if let Some(entry) = self.cache.get(&key) {
            if entry.at.elapsed() < self.cache_ttl && !entry.is_hit {
                return PairResult::Miss;
            }
        }

        let request = self.registry.probe_request(ats, token);
        let result = match self.fetcher.fetch(&request, cancel).await {
            Ok(response) => match self.registry.parse_page(ats, token, &response.body) {
                // A valid payload with zero jobs still confirms the board
                Ok(board) => PairResult::Hit(ProbeHit {
                    ats,
                    token: token.to_string(),
                    board,
                }),
                Err(_) => PairResult::Miss,
            },
            Err(FetchError::Http4xx(_)) => PairResult::Miss,
            Err(FetchError::PolicyBlocked) => PairResult::Miss,
            Err(e) => {
                log::trace!("[PROBE] {}:{} errored: {}", ats, token, e);
                PairResult::Errored
            }
        };

        let is_hit = matches!(result, PairResult::Hit(_));
        if !matches!(result, PairResult::Errored) {
            self.cache.insert(
                key,
                CacheEntry {
                    at: Instant::now(),
                    is_hit,
                },
            );
        }
        result
    }
}

// ============================================================================
// TOKEN GENERATION
// ============================================================================

/// Deterministic candidate tokens for a company name, exact slug first,
/// capped at 50 variants. Duplicates and sub-2-char tokens are dropped.
pub fn candidate_tokens(company_name: &str, seed_slug: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let push = |candidate: String, out: &mut Vec<String>| {
        if candidate.len() >= 2 && !out.contains(&candidate) && out.len() < MAX_TOKEN_VARIANTS {
            out.push(candidate);
        }
    };

    let slug = slugify(company_name);
    push(slug.clone(), &mut out);
    if let Some(s) = seed_slug {
        push(s.trim().to_lowercase(), &mut out);
    }

    let words: Vec<&str> = slug.split('-').filter(|w| !w.is_empty()).collect();

    // Separator variants
    push(words.join("_"), &mut out);
    push(words.join(""), &mut out);

    if words.len() > 1 {
        // First word / first two words
        push(words[0].to_string(), &mut out);
        push(words[..2].join("-"), &mut out);
        push(words[..2].join("_"), &mut out);
        push(words[..2].join(""), &mut out);

        // Initials
        let initials: String = words.iter().filter_map(|w| w.chars().next()).collect();
        push(initials, &mut out);
    }

    // Vowel-stripped
    let no_vowels: String = words
        .join("")
        .chars()
        .filter(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
        .collect();
    push(no_vowels, &mut out);

    // Full name without suffix stripping, for companies whose board keeps
    // the "co"/"inc" ("brewco", "acmeinc")
    let raw: String = company_name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    push(raw, &mut out);

    // Ampersand spelled out
    if company_name.contains('&') {
        push(slugify(&company_name.replace('&', " and ")), &mut out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::Endpoints;

    #[test]
    fn test_single_word_name() {
        let tokens = candidate_tokens("Stripe", None);
        assert_eq!(tokens[0], "stripe");
        // No separator variants collapse into duplicates
        assert!(tokens.iter().all(|t| !t.is_empty()));
        let unique: std::collections::HashSet<_> = tokens.iter().collect();
        assert_eq!(unique.len(), tokens.len());
    }

    #[test]
    fn test_multi_word_variants() {
        let tokens = candidate_tokens("Scale AI", None);
        assert_eq!(tokens[0], "scale-ai");
        assert!(tokens.contains(&"scale_ai".to_string()));
        assert!(tokens.contains(&"scaleai".to_string()));
        assert!(tokens.contains(&"scale".to_string()));
    }

    #[test]
    fn test_suffix_kept_variant() {
        let tokens = candidate_tokens("Acme Inc", None);
        assert_eq!(tokens[0], "acme");
        assert!(tokens.contains(&"acmeinc".to_string()));
    }

    #[test]
    fn test_ampersand_variant() {
        let tokens = candidate_tokens("Bolt & Nut", None);
        assert!(tokens.contains(&"bolt-and-nut".to_string()));
    }

    #[test]
    fn test_seed_slug_comes_early() {
        let tokens = candidate_tokens("Example Company", Some("examplehq"));
        assert_eq!(tokens[0], "example-company");
        assert_eq!(tokens[1], "examplehq");
    }

    #[test]
    fn test_cap_and_no_empty_tokens() {
        let tokens = candidate_tokens("A B C D E F G H I J K L M N O P", None);
        assert!(tokens.len() <= MAX_TOKEN_VARIANTS);
        assert!(tokens.iter().all(|t| t.len() >= 2));
    }

    #[test]
    fn test_unusable_name_yields_nothing() {
        assert!(candidate_tokens("!", None).is_empty());
    }

    /// Registry where every provider points at the mock server; paths the
    /// server does not mock return errors, which probe treats as misses.
    fn mock_registry(base: &str) -> AtsRegistry {
        let mut registry = AtsRegistry::new();
        for ats in ALL_PROVIDERS {
            registry = registry.with_endpoints(
                *ats,
                Endpoints {
                    probe: format!("{}/{}/{{token}}", base, ats.as_str()),
                    listing: format!("{}/{}/{{token}}", base, ats.as_str()),
                    careers: format!("{}/{}/{{token}}", base, ats.as_str()),
                },
            );
        }
        registry
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.collector_max_retries = 0;
        config.rate_limit_default = 100.0;
        config.rate_limit_greenhouse = 100.0;
        config.rate_limit_lever = 100.0;
        config.rate_limit_workday = 100.0;
        config
    }

    #[tokio::test]
    async fn test_probe_finds_greenhouse_board() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;
        let _board = server
            .mock("GET", "/greenhouse/stripe")
            .with_status(200)
            .with_body(r#"{"name": "Stripe", "jobs": [{"id": 1, "title": "Engineer"}]}"#)
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = Arc::new(mock_registry(&server.url()));
        let engine = ProbeEngine::new(fetcher, registry, &config);

        let outcome = engine
            .probe("Stripe", None, &CancellationToken::new())
            .await
            .unwrap();

        let hit = outcome.hit.expect("expected a hit");
        assert_eq!(hit.ats, AtsType::Greenhouse);
        assert_eq!(hit.token, "stripe");
        assert_eq!(hit.board.jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_probe_miss_marks_no_hit() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;
        // 404 on every probe path: definitive misses
        let _catch = server
            .mock("GET", mockito::Matcher::Regex("^/(?:[a-z]+)/.*$".to_string()))
            .with_status(404)
            .expect_at_least(1)
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = Arc::new(mock_registry(&server.url()));
        let engine = ProbeEngine::new(fetcher, registry, &config);

        let outcome = engine
            .probe("NoSuchCo", None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.hit.is_none());
        assert!(!outcome.all_errored);
    }

    #[tokio::test]
    async fn test_probe_tie_break_prefers_priority() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;
        // Both Lever and Workable confirm the same token; Lever outranks
        let _lever = server
            .mock("GET", "/lever/acme")
            .with_status(200)
            .with_body(r#"[{"id": "1", "text": "Engineer"}]"#)
            .create_async()
            .await;
        let _workable = server
            .mock("GET", "/workable/acme")
            .with_status(200)
            .with_body(r#"{"name": "Acme", "jobs": [{"title": "Engineer"}]}"#)
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = Arc::new(mock_registry(&server.url()));
        let engine = ProbeEngine::new(fetcher, registry, &config);

        let outcome = engine
            .probe("Acme", None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.hit.unwrap().ats, AtsType::Lever);
    }

    #[tokio::test]
    async fn test_probe_empty_board_counts_as_hit() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;
        let _board = server
            .mock("GET", "/greenhouse/ghostco")
            .with_status(200)
            .with_body(r#"{"name": "Ghost Co", "jobs": []}"#)
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = Arc::new(mock_registry(&server.url()));
        let engine = ProbeEngine::new(fetcher, registry, &config);

        let outcome = engine
            .probe("GhostCo", None, &CancellationToken::new())
            .await
            .unwrap();

        let hit = outcome.hit.expect("zero-job board should still confirm");
        assert!(hit.board.jobs.is_empty());
    }
}
