//! robots.txt cache.
//!
//! Entries are keyed by origin (scheme + host + port) with a 24 h TTL and
//! single-flight fetching, so a burst of probes against one host fetches
//! robots.txt once. A host whose robots.txt cannot be fetched is treated as
//! allow-all; only an explicit Disallow blocks us.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use url::Url;

use crate::error::FetchError;

const ROBOTS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
struct RobotsEntry {
    fetched_at: Instant,
    disallow: Arc<Vec<String>>,
}

pub struct RobotsCache {
    entries: DashMap<String, RobotsEntry>,
    flights: DashMap<String, Arc<Mutex<()>>>,
    ttl: Duration,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            flights: DashMap::new(),
            ttl: ROBOTS_TTL,
        }
    }

    #[cfg(test)]
    fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            flights: DashMap::new(),
            ttl,
        }
    }

    /// Whether `url` may be fetched under the host's robots policy.
    pub async fn is_allowed(&self, client: &rquest::Client, url: &Url) -> Result<bool, FetchError> {
        let origin = url.origin().ascii_serialization();
        let path = url.path();

        if let Some(entry) = self.fresh_entry(&origin) {
            return Ok(path_allowed(&entry.disallow, path));
        }

        // Single-flight per origin
        let flight = self
            .flights
            .entry(origin.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = flight.lock().await;

        if let Some(entry) = self.fresh_entry(&origin) {
            return Ok(path_allowed(&entry.disallow, path));
        }

        let disallow = self.fetch_rules(client, &origin).await;
        let entry = RobotsEntry {
            fetched_at: Instant::now(),
            disallow: Arc::new(disallow),
        };
        let allowed = path_allowed(&entry.disallow, path);
        self.entries.insert(origin, entry);
        Ok(allowed)
    }

    fn fresh_entry(&self, origin: &str) -> Option<RobotsEntry> {
        self.entries
            .get(origin)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.clone())
    }

    async fn fetch_rules(&self, client: &rquest::Client, origin: &str) -> Vec<String> {
        let robots_url = format!("{}/robots.txt", origin);
        log::debug!("[ROBOTS] Fetching {}", robots_url);

        let request = client.get(&robots_url);
        let response = tokio::time::timeout(ROBOTS_FETCH_TIMEOUT, request.send()).await;

        match response {
            Ok(Ok(resp)) if resp.status().as_u16() == 200 => match resp.text().await {
                Ok(body) => parse_disallow(&body),
                Err(e) => {
                    log::debug!("[ROBOTS] Failed to read body for {}: {}", robots_url, e);
                    Vec::new()
                }
            },
            Ok(Ok(resp)) => {
                log::debug!("[ROBOTS] {} returned {}", robots_url, resp.status());
                Vec::new()
            }
            Ok(Err(e)) => {
                log::debug!("[ROBOTS] Fetch failed for {}: {}", robots_url, e);
                Vec::new()
            }
            Err(_) => {
                log::debug!("[ROBOTS] Fetch timed out for {}", robots_url);
                Vec::new()
            }
        }
    }
}

impl Default for RobotsCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect Disallow prefixes from groups that apply to any browser-like
/// agent (`User-agent: *`).
fn parse_disallow(body: &str) -> Vec<String> {
    let mut rules = Vec::new();
    let mut group_applies = false;
    let mut in_agent_lines = false;

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_lowercase();
        let value = value.trim();

        match field.as_str() {
            "user-agent" => {
                // A new agent block resets applicability
                if !in_agent_lines {
                    group_applies = false;
                }
                in_agent_lines = true;
                if value == "*" {
                    group_applies = true;
                }
            }
            "disallow" => {
                in_agent_lines = false;
                if group_applies && !value.is_empty() {
                    rules.push(value.to_string());
                }
            }
            _ => {
                in_agent_lines = false;
            }
        }
    }

    rules
}

fn path_allowed(disallow: &[String], path: &str) -> bool {
    !disallow.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> rquest::Client {
        crate::fetcher::build_client(crate::fetcher::ClientProfile::Plain, None).unwrap()
    }

    #[test]
    fn test_parse_disallow_wildcard_group_only() {
        let body = "User-agent: GoogleBot\nDisallow: /google-only\n\nUser-agent: *\nDisallow: /private\nDisallow: /admin\n";
        let rules = parse_disallow(body);
        assert_eq!(rules, vec!["/private", "/admin"]);
    }

    #[test]
    fn test_parse_disallow_stacked_agents() {
        let body = "User-agent: GoogleBot\nUser-agent: *\nDisallow: /all\n";
        let rules = parse_disallow(body);
        assert_eq!(rules, vec!["/all"]);
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let rules = parse_disallow("User-agent: *\nDisallow:\n");
        assert!(rules.is_empty());
        assert!(path_allowed(&rules, "/anything"));
    }

    #[tokio::test]
    async fn test_disallowed_path_is_blocked() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow: /jobs\n")
            .create_async()
            .await;

        let cache = RobotsCache::new();
        let blocked = Url::parse(&format!("{}/jobs/123", server.url())).unwrap();
        let open = Url::parse(&format!("{}/about", server.url())).unwrap();

        assert!(!cache.is_allowed(&client(), &blocked).await.unwrap());
        assert!(cache.is_allowed(&client(), &open).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/robots.txt")
            .with_status(404)
            .create_async()
            .await;

        let cache = RobotsCache::new();
        let url = Url::parse(&format!("{}/jobs", server.url())).unwrap();
        assert!(cache.is_allowed(&client(), &url).await.unwrap());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_refetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow: /x\n")
            .expect(1)
            .create_async()
            .await;

        let cache = RobotsCache::new();
        let url = Url::parse(&format!("{}/ok", server.url())).unwrap();
        assert!(cache.is_allowed(&client(), &url).await.unwrap());
        assert!(cache.is_allowed(&client(), &url).await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_body("User-agent: *\nDisallow:\n")
            .expect(2)
            .create_async()
            .await;

        let cache = RobotsCache::with_ttl(Duration::from_millis(0));
        let url = Url::parse(&format!("{}/ok", server.url())).unwrap();
        assert!(cache.is_allowed(&client(), &url).await.unwrap());
        assert!(cache.is_allowed(&client(), &url).await.unwrap());
        mock.assert_async().await;
    }
}
