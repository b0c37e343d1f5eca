//! Polite HTTP fetcher.
//!
//! Every outbound request in the pipeline goes through here: per-host token
//! buckets, robots.txt gating, User-Agent rotation, bounded retries with
//! jittered backoff, and an optional headless-render fallback for pages
//! that only exist after JavaScript runs.

mod rate_limit;
mod render;
mod robots;

pub use rate_limit::HostRateLimiter;
pub use render::{NoopRenderer, PageRenderer, RenderError};
pub use robots::RobotsCache;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rquest::Client;
use rquest_util::Emulation;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Config;
use crate::error::FetchError;

const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Pool of modern browser strings rotated across requests.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:136.0) Gecko/20100101 Firefox/136.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:136.0) Gecko/20100101 Firefox/136.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

/// How much the client should look like a real browser. Board APIs answer
/// anything, but several career-site hosts run TLS fingerprint checks that
/// reject non-browser clients outright.
#[derive(Debug, Clone, Copy)]
pub enum ClientProfile {
    Plain,
    Emulated,
}

/// Assemble the outbound HTTP client for board fetching, optionally routed
/// through the configured proxy.
pub fn build_client(profile: ClientProfile, proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(Duration::from_secs(30));

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(rquest::Proxy::all(proxy_url).context("invalid proxy URL")?);
    }
    if matches!(profile, ClientProfile::Emulated) {
        builder = builder.emulation(Emulation::Firefox136);
    }

    builder
        .build()
        .context("failed to assemble board-fetching HTTP client")
}

// ============================================================================
// REQUEST / RESPONSE
// ============================================================================

#[derive(Debug, Clone)]
pub enum FetchMethod {
    Get,
    PostJson(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: FetchMethod,
    pub accept_json: bool,
    pub needs_js: bool,
    /// Provider rate-limit key; the URL host when unset
    pub rate_key: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: FetchMethod::Get,
            accept_json: false,
            needs_js: false,
            rate_key: None,
        }
    }

    pub fn json(url: impl Into<String>) -> Self {
        Self {
            accept_json: true,
            ..Self::get(url)
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: FetchMethod::PostJson(body),
            accept_json: true,
            ..Self::get(url)
        }
    }

    pub fn with_rate_key(mut self, key: impl Into<String>) -> Self {
        self.rate_key = Some(key.into());
        self
    }

    pub fn with_needs_js(mut self) -> Self {
        self.needs_js = true;
        self
    }
}

#[derive(Debug)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: rquest::header::HeaderMap,
    pub body: String,
}

// ============================================================================
// FETCHER
// ============================================================================

pub struct Fetcher {
    client: Client,
    limiter: HostRateLimiter,
    robots: RobotsCache,
    renderer: Arc<dyn PageRenderer>,
    max_retries: u32,
    attempt_timeout: Duration,
    rate_default: f64,
    rate_overrides: Vec<(String, f64)>,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let proxy = if config.proxy_enabled {
            config.proxy_url.as_deref()
        } else {
            None
        };
        let client = build_client(ClientProfile::Emulated, proxy)?;

        Ok(Self {
            client,
            limiter: HostRateLimiter::new(),
            robots: RobotsCache::new(),
            renderer: Arc::new(NoopRenderer),
            max_retries: config.collector_max_retries,
            attempt_timeout: Duration::from_secs(config.collector_timeout_secs),
            rate_default: config.rate_limit_default,
            rate_overrides: vec![
                ("greenhouse".to_string(), config.rate_limit_greenhouse),
                ("lever".to_string(), config.rate_limit_lever),
                ("workday".to_string(), config.rate_limit_workday),
            ],
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    fn rate_for(&self, key: &str) -> f64 {
        self.rate_overrides
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| *r)
            .unwrap_or(self.rate_default)
    }

    /// Fetch a URL under the politeness policies. Transient failures
    /// (network, timeout, 5xx, 429) are retried internally with exponential
    /// backoff; everything surfaced to the caller is terminal.
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        let url = Url::parse(&request.url)
            .map_err(|e| FetchError::network(format!("invalid URL {}: {}", request.url, e)))?;

        if !self.robots.is_allowed(&self.client, &url).await? {
            log::info!("[FETCH] Blocked by robots.txt: {}", request.url);
            return Err(FetchError::PolicyBlocked);
        }

        if request.needs_js {
            return self.render_page(&request.url).await;
        }

        let rate_key = request
            .rate_key
            .clone()
            .or_else(|| url.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "default".to_string());
        let rate = self.rate_for(&rate_key);

        let mut last_err = FetchError::network("no attempts made");

        for attempt in 0..=self.max_retries {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            self.limiter.acquire(&rate_key, rate, cancel).await?;

            match self.attempt(request, cancel).await {
                Ok(response) => return Ok(response),
                Err(RetryClass::Terminal(err)) => return Err(err),
                Err(RetryClass::Transient { err, retry_after }) => {
                    log::debug!(
                        "[FETCH] Attempt {}/{} failed for {}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        request.url,
                        err
                    );
                    last_err = err;
                    if attempt < self.max_retries {
                        let delay = retry_after.unwrap_or_else(|| backoff_delay(attempt));
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        }
                    }
                }
            }
        }

        Err(last_err)
    }

    async fn attempt(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, RetryClass> {
        let mut builder = match &request.method {
            FetchMethod::Get => self.client.get(&request.url),
            FetchMethod::PostJson(body) => self.client.post(&request.url).json(body),
        };

        let ua = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        builder = builder.header("User-Agent", ua);
        if request.accept_json {
            builder = builder.header("Accept", "application/json");
        }

        let send = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, rquest::Error>((status, headers, body))
        };

        let outcome = tokio::select! {
            r = tokio::time::timeout(self.attempt_timeout, send) => r,
            _ = cancel.cancelled() => {
                return Err(RetryClass::Terminal(FetchError::Cancelled));
            }
        };

        match outcome {
            Err(_) => Err(RetryClass::Transient {
                err: FetchError::Timeout,
                retry_after: None,
            }),
            Ok(Err(e)) => {
                let err = if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::network(e.to_string())
                };
                Err(RetryClass::Transient { err, retry_after: None })
            }
            Ok(Ok((status, headers, body))) => match status {
                200..=299 => Ok(FetchResponse { status, headers, body }),
                429 => Err(RetryClass::Transient {
                    err: FetchError::Http4xx(429),
                    retry_after: parse_retry_after(&headers),
                }),
                500..=599 => Err(RetryClass::Transient {
                    err: FetchError::Http5xx(status),
                    retry_after: None,
                }),
                _ => Err(RetryClass::Terminal(FetchError::Http4xx(status))),
            },
        }
    }

    async fn render_page(&self, url: &str) -> Result<FetchResponse, FetchError> {
        if !self.renderer.is_available() {
            return Err(FetchError::RequiresJs);
        }
        match self.renderer.render(url).await {
            Ok(html) => Ok(FetchResponse {
                status: 200,
                headers: rquest::header::HeaderMap::new(),
                body: html,
            }),
            Err(RenderError::Unsupported) => Err(FetchError::RequiresJs),
            Err(RenderError::Failed(msg)) => Err(FetchError::network(msg)),
        }
    }
}

enum RetryClass {
    Transient {
        err: FetchError,
        retry_after: Option<Duration>,
    },
    Terminal(FetchError),
}

fn backoff_delay(attempt: u32) -> Duration {
    let base = BACKOFF_BASE.as_secs_f64() * 2f64.powi(attempt as i32);
    let jitter = rand::thread_rng().gen_range(0.7..1.3);
    Duration::from_secs_f64(base * jitter)
}

fn parse_retry_after(headers: &rquest::header::HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
