//! Environment-driven configuration.
//!
//! Every knob has a default that matches production behavior; the struct is
//! the only surface the rest of the core reads settings from.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub db_pool_size: u32,
    pub db_max_overflow: u32,

    // Collector
    pub collector_batch_size: usize,
    pub collector_timeout_secs: u64,
    pub collector_max_retries: u32,
    pub collector_parallel_workers: usize,

    // Rate limiting (requests per second)
    pub rate_limit_greenhouse: f64,
    pub rate_limit_lever: f64,
    pub rate_limit_workday: f64,
    pub rate_limit_default: f64,

    // Scheduler
    pub refresh_interval_hours: i64,
    pub discovery_interval_hours: i64,

    // Probe engine
    pub max_concurrent_probes: usize,
    pub cache_ttl_seconds: u64,

    // Seed expander
    pub seed_min_length: usize,
    pub seed_max_length: usize,
    pub seed_max_words: usize,
    pub seed_expander_tiers: Vec<i64>,

    // Budgets
    pub company_budget_secs: u64,
    pub pass_budget_secs: u64,

    // Proxy (plumbed through, off by default)
    pub proxy_enabled: bool,
    pub proxy_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://boardwatch.db?mode=rwc".to_string(),
            db_pool_size: 15,
            db_max_overflow: 25,
            collector_batch_size: 10,
            collector_timeout_secs: 30,
            collector_max_retries: 3,
            collector_parallel_workers: 5,
            rate_limit_greenhouse: 2.0,
            rate_limit_lever: 2.0,
            rate_limit_workday: 1.0,
            rate_limit_default: 1.5,
            refresh_interval_hours: 6,
            discovery_interval_hours: 1,
            max_concurrent_probes: 8,
            cache_ttl_seconds: 3600,
            seed_min_length: 2,
            seed_max_length: 200,
            seed_max_words: 8,
            seed_expander_tiers: vec![1, 2],
            company_budget_secs: 120,
            pass_budget_secs: 3600,
            proxy_enabled: false,
            proxy_url: None,
        }
    }
}

impl Config {
    /// Build a config from the process environment, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            database_url: var_or("DATABASE_URL", d.database_url),
            db_pool_size: parsed_or("DB_POOL_SIZE", d.db_pool_size),
            db_max_overflow: parsed_or("DB_MAX_OVERFLOW", d.db_max_overflow),
            collector_batch_size: parsed_or("COLLECTOR_BATCH_SIZE", d.collector_batch_size),
            collector_timeout_secs: parsed_or("COLLECTOR_TIMEOUT", d.collector_timeout_secs),
            collector_max_retries: parsed_or("COLLECTOR_MAX_RETRIES", d.collector_max_retries),
            collector_parallel_workers: parsed_or(
                "COLLECTOR_PARALLEL_WORKERS",
                d.collector_parallel_workers,
            ),
            rate_limit_greenhouse: parsed_or("RATE_LIMIT_GREENHOUSE", d.rate_limit_greenhouse),
            rate_limit_lever: parsed_or("RATE_LIMIT_LEVER", d.rate_limit_lever),
            rate_limit_workday: parsed_or("RATE_LIMIT_WORKDAY", d.rate_limit_workday),
            rate_limit_default: parsed_or("RATE_LIMIT_DEFAULT", d.rate_limit_default),
            refresh_interval_hours: parsed_or("REFRESH_INTERVAL_HOURS", d.refresh_interval_hours),
            discovery_interval_hours: parsed_or(
                "DISCOVERY_INTERVAL_HOURS",
                d.discovery_interval_hours,
            ),
            max_concurrent_probes: parsed_or("MAX_CONCURRENT_PROBES", d.max_concurrent_probes),
            cache_ttl_seconds: parsed_or("CACHE_TTL_SECONDS", d.cache_ttl_seconds),
            seed_min_length: parsed_or("SEED_MIN_LENGTH", d.seed_min_length),
            seed_max_length: parsed_or("SEED_MAX_LENGTH", d.seed_max_length),
            seed_max_words: parsed_or("SEED_MAX_WORDS", d.seed_max_words),
            seed_expander_tiers: tiers_or("SEED_EXPANDER_TIERS", d.seed_expander_tiers),
            company_budget_secs: parsed_or("COMPANY_BUDGET_SECS", d.company_budget_secs),
            pass_budget_secs: parsed_or("PASS_BUDGET_SECS", d.pass_budget_secs),
            proxy_enabled: flag_or("PROXY_ENABLED", d.proxy_enabled),
            proxy_url: env::var("PROXY_URL").ok().filter(|s| !s.is_empty()),
        }
    }

    /// Requests/sec for a provider rate-limit key, falling back to the
    /// default bucket rate for unknown hosts.
    pub fn rate_for(&self, key: &str) -> f64 {
        match key {
            "greenhouse" => self.rate_limit_greenhouse,
            "lever" => self.rate_limit_lever,
            "workday" => self.rate_limit_workday,
            _ => self.rate_limit_default,
        }
    }
}

fn var_or(name: &str, default: String) -> String {
    env::var(name).ok().filter(|s| !s.is_empty()).unwrap_or(default)
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn flag_or(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
        .unwrap_or(default)
}

fn tiers_or(name: &str, default: Vec<i64>) -> Vec<i64> {
    match env::var(name) {
        Ok(raw) => {
            let tiers: Vec<i64> = raw
                .split(',')
                .filter_map(|t| t.trim().parse().ok())
                .collect();
            if tiers.is_empty() {
                default
            } else {
                tiers
            }
        }
        Err(_) => default,
    }
}
