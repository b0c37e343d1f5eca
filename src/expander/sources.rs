//! Seed source registry and per-source extractors.
//!
//! Each source turns one external directory into a flat list of raw company
//! names; the expander validates, slugs and deduplicates them afterwards.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Y Combinator public companies API (JSON)
    YcDirectory,
    /// Hard-coded list of known Greenhouse/Lever users
    CuratedAts,
    /// Hard-coded unicorn list
    Unicorns,
    /// awesome-career-pages README (markdown links)
    AwesomeCareerPages,
    /// Wikipedia S&P 500 constituents table (HTML)
    WikipediaSp500,
    /// SEC official company tickers (JSON)
    SecTickers,
}

#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub name: &'static str,
    pub kind: SourceKind,
    pub tier: i64,
    pub priority: u8,
    pub url: Option<String>,
}

pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec {
            name: "yc-directory",
            kind: SourceKind::YcDirectory,
            tier: 1,
            priority: 95,
            url: Some("https://api.ycombinator.com/v0.1/companies".to_string()),
        },
        SourceSpec {
            name: "ats-curated",
            kind: SourceKind::CuratedAts,
            tier: 1,
            priority: 90,
            url: None,
        },
        SourceSpec {
            name: "awesome-career-pages",
            kind: SourceKind::AwesomeCareerPages,
            tier: 1,
            priority: 88,
            url: Some(
                "https://raw.githubusercontent.com/CSwala/awesome-career-pages/main/README.md"
                    .to_string(),
            ),
        },
        SourceSpec {
            name: "crunchbase-unicorn",
            kind: SourceKind::Unicorns,
            tier: 1,
            priority: 85,
            url: None,
        },
        SourceSpec {
            name: "wikipedia-sp500",
            kind: SourceKind::WikipediaSp500,
            tier: 2,
            priority: 80,
            url: Some("https://en.wikipedia.org/wiki/List_of_S%26P_500_companies".to_string()),
        },
        SourceSpec {
            name: "sec-tickers",
            kind: SourceKind::SecTickers,
            tier: 2,
            priority: 75,
            url: Some("https://www.sec.gov/files/company_tickers.json".to_string()),
        },
    ]
}

// ============================================================================
// STATIC LISTS
// ============================================================================

pub const ATS_CURATED: &[&str] = &[
    "Stripe", "Airbnb", "Dropbox", "Reddit", "Pinterest", "Slack", "Coinbase", "Instacart",
    "DoorDash", "Brex", "Notion", "Figma", "Vercel", "Cloudflare", "SpaceX", "Anduril",
    "Scale AI", "Anthropic", "OpenAI", "Cruise", "IonQ", "HubSpot", "Okta", "Affirm",
    "Postman", "Unity", "Vimeo", "Lyft", "Oscar Health",
];

pub const UNICORNS: &[&str] = &[
    "Databricks", "Canva", "Discord", "Epic Games", "Robinhood", "Chime", "Plaid", "Airtable",
    "Flexport", "Gusto", "Zapier", "Carta", "Benchling", "Ramp", "Waymo", "Rivian", "Klarna",
    "Revolut", "Nubank", "Grab", "Flipkart", "Swiggy", "Zomato", "UiPath", "Miro", "Snyk",
    "HashiCorp", "GitLab", "Elastic", "Confluent", "MongoDB", "Snowflake", "DataRobot",
];

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Markdown links `[Company](https://careers...)`, skipping TOC entries.
pub fn parse_awesome_career_pages(markdown: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\((https?://[^)]+)\)").unwrap());

    re.captures_iter(markdown)
        .map(|c| c[1].trim().to_string())
        .filter(|name| {
            !matches!(
                name.to_lowercase().as_str(),
                "top" | "back to top" | "contents" | "contributing"
            )
        })
        .collect()
}

/// YC companies API: JSON array of objects with a `name` field.
pub fn parse_yc_companies(body: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };
    let Some(companies) = value.as_array() else {
        return Vec::new();
    };
    companies
        .iter()
        .filter_map(|c| c.get("name").and_then(|n| n.as_str()))
        .map(|n| n.to_string())
        .collect()
}

/// Wikipedia constituents table: second cell of each row is the company.
pub fn parse_wikipedia_sp500(html: &str) -> Vec<String> {
    static ROW: OnceLock<Selector> = OnceLock::new();
    static CELL: OnceLock<Selector> = OnceLock::new();
    let row_sel = ROW.get_or_init(|| Selector::parse("table#constituents tr").unwrap());
    let cell_sel = CELL.get_or_init(|| Selector::parse("td").unwrap());

    let document = Html::parse_document(html);
    let mut companies = Vec::new();
    for row in document.select(row_sel) {
        let cells: Vec<String> = row
            .select(cell_sel)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() > 1 && !cells[1].is_empty() {
            companies.push(cells[1].clone());
        }
    }
    companies
}

/// SEC tickers file: `{"0": {"ticker": ..., "title": ...}, ...}`.
pub fn parse_sec_tickers(body: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };
    let Some(entries) = value.as_object() else {
        return Vec::new();
    };
    entries
        .values()
        .filter_map(|e| e.get("title").and_then(|t| t.as_str()))
        .map(|t| t.to_string())
        .collect()
}
