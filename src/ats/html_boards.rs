//! HTML-only board providers: Teamtailor, Jazz, iCIMS, Taleo,
//! SuccessFactors.
//!
//! These have no public JSON listing, so we scrape the posting links off
//! the careers page. A 200 page with no recognizable posting links is a
//! parse failure — for the probe engine that is indistinguishable from a
//! miss, which is what we want (any marketing page would otherwise count
//! as a board).

use std::collections::HashSet;
use std::sync::OnceLock;

use scraper::{Html, Selector};

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

fn selector(cache: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cache.get_or_init(|| Selector::parse(css).expect("invalid selector"))
}

/// Extract posting links matched by `css`, deduplicated by href.
fn extract_postings(body: &str, sel: &Selector, provider: &str) -> Result<Vec<RawJob>, FetchError> {
    let document = Html::parse_document(body);
    let mut seen: HashSet<String> = HashSet::new();
    let mut jobs = Vec::new();

    for element in document.select(sel) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let title: String = element.text().collect::<String>().trim().to_string();
        if title.len() < 2 || !seen.insert(href.to_string()) {
            continue;
        }
        jobs.push(RawJob {
            title,
            location: None,
            department: None,
            url: Some(href.to_string()),
            description: None,
            remote: None,
        });
    }

    if jobs.is_empty() {
        return Err(FetchError::parse(format!("{}: no posting links found", provider)));
    }
    Ok(jobs)
}

fn page(jobs: Vec<RawJob>) -> BoardPage {
    BoardPage {
        board_name: None,
        jobs,
        total: None,
    }
}

pub fn parse_teamtailor(body: &str) -> Result<BoardPage, FetchError> {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let sel = selector(&SEL, r#"a[href*="/jobs/"]"#);
    Ok(page(extract_postings(body, sel, "teamtailor")?))
}

pub fn parse_jazz(body: &str) -> Result<BoardPage, FetchError> {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let sel = selector(&SEL, r#"a[href*="/apply/"]"#);
    Ok(page(extract_postings(body, sel, "jazz")?))
}

pub fn parse_icims(body: &str) -> Result<BoardPage, FetchError> {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let sel = selector(&SEL, r#"a.iCIMS_Anchor, a[href*="/jobs/"]"#);
    Ok(page(extract_postings(body, sel, "icims")?))
}

pub fn parse_taleo(body: &str) -> Result<BoardPage, FetchError> {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let sel = selector(&SEL, r#"a[href*="jobdetail.ftl"]"#);
    Ok(page(extract_postings(body, sel, "taleo")?))
}

pub fn parse_successfactors(body: &str) -> Result<BoardPage, FetchError> {
    static SEL: OnceLock<Selector> = OnceLock::new();
    let sel = selector(&SEL, r#"a.jobTitle-link, a[href*="career_job_req_id"]"#);
    Ok(page(extract_postings(body, sel, "successfactors")?))
}
