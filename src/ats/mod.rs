//! ATS provider registry.
//!
//! Each provider is one row of a capability table: how to build its probe
//! and listing requests, how to parse its responses, its priority for
//! tie-breaking, and the rate-limit key the Fetcher throttles it under.
//! Polymorphism by table, not inheritance.

mod ashby;
mod greenhouse;
mod html_boards;
mod json_boards;
mod lever;
mod personio;
mod smartrecruiters;
mod workable;
mod workday;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::models::BoardPage;
use crate::error::FetchError;
use crate::fetcher::FetchRequest;

// ============================================================================
// PROVIDER ENUM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtsType {
    Greenhouse,
    Lever,
    Ashby,
    Workday,
    SmartRecruiters,
    Icims,
    Taleo,
    SuccessFactors,
    Workable,
    Breezy,
    Recruitee,
    Personio,
    Teamtailor,
    Jazz,
    Pinpoint,
}

/// All providers in descending tie-break priority.
pub const ALL_PROVIDERS: &[AtsType] = &[
    AtsType::Greenhouse,
    AtsType::Lever,
    AtsType::Ashby,
    AtsType::Workday,
    AtsType::SmartRecruiters,
    AtsType::Icims,
    AtsType::Taleo,
    AtsType::SuccessFactors,
    AtsType::Workable,
    AtsType::Breezy,
    AtsType::Recruitee,
    AtsType::Personio,
    AtsType::Teamtailor,
    AtsType::Jazz,
    AtsType::Pinpoint,
];

impl AtsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greenhouse => "greenhouse",
            Self::Lever => "lever",
            Self::Ashby => "ashby",
            Self::Workday => "workday",
            Self::SmartRecruiters => "smartrecruiters",
            Self::Icims => "icims",
            Self::Taleo => "taleo",
            Self::SuccessFactors => "successfactors",
            Self::Workable => "workable",
            Self::Breezy => "breezy",
            Self::Recruitee => "recruitee",
            Self::Personio => "personio",
            Self::Teamtailor => "teamtailor",
            Self::Jazz => "jazz",
            Self::Pinpoint => "pinpoint",
        }
    }

    /// Higher wins when several providers confirm the same token.
    pub fn priority(&self) -> u8 {
        let position = ALL_PROVIDERS
            .iter()
            .position(|a| a == self)
            .unwrap_or(ALL_PROVIDERS.len());
        (ALL_PROVIDERS.len() - position) as u8
    }

    /// Key for the Fetcher's per-host token buckets. Providers with an
    /// explicit configured rate use their own key; the rest share the
    /// default rate under their provider name.
    pub fn rate_limit_key(&self) -> &'static str {
        self.as_str()
    }

    /// Page size when the listing endpoint paginates.
    pub fn page_size(&self) -> Option<u32> {
        match self {
            Self::Workday => Some(workday::PAGE_SIZE),
            Self::SmartRecruiters => Some(smartrecruiters::PAGE_SIZE),
            _ => None,
        }
    }
}

impl std::str::FromStr for AtsType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_PROVIDERS
            .iter()
            .find(|a| a.as_str() == s)
            .copied()
            .ok_or(())
    }
}

impl std::fmt::Display for AtsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// URL templates for one provider. `{token}` and `{offset}` are expanded at
/// request-build time. Templates are overridable so tests can point a
/// provider at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub probe: String,
    pub listing: String,
    pub careers: String,
}

pub struct AtsRegistry {
    endpoints: HashMap<AtsType, Endpoints>,
}

impl AtsRegistry {
    pub fn new() -> Self {
        let mut endpoints = HashMap::new();
        for ats in ALL_PROVIDERS {
            endpoints.insert(*ats, default_endpoints(*ats));
        }
        Self { endpoints }
    }

    /// Replace one provider's endpoints (mock servers in tests, or a
    /// region-specific deployment).
    pub fn with_endpoints(mut self, ats: AtsType, e: Endpoints) -> Self {
        self.endpoints.insert(ats, e);
        self
    }

    fn expand(&self, template: &str, token: &str, offset: u32) -> String {
        template
            .replace("{token}", token)
            .replace("{offset}", &offset.to_string())
    }

    /// The cheap existence check for (ats, token).
    pub fn probe_request(&self, ats: AtsType, token: &str) -> FetchRequest {
        let url = self.expand(&self.endpoints[&ats].probe, token, 0);
        self.request_for(ats, url, 0)
    }

    /// One page of the full listing.
    pub fn listing_request(&self, ats: AtsType, token: &str, offset: u32) -> FetchRequest {
        let url = self.expand(&self.endpoints[&ats].listing, token, offset);
        self.request_for(ats, url, offset)
    }

    pub fn careers_url(&self, ats: AtsType, token: &str) -> String {
        self.expand(&self.endpoints[&ats].careers, token, 0)
    }

    fn request_for(&self, ats: AtsType, url: String, offset: u32) -> FetchRequest {
        let request = match ats {
            AtsType::Workday => FetchRequest::post_json(url, workday::search_body(offset)),
            AtsType::Teamtailor
            | AtsType::Jazz
            | AtsType::Icims
            | AtsType::Taleo
            | AtsType::SuccessFactors => FetchRequest::get(url),
            _ => FetchRequest::json(url),
        };
        request.with_rate_key(ats.rate_limit_key())
    }

    /// Provider-specific deserialization of a listing/probe response body.
    pub fn parse_page(&self, ats: AtsType, token: &str, body: &str) -> Result<BoardPage, FetchError> {
        match ats {
            AtsType::Greenhouse => greenhouse::parse(body),
            AtsType::Lever => lever::parse(body),
            AtsType::Ashby => ashby::parse(body),
            AtsType::Workday => workday::parse(token, body),
            AtsType::SmartRecruiters => smartrecruiters::parse(body),
            AtsType::Workable => workable::parse(body),
            AtsType::Breezy => json_boards::parse_breezy(body),
            AtsType::Recruitee => json_boards::parse_recruitee(body),
            AtsType::Pinpoint => json_boards::parse_pinpoint(body),
            AtsType::Personio => personio::parse(body),
            AtsType::Teamtailor => html_boards::parse_teamtailor(body),
            AtsType::Jazz => html_boards::parse_jazz(body),
            AtsType::Icims => html_boards::parse_icims(body),
            AtsType::Taleo => html_boards::parse_taleo(body),
            AtsType::SuccessFactors => html_boards::parse_successfactors(body),
        }
    }
}

impl Default for AtsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_endpoints(ats: AtsType) -> Endpoints {
    let (probe, listing, careers) = match ats {
        AtsType::Greenhouse => (
            "https://boards-api.greenhouse.io/v1/boards/{token}/jobs",
            "https://boards-api.greenhouse.io/v1/boards/{token}/jobs?content=true",
            "https://boards.greenhouse.io/{token}",
        ),
        AtsType::Lever => (
            "https://api.lever.co/v0/postings/{token}?mode=json",
            "https://api.lever.co/v0/postings/{token}?mode=json",
            "https://jobs.lever.co/{token}",
        ),
        AtsType::Ashby => (
            "https://api.ashbyhq.com/posting-api/job-board/{token}",
            "https://api.ashbyhq.com/posting-api/job-board/{token}",
            "https://jobs.ashbyhq.com/{token}",
        ),
        AtsType::Workday => (
            "https://{token}.wd1.myworkdayjobs.com/wday/cxs/{token}/External/jobs",
            "https://{token}.wd1.myworkdayjobs.com/wday/cxs/{token}/External/jobs",
            "https://{token}.wd1.myworkdayjobs.com/External",
        ),
        AtsType::SmartRecruiters => (
            "https://api.smartrecruiters.com/v1/companies/{token}/postings?limit=10",
            "https://api.smartrecruiters.com/v1/companies/{token}/postings?limit=100&offset={offset}",
            "https://jobs.smartrecruiters.com/{token}",
        ),
        AtsType::Icims => (
            "https://careers-{token}.icims.com/jobs/search?ss=1&in_iframe=1",
            "https://careers-{token}.icims.com/jobs/search?ss=1&in_iframe=1",
            "https://careers-{token}.icims.com/jobs",
        ),
        AtsType::Taleo => (
            "https://{token}.taleo.net/careersection/ex/jobsearch.ftl",
            "https://{token}.taleo.net/careersection/ex/jobsearch.ftl",
            "https://{token}.taleo.net/careersection/ex/jobsearch.ftl",
        ),
        AtsType::SuccessFactors => (
            "https://career8.successfactors.com/career?company={token}",
            "https://career8.successfactors.com/career?company={token}",
            "https://career8.successfactors.com/career?company={token}",
        ),
        AtsType::Workable => (
            "https://apply.workable.com/api/v1/widget/accounts/{token}",
            "https://apply.workable.com/api/v1/widget/accounts/{token}",
            "https://apply.workable.com/{token}",
        ),
        AtsType::Breezy => (
            "https://{token}.breezy.hr/json",
            "https://{token}.breezy.hr/json",
            "https://{token}.breezy.hr",
        ),
        AtsType::Recruitee => (
            "https://{token}.recruitee.com/api/offers/",
            "https://{token}.recruitee.com/api/offers/",
            "https://{token}.recruitee.com",
        ),
        AtsType::Personio => (
            "https://{token}.jobs.personio.de/xml",
            "https://{token}.jobs.personio.de/xml",
            "https://{token}.jobs.personio.de",
        ),
        AtsType::Teamtailor => (
            "https://{token}.teamtailor.com/jobs",
            "https://{token}.teamtailor.com/jobs",
            "https://{token}.teamtailor.com/jobs",
        ),
        AtsType::Jazz => (
            "https://{token}.applytojob.com/apply",
            "https://{token}.applytojob.com/apply",
            "https://{token}.applytojob.com/apply",
        ),
        AtsType::Pinpoint => (
            "https://{token}.pinpointhq.com/postings.json",
            "https://{token}.pinpointhq.com/postings.json",
            "https://{token}.pinpointhq.com",
        ),
    };
    Endpoints {
        probe: probe.to_string(),
        listing: listing.to_string(),
        careers: careers.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::FetchMethod;

    #[test]
    fn test_priority_descends_in_registry_order() {
        assert!(AtsType::Greenhouse.priority() > AtsType::Lever.priority());
        assert!(AtsType::Lever.priority() > AtsType::Workable.priority());
        assert!(AtsType::Jazz.priority() > AtsType::Pinpoint.priority());
    }

    #[test]
    fn test_as_str_round_trips() {
        for ats in ALL_PROVIDERS {
            let parsed: AtsType = ats.as_str().parse().unwrap();
            assert_eq!(parsed, *ats);
        }
        assert!("linkedin".parse::<AtsType>().is_err());
    }

    #[test]
    fn test_probe_request_expands_token() {
        let registry = AtsRegistry::new();
        let req = registry.probe_request(AtsType::Greenhouse, "stripe");
        assert_eq!(
            req.url,
            "https://boards-api.greenhouse.io/v1/boards/stripe/jobs"
        );
        assert!(matches!(req.method, FetchMethod::Get));
        assert_eq!(req.rate_key.as_deref(), Some("greenhouse"));
    }

    #[test]
    fn test_workday_probe_is_post() {
        let registry = AtsRegistry::new();
        let req = registry.probe_request(AtsType::Workday, "acme");
        assert!(matches!(req.method, FetchMethod::PostJson(_)));
        assert!(req.url.contains("acme.wd1.myworkdayjobs.com"));
    }

    #[test]
    fn test_listing_request_offset() {
        let registry = AtsRegistry::new();
        let req = registry.listing_request(AtsType::SmartRecruiters, "acme", 200);
        assert!(req.url.ends_with("offset=200"));
    }

    #[test]
    fn test_endpoint_override() {
        let registry = AtsRegistry::new().with_endpoints(
            AtsType::Lever,
            Endpoints {
                probe: "http://127.0.0.1:9999/postings/{token}".into(),
                listing: "http://127.0.0.1:9999/postings/{token}".into(),
                careers: "http://127.0.0.1:9999/{token}".into(),
            },
        );
        let req = registry.probe_request(AtsType::Lever, "acme");
        assert_eq!(req.url, "http://127.0.0.1:9999/postings/acme");
    }
}
