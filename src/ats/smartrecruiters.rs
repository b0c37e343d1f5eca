//! SmartRecruiters public postings API, paginated by offset.

use serde::Deserialize;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

pub const PAGE_SIZE: u32 = 100;

#[derive(Deserialize)]
struct SrLocation {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    remote: Option<bool>,
}

#[derive(Deserialize)]
struct SrLabel {
    #[serde(default)]
    label: Option<String>,
}

#[derive(Deserialize)]
struct SrPosting {
    name: String,
    #[serde(default)]
    location: Option<SrLocation>,
    #[serde(default)]
    function: Option<SrLabel>,
    #[serde(default)]
    department: Option<SrLabel>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SrPostingsResponse {
    #[serde(default)]
    total_found: u64,
    #[serde(default)]
    content: Vec<SrPosting>,
}

pub fn parse(body: &str) -> Result<BoardPage, FetchError> {
    let response: SrPostingsResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("smartrecruiters postings: {}", e)))?;

    let jobs = response
        .content
        .into_iter()
        .map(|p| {
            let (location, remote) = match &p.location {
                Some(l) => {
                    let parts: Vec<&str> = [l.city.as_deref(), l.region.as_deref(), l.country.as_deref()]
                        .into_iter()
                        .flatten()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .collect();
                    let joined = if parts.is_empty() {
                        None
                    } else {
                        Some(parts.join(", "))
                    };
                    (joined, l.remote)
                }
                None => (None, None),
            };
            RawJob {
                title: p.name,
                location,
                department: p
                    .department
                    .and_then(|d| d.label)
                    .or_else(|| p.function.and_then(|f| f.label)),
                url: None,
                description: None,
                remote,
            }
        })
        .collect();

    Ok(BoardPage {
        board_name: None,
        jobs,
        total: Some(response.total_found),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_postings_page() {
        let body = r#"{
            "totalFound": 120,
            "content": [
                {"name": "QA Engineer", "location": {"city": "Krakow", "country": "pl"}, "function": {"label": "Engineering"}},
                {"name": "Remote CSM", "location": {"remote": true}}
            ]
        }"#;

        let page = parse(body).unwrap();
        assert_eq!(page.total, Some(120));
        assert_eq!(page.jobs[0].location.as_deref(), Some("Krakow, pl"));
        assert_eq!(page.jobs[0].department.as_deref(), Some("Engineering"));
        assert_eq!(page.jobs[1].remote, Some(true));
    }
}
