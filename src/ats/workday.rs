//! Workday CXS job search endpoint.
//!
//! Workday is the one provider probed with POST: the CXS endpoint takes a
//! JSON search body and pages by offset, reporting the total up front.

use serde::Deserialize;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

pub const PAGE_SIZE: u32 = 20;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkdayJobPosting {
    title: String,
    #[serde(default)]
    locations_text: Option<String>,
    #[serde(default)]
    external_path: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkdaySearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    job_postings: Vec<WorkdayJobPosting>,
}

pub fn search_body(offset: u32) -> serde_json::Value {
    serde_json::json!({
        "appliedFacets": {},
        "limit": PAGE_SIZE,
        "offset": offset,
        "searchText": ""
    })
}

pub fn parse(token: &str, body: &str) -> Result<BoardPage, FetchError> {
    let response: WorkdaySearchResponse =
        serde_json::from_str(body).map_err(|e| FetchError::parse(format!("workday search: {}", e)))?;

    let jobs = response
        .job_postings
        .into_iter()
        .map(|j| {
            let url = j
                .external_path
                .map(|p| format!("https://{}.wd1.myworkdayjobs.com/External{}", token, p));
            RawJob {
                title: j.title,
                location: j.locations_text,
                department: None,
                url,
                description: None,
                remote: None,
            }
        })
        .collect();

    Ok(BoardPage {
        board_name: None,
        jobs,
        total: Some(response.total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_with_total() {
        let body = r#"{
            "total": 43,
            "jobPostings": [
                {"title": "Supply Chain Analyst", "locationsText": "Chicago, IL", "externalPath": "/job/Chicago/Analyst_JR100"},
                {"title": "Warehouse Lead", "locationsText": "2 Locations"}
            ]
        }"#;

        let page = parse("acme", body).unwrap();
        assert_eq!(page.total, Some(43));
        assert_eq!(page.jobs.len(), 2);
        assert_eq!(
            page.jobs[0].url.as_deref(),
            Some("https://acme.wd1.myworkdayjobs.com/External/job/Chicago/Analyst_JR100")
        );
    }

    #[test]
    fn test_search_body_offsets() {
        let body = search_body(40);
        assert_eq!(body["offset"], 40);
        assert_eq!(body["limit"], PAGE_SIZE);
    }
}
