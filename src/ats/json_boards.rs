//! Small JSON board providers: Breezy, Recruitee, Pinpoint.

use serde::Deserialize;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

// ============================================================================
// BREEZY — {token}.breezy.hr/json, bare array of positions
// ============================================================================

#[derive(Deserialize)]
struct BreezyLocation {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct BreezyPosition {
    name: String,
    #[serde(default)]
    location: Option<BreezyLocation>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub fn parse_breezy(body: &str) -> Result<BoardPage, FetchError> {
    let positions: Vec<BreezyPosition> =
        serde_json::from_str(body).map_err(|e| FetchError::parse(format!("breezy positions: {}", e)))?;

    let jobs = positions
        .into_iter()
        .map(|p| RawJob {
            title: p.name,
            location: p.location.and_then(|l| l.name),
            department: p.department,
            url: p.url,
            description: None,
            remote: None,
        })
        .collect();

    Ok(BoardPage {
        board_name: None,
        jobs,
        total: None,
    })
}

// ============================================================================
// RECRUITEE — {token}.recruitee.com/api/offers/
// ============================================================================

#[derive(Deserialize)]
struct RecruiteeOffer {
    title: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    careers_url: Option<String>,
}

#[derive(Deserialize)]
struct RecruiteeResponse {
    #[serde(default)]
    offers: Vec<RecruiteeOffer>,
}

pub fn parse_recruitee(body: &str) -> Result<BoardPage, FetchError> {
    let response: RecruiteeResponse =
        serde_json::from_str(body).map_err(|e| FetchError::parse(format!("recruitee offers: {}", e)))?;

    let jobs = response
        .offers
        .into_iter()
        .map(|o| RawJob {
            title: o.title,
            location: o.location,
            department: o.department,
            url: o.careers_url,
            description: None,
            remote: None,
        })
        .collect();

    Ok(BoardPage {
        board_name: None,
        jobs,
        total: None,
    })
}

// ============================================================================
// PINPOINT — {token}.pinpointhq.com/postings.json
// ============================================================================

#[derive(Deserialize)]
struct PinpointName {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct PinpointPosting {
    title: String,
    #[serde(default)]
    location: Option<PinpointName>,
    #[serde(default)]
    department: Option<PinpointName>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct PinpointResponse {
    #[serde(default)]
    data: Vec<PinpointPosting>,
}

pub fn parse_pinpoint(body: &str) -> Result<BoardPage, FetchError> {
    let response: PinpointResponse =
        serde_json::from_str(body).map_err(|e| FetchError::parse(format!("pinpoint postings: {}", e)))?;

    let jobs = response
        .data
        .into_iter()
        .map(|p| RawJob {
            title: p.title,
            location: p.location.and_then(|l| l.name),
            department: p.department.and_then(|d| d.name),
            url: p.url,
            description: None,
            remote: None,
        })
        .collect();

    Ok(BoardPage {
        board_name: None,
        jobs,
        total: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_breezy() {
        let body = r#"[
            {"name": "Office Manager", "location": {"name": "Lisbon, Portugal"}, "department": "Operations", "url": "https://acme.breezy.hr/p/1"}
        ]"#;
        let page = parse_breezy(body).unwrap();
        assert_eq!(page.jobs.len(), 1);
        assert_eq!(page.jobs[0].location.as_deref(), Some("Lisbon, Portugal"));
    }

    #[test]
    fn test_parse_recruitee() {
        let body = r#"{"offers": [{"title": "Frontend Developer", "location": "Amsterdam, Netherlands", "department": "Engineering"}]}"#;
        let page = parse_recruitee(body).unwrap();
        assert_eq!(page.jobs[0].department.as_deref(), Some("Engineering"));
    }

    #[test]
    fn test_parse_pinpoint() {
        let body = r#"{"data": [{"title": "HR Advisor", "location": {"name": "Leeds"}, "department": {"name": "People"}}]}"#;
        let page = parse_pinpoint(body).unwrap();
        assert_eq!(page.jobs[0].title, "HR Advisor");
        assert_eq!(page.jobs[0].department.as_deref(), Some("People"));
    }

    #[test]
    fn test_wrong_shape_fails() {
        assert!(parse_breezy(r#"{"oops": true}"#).is_err());
        assert!(parse_recruitee("[]").is_err());
        assert!(parse_pinpoint("null").is_err());
    }
}
