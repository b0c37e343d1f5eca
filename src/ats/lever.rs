//! Lever Postings API v0.

use serde::Deserialize;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverCategories {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    department: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeverPosting {
    /// Job title
    text: String,
    #[serde(default)]
    categories: Option<LeverCategories>,
    #[serde(default)]
    description_plain: Option<String>,
    #[serde(default)]
    hosted_url: Option<String>,
    /// on-site, remote, hybrid, unspecified
    #[serde(default)]
    workplace_type: Option<String>,
}

/// The postings endpoint returns a bare JSON array; an empty array is a
/// valid board with zero openings.
pub fn parse(body: &str) -> Result<BoardPage, FetchError> {
    let postings: Vec<LeverPosting> =
        serde_json::from_str(body).map_err(|e| FetchError::parse(format!("lever postings: {}", e)))?;

    let jobs = postings
        .into_iter()
        .map(|p| {
            let remote = p.workplace_type.as_deref().map(|w| w == "remote");
            let (location, department) = match p.categories {
                Some(c) => (c.location, c.department.or(c.team)),
                None => (None, None),
            };
            RawJob {
                title: p.text,
                location,
                department,
                url: p.hosted_url,
                description: p.description_plain,
                remote,
            }
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
    fn test_parse_postings() {
        let body = r#"[
            {
                "id": "abc",
                "text": "Platform Engineer",
                "categories": {"location": "London, United Kingdom", "team": "Infrastructure"},
                "workplaceType": "hybrid",
                "hostedUrl": "https://jobs.lever.co/acme/abc",
                "descriptionPlain": "Kafka and Terraform experience required."
            },
            {
                "id": "def",
                "text": "Designer",
                "categories": {"location": "Remote", "department": "Design"},
                "workplaceType": "remote"
            }
        ]"#;

        let page = parse(body).unwrap();
        assert_eq!(page.jobs.len(), 2);
        assert_eq!(page.jobs[0].department.as_deref(), Some("Infrastructure"));
        assert_eq!(page.jobs[0].remote, Some(false));
        assert_eq!(page.jobs[1].remote, Some(true));
        assert_eq!(page.jobs[1].department.as_deref(), Some("Design"));
    }

    #[test]
    fn test_parse_empty_array_is_valid() {
        let page = parse("[]").unwrap();
        assert!(page.jobs.is_empty());
    }

    #[test]
    fn test_parse_object_fails() {
        assert!(parse(r#"{"ok": false}"#).is_err());
    }
}
