//! Greenhouse Job Board API v1.

use serde::Deserialize;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

#[derive(Deserialize)]
struct GreenhouseLocation {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct GreenhouseDepartment {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct GreenhouseJob {
    title: String,
    #[serde(default)]
    absolute_url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    location: Option<GreenhouseLocation>,
    #[serde(default)]
    departments: Option<Vec<GreenhouseDepartment>>,
}

#[derive(Deserialize)]
struct GreenhouseBoardResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    jobs: Vec<GreenhouseJob>,
}

/// A valid response with zero jobs still parses — the board exists.
pub fn parse(body: &str) -> Result<BoardPage, FetchError> {
    let board: GreenhouseBoardResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("greenhouse board: {}", e)))?;

    let jobs = board
        .jobs
        .into_iter()
        .map(|j| RawJob {
            title: j.title,
            location: j.location.and_then(|l| l.name),
            department: j
                .departments
                .and_then(|ds| ds.into_iter().find_map(|d| d.name)),
            url: j.absolute_url,
            description: j.content,
            remote: None,
        })
        .collect();

    Ok(BoardPage {
        board_name: board.name,
        jobs,
        total: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_board() {
        let body = r#"{
            "name": "Stripe",
            "jobs": [
                {
                    "id": 1,
                    "title": "Backend Engineer",
                    "absolute_url": "https://boards.greenhouse.io/stripe/jobs/1",
                    "location": {"name": "San Francisco, CA"},
                    "departments": [{"id": 7, "name": "Engineering"}],
                    "content": "We use Rust and Kubernetes."
                },
                {
                    "id": 2,
                    "title": "Account Executive",
                    "location": {"name": "Remote"}
                }
            ]
        }"#;

        let page = parse(body).unwrap();
        assert_eq!(page.board_name.as_deref(), Some("Stripe"));
        assert_eq!(page.jobs.len(), 2);
        assert_eq!(page.jobs[0].title, "Backend Engineer");
        assert_eq!(page.jobs[0].department.as_deref(), Some("Engineering"));
        assert_eq!(page.jobs[1].location.as_deref(), Some("Remote"));
        assert!(page.jobs[1].url.is_none());
    }

    #[test]
    fn test_parse_empty_board_is_valid() {
        let page = parse(r#"{"name": "Ghost Co", "jobs": []}"#).unwrap();
        assert!(page.jobs.is_empty());
        assert_eq!(page.board_name.as_deref(), Some("Ghost Co"));
    }

    #[test]
    fn test_parse_html_error_page_fails() {
        assert!(parse("<html>404</html>").is_err());
    }
}
