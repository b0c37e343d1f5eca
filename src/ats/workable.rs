//! Workable Widget API v1.

use serde::Deserialize;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

#[derive(Deserialize)]
struct WorkableJob {
    title: String,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    telecommuting: Option<bool>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Deserialize)]
struct WorkableBoardResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    jobs: Vec<WorkableJob>,
}

pub fn parse(body: &str) -> Result<BoardPage, FetchError> {
    let board: WorkableBoardResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::parse(format!("workable account: {}", e)))?;

    let jobs = board
        .jobs
        .into_iter()
        .map(|j| {
            let location = join_location(&[&j.city, &j.state, &j.country]);
            RawJob {
                title: j.title,
                location,
                department: j.department,
                url: j.url,
                description: None,
                remote: j.telecommuting,
            }
        })
        .collect();

    Ok(BoardPage {
        board_name: board.name,
        jobs,
        total: None,
    })
}

fn join_location(parts: &[&Option<String>]) -> Option<String> {
    let joined: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account() {
        let body = r#"{
            "name": "Acme",
            "jobs": [
                {"title": "Data Analyst", "city": "Athens", "country": "Greece", "department": "Analytics", "url": "https://apply.workable.com/acme/j/1"},
                {"title": "SRE", "telecommuting": true}
            ]
        }"#;

        let page = parse(body).unwrap();
        assert_eq!(page.jobs.len(), 2);
        assert_eq!(page.jobs[0].location.as_deref(), Some("Athens, Greece"));
        assert_eq!(page.jobs[1].remote, Some(true));
        assert!(page.jobs[1].location.is_none());
    }
}
