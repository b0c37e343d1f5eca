//! Ashby Posting API.

use serde::Deserialize;

use crate::domain::models::{BoardPage, RawJob};
use crate::error::FetchError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AshbyJobPosting {
    title: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    description_plain: Option<String>,
    #[serde(default)]
    job_url: Option<String>,
    #[serde(default)]
    is_remote: Option<bool>,
    #[serde(default)]
    is_listed: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AshbyJobBoardResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    jobs: Vec<AshbyJobPosting>,
}

pub fn parse(body: &str) -> Result<BoardPage, FetchError> {
    let board: AshbyJobBoardResponse =
        serde_json::from_str(body).map_err(|e| FetchError::parse(format!("ashby board: {}", e)))?;

    let jobs = board
        .jobs
        .into_iter()
        // Unlisted postings are not part of the public open set
        .filter(|j| j.is_listed != Some(false))
        .map(|j| RawJob {
            title: j.title,
            location: j.location,
            department: j.department.or(j.team),
            url: j.job_url,
            description: j.description_plain,
            remote: j.is_remote,
        })
        .collect();

    Ok(BoardPage {
        board_name: board.title,
        jobs,
        total: None,
    })
}
