//! Collector: pull the complete open-posting set for a confirmed board.
//!
//! The job list a pass emits is what the Reconciler diffs against the
//! archive to detect closures, so completeness matters: when a paginated
//! listing dies halfway through, the result is flagged partial and the
//! Reconciler will only add/refresh, never close.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::ats::{AtsRegistry, AtsType};
use crate::domain::models::{
    CollectedJob, CollectionResult, CompanyAggregates, PartialInfo, RawJob, WorkType,
};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::normalize::{company_id, normalize_job};

pub struct Collector {
    fetcher: Arc<Fetcher>,
    registry: Arc<AtsRegistry>,
}

impl Collector {
    pub fn new(fetcher: Arc<Fetcher>, registry: Arc<AtsRegistry>) -> Self {
        Self { fetcher, registry }
    }

    /// Fetch and normalize every open posting for (company, ats, token).
    ///
    /// A failure on the first page aborts the company (terminal error); a
    /// failure after k good pages returns the k pages as a partial result.
    pub async fn collect(
        &self,
        company_name: &str,
        ats: AtsType,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<CollectionResult> {
        let cid = company_id(ats.as_str(), token);
        log::info!("[COLLECT] {} via {} (token '{}')", company_name, ats, token);

        let mut raw_jobs: Vec<RawJob> = Vec::new();
        let mut partial: Option<PartialInfo> = None;

        let first_request = self.registry.listing_request(ats, token, 0);
        let first_response = self.fetcher.fetch(&first_request, cancel).await?;
        let first_page = self
            .registry
            .parse_page(ats, token, &first_response.body)
            .map_err(crate::error::CoreError::from)?;

        let board_name = first_page.board_name.clone();
        let total = first_page.total;
        raw_jobs.extend(first_page.jobs);

        // Walk remaining pages for providers that paginate
        if let (Some(total), Some(page_size)) = (total, ats.page_size()) {
            let mut pages_ok: u32 = 1;
            let mut offset = page_size;
            while u64::from(offset) < total {
                let request = self.registry.listing_request(ats, token, offset);
                let page = match self.fetcher.fetch(&request, cancel).await {
                    Ok(response) => self.registry.parse_page(ats, token, &response.body),
                    Err(e) => Err(e),
                };
                match page {
                    Ok(page) => {
                        if page.jobs.is_empty() {
                            break;
                        }
                        raw_jobs.extend(page.jobs);
                        pages_ok += 1;
                        offset += page_size;
                    }
                    Err(e) => {
                        log::warn!(
                            "[COLLECT] {}:{} page at offset {} failed after {} good pages: {}",
                            ats,
                            token,
                            offset,
                            pages_ok,
                            e
                        );
                        partial = Some(PartialInfo {
                            pages_ok,
                            error: e.to_string(),
                        });
                        break;
                    }
                }
            }
        }

        // Normalize and collapse duplicate hashes: at most one job per hash
        let mut jobs: Vec<CollectedJob> = Vec::new();
        let mut seen_hashes = std::collections::HashSet::new();
        for raw in &raw_jobs {
            let job = normalize_job(&cid, raw);
            if seen_hashes.insert(job.job_hash.clone()) {
                jobs.push(job);
            }
        }

        let aggregates = compute_aggregates(&jobs);
        let display_name = board_name.unwrap_or_else(|| company_name.to_string());

        log::info!(
            "[COLLECT] {} -> {} open postings{}",
            display_name,
            jobs.len(),
            if partial.is_some() { " (partial)" } else { "" }
        );

        Ok(CollectionResult {
            company_id: cid,
            company_name: display_name,
            ats_type: ats.as_str().to_string(),
            token: token.to_string(),
            careers_url: self.registry.careers_url(ats, token),
            jobs,
            aggregates,
            collected_at: Utc::now(),
            partial,
        })
    }
}

/// Derive the company-level aggregate counts from one pass's open set.
pub fn compute_aggregates(jobs: &[CollectedJob]) -> CompanyAggregates {
    let mut aggregates = CompanyAggregates {
        job_count: jobs.len() as i64,
        ..Default::default()
    };

    let mut locations: Vec<String> = Vec::new();
    let mut departments: Vec<String> = Vec::new();
    let mut countries: BTreeMap<String, i64> = BTreeMap::new();
    let mut skills: BTreeMap<String, i64> = BTreeMap::new();

    for job in jobs {
        match job.work_type {
            WorkType::Remote => aggregates.remote_count += 1,
            WorkType::Hybrid => aggregates.hybrid_count += 1,
            WorkType::Onsite => aggregates.onsite_count += 1,
        }

        if !job.location_raw.is_empty() && !locations.contains(&job.location_raw) {
            locations.push(job.location_raw.clone());
        }
        if !departments.contains(&job.department) {
            departments.push(job.department.clone());
        }
        if let Some(country) = &job.country {
            *countries.entry(country.clone()).or_insert(0) += 1;
        }
        for skill in &job.skills {
            *skills.entry(skill.clone()).or_insert(0) += 1;
        }
    }

    locations.sort();
    departments.sort();
    aggregates.locations = locations;
    aggregates.departments = departments;
    aggregates.normalized_locations = countries;
    aggregates.extracted_skills = skills;
    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::Endpoints;
    use crate::config::Config;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.collector_max_retries = 0;
        config.rate_limit_default = 100.0;
        config.rate_limit_workday = 100.0;
        config.rate_limit_greenhouse = 100.0;
        config
    }

    fn registry_for(ats: AtsType, base: &str, path: &str) -> Arc<AtsRegistry> {
        Arc::new(AtsRegistry::new().with_endpoints(
            ats,
            Endpoints {
                probe: format!("{}{}", base, path),
                listing: format!("{}{}", base, path),
                careers: format!("{}/careers/{{token}}", base),
            },
        ))
    }

    #[tokio::test]
    async fn test_collect_greenhouse_board() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;
        let _board = server
            .mock("GET", "/gh/stripe")
            .with_status(200)
            .with_body(
                r#"{"name": "Stripe", "jobs": [
                    {"id": 1, "title": "Backend Engineer", "location": {"name": "San Francisco, CA"}, "departments": [{"name": "Engineering"}], "content": "Rust and Kubernetes"},
                    {"id": 2, "title": "Backend Engineer", "location": {"name": "san francisco, ca"}},
                    {"id": 3, "title": "Remote Designer", "location": {"name": "Remote"}, "departments": [{"name": "Design"}]}
                ]}"#,
            )
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = registry_for(AtsType::Greenhouse, &server.url(), "/gh/{token}");
        let collector = Collector::new(fetcher, registry);

        let result = collector
            .collect("Stripe", AtsType::Greenhouse, "stripe", &CancellationToken::new())
            .await
            .unwrap();

        // Jobs 1 and 2 differ only in location case: one hash, one job
        assert_eq!(result.jobs.len(), 2);
        assert!(result.is_complete());
        assert_eq!(result.company_name, "Stripe");
        assert_eq!(result.aggregates.job_count, 2);
        assert_eq!(result.aggregates.remote_count, 1);
        assert_eq!(result.aggregates.onsite_count, 1);
        assert!(result
            .aggregates
            .extracted_skills
            .contains_key("Kubernetes"));
    }

    #[tokio::test]
    async fn test_collect_workday_paginates() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;

        let page1: Vec<String> = (0..20)
            .map(|i| format!(r#"{{"title": "Role {}", "locationsText": "Chicago, IL"}}"#, i))
            .collect();
        let _p1 = server
            .mock("POST", "/wd/acme/0")
            .with_status(200)
            .with_body(format!(r#"{{"total": 25, "jobPostings": [{}]}}"#, page1.join(",")))
            .create_async()
            .await;
        let _p2 = server
            .mock("POST", "/wd/acme/20")
            .with_status(200)
            .with_body(
                r#"{"total": 25, "jobPostings": [
                    {"title": "Role 20"}, {"title": "Role 21"}, {"title": "Role 22"},
                    {"title": "Role 23"}, {"title": "Role 24"}
                ]}"#,
            )
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = registry_for(AtsType::Workday, &server.url(), "/wd/{token}/{offset}");
        let collector = Collector::new(fetcher, registry);

        let result = collector
            .collect("Acme", AtsType::Workday, "acme", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.jobs.len(), 25);
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_collect_partial_after_page_failure() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;

        let page1: Vec<String> = (0..20)
            .map(|i| format!(r#"{{"title": "Role {}"}}"#, i))
            .collect();
        let _p1 = server
            .mock("POST", "/wd/acme/0")
            .with_status(200)
            .with_body(format!(r#"{{"total": 40, "jobPostings": [{}]}}"#, page1.join(",")))
            .create_async()
            .await;
        let _p2 = server
            .mock("POST", "/wd/acme/20")
            .with_status(404)
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = registry_for(AtsType::Workday, &server.url(), "/wd/{token}/{offset}");
        let collector = Collector::new(fetcher, registry);

        let result = collector
            .collect("Acme", AtsType::Workday, "acme", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.jobs.len(), 20);
        assert!(!result.is_complete());
        assert_eq!(result.partial.as_ref().unwrap().pages_ok, 1);
    }

    #[tokio::test]
    async fn test_collect_first_page_failure_is_terminal() {
        let mut server = mockito::Server::new_async().await;
        let _robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;
        let _board = server
            .mock("GET", "/gh/gone")
            .with_status(404)
            .create_async()
            .await;

        let config = test_config();
        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = registry_for(AtsType::Greenhouse, &server.url(), "/gh/{token}");
        let collector = Collector::new(fetcher, registry);

        let err = collector
            .collect("Gone", AtsType::Greenhouse, "gone", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::CoreError::Fetch(crate::error::FetchError::Http4xx(404))
        ));
    }

    #[test]
    fn test_compute_aggregates_counts() {
        let cid = company_id("greenhouse", "acme");
        let jobs: Vec<CollectedJob> = [
            ("Engineer", "Berlin, Germany", WorkType::Onsite),
            ("Engineer II", "Remote", WorkType::Remote),
            ("PM", "Berlin, Germany", WorkType::Hybrid),
        ]
        .iter()
        .map(|(title, loc, wt)| {
            let mut job = normalize_job(
                &cid,
                &RawJob {
                    title: (*title).to_string(),
                    location: Some((*loc).to_string()),
                    ..Default::default()
                },
            );
            job.work_type = *wt;
            job
        })
        .collect();

        let aggregates = compute_aggregates(&jobs);
        assert_eq!(aggregates.job_count, 3);
        assert_eq!(aggregates.remote_count, 1);
        assert_eq!(aggregates.hybrid_count, 1);
        assert_eq!(aggregates.onsite_count, 1);
        assert_eq!(aggregates.normalized_locations.get("Germany"), Some(&2));
        assert_eq!(aggregates.locations.len(), 2);
    }
}
