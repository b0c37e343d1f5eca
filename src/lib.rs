pub mod ats;
pub mod collector;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod expander;
pub mod fetcher;
pub mod intel;
pub mod normalize;
pub mod probe;
pub mod reconcile;
pub mod repository;
pub mod scheduler;
pub mod test_utils;

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::ats::AtsRegistry;
use crate::collector::Collector;
use crate::config::Config;
use crate::expander::SeedExpander;
use crate::fetcher::Fetcher;
use crate::probe::ProbeEngine;
use crate::reconcile::Reconciler;
use crate::scheduler::Scheduler;

/// Explicit owner of the pipeline's shared components; everything below it
/// is passed by reference. No module-level singletons.
pub struct Core {
    pub pool: SqlitePool,
    pub scheduler: Arc<Scheduler>,
}

impl Core {
    pub fn new(config: Config, pool: SqlitePool) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(&config)?);
        let registry = Arc::new(AtsRegistry::new());

        let probe = Arc::new(ProbeEngine::new(fetcher.clone(), registry.clone(), &config));
        let collector = Arc::new(Collector::new(fetcher.clone(), registry));
        let reconciler = Arc::new(Reconciler::new(pool.clone()));
        let expander = Arc::new(SeedExpander::new(fetcher, pool.clone(), &config));

        let scheduler = Arc::new(Scheduler::new(
            config,
            pool.clone(),
            probe,
            collector,
            reconciler,
            expander,
        ));

        Ok(Self { pool, scheduler })
    }
}
