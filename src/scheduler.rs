//! Scheduler / orchestrator.
//!
//! Owns the three recurring activities — discovery, refresh, expansion —
//! plus maintenance, under a single-active-pass invariant: an atomic CAS
//! gate admits one pass at a time and drops (never queues) triggers that
//! arrive while another is running. Collection state lives in one struct
//! behind a mutex and is exposed read-only to the dashboard surface.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ats::AtsType;
use crate::collector::Collector;
use crate::config::Config;
use crate::domain::models::{PassMode, PassStats, PassSummary, Seed, StatusSnapshot};
use crate::error::{CoreError, Result};
use crate::expander::SeedExpander;
use crate::intel::MarketIntel;
use crate::probe::ProbeEngine;
use crate::reconcile::Reconciler;
use crate::repository::sqlite::{CompanyRepository, SeedRepository};

type ProgressCallback = Box<dyn Fn(f64, &PassStats) + Send + Sync>;

#[derive(Default)]
struct PassState {
    running: bool,
    mode: Option<PassMode>,
    progress: f64,
    last_run: Option<chrono::DateTime<Utc>>,
    last_stats: Option<PassStats>,
    last_error: Option<String>,
}

pub struct Scheduler {
    config: Config,
    seeds: SeedRepository,
    companies: CompanyRepository,
    probe: Arc<ProbeEngine>,
    collector: Arc<Collector>,
    reconciler: Arc<Reconciler>,
    expander: Arc<SeedExpander>,
    intel: MarketIntel,

    gate: AtomicBool,
    state: Mutex<PassState>,
    current_cancel: Mutex<Option<CancellationToken>>,
    progress_callback: Mutex<Option<ProgressCallback>>,
}

impl Scheduler {
    pub fn new(
        config: Config,
        pool: SqlitePool,
        probe: Arc<ProbeEngine>,
        collector: Arc<Collector>,
        reconciler: Arc<Reconciler>,
        expander: Arc<SeedExpander>,
    ) -> Self {
        Self {
            seeds: SeedRepository::new(pool.clone()),
            companies: CompanyRepository::new(pool.clone()),
            intel: MarketIntel::new(pool),
            config,
            probe,
            collector,
            reconciler,
            expander,
            gate: AtomicBool::new(false),
            state: Mutex::new(PassState::default()),
            current_cancel: Mutex::new(None),
            progress_callback: Mutex::new(None),
        }
    }

    /// Register the progress channel; called at least once per completed
    /// company with `(progress in [0,1], stats)`.
    pub fn set_progress_callback(&self, callback: ProgressCallback) {
        *self.progress_callback.lock().unwrap() = Some(callback);
    }

    /// Read-only state snapshot for the dashboard.
    pub fn status(&self) -> StatusSnapshot {
        let state = self.state.lock().unwrap();
        StatusSnapshot {
            is_running: state.running,
            mode: state.mode.map(|m| m.as_str().to_string()),
            current_progress: state.progress,
            last_run: state.last_run,
            last_stats: state.last_stats,
            last_error: state.last_error.clone(),
        }
    }

    /// Cancel the pass in flight, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.current_cancel.lock().unwrap().as_ref() {
            log::warn!("[SCHED] Cancelling active pass");
            token.cancel();
        }
    }

    // ========================================================================
    // PASSES
    // ========================================================================

    /// Returns `Ok(None)` when another pass holds the gate (the trigger is
    /// dropped, not queued).
    pub async fn run_discovery_pass(&self) -> Result<Option<PassSummary>> {
        self.run_pass(PassMode::Discovery).await
    }

    pub async fn run_refresh_pass(&self) -> Result<Option<PassSummary>> {
        self.run_pass(PassMode::Refresh).await
    }

    pub async fn run_expansion_pass(&self) -> Result<Option<PassSummary>> {
        self.run_pass(PassMode::Expansion).await
    }

    pub async fn run_maintenance(&self) -> Result<()> {
        self.intel.run_maintenance(Utc::now()).await?;
        Ok(())
    }

    async fn run_pass(&self, mode: PassMode) -> Result<Option<PassSummary>> {
        let Some(guard) = PassGuard::acquire(self, mode) else {
            log::warn!(
                "[SCHED] Dropping {} trigger: another pass is active",
                mode
            );
            return Ok(None);
        };

        let cancel = guard.cancel.clone();
        let budget = Duration::from_secs(self.config.pass_budget_secs);

        let inner = async {
            match mode {
                PassMode::Discovery => self.discovery_inner(&cancel).await,
                PassMode::Refresh => self.refresh_inner(&cancel).await,
                PassMode::Expansion => self.expansion_inner(&cancel).await,
            }
        };
        tokio::pin!(inner);

        let result = tokio::select! {
            r = &mut inner => r,
            _ = tokio::time::sleep(budget) => {
                log::warn!("[SCHED] {} pass exceeded {}s budget, cancelling", mode, budget.as_secs());
                cancel.cancel();
                inner.await
            }
        };

        match result {
            Ok(summary) => {
                log::info!(
                    "[SCHED] {} pass finished: {}/{} completed{}",
                    mode,
                    summary.completed,
                    summary.total,
                    if summary.cancelled { " (cancelled)" } else { "" }
                );
                guard.finish(Some(summary.stats), None);
                Ok(Some(summary))
            }
            Err(e) => {
                log::error!("[SCHED] {} pass failed: {}", mode, e);
                guard.finish(None, Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn discovery_inner(&self, cancel: &CancellationToken) -> Result<PassSummary> {
        let batch = self.config.collector_batch_size as i64;
        let seeds = self.seeds.get_untested(batch).await?;
        let total = seeds.len() as u64;
        log::info!("[SCHED] Discovery pass over {} seeds", total);

        let mut stats = PassStats::default();
        let mut completed = 0u64;

        for seed in &seeds {
            if cancel.is_cancelled() {
                break;
            }

            match self.process_seed(seed, cancel).await {
                Ok(outcome) => {
                    stats.tested += 1;
                    if outcome.hit {
                        stats.hits += 1;
                    }
                    stats.jobs_added += outcome.jobs_added;
                    stats.jobs_closed += outcome.jobs_closed;
                }
                Err(e) if e.is_cancelled() => break,
                Err(e) => {
                    log::error!("[SCHED] Seed '{}' failed: {}", seed.company_name, e);
                    stats.tested += 1;
                    stats.errors += 1;
                }
            }

            completed += 1;
            self.publish_progress(completed, total, &stats);
        }

        Ok(PassSummary {
            mode: PassMode::Discovery,
            completed,
            total,
            stats,
            cancelled: cancel.is_cancelled(),
        })
    }

    /// Probe one seed; on hit, collect and reconcile its board. The seed is
    /// marked tested in all non-cancelled outcomes.
    async fn process_seed(&self, seed: &Seed, cancel: &CancellationToken) -> Result<SeedOutcome> {
        let budget = Duration::from_secs(self.config.company_budget_secs);
        let work = async {
            let probed = self
                .probe
                .probe(&seed.company_name, Some(&seed.token_slug), cancel)
                .await;

            let outcome = match probed {
                Ok(outcome) => outcome,
                // Unusable name: tested, no hit
                Err(CoreError::NoCandidateTokens(_)) => {
                    self.seeds.mark_tested(seed.id, Utc::now()).await?;
                    return Ok(SeedOutcome::default());
                }
                Err(e) => return Err(e),
            };

            self.seeds.mark_tested(seed.id, Utc::now()).await?;

            let Some(hit) = outcome.hit else {
                if outcome.all_errored {
                    log::debug!(
                        "[SCHED] All probes errored for '{}' (counted as miss)",
                        seed.company_name
                    );
                }
                return Ok(SeedOutcome::default());
            };

            self.seeds.mark_hit(seed.id).await?;

            let result = self
                .collector
                .collect(&seed.company_name, hit.ats, &hit.token, cancel)
                .await?;
            let reconciled = self.reconciler.apply(&result).await?;

            Ok(SeedOutcome {
                hit: true,
                jobs_added: reconciled.jobs_added,
                jobs_closed: reconciled.jobs_closed,
            })
        };

        match tokio::time::timeout(budget, work).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "[SCHED] Seed '{}' exceeded {}s company budget",
                    seed.company_name,
                    budget.as_secs()
                );
                self.seeds.mark_tested(seed.id, Utc::now()).await?;
                Ok(SeedOutcome::default())
            }
        }
    }

    async fn refresh_inner(&self, cancel: &CancellationToken) -> Result<PassSummary> {
        let batch = self.config.collector_batch_size as i64;
        let companies = self
            .companies
            .get_for_refresh(self.config.refresh_interval_hours, batch)
            .await?;
        let total = companies.len() as u64;
        log::info!("[SCHED] Refresh pass over {} companies", total);

        let mut stats = PassStats::default();
        let mut completed = 0u64;

        for company in &companies {
            if cancel.is_cancelled() {
                break;
            }

            let Ok(ats) = company.ats_type.parse::<AtsType>() else {
                log::error!(
                    "[SCHED] Company {} has unknown ats_type '{}'",
                    company.company_name,
                    company.ats_type
                );
                stats.errors += 1;
                completed += 1;
                continue;
            };

            let budget = Duration::from_secs(self.config.company_budget_secs);
            let work = async {
                let result = self
                    .collector
                    .collect(&company.company_name, ats, &company.token, cancel)
                    .await?;
                self.reconciler.apply(&result).await
            };

            match tokio::time::timeout(budget, work).await {
                Ok(Ok(reconciled)) => {
                    stats.companies_refreshed += 1;
                    stats.jobs_added += reconciled.jobs_added;
                    stats.jobs_closed += reconciled.jobs_closed;
                }
                Ok(Err(e)) if e.is_cancelled() => break,
                Ok(Err(e)) => {
                    log::error!("[SCHED] Refresh of {} failed: {}", company.company_name, e);
                    stats.errors += 1;
                }
                Err(_) => {
                    log::warn!(
                        "[SCHED] Refresh of {} exceeded company budget",
                        company.company_name
                    );
                    stats.errors += 1;
                }
            }

            completed += 1;
            self.publish_progress(completed, total, &stats);
        }

        Ok(PassSummary {
            mode: PassMode::Refresh,
            completed,
            total,
            stats,
            cancelled: cancel.is_cancelled(),
        })
    }

    async fn expansion_inner(&self, cancel: &CancellationToken) -> Result<PassSummary> {
        let tiers = self.config.seed_expander_tiers.clone();
        let summary = self.expander.expand(&tiers, cancel).await?;

        let total = summary.per_source.len() as u64;
        let stats = PassStats::default();
        self.publish_progress(total, total, &stats);

        log::info!(
            "[SCHED] Expansion added {} seeds across {} sources ({} failed)",
            summary.total_inserted,
            total,
            summary.sources_failed
        );

        Ok(PassSummary {
            mode: PassMode::Expansion,
            completed: total,
            total,
            stats,
            cancelled: cancel.is_cancelled(),
        })
    }

    fn publish_progress(&self, completed: u64, total: u64, stats: &PassStats) {
        let progress = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };

        {
            let mut state = self.state.lock().unwrap();
            state.progress = progress;
            state.last_stats = Some(*stats);
        }
        if let Some(callback) = self.progress_callback.lock().unwrap().as_ref() {
            callback(progress, stats);
        }
    }

    // ========================================================================
    // RECURRING TRIGGERS
    // ========================================================================

    /// Register the interval timers and run until shutdown. Triggers that
    /// land while a pass is active are dropped by the gate.
    pub async fn run_forever(self: Arc<Self>, shutdown: CancellationToken) {
        let hour = |h: i64| Duration::from_secs((h.max(1) as u64) * 3600);

        let mut discovery = tokio::time::interval(hour(self.config.discovery_interval_hours));
        let mut refresh = delayed_interval(hour(self.config.refresh_interval_hours));
        let mut maintenance = delayed_interval(hour(6));
        let mut expansion = delayed_interval(Duration::from_secs(7 * 24 * 3600));

        discovery.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("[SCHED] Recurring triggers registered");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    self.cancel();
                    log::info!("[SCHED] Shutdown requested, scheduler stopping");
                    break;
                }
                _ = discovery.tick() => {
                    if let Err(e) = self.run_discovery_pass().await {
                        log::error!("[SCHED] Discovery trigger failed: {}", e);
                    }
                }
                _ = refresh.tick() => {
                    if let Err(e) = self.run_refresh_pass().await {
                        log::error!("[SCHED] Refresh trigger failed: {}", e);
                    }
                }
                _ = expansion.tick() => {
                    if let Err(e) = self.run_expansion_pass().await {
                        log::error!("[SCHED] Expansion trigger failed: {}", e);
                    }
                }
                _ = maintenance.tick() => {
                    if let Err(e) = self.run_maintenance().await {
                        log::error!("[SCHED] Maintenance failed: {}", e);
                    }
                }
            }
        }
    }
}

/// Interval whose first tick fires one period from now, not immediately.
fn delayed_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

#[derive(Debug, Default)]
struct SeedOutcome {
    hit: bool,
    jobs_added: u64,
    jobs_closed: u64,
}

/// RAII holder of the single-pass gate.
struct PassGuard<'a> {
    scheduler: &'a Scheduler,
    cancel: CancellationToken,
}

impl<'a> PassGuard<'a> {
    fn acquire(scheduler: &'a Scheduler, mode: PassMode) -> Option<Self> {
        if scheduler
            .gate
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        let cancel = CancellationToken::new();
        *scheduler.current_cancel.lock().unwrap() = Some(cancel.clone());
        {
            let mut state = scheduler.state.lock().unwrap();
            state.running = true;
            state.mode = Some(mode);
            state.progress = 0.0;
            state.last_error = None;
        }
        log::info!("[SCHED] {} pass starting", mode);

        Some(Self { scheduler, cancel })
    }

    fn finish(&self, stats: Option<PassStats>, error: Option<String>) {
        let mut state = self.scheduler.state.lock().unwrap();
        if let Some(stats) = stats {
            state.last_stats = Some(stats);
        }
        state.last_error = error;
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.scheduler.state.lock().unwrap();
            state.running = false;
            state.mode = None;
            state.last_run = Some(Utc::now());
        }
        *self.scheduler.current_cancel.lock().unwrap() = None;
        self.scheduler.gate.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::AtsRegistry;
    use crate::fetcher::Fetcher;
    use crate::test_utils::fixtures::setup_test_db;

    async fn test_scheduler(pool: SqlitePool) -> Scheduler {
        let mut config = Config::default();
        config.collector_max_retries = 0;
        config.rate_limit_default = 100.0;

        let fetcher = Arc::new(Fetcher::new(&config).unwrap());
        let registry = Arc::new(AtsRegistry::new());
        let probe = Arc::new(ProbeEngine::new(fetcher.clone(), registry.clone(), &config));
        let collector = Arc::new(Collector::new(fetcher.clone(), registry));
        let reconciler = Arc::new(Reconciler::new(pool.clone()));
        let expander = Arc::new(
            SeedExpander::new(fetcher, pool.clone(), &config)
                .with_sources(Vec::new())
                .with_jitter((0, 0)),
        );

        Scheduler::new(config, pool, probe, collector, reconciler, expander)
    }

    #[tokio::test]
    async fn test_single_pass_exclusion() {
        let pool = setup_test_db().await;
        let scheduler = Arc::new(test_scheduler(pool).await);

        // Hold the gate manually, then try to start a pass
        let guard = PassGuard::acquire(scheduler.as_ref(), PassMode::Refresh).expect("gate free");
        assert!(scheduler.status().is_running);

        let dropped = scheduler.run_discovery_pass().await.unwrap();
        assert!(dropped.is_none(), "second pass must be dropped, not queued");

        drop(guard);
        assert!(!scheduler.status().is_running);

        // Gate released: a pass over the empty seed table runs and finishes
        let summary = scheduler.run_discovery_pass().await.unwrap().unwrap();
        assert_eq!(summary.total, 0);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn test_empty_discovery_pass_updates_state() {
        let pool = setup_test_db().await;
        let scheduler = test_scheduler(pool).await;

        let summary = scheduler.run_discovery_pass().await.unwrap().unwrap();
        assert_eq!(summary.completed, 0);

        let status = scheduler.status();
        assert!(!status.is_running);
        assert!(status.last_run.is_some());
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_expansion_pass_with_no_sources() {
        let pool = setup_test_db().await;
        let scheduler = test_scheduler(pool).await;

        let summary = scheduler.run_expansion_pass().await.unwrap().unwrap();
        assert_eq!(summary.mode, PassMode::Expansion);
        assert_eq!(summary.total, 0);

        // Progress lands at 1.0 once the pass completes
        assert!((scheduler.status().current_progress - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_progress_callback_invoked() {
        let pool = setup_test_db().await;
        let scheduler = test_scheduler(pool).await;

        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_clone = calls.clone();
        scheduler.set_progress_callback(Box::new(move |_, _| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        scheduler.run_expansion_pass().await.unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_cancel_marks_pass_cancelled() {
        let pool = setup_test_db().await;
        let scheduler = Arc::new(test_scheduler(pool.clone()).await);

        // Seed the table so the pass has work, then cancel before running;
        // process_seed observes the token at its first suspension point
        crate::repository::sqlite::SeedRepository::new(pool)
            .insert_batch(&[crate::domain::models::NewSeed {
                company_name: "Acme".into(),
                token_slug: "acme".into(),
                source: "test".into(),
                tier: 1,
            }])
            .await
            .unwrap();

        let guard = PassGuard::acquire(scheduler.as_ref(), PassMode::Discovery).unwrap();
        guard.cancel.cancel();
        let summary = scheduler.discovery_inner(&guard.cancel).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.completed, 0);
    }
}
