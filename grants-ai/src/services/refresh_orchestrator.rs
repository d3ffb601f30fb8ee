//! Scheduled refresh of applications and features
//!
//! One cycle walks the phases
//! `Idle → Fetching → PersistRounds → Classifying → PersistFeatures → Idle`:
//! - Fetching: every round is fetched, at most `max_concurrent_fetches` at once
//! - PersistRounds: each fetched round overwrites its cache entry
//! - Classifying: every application goes through the classifier, which
//!   skips cached features and writes new ones back as each extraction
//!   completes
//! - PersistFeatures: the cycle report is recorded next to the features
//!
//! A failed round is logged and skipped; the other rounds carry on through
//! the later phases. The loop re-arms after every cycle whatever its outcome.

use crate::models::{Application, RoundRef};
use crate::services::classifier::{Classification, Classifier};
use crate::services::indexer_client::{ApplicationSource, IndexerError};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use grants_common::cache::KvCacheExt;
use grants_common::KvCache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Lifetime of a round's cached application list (24 hours)
pub const APPLICATIONS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Delay between the end of one cycle and the start of the next (24 hours)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key of the most recent cycle report
pub const LAST_REPORT_KEY: &str = "refresh:last_report";
const REPORT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub max_concurrent_fetches: usize,
    pub applications_ttl: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            max_concurrent_fetches: 9,
            applications_ttl: APPLICATIONS_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    #[default]
    Idle,
    Fetching,
    PersistRounds,
    Classifying,
    PersistFeatures,
}

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub rounds_fetched: usize,
    pub rounds_failed: Vec<RoundRef>,
    pub applications_fetched: usize,
    pub features_cached: usize,
    pub features_extracted: usize,
    pub features_failed: usize,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.rounds_failed.is_empty() && self.features_failed == 0
    }
}

/// A cycle that ended in an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFailure {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Live view of the orchestrator, read by the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    pub phase: CyclePhase,
    pub cycles_completed: u64,
    pub last_report: Option<CycleReport>,
    /// Cleared by the next successful cycle
    pub last_failure: Option<CycleFailure>,
    pub next_cycle_at: Option<DateTime<Utc>>,
}

/// Resets the running flag when a cycle ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct RefreshOrchestrator {
    cache: Arc<dyn KvCache>,
    source: Arc<dyn ApplicationSource>,
    classifier: Arc<Classifier>,
    rounds: Arc<[RoundRef]>,
    settings: RefreshSettings,
    status: RwLock<RefreshStatus>,
    running: AtomicBool,
    trigger: Notify,
}

impl RefreshOrchestrator {
    pub fn new(
        cache: Arc<dyn KvCache>,
        source: Arc<dyn ApplicationSource>,
        classifier: Arc<Classifier>,
        rounds: Arc<[RoundRef]>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            cache,
            source,
            classifier,
            rounds,
            settings,
            status: RwLock::new(RefreshStatus::default()),
            running: AtomicBool::new(false),
            trigger: Notify::new(),
        }
    }

    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Load the report persisted by a previous process, if any
    pub async fn restore_last_report(&self) {
        match self.cache.get_json::<CycleReport>(LAST_REPORT_KEY).await {
            Ok(Some(report)) => {
                tracing::info!(
                    cycle_id = %report.cycle_id,
                    finished_at = %report.finished_at,
                    "Restored last refresh report"
                );
                self.status.write().await.last_report = Some(report);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Could not read last refresh report"),
        }
    }

    /// Wake the loop for an immediate cycle
    ///
    /// Returns `false` when a cycle is already running. A trigger accepted
    /// before the next cycle starts is satisfied by that cycle.
    pub fn trigger_now(&self) -> bool {
        if self.is_running() {
            return false;
        }
        self.trigger.notify_one();
        true
    }

    /// Run cycles until `cancel` fires
    ///
    /// Cancellation is observed between cycles and during the wait; a cycle
    /// in progress runs to completion.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!(
            rounds = self.rounds.len(),
            interval_secs = self.settings.interval.as_secs(),
            "Refresh loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(report) if !report.is_clean() => tracing::warn!(
                    cycle_id = %report.cycle_id,
                    rounds_failed = report.rounds_failed.len(),
                    features_failed = report.features_failed,
                    "Update finished with failures"
                ),
                Ok(report) => tracing::info!(
                    cycle_id = %report.cycle_id,
                    applications = report.applications_fetched,
                    extracted = report.features_extracted,
                    "Update successful"
                ),
                Err(e) => tracing::error!(error = %e, "Error during update"),
            }

            let next_at = Utc::now()
                + chrono::Duration::from_std(self.settings.interval)
                    .unwrap_or_else(|_| chrono::Duration::days(1));
            self.status.write().await.next_cycle_at = Some(next_at);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = self.trigger.notified() => {
                    tracing::info!("Refresh triggered ahead of schedule");
                }
            }
        }

        self.status.write().await.next_cycle_at = None;
        tracing::info!("Refresh loop stopped");
    }

    /// Run one full cycle and record its outcome in the status
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(anyhow!("a refresh cycle is already running"));
        }
        let _guard = RunningGuard(&self.running);

        // Consume a trigger stored while idle; this cycle answers it
        if self.trigger.notified().now_or_never().is_some() {
            tracing::debug!("Pending refresh trigger absorbed by this cycle");
        }

        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!("refresh_cycle", cycle_id = %cycle_id);
        let result = self.execute_cycle(cycle_id).instrument(span).await;

        let mut status = self.status.write().await;
        status.phase = CyclePhase::Idle;
        match &result {
            Ok(report) => {
                status.cycles_completed += 1;
                status.last_report = Some(report.clone());
                status.last_failure = None;
            }
            Err(e) => {
                status.last_failure = Some(CycleFailure {
                    at: Utc::now(),
                    message: e.to_string(),
                });
            }
        }

        result
    }

    async fn enter(&self, phase: CyclePhase) {
        tracing::debug!(?phase, "Entering refresh phase");
        self.status.write().await.phase = phase;
    }

    async fn execute_cycle(&self, cycle_id: Uuid) -> Result<CycleReport> {
        let started_at = Utc::now();

        match self.cache.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Purged expired cache entries"),
            Err(e) => tracing::warn!(error = %e, "Cache purge failed"),
        }

        self.enter(CyclePhase::Fetching).await;
        let fetched = self.fetch_rounds().await;

        let mut rounds_failed = Vec::new();
        let mut rounds = Vec::new();
        for (round, result) in fetched {
            match result {
                Ok(applications) => rounds.push((round, applications)),
                Err(e) => {
                    tracing::warn!(round = %round, error = %e, "Round fetch failed");
                    rounds_failed.push(round);
                }
            }
        }

        if rounds.is_empty() && !rounds_failed.is_empty() {
            return Err(anyhow!(
                "all {} round fetches failed",
                rounds_failed.len()
            ));
        }

        self.enter(CyclePhase::PersistRounds).await;
        for (round, applications) in &rounds {
            let key = round.applications_key();
            if let Err(e) = self
                .cache
                .set_json(&key, applications, self.settings.applications_ttl)
                .await
            {
                tracing::warn!(key = %key, error = %e, "Failed to cache round applications");
            }
        }

        let applications: Vec<Application> = rounds
            .into_iter()
            .flat_map(|(_, applications)| applications)
            .collect();
        tracing::info!(count = applications.len(), "Fetched applications");

        self.enter(CyclePhase::Classifying).await;
        let (features_cached, features_extracted, features_failed) =
            self.classify_all(&applications).await;

        self.enter(CyclePhase::PersistFeatures).await;
        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            rounds_fetched: self.rounds.len() - rounds_failed.len(),
            rounds_failed,
            applications_fetched: applications.len(),
            features_cached,
            features_extracted,
            features_failed,
        };

        if let Err(e) = self
            .cache
            .set_json(LAST_REPORT_KEY, &report, REPORT_TTL)
            .await
        {
            tracing::warn!(error = %e, "Failed to persist refresh report");
        }

        Ok(report)
    }

    /// Fetch every round with bounded concurrency, results in round order
    async fn fetch_rounds(
        &self,
    ) -> Vec<(RoundRef, Result<Vec<Application>, IndexerError>)> {
        let limit = self.settings.max_concurrent_fetches.max(1);

        stream::iter(self.rounds.iter().copied())
            .map(|round| async move { (round, self.source.fetch_applications(round).await) })
            .buffered(limit)
            .collect()
            .await
    }

    /// Classify every application
    ///
    /// All applications are dispatched at once. The classifier answers cached
    /// ones from the cache and re-extracts unreadable entries. Its throttle
    /// decides when each external call actually starts.
    /// Returns (already cached, extracted, failed).
    async fn classify_all(&self, applications: &[Application]) -> (usize, usize, usize) {
        let total = applications.len();
        tracing::info!(total, "Classifying applications");

        let progress = AtomicUsize::new(0);
        let outcomes = futures::future::join_all(applications.iter().map(|application| {
            let progress = &progress;
            async move {
                let outcome = self.classifier.classify_detailed(application).await;
                let done = progress.fetch_add(1, Ordering::SeqCst) + 1;
                if !matches!(outcome, Classification::Cached(_)) {
                    tracing::info!("Extracted {} of {} applications", done, total);
                }
                outcome
            }
        }))
        .await;

        let mut cached = 0;
        let mut extracted = 0;
        let mut failed = 0;
        for outcome in outcomes {
            match outcome {
                Classification::Cached(_) => cached += 1,
                Classification::Extracted(_) => extracted += 1,
                Classification::Failed => failed += 1,
            }
        }

        (cached, extracted, failed)
    }
}
