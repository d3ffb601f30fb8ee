//! Shared test doubles for the indexer and the AI service
#![allow(dead_code)]

use async_trait::async_trait;
use grants_ai::models::{Application, Features, ProjectAge, RoundRef, TeamSize, UsersCount};
use grants_ai::services::{
    ApplicationSource, CallThrottle, Classifier, ExtractionError, FeatureExtractor, IndexerError,
    RefreshOrchestrator, RefreshSettings,
};
use grants_common::KvCache;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Indexer-shaped application record
pub fn application_json(chain_id: u64, round_id: u64, id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "chainId": chain_id,
        "roundId": round_id.to_string(),
        "projectId": format!("0x{}", id),
        "metadata": {
            "application": {
                "answers": [
                    {"question": "Team", "answer": "Two developers"},
                    {"question": "Contact", "encryptedAnswer": {"ciphertext": "x"}}
                ],
                "project": {
                    "title": title,
                    "description": format!("{} builds public goods", title),
                    "projectGithub": "org",
                    "userGithub": "dev",
                    "projectTwitter": "handle"
                }
            }
        },
        "totalAmountDonatedInUsd": 10.5,
        "totalDonationsCount": 3,
        "round": {
            "id": round_id.to_string(),
            "chainId": chain_id,
            "matchAmountInUsd": 1000,
            "roundMetadata": {"name": "Test Round"},
            "applicationMetadata": {}
        }
    })
}

pub fn application(chain_id: u64, round_id: u64, id: &str, title: &str) -> Application {
    serde_json::from_value(application_json(chain_id, round_id, id, title))
        .expect("fixture should decode")
}

pub fn features(tags: &[&str]) -> Features {
    Features {
        short_description: "Short".to_string(),
        enhanced_project_description: "Enhanced".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        technology_stack: vec!["Solidity".to_string()],
        project_age: ProjectAge::LessThanOneYear,
        users_count: UsersCount::UpTo100,
        team_size: TeamSize::SoloFounder,
        regions: vec![],
        is_dao: true,
    }
}

/// Serves canned rounds; rounds not registered fail with a network error
pub struct StubSource {
    rounds: Mutex<HashMap<RoundRef, Vec<Application>>>,
    pub calls: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self {
            rounds: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_round(self, round: RoundRef, applications: Vec<Application>) -> Self {
        self.set_round(round, applications);
        self
    }

    pub fn set_round(&self, round: RoundRef, applications: Vec<Application>) {
        self.rounds.lock().unwrap().insert(round, applications);
    }

    pub fn remove_round(&self, round: RoundRef) {
        self.rounds.lock().unwrap().remove(&round);
    }
}

#[async_trait]
impl ApplicationSource for StubSource {
    async fn fetch_applications(&self, round: RoundRef) -> Result<Vec<Application>, IndexerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rounds
            .lock()
            .unwrap()
            .get(&round)
            .cloned()
            .ok_or_else(|| IndexerError::ApiError(502, "bad gateway".to_string()))
    }
}

/// Returns fixed features, records call start times, fails for chosen ids
pub struct StubExtractor {
    features: Features,
    failing_ids: Vec<String>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub started: Mutex<Vec<Instant>>,
}

impl StubExtractor {
    pub fn new(features: Features) -> Self {
        Self {
            features,
            failing_ids: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_for(mut self, ids: &[&str]) -> Self {
        self.failing_ids = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn start_times(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeatureExtractor for StubExtractor {
    async fn extract(&self, application: &Application) -> Result<Features, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_ids.contains(&application.id) {
            return Err(ExtractionError::ApiError(500, "model overloaded".to_string()));
        }
        Ok(self.features.clone())
    }
}

/// Orchestrator wired to stubs with a short classify interval
pub fn orchestrator(
    cache: Arc<dyn KvCache>,
    source: Arc<StubSource>,
    extractor: Arc<StubExtractor>,
    rounds: &[RoundRef],
    classify_interval: Duration,
) -> RefreshOrchestrator {
    let classifier = Classifier::new(
        cache.clone(),
        extractor,
        Arc::new(CallThrottle::serial(classify_interval)),
    );
    RefreshOrchestrator::new(
        cache,
        source,
        Arc::new(classifier),
        rounds.to_vec().into(),
        RefreshSettings {
            interval: Duration::from_secs(3600),
            ..Default::default()
        },
    )
}
