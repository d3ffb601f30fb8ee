//! Read-side assembly of enriched applications
//!
//! Joins each round's cached applications with their cached features. Reads
//! only the cache; never triggers fetching or classification.

use crate::models::{Application, EnrichedApplication, Features, RoundRef};
use grants_common::cache::KvCacheExt;
use grants_common::KvCache;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A configured round has no cached application list yet
    #[error("No cached applications for {0}")]
    CacheMiss(String),

    #[error("Cache error: {0}")]
    Cache(#[from] grants_common::Error),
}

/// Base letters only: canonical decomposition with combining marks dropped,
/// then lowercased
fn primary_key(title: &str) -> String {
    title
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Title order ignoring case and accents first
///
/// "Éclair" sorts with the e's rather than after "Zebra". Titles equal at
/// that level fall back to a lowercase comparison, then to the raw title.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

#[derive(Clone)]
pub struct ApplicationAssembler {
    cache: Arc<dyn KvCache>,
    rounds: Arc<[RoundRef]>,
}

impl ApplicationAssembler {
    pub fn new(cache: Arc<dyn KvCache>, rounds: Arc<[RoundRef]>) -> Self {
        Self { cache, rounds }
    }

    pub fn rounds(&self) -> &[RoundRef] {
        &self.rounds
    }

    /// Every classified application across all rounds, sorted by title
    ///
    /// Applications without cached features are left out. The first
    /// occurrence of a ref id wins.
    pub async fn assemble(&self) -> Result<Vec<EnrichedApplication>, AssemblyError> {
        let mut seen = HashSet::new();
        let mut enriched = Vec::new();
        let mut unclassified = 0usize;

        for round in self.rounds.iter() {
            let key = round.applications_key();
            let cached: Option<Vec<Application>> = self.cache.get_json(&key).await?;
            let applications = cached.ok_or(AssemblyError::CacheMiss(key))?;

            for application in applications {
                let features_key = application.features_key();
                let features = match self.cache.get_json::<Features>(&features_key).await {
                    Ok(features) => features,
                    Err(grants_common::Error::Serialization(e)) => {
                        tracing::warn!(key = %features_key, error = %e, "Ignoring unreadable cached features");
                        None
                    }
                    Err(e) => return Err(e.into()),
                };

                let Some(features) = features else {
                    unclassified += 1;
                    continue;
                };

                if !seen.insert(application.ref_id()) {
                    tracing::debug!(ref_id = %application.ref_id(), "Dropping duplicate application");
                    continue;
                }

                enriched.push(EnrichedApplication::new(application, features));
            }
        }

        enriched.sort_by(|a, b| compare_titles(a.title(), b.title()));

        tracing::debug!(
            returned = enriched.len(),
            unclassified,
            "Assembled applications"
        );

        Ok(enriched)
    }
}
