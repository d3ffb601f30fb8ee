//! Rate-limited, cache-aware feature classification
//!
//! Per application:
//! 1. cached features under `application:{chain}:{round}:{id}:features` are
//!    returned as-is, without an external call or a throttle wait
//! 2. otherwise the extractor runs through the shared [`CallThrottle`]
//! 3. successful extractions are written back with the features TTL
//!
//! Any extraction failure yields no features for that application only.

use crate::models::{Application, Features};
use crate::services::openai_extractor::FeatureExtractor;
use crate::services::throttle::CallThrottle;
use grants_common::cache::KvCacheExt;
use grants_common::KvCache;
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of cached features (24 hours)
pub const FEATURES_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Outcome of one classification attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Features were already cached
    Cached(Features),
    /// Features were extracted during this call
    Extracted(Features),
    /// Extraction failed; the application stays unclassified
    Failed,
}

impl Classification {
    pub fn into_features(self) -> Option<Features> {
        match self {
            Classification::Cached(features) | Classification::Extracted(features) => {
                Some(features)
            }
            Classification::Failed => None,
        }
    }
}

pub struct Classifier {
    cache: Arc<dyn KvCache>,
    extractor: Arc<dyn FeatureExtractor>,
    throttle: Arc<CallThrottle>,
    ttl: Duration,
}

impl Classifier {
    pub fn new(
        cache: Arc<dyn KvCache>,
        extractor: Arc<dyn FeatureExtractor>,
        throttle: Arc<CallThrottle>,
    ) -> Self {
        Self {
            cache,
            extractor,
            throttle,
            ttl: FEATURES_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Features for `application`, or `None` when extraction failed
    pub async fn classify(&self, application: &Application) -> Option<Features> {
        self.classify_detailed(application).await.into_features()
    }

    /// Same as [`Classifier::classify`] but reports where the features came from
    pub async fn classify_detailed(&self, application: &Application) -> Classification {
        let key = application.features_key();

        if let Some(features) = self.cached(&key).await {
            return Classification::Cached(features);
        }

        tracing::info!(ref_id = %application.ref_id(), "Extracting features for application");

        let result = match self
            .throttle
            .run(|| self.extractor.extract(application))
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(ref_id = %application.ref_id(), error = %e, "Extraction not attempted");
                return Classification::Failed;
            }
        };

        let features = match result {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(
                    ref_id = %application.ref_id(),
                    error = %e,
                    "Feature extraction failed"
                );
                return Classification::Failed;
            }
        };

        tracing::debug!(
            ref_id = %application.ref_id(),
            tags = ?features.tags,
            "Extracted features"
        );

        if let Err(e) = self.cache.set_json(&key, &features, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to cache extracted features");
        }

        Classification::Extracted(features)
    }

    /// Cached features, treating unreadable entries as absent
    async fn cached(&self, key: &str) -> Option<Features> {
        match self.cache.get_json::<Features>(key).await {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring unreadable cached features");
                None
            }
        }
    }
}
