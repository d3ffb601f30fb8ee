//! Enrichment pipeline services
//!
//! Leaves first:
//! - `indexer_client` - GraphQL fetch of approved applications per round
//! - `throttle` - shared limiter for outbound classifier calls
//! - `prompt` / `openai_extractor` - the `save_features` call
//! - `classifier` - cache-aware, throttled feature extraction
//! - `refresh_orchestrator` - the scheduled refresh loop
//! - `assembler` - read-path join of applications and features

pub mod assembler;
pub mod classifier;
pub mod indexer_client;
pub mod openai_extractor;
pub mod prompt;
pub mod refresh_orchestrator;
pub mod throttle;

pub use assembler::{compare_titles, ApplicationAssembler, AssemblyError};
pub use classifier::{Classification, Classifier};
pub use indexer_client::{ApplicationSource, IndexerClient, IndexerError};
pub use openai_extractor::{ExtractionError, FeatureExtractor, OpenAiConfig, OpenAiExtractor};
pub use refresh_orchestrator::{
    CycleFailure, CyclePhase, CycleReport, RefreshOrchestrator, RefreshSettings, RefreshStatus,
};
pub use throttle::{CallThrottle, ThrottleClosed};
