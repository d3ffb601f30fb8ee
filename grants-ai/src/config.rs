//! Configuration resolution for grants-ai
//!
//! Each setting resolves CLI → ENV → TOML → compiled default. The CLI and
//! ENV tiers for the port are merged by clap before they reach here.

use crate::models::{RoundRef, GITCOIN_GRANTS_ROUNDS};
use crate::services::indexer_client::DEFAULT_INDEXER_URL;
use crate::services::openai_extractor::DEFAULT_MODEL;
use crate::services::refresh_orchestrator::{RefreshSettings, APPLICATIONS_TTL};
use grants_common::config::{load_toml_config, TomlConfig};
use grants_common::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::fmt::MakeWriter;

pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_CLASSIFY_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 9;

pub const API_KEY_ENV: &str = "GRANTS_OPENAI_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Settings taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    /// Skip the refresh loop and serve whatever is already cached
    pub no_refresh: bool,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub indexer_url: String,
    /// `None` only when refresh is disabled
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub classify_interval: Duration,
    pub refresh: RefreshSettings,
    pub rounds: Arc<[RoundRef]>,
}

impl ServiceConfig {
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let openai_api_key = if cli.no_refresh {
            None
        } else {
            Some(resolve_openai_api_key(toml_config)?)
        };

        let rounds: Arc<[RoundRef]> = match &toml_config.rounds {
            Some(entries) if !entries.is_empty() => {
                entries.iter().copied().map(RoundRef::from).collect()
            }
            Some(_) => {
                return Err(Error::Config(
                    "`rounds` in config.toml must list at least one round".to_string(),
                ))
            }
            None => GITCOIN_GRANTS_ROUNDS.to_vec().into(),
        };

        let max_concurrent_fetches = toml_config
            .max_concurrent_fetches
            .unwrap_or(DEFAULT_MAX_CONCURRENT_FETCHES);
        if max_concurrent_fetches == 0 {
            return Err(Error::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }

        let refresh_interval_secs = toml_config
            .refresh_interval_secs
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        if refresh_interval_secs == 0 {
            return Err(Error::Config(
                "refresh_interval_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            port: cli.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            indexer_url: toml_config
                .indexer_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INDEXER_URL.to_string()),
            openai_api_key,
            openai_model: toml_config
                .openai_model
                .clone()
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            classify_interval: Duration::from_millis(
                toml_config
                    .classify_interval_ms
                    .unwrap_or(DEFAULT_CLASSIFY_INTERVAL_MS),
            ),
            refresh: RefreshSettings {
                interval: Duration::from_secs(refresh_interval_secs),
                max_concurrent_fetches,
                applications_ttl: APPLICATIONS_TTL,
            },
            rounds,
        })
    }
}

/// Resolve the OpenAI API key
///
/// **Priority:** `GRANTS_OPENAI_API_KEY` → `OPENAI_API_KEY` → TOML
pub fn resolve_openai_api_key(toml_config: &TomlConfig) -> Result<String> {
    let candidates = [
        ("GRANTS_OPENAI_API_KEY", std::env::var(API_KEY_ENV).ok()),
        ("OPENAI_API_KEY", std::env::var(FALLBACK_API_KEY_ENV).ok()),
        ("TOML", toml_config.openai_api_key.clone()),
    ];

    let valid: Vec<_> = candidates
        .into_iter()
        .filter_map(|(source, key)| key.filter(|k| is_valid_key(k)).map(|k| (source, k)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<_> = valid.iter().map(|(source, _)| *source).collect();
        warn!(
            "OpenAI API key found in multiple sources: {}. Using {}.",
            sources.join(", "),
            sources[0]
        );
    }

    match valid.into_iter().next() {
        Some((source, key)) => {
            info!("OpenAI API key loaded from {}", source);
            Ok(key.trim().to_string())
        }
        None => Err(Error::Config(format!(
            "OpenAI API key not configured. Please configure using one of:\n\
             1. Environment: {}=your-key-here\n\
             2. Environment: {}=your-key-here\n\
             3. TOML config: ~/.config/grants-ai/config.toml (openai_api_key = \"your-key\")\n\
             \n\
             Or start with --no-refresh to serve the existing cache only.",
            API_KEY_ENV, FALLBACK_API_KEY_ENV
        ))),
    }
}

/// Load the TOML config under a temporary subscriber writing to `make_writer`
///
/// The log level lives in the file itself, so the global subscriber can only
/// be installed afterwards.
pub fn load_toml_config_logged<W>(path: &Path, make_writer: W) -> Result<TomlConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::with_default(bootstrap, || load_toml_config(path))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
