//! Configuration loading and root folder resolution
//!
//! Resolution order for every bootstrap setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and
//! continues with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "GRANTS_ROOT_FOLDER";

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "grants-ai";

/// Cache database file name inside the root folder
pub const CACHE_DB_FILE: &str = "cache.db";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; unset fields fall through to environment
/// variables or compiled defaults in the service crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding `cache.db`
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP port for the read API
    #[serde(default)]
    pub port: Option<u16>,

    /// Base URL of the grants indexer (without `/graphql`)
    #[serde(default)]
    pub indexer_url: Option<String>,

    /// AI service API key
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Chat model used for feature extraction
    #[serde(default)]
    pub openai_model: Option<String>,

    /// Delay between refresh cycles
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    /// Minimum spacing between classifier calls
    #[serde(default)]
    pub classify_interval_ms: Option<u64>,

    /// Upper bound on simultaneous round fetches
    #[serde(default)]
    pub max_concurrent_fetches: Option<usize>,

    /// Replaces the built-in round list when present
    #[serde(default)]
    pub rounds: Option<Vec<RoundEntry>>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One `[[rounds]]` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub chain_id: u64,
    pub round_id: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub config_file: Option<PathBuf>,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            config_file: dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml")),
            log_level: default_log_level(),
        }
    }
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/grants-ai (or /var/lib/grants-ai for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/var/lib/grants-ai"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/grants-ai"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\grants-ai"))
    } else {
        PathBuf::from("./grants_data")
    }
}

/// Load the TOML config file
///
/// Missing file → defaults with a warning. Unreadable or malformed file →
/// `Error::Config`.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    debug!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Resolves the root folder from CLI → ENV → TOML → default
pub struct RootFolderResolver<'a> {
    cli_arg: Option<PathBuf>,
    toml_config: Option<&'a TomlConfig>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new() -> Self {
        Self {
            cli_arg: None,
            toml_config: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &'a TomlConfig) -> Self {
        self.toml_config = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = self.toml_config.and_then(|c| c.root_folder.as_ref()) {
            return path.clone();
        }

        // Priority 4: Compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

impl Default for RootFolderResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Prepares the resolved root folder for use
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if missing; safe to call repeatedly
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.root_folder.join(CACHE_DB_FILE)
    }

    pub fn cache_db_exists(&self) -> bool {
        self.cache_db_path().exists()
    }
}
