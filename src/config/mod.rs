//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. the `--config` command-line path
//! 2. `$INVOICE_ARCHIVER_CONFIG` (environment variable)
//! 3. `~/.config/invoice-archiver/config.toml` (Linux/macOS)
//!    `%APPDATA%\invoice-archiver\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! A config file that exists but fails to parse is an error; the job must
//! not run with settings the user did not write.

pub mod archive;
pub mod presets;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};
use crate::storage::CollisionPolicy;

pub use archive::{ArchiveConfig, ValidatedConfig};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "INVOICE_ARCHIVER_CONFIG";

const APP_DIR: &str = "invoice-archiver";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// The archive job itself.
    pub archive: ArchiveConfig,
    /// Where and how attachments are written.
    pub storage: StorageConfig,
    /// Mailbox input and processed-label ledger.
    pub mailbox: MailboxConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs and the ledger.
    pub cache_dir: Option<PathBuf>,
    /// Output language: "en" or "ja". Defaults to the system locale.
    pub lang: Option<String>,
}

/// Storage location settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory standing in for the storage root. Folder ids are
    /// subdirectories of it.
    pub root_dir: PathBuf,
    /// What to do when a rendered name already exists in the folder.
    pub collision: CollisionPolicy,
    /// Maximum filename length in characters, extension included.
    pub max_name_len: usize,
}

/// Mailbox settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Default MBOX file for `run`.
    pub path: Option<PathBuf>,
    /// Override location of the processed-label ledger.
    pub ledger_path: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
            lang: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("archive"),
            collision: CollisionPolicy::default(),
            max_name_len: 150,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration from `explicit`, or from the standard locations.
///
/// An explicit path must exist. A missing standard file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => {
            if !p.exists() {
                return Err(ArchiveError::FileNotFound(p.to_path_buf()));
            }
            p.to_path_buf()
        }
        None => match config_file_path() {
            Some(p) if p.exists() => p,
            _ => {
                tracing::info!("No config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| ArchiveError::io(&path, e))?;
    let cfg = parse_config(&contents, &path)?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Parse TOML text; `path` is only used in error messages.
pub fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    toml::from_str::<Config>(contents).map_err(|e| ArchiveError::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Render a configuration as TOML.
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| ArchiveError::ConfigParse {
        path: PathBuf::from("<memory>"),
        reason: e.to_string(),
    })
}

/// Write configuration to `path`, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
    }
    let contents = to_toml(config)?;
    std::fs::write(path, contents).map_err(|e| ArchiveError::io(path, e))?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Return the cache directory for logs and the ledger.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("invoice-archiver.log")
}

/// Return the processed-label ledger path.
pub fn ledger_path(config: &Config) -> PathBuf {
    config
        .mailbox
        .ledger_path
        .clone()
        .unwrap_or_else(|| cache_dir(config).join("ledger.json"))
}

/// A full config file built around a preset's `[archive]` table.
pub fn preset_config(preset: &presets::Preset) -> Config {
    Config {
        archive: preset.archive.clone(),
        ..Config::default()
    }
}
