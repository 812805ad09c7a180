//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`INTERVIEW_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "INTERVIEW_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "INTERVIEW_CONFIG";

/// Directory name used under the platform config/data directories
const APP_DIR_NAME: &str = "mock-interview";

/// Database file name inside the root folder
const DATABASE_FILE: &str = "interview.db";

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./mock_interview_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
            bind_address: "127.0.0.1:5730".to_string(),
        }
    }
}

/// Service configuration file (TOML)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Root folder holding the database, storage and scratch directories
    pub root_folder: Option<PathBuf>,
    /// Listen address (host:port)
    pub bind_address: Option<String>,
    /// Default log filter when RUST_LOG is unset
    pub log_level: Option<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[storage]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Durable storage for videos, thumbnails and audio tracks (default `<root>/storage`)
    pub storage_dir: Option<PathBuf>,
    /// Scratch space for uploads and transcoder output (default `<root>/scratch`)
    pub scratch_dir: Option<PathBuf>,
}

/// `[gateway]` section: external analysis service endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub stt_url: String,
    pub emotion_url: String,
    pub vision_url: String,
    pub llm_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            stt_url: "http://127.0.0.1:5002".to_string(),
            emotion_url: "http://127.0.0.1:5001".to_string(),
            vision_url: "http://127.0.0.1:5003".to_string(),
            llm_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: 90,
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on concurrently running background analyses
    pub max_concurrent_analyses: usize,
    /// Analyzed videos required before an interview summary is computed
    pub aggregation_threshold: usize,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: 4,
            aggregation_threshold: 3,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn log_level(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level)
    }

    pub fn bind_address(&self) -> String {
        self.bind_address
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().bind_address)
    }
}

/// Default config file location: `<config_dir>/mock-interview/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Resolve config file location: CLI flag → `INTERVIEW_CONFIG` → platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    default_config_path()
}

/// Load the service configuration
///
/// A missing file yields defaults with a warning; a malformed file is fatal.
pub fn load_service_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let Some(path) = path else {
        warn!("No config file location available, using defaults");
        return Ok(ServiceConfig::default());
    };

    if !path.exists() {
        warn!("Config file not found at {}, using defaults", path.display());
        return Ok(ServiceConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: ServiceConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Root folder resolution following the CLI → ENV → TOML → default order
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_config(mut self, config: &ServiceConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on startup
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
    storage_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf, storage: &StorageConfig) -> Self {
        let storage_dir = storage
            .storage_dir
            .clone()
            .unwrap_or_else(|| root.join("storage"));
        let scratch_dir = storage
            .scratch_dir
            .clone()
            .unwrap_or_else(|| root.join("scratch"));

        Self {
            root,
            storage_dir,
            scratch_dir,
        }
    }

    /// Create root, storage and scratch directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [&self.root, &self.storage_dir, &self.scratch_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::Config(format!("Could not create directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}
