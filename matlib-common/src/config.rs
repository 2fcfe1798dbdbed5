//! Configuration loading and root folder resolution
//!
//! Root folder priority:
//! 1. Command-line argument (highest priority)
//! 2. `MATLIB_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file never stops startup: a warning is
//! logged and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MATLIB_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "MATLIB_CONFIG";

/// Name of the JSON store inside the materials directory
pub const STORE_FILE_NAME: &str = "materials.json";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// HTTP listener section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// PBR generation collaborator section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PbrSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_script")]
    pub script: PathBuf,
    #[serde(default = "default_resolution")]
    pub resolution: u32,
}

fn default_true() -> bool {
    true
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_script() -> PathBuf {
    PathBuf::from("scripts/generate_pbr.py")
}

fn default_resolution() -> u32 {
    1000
}

impl Default for PbrSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interpreter: default_interpreter(),
            script: default_script(),
            resolution: default_resolution(),
        }
    }
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

/// TOML configuration file contents.
///
/// Every field is optional on disk so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub pbr: PbrSection,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            logging: LoggingConfig::default(),
            server: ServerSection::default(),
            pbr: PbrSection::default(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Platform defaults used when nothing else is configured
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            dirs::data_local_dir()
                .map(|d| d.join("matlib"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/matlib"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("matlib"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/matlib"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("matlib"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\matlib"))
        } else {
            PathBuf::from("./matlib_data")
        };

        Self {
            root_folder,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// Resolves which config file and root folder a module uses
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_root: Option<PathBuf>,
    cli_config: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_root: None,
            cli_config: None,
        }
    }

    /// Root folder given on the command line
    pub fn with_cli_root(mut self, root: Option<PathBuf>) -> Self {
        self.cli_root = root;
        self
    }

    /// Config file given on the command line
    pub fn with_cli_config(mut self, config: Option<PathBuf>) -> Self {
        self.cli_config = config;
        self
    }

    /// Config file path: CLI → `MATLIB_CONFIG` → `<config dir>/matlib/<module>.toml`
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_config {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir().map(|d| d.join("matlib").join(format!("{}.toml", self.module_name)))
    }

    /// Load the TOML config, falling back to defaults with a warning
    pub fn load_config(&self) -> TomlConfig {
        let Some(path) = self.config_path() else {
            warn!("Could not determine config directory, using defaults");
            return TomlConfig::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return TomlConfig::default();
        }

        match load_toml_config(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Config file unusable, using defaults");
                TomlConfig::default()
            }
        }
    }

    /// Resolve the root folder against an already loaded config
    pub fn resolve_with(&self, config: &TomlConfig) -> PathBuf {
        if let Some(root) = &self.cli_root {
            return root.clone();
        }
        if let Ok(root) = std::env::var(ROOT_FOLDER_ENV) {
            if !root.trim().is_empty() {
                return PathBuf::from(root);
            }
        }
        if let Some(root) = &config.root_folder {
            return root.clone();
        }
        CompiledDefaults::for_current_platform().root_folder
    }

    /// Resolve the root folder, loading the config file as needed
    pub fn resolve(&self) -> PathBuf {
        let config = self.load_config();
        self.resolve_with(&config)
    }
}

/// Filesystem layout under the root folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// One directory per SKU plus the JSON store
    pub fn materials_dir(&self) -> PathBuf {
        self.root.join("materials")
    }

    pub fn store_path(&self) -> PathBuf {
        self.materials_dir().join(STORE_FILE_NAME)
    }

    /// Per-SKU upload staging directories
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    /// `<project>Presets.json` files
    pub fn presets_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    /// Create the root and every sub-directory (idempotent)
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.materials_dir(),
            self.staging_dir(),
            self.presets_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                Error::Config(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}
