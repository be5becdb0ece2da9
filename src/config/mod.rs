use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::plugins::resources::ShadowPolicy;

/// Name of the config file looked up next to the host executable
pub const CONFIG_FILE_NAME: &str = "anvil.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub plugins: PluginConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory to scan; defaults to the directory of the host executable
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// File name prefix every plugin module carries
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Marker before the extension that makes a module resources-only
    #[serde(default = "default_resources_suffix")]
    pub resources_suffix: String,

    /// Module file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Shared directories for ambient resolution; empty means the scan directory
    #[serde(default)]
    pub ambient_dirs: Vec<PathBuf>,

    /// Let unresolved native libraries fall through to the OS loader search
    #[serde(default = "default_true")]
    pub system_search: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Host static file root; defaults to `wwwroot` next to the executable
    #[serde(default)]
    pub web_root: Option<PathBuf>,

    /// Namespace embedded module resources are served from
    #[serde(default = "default_embedded_root")]
    pub embedded_root: String,

    /// Report plugin resources hidden by earlier providers
    #[serde(default)]
    pub shadowing: ShadowPolicy,
}

// Default value functions
fn default_prefix() -> String {
    "rcl_".to_string()
}

fn default_resources_suffix() -> String {
    ".Views".to_string()
}

fn default_extension() -> String {
    std::env::consts::DLL_EXTENSION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_embedded_root() -> String {
    "wwwroot".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: None,
            prefix: default_prefix(),
            resources_suffix: default_resources_suffix(),
            extension: default_extension(),
            ambient_dirs: Vec::new(),
            system_search: true,
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            web_root: None,
            embedded_root: default_embedded_root(),
            shadowing: ShadowPolicy::default(),
        }
    }
}

impl PluginConfig {
    /// Directory the scanner enumerates
    ///
    /// # Errors
    /// Returns an error if no directory is configured and the executable's
    /// location cannot be determined.
    pub fn scan_root(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => host_dir(),
        }
    }

    /// Directories searched by the ambient resolver
    #[must_use]
    pub fn ambient_search_dirs(&self, scan_root: &Path) -> Vec<PathBuf> {
        if self.ambient_dirs.is_empty() {
            vec![scan_root.to_path_buf()]
        } else {
            self.ambient_dirs.clone()
        }
    }
}

impl ResourceConfig {
    /// Directory the host's own static files are served from
    ///
    /// # Errors
    /// Returns an error if no web root is configured and the executable's
    /// location cannot be determined.
    pub fn web_root_dir(&self) -> Result<PathBuf> {
        match &self.web_root {
            Some(dir) => Ok(dir.clone()),
            None => Ok(host_dir()?.join("wwwroot")),
        }
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("Failed to serialize config")?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(path.as_ref(), contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get default configuration path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(host_dir()?.join(CONFIG_FILE_NAME))
    }
}

/// Directory containing the running host executable
pub fn host_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate host executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("Host executable has no parent directory")
}
