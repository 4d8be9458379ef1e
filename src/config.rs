use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::preflight::DEFAULT_UDEV_RULES_DIR;
use crate::request::BandwidthMode;

const DEFAULT_ZOO_DIR: &str = "resources/nn";
const DEFAULT_VIDEOS_DIR: &str = "videos";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    paths: Option<PathsConfigFile>,
    defaults: Option<DefaultsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PathsConfigFile {
    zoo_dir: Option<PathBuf>,
    videos_dir: Option<PathBuf>,
    udev_rules_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DefaultsConfigFile {
    bandwidth: Option<String>,
}

/// Host-side settings that do not come from the command line.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub zoo_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub udev_rules_dir: PathBuf,
    /// Bandwidth mode used when the command line leaves it unset.
    pub default_bandwidth: BandwidthMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            zoo_dir: PathBuf::from(DEFAULT_ZOO_DIR),
            videos_dir: PathBuf::from(DEFAULT_VIDEOS_DIR),
            udev_rules_dir: PathBuf::from(DEFAULT_UDEV_RULES_DIR),
            default_bandwidth: BandwidthMode::Auto,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DEPTH_SETUP_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let paths = file.paths.unwrap_or_default();
        let default_bandwidth = match file.defaults.and_then(|d| d.bandwidth) {
            Some(mode) => mode.parse()?,
            None => defaults.default_bandwidth,
        };
        Ok(Self {
            zoo_dir: paths.zoo_dir.unwrap_or(defaults.zoo_dir),
            videos_dir: paths.videos_dir.unwrap_or(defaults.videos_dir),
            udev_rules_dir: paths.udev_rules_dir.unwrap_or(defaults.udev_rules_dir),
            default_bandwidth,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(dir) = non_empty_env("DEPTH_SETUP_ZOO_DIR") {
            self.zoo_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_env("DEPTH_SETUP_VIDEOS_DIR") {
            self.videos_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty_env("DEPTH_SETUP_UDEV_RULES_DIR") {
            self.udev_rules_dir = PathBuf::from(dir);
        }
        if let Some(mode) = non_empty_env("DEPTH_SETUP_BANDWIDTH") {
            self.default_bandwidth = mode
                .parse()
                .map_err(|e| anyhow!("DEPTH_SETUP_BANDWIDTH: {}", e))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("zoo_dir", &self.zoo_dir),
            ("videos_dir", &self.videos_dir),
            ("udev_rules_dir", &self.udev_rules_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("{} must not be empty", name));
            }
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
