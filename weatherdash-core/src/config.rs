use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::Coordinates;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A fixed device position, used as the position source when set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionConfig {
    pub latitude: f64,
    pub longitude: f64,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// backend_url = "http://127.0.0.1:5000"
/// request_timeout_secs = 10
///
/// [position]
/// latitude = 48.8566
/// longitude = 2.3522
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub backend_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub position: Option<PositionConfig>,
}

impl Config {
    /// Backend base URL, normalised to end with `/` so endpoint paths join under it.
    pub fn backend_url(&self) -> Result<Url> {
        let raw = self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL);
        parse_base_url(raw)
    }

    /// Validates and stores a backend URL.
    pub fn set_backend_url(&mut self, raw: &str) -> Result<()> {
        let url = parse_base_url(raw)?;
        self.backend_url = Some(url.to_string());
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Validates and stores a fixed device position.
    pub fn set_position(&mut self, latitude: f64, longitude: f64) -> Result<()> {
        Coordinates::new(latitude, longitude).ok_or_else(|| {
            anyhow!(
                "Position ({latitude}, {longitude}) is out of range.\n\
                 Latitude must be within -90..90 and longitude within -180..180."
            )
        })?;
        self.position = Some(PositionConfig {
            latitude,
            longitude,
        });
        Ok(())
    }

    pub fn clear_position(&mut self) {
        self.position = None;
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the durable storage file (favorites, theme, units).
    pub fn storage_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.data_dir().join("storage.json"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weatherdash", "weatherdash")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_slash)
        .with_context(|| format!("Invalid backend URL '{trimmed}'"))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!(
            "Unsupported backend URL scheme '{other}'. Use http or https."
        )),
    }
}
