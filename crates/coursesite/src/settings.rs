//! Optional project settings file (coursesite.toml).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings file structure.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SiteSection {
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

fn default_title() -> String {
    "Courses".to_string()
}

/// Load settings from `path` (relative to `root`) if it exists.
/// Returns an error if the file exists but is malformed.
pub fn load(root: &Path, path: &Path) -> Result<Settings> {
    let config_path = root.join(path);
    if !config_path.exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    tracing::info!("Loaded config from {}", config_path.display());
    Ok(settings)
}
