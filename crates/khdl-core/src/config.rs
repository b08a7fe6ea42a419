use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::extract::MarkupRules;

/// Global configuration loaded from `~/.config/khinsider-dl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KhdlConfig {
    /// File extensions to look for on each song page, most preferred first.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Optional `User-Agent` header sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Site markup heuristics used to find the album title and song list.
    #[serde(default)]
    pub markup: MarkupRules,
}

fn default_extensions() -> Vec<String> {
    vec!["flac".to_string(), "mp3".to_string()]
}

impl Default for KhdlConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            user_agent: None,
            markup: MarkupRules::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("khinsider-dl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<KhdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = KhdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: KhdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
