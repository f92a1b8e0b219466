use std::path::{Path, PathBuf};

use anyhow::Context;
use directories_next::ProjectDirs;
use serde::Deserialize;

use crate::keys::DEFAULT_KEY_LENGTH;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: Database,
    pub limits: Limits,
    pub form: Form,
    pub keys: Keys,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Database {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Largest accepted paste body, in bytes.
    pub max_content_size: usize,
    /// How many ancestors a lookup nests as full records.
    pub max_parent_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Form {
    /// Field name that groups submitted values, if any.
    pub belongs_to: Option<String>,
    pub default_type: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Keys {
    pub length: usize,
}

impl Default for Database {
    fn default() -> Self {
        Database {
            url: "sqlite://nestbin.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_content_size: 1024 * 1024,
            max_parent_depth: 1,
        }
    }
}

impl Default for Form {
    fn default() -> Self {
        let types = [
            "text", "c", "cpp", "css", "diff", "go", "html", "java", "javascript", "json",
            "markdown", "php", "python", "ruby", "rust", "shell", "sql", "toml", "xml", "yaml",
        ];
        Form {
            belongs_to: None,
            default_type: "text".into(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Default for Keys {
    fn default() -> Self {
        Keys {
            length: DEFAULT_KEY_LENGTH,
        }
    }
}

impl Config {
    /// The per-user config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "nestbin").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`. A missing file means defaults; an unreadable or
    /// malformed one is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to deserialize config file {}", path.display()))
    }
}
