use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::remote::SearchOrder;
use crate::{Error, Result};

pub const CONFIG_FILE: &str = "everki.toml";
pub const APP_DIR: &str = "everki";

/// Pipeline parameters. Built once before a run and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Deck receiving new records
    pub deck: String,
    /// Record type whose fields the pattern groups must name
    pub note_type: String,
    /// Query selecting source documents
    pub search_filter: String,
    /// Line pattern with one named group per field
    pub parsing_regex: String,
    /// Title of the document aggregation appends to
    pub staging_title: String,
    #[serde(default)]
    pub order: SearchOrder,
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("deck", &self.deck),
            ("note_type", &self.note_type),
            ("search_filter", &self.search_filter),
            ("parsing_regex", &self.parsing_regex),
            ("staging_title", &self.staging_title),
        ];

        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("params.{key} must not be empty")));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the SQLite flashcard collection
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding one JSON file per note
    pub notes_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub params: Params,
    pub store: StoreConfig,
    pub source: SourceConfig,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base)
    }

    /// Parses and validates a config. Relative paths are resolved against
    /// `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.params.validate()?;

        if config.store.path.is_relative() {
            config.store.path = base_dir.join(&config.store.path);
        }
        if config.source.notes_dir.is_relative() {
            config.source.notes_dir = base_dir.join(&config.source.notes_dir);
        }

        Ok(config)
    }
}
