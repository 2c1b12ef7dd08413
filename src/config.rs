//! Engine configuration
//!
//! Read from `pet-quest.toml` (or the file named by `PET_QUEST_CONFIG`).
//! Every field has a default, so a missing file is not an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::quest::{CatalogError, QuestCatalog, TrackerOptions};

pub const DEFAULT_CONFIG_PATH: &str = "pet-quest.toml";
pub const CONFIG_PATH_ENV: &str = "PET_QUEST_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory containing a `quests/` folder; built-in content when unset
    pub data_dir: Option<PathBuf>,
    pub database_url: String,
    /// The one quest unlocked for a new player
    pub starter_quest: String,
    pub eager_choice_recheck: bool,
    /// tracing-subscriber directive used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_url: "sqlite:pet_quests.db?mode=rwc".to_string(),
            starter_quest: "welcome_duckling".to_string(),
            eager_choice_recheck: true,
            log_filter: "pet_quest_engine=info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from the configured path, falling back to defaults when the
    /// default file is absent
    pub fn load() -> Result<Self, String> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            eager_choice_recheck: self.eager_choice_recheck,
        }
    }

    /// Build the quest catalog this configuration points at
    pub fn load_catalog(&self) -> Result<Arc<QuestCatalog>, CatalogError> {
        match &self.data_dir {
            Some(dir) => Ok(Arc::new(QuestCatalog::load_from_directory(&dir.join("quests"))?)),
            None => QuestCatalog::builtin(),
        }
    }
}
