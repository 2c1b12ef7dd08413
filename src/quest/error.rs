//! Quest error types
//!
//! `QuestError` covers expected invalid player actions and is always returned
//! as a value. `CatalogError` is a content-authoring fault raised while the
//! catalog is built; a catalog that fails to load is never handed out.

use std::path::PathBuf;

use thiserror::Error;

/// Rejections for player-initiated quest operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestError {
    #[error("Quest '{0}' not found")]
    QuestNotFound(String),

    #[error("Quest '{0}' is already active")]
    QuestAlreadyActive(String),

    #[error("Quest '{0}' is not active")]
    QuestNotActive(String),

    #[error("Quest '{0}' has no choices at its current step")]
    NoChoicesAvailable(String),

    #[error("'{choice}' is not a valid choice for quest '{quest_id}'")]
    InvalidChoice { quest_id: String, choice: String },
}

/// Faults found while building the quest catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("Quest '{quest_id}' is invalid: {reason}")]
    InvalidQuest { quest_id: String, reason: String },

    #[error("Quest '{0}' is defined more than once")]
    DuplicateQuest(String),

    #[error("Quest '{quest_id}' step {step_id} points at missing step {target}")]
    DanglingStep {
        quest_id: String,
        step_id: u32,
        target: i64,
    },
}

impl CatalogError {
    pub fn invalid(quest_id: &str, reason: impl Into<String>) -> Self {
        CatalogError::InvalidQuest {
            quest_id: quest_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Faults while decoding or migrating a saved quest state
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Invalid save data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Save version {0} is newer than this build supports")]
    UnsupportedVersion(u64),

    #[error("Malformed save data: {0}")]
    Malformed(String),
}
