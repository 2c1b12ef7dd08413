//! Quest System Module
//!
//! Branching, multi-step quests for a pet-care game. Content comes from TOML
//! and is fixed once the catalog is built; each player gets a tracker.

pub mod catalog;
pub mod definition;
pub mod error;
pub mod events;
pub mod matcher;
pub mod persistence;
pub mod state;
pub mod tracker;
pub mod transition;
pub mod unlock;

pub use catalog::QuestCatalog;
pub use definition::{
    Choice, ObjectiveType, QuestCategory, QuestDefinition, QuestObjective, QuestStep, Reward,
    StepTarget, StepTransition,
};
pub use error::{CatalogError, PersistenceError, QuestError};
pub use events::{ActionEvent, ChoiceResult, ObjectiveUpdate, ProgressReport, QuestOutcome};
pub use state::{ActiveQuest, PlayerQuestState, ProgressKey};
pub use tracker::{QuestStatus, QuestStatusView, QuestTracker, TrackerOptions};
