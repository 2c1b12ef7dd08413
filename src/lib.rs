//! Quest and progression engine for a virtual-pet game.
//!
//! Quests are loaded into an immutable [`QuestCatalog`]; each player session
//! owns a [`QuestTracker`] that consumes gameplay actions and dialogue
//! choices and reports rewards for other systems to apply.

pub mod config;
pub mod db;
pub mod quest;

pub use config::EngineConfig;
pub use db::Database;
pub use quest::{
    ActionEvent, PlayerQuestState, QuestCatalog, QuestError, QuestOutcome, QuestTracker,
    TrackerOptions,
};
