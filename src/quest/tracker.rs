//! Active Quest Tracker
//!
//! Owns one player's quest state and answers "what can I do now" questions.
//! Progress matching, step transitions and completion live in sibling
//! modules as further `impl QuestTracker` blocks.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::catalog::QuestCatalog;
use super::definition::QuestDefinition;
use super::error::QuestError;
use super::state::{ActiveQuest, PlayerQuestState};

/// Behavior switches for a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Re-check the destination step right after a choice so steps without
    /// objectives do not wait for an unrelated event
    pub eager_choice_recheck: bool,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            eager_choice_recheck: true,
        }
    }
}

/// Where a quest stands for this player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuestStatus {
    /// Not unlocked, prerequisites missing or level too low
    Locked,
    /// Can be started
    Available,
    Active,
    /// Completed and not repeatable
    Completed,
    /// Last attempt ended in failure
    Failed,
}

/// Progress of one objective, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectiveStatus {
    pub id: String,
    pub description: String,
    pub progress: u32,
    pub required: u32,
    pub completed: bool,
    pub optional: bool,
    pub hint: String,
}

/// Display payload for an active quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestStatusView {
    pub quest_id: String,
    pub quest_name: String,
    pub step_id: u32,
    pub step_title: String,
    pub objectives: Vec<ObjectiveStatus>,
    /// Choice texts when the current step branches
    pub choices: Vec<String>,
}

/// Quest state machine for a single player session
pub struct QuestTracker {
    pub(super) catalog: Arc<QuestCatalog>,
    pub(super) state: PlayerQuestState,
    pub(super) options: TrackerOptions,
}

impl QuestTracker {
    /// Tracker for a brand new player; only `starter_quest` is unlocked
    pub fn new_player(
        catalog: Arc<QuestCatalog>,
        starter_quest: &str,
        options: TrackerOptions,
    ) -> Result<Self, QuestError> {
        if !catalog.contains(starter_quest) {
            return Err(QuestError::QuestNotFound(starter_quest.to_string()));
        }
        Ok(Self {
            catalog,
            state: PlayerQuestState::new(starter_quest),
            options,
        })
    }

    /// Tracker resuming a saved state
    pub fn from_state(
        catalog: Arc<QuestCatalog>,
        state: PlayerQuestState,
        options: TrackerOptions,
    ) -> Self {
        let mut tracker = Self { catalog, state, options };
        tracker.reconcile();
        tracker
    }

    /// Drop active quests the catalog can no longer resolve
    fn reconcile(&mut self) {
        let catalog = &self.catalog;
        self.state.active_quests.retain(|quest_id, active| {
            let resolvable = catalog
                .get(quest_id)
                .is_some_and(|q| q.step(active.current_step).is_some());
            if !resolvable {
                warn!(
                    "Dropping active quest '{}' at step {}: not in catalog",
                    quest_id, active.current_step
                );
            }
            resolvable
        });
        // Saved counts never exceed what the objective asks for
        for active in self.state.active_quests.values_mut() {
            let Some(quest) = catalog.get(&active.quest_id) else {
                continue;
            };
            for (key, count) in active.step_progress.iter_mut() {
                if let Some(objective) = quest.objective(&key.objective_id) {
                    if *count > objective.required {
                        warn!(
                            "Clamping saved progress of {}/{} from {} to {}",
                            key.quest_id, key.objective_id, count, objective.required
                        );
                        *count = objective.required;
                    }
                }
            }
        }
        // An id is never both active and failed
        let active = &self.state.active_quests;
        self.state.failed_quests.retain(|id| !active.contains_key(id));
    }

    pub fn catalog(&self) -> &Arc<QuestCatalog> {
        &self.catalog
    }

    pub fn options(&self) -> TrackerOptions {
        self.options
    }

    pub fn state(&self) -> &PlayerQuestState {
        &self.state
    }

    pub fn into_state(self) -> PlayerQuestState {
        self.state
    }

    fn is_available(&self, quest: &QuestDefinition, player_level: u32) -> bool {
        self.state.is_quest_unlocked(&quest.id)
            && !self.state.is_quest_active(&quest.id)
            && (quest.repeatable || !self.state.is_quest_completed(&quest.id))
            && quest.prerequisites.iter().all(|p| self.state.is_quest_completed(p))
            && player_level >= quest.level_required
    }

    /// Quests the player could start right now, in catalog order
    pub fn available(&self, player_level: u32) -> Vec<&QuestDefinition> {
        self.catalog
            .all()
            .filter(|q| self.is_available(q, player_level))
            .collect()
    }

    /// Active quests ordered by quest id
    pub fn active(&self) -> Vec<&ActiveQuest> {
        self.state.active_quests.values().collect()
    }

    /// Begin tracking a quest and return its opening dialogue.
    ///
    /// Prerequisites and level are not checked here; `available` is the gate.
    pub fn start_quest(&mut self, quest_id: &str) -> Result<Vec<String>, QuestError> {
        let quest = self
            .catalog
            .get(quest_id)
            .ok_or_else(|| QuestError::QuestNotFound(quest_id.to_string()))?;

        if self.state.is_quest_active(quest_id) {
            return Err(QuestError::QuestAlreadyActive(quest_id.to_string()));
        }

        let first_step = quest.first_step();
        // A restart after failure is a fresh attempt
        self.state.clear_failed(quest_id);
        self.state
            .active_quests
            .insert(quest_id.to_string(), ActiveQuest::new(quest_id, first_step.id));

        info!("Started quest: {} ({})", quest.name, quest_id);
        Ok(first_step.dialogue.clone())
    }

    /// Current step and objective progress of an active quest
    pub fn status(&self, quest_id: &str) -> Result<QuestStatusView, QuestError> {
        let not_active = || QuestError::QuestNotActive(quest_id.to_string());
        let active = self.state.get_quest(quest_id).ok_or_else(not_active)?;
        let quest = self.catalog.get(quest_id).ok_or_else(not_active)?;
        let step = quest.step(active.current_step).ok_or_else(not_active)?;

        let objectives = step
            .objectives
            .iter()
            .map(|o| {
                let progress = active.progress(&o.id);
                ObjectiveStatus {
                    id: o.id.clone(),
                    description: o.description.clone(),
                    progress,
                    required: o.required,
                    completed: progress >= o.required,
                    optional: o.optional,
                    hint: o.hint.clone(),
                }
            })
            .collect();

        Ok(QuestStatusView {
            quest_id: quest_id.to_string(),
            quest_name: quest.name.clone(),
            step_id: step.id,
            step_title: step.title.clone(),
            objectives,
            choices: step.choices().iter().map(|c| c.text.clone()).collect(),
        })
    }

    /// Summary state of any catalog quest; `None` if the id is unknown
    pub fn quest_status(&self, quest_id: &str, player_level: u32) -> Option<QuestStatus> {
        let quest = self.catalog.get(quest_id)?;
        let status = if self.state.is_quest_active(quest_id) {
            QuestStatus::Active
        } else if self.is_available(quest, player_level) {
            QuestStatus::Available
        } else if self.state.is_quest_failed(quest_id) {
            QuestStatus::Failed
        } else if self.state.is_quest_completed(quest_id) && !quest.repeatable {
            QuestStatus::Completed
        } else {
            QuestStatus::Locked
        };
        Some(status)
    }

    pub fn completion_count(&self, quest_id: &str) -> u32 {
        self.state.completion_count(quest_id)
    }

    pub fn earned_titles(&self) -> &[String] {
        &self.state.earned_titles
    }

    pub fn choice_history(&self, quest_id: &str) -> Vec<&str> {
        self.state.choice_history(quest_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::definition::StepTarget;
    use crate::quest::state::ProgressKey;

    fn tracker() -> QuestTracker {
        let catalog = QuestCatalog::builtin().unwrap();
        QuestTracker::new_player(catalog, "welcome_duckling", TrackerOptions::default()).unwrap()
    }

    #[test]
    fn test_new_player_has_only_starter_available() {
        let tracker = tracker();
        let available: Vec<&str> = tracker.available(99).iter().map(|q| q.id.as_str()).collect();
        assert_eq!(available, vec!["welcome_duckling"]);
        assert_eq!(tracker.state().unlocked_quests.len(), 1);
    }

    #[test]
    fn test_unknown_starter_is_rejected() {
        let catalog = QuestCatalog::builtin().unwrap();
        let result = QuestTracker::new_player(catalog, "missing", TrackerOptions::default());
        assert!(matches!(result, Err(QuestError::QuestNotFound(_))));
    }

    #[test]
    fn test_start_quest_returns_first_dialogue() {
        let mut tracker = tracker();
        let dialogue = tracker.start_quest("welcome_duckling").unwrap();
        assert_eq!(dialogue[0], "A tiny duckling blinks up at you.");

        let active = tracker.state().get_quest("welcome_duckling").unwrap();
        assert_eq!(active.current_step, 1);
        assert!(tracker.available(1).is_empty());
        assert_eq!(tracker.quest_status("welcome_duckling", 1), Some(QuestStatus::Active));
    }

    #[test]
    fn test_start_quest_errors() {
        let mut tracker = tracker();
        assert_eq!(
            tracker.start_quest("nonexistent"),
            Err(QuestError::QuestNotFound("nonexistent".to_string()))
        );

        tracker.start_quest("welcome_duckling").unwrap();
        tracker.record_action("feed", "any", 1);
        let before = tracker.state().get_quest("welcome_duckling").cloned();

        assert_eq!(
            tracker.start_quest("welcome_duckling"),
            Err(QuestError::QuestAlreadyActive("welcome_duckling".to_string()))
        );
        assert_eq!(tracker.state().get_quest("welcome_duckling").cloned(), before);
    }

    #[test]
    fn test_status_lists_objectives_and_choices() {
        let catalog = QuestCatalog::builtin().unwrap();
        let mut state = PlayerQuestState::new("welcome_duckling");
        state.completed_quests.insert("welcome_duckling".to_string(), 1);
        state.unlock_quest("pond_explorer");
        let mut tracker = QuestTracker::from_state(catalog, state, TrackerOptions::default());

        assert_eq!(
            tracker.status("pond_explorer"),
            Err(QuestError::QuestNotActive("pond_explorer".to_string()))
        );

        tracker.start_quest("pond_explorer").unwrap();
        let status = tracker.status("pond_explorer").unwrap();
        assert_eq!(status.quest_name, "The Pond Beyond the Garden");
        assert_eq!(status.step_title, "To the Water's Edge");
        assert_eq!(status.objectives.len(), 2);
        assert_eq!(status.objectives[0].progress, 0);
        assert_eq!(status.objectives[0].required, 1);
        assert!(!status.objectives[0].completed);
        assert_eq!(status.choices, vec!["Dive in", "Gather reeds instead", "Turn back"]);

        let quest = tracker.catalog().get("pond_explorer").unwrap();
        assert_eq!(quest.first_step().resolve_choice("Turn back"), Some(StepTarget::Fail));
    }

    #[test]
    fn test_available_respects_level() {
        let catalog = QuestCatalog::builtin().unwrap();
        let mut state = PlayerQuestState::new("welcome_duckling");
        state.completed_quests.insert("welcome_duckling".to_string(), 1);
        for id in ["daily_feeding", "pond_explorer", "green_thumb"] {
            state.unlock_quest(id);
        }
        let tracker = QuestTracker::from_state(catalog, state, TrackerOptions::default());

        let at_one: Vec<&str> = tracker.available(1).iter().map(|q| q.id.as_str()).collect();
        assert_eq!(at_one, vec!["daily_feeding"]);

        let at_two: Vec<&str> = tracker.available(2).iter().map(|q| q.id.as_str()).collect();
        assert_eq!(at_two, vec!["daily_feeding", "pond_explorer", "green_thumb"]);

        assert_eq!(tracker.quest_status("welcome_duckling", 2), Some(QuestStatus::Completed));
        assert_eq!(tracker.quest_status("pond_explorer", 1), Some(QuestStatus::Locked));
        assert_eq!(tracker.quest_status("nope", 1), None);
    }

    #[test]
    fn test_from_state_clamps_saved_progress() {
        let catalog = QuestCatalog::builtin().unwrap();
        let mut state = PlayerQuestState::new("welcome_duckling");
        let mut active = ActiveQuest::new("welcome_duckling", 2);
        active
            .step_progress
            .insert(ProgressKey::new("welcome_duckling", "first_play"), 40);
        state.active_quests.insert("welcome_duckling".to_string(), active);

        let mut tracker = QuestTracker::from_state(catalog, state, TrackerOptions::default());
        let status = tracker.status("welcome_duckling").unwrap();
        assert_eq!(status.objectives[0].progress, 2);
        assert!(status.objectives[0].completed);

        // Any event re-checks the quest and moves past the finished step
        tracker.record_action("talk", "any", 1);
        assert_eq!(tracker.status("welcome_duckling").unwrap().step_id, 3);
    }

    #[test]
    fn test_from_state_drops_unknown_quests() {
        let catalog = QuestCatalog::builtin().unwrap();
        let mut state = PlayerQuestState::new("welcome_duckling");
        state
            .active_quests
            .insert("retired_quest".to_string(), ActiveQuest::new("retired_quest", 1));
        state
            .active_quests
            .insert("welcome_duckling".to_string(), ActiveQuest::new("welcome_duckling", 9));

        let tracker = QuestTracker::from_state(catalog, state, TrackerOptions::default());
        assert!(tracker.active().is_empty());
    }
}
