//! Quest State Tracking
//!
//! Per-player quest progress and the aggregate that gets persisted.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::definition::{QuestObjective, QuestStep};

/// Entries kept per quest in the choice history
pub const CHOICE_HISTORY_CAP: usize = 50;

/// Composite key for objective progress
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressKey {
    pub quest_id: String,
    pub objective_id: String,
}

impl ProgressKey {
    pub fn new(quest_id: &str, objective_id: &str) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            objective_id: objective_id.to_string(),
        }
    }
}

/// A quest the player is currently working on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveQuest {
    pub quest_id: String,
    pub current_step: u32,
    pub started_at: DateTime<Utc>,
    #[serde(with = "progress_entries")]
    pub step_progress: BTreeMap<ProgressKey, u32>,
    pub choices_made: Vec<String>,
    pub completed: bool,
    pub failed: bool,
}

impl ActiveQuest {
    pub fn new(quest_id: &str, first_step: u32) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            current_step: first_step,
            started_at: Utc::now(),
            step_progress: BTreeMap::new(),
            choices_made: Vec::new(),
            completed: false,
            failed: false,
        }
    }

    fn key(&self, objective_id: &str) -> ProgressKey {
        ProgressKey::new(&self.quest_id, objective_id)
    }

    /// Current count for an objective (0 if untouched)
    pub fn progress(&self, objective_id: &str) -> u32 {
        self.step_progress
            .get(&self.key(objective_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_objective_complete(&self, objective: &QuestObjective) -> bool {
        self.progress(&objective.id) >= objective.required
    }

    /// Add progress, saturating at the objective's requirement.
    /// Returns the new count and whether this call completed the objective.
    pub fn add_progress(&mut self, objective: &QuestObjective, amount: u32) -> (u32, bool) {
        let key = self.key(&objective.id);
        let entry = self.step_progress.entry(key).or_insert(0);
        let was_complete = *entry >= objective.required;
        *entry = entry.saturating_add(amount).min(objective.required);
        (*entry, !was_complete && *entry >= objective.required)
    }

    /// Mark as complete regardless of count
    pub fn force_complete(&mut self, objective: &QuestObjective) {
        let key = self.key(&objective.id);
        self.step_progress.insert(key, objective.required);
    }

    /// Every non-optional objective of `step` has reached its requirement
    pub fn is_step_done(&self, step: &QuestStep) -> bool {
        step.required_objectives().all(|o| self.is_objective_complete(o))
    }
}

/// All quest state for a single player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerQuestState {
    /// Active quests (quest_id -> progress)
    pub active_quests: BTreeMap<String, ActiveQuest>,
    /// Completion counts; repeatable quests can exceed 1
    pub completed_quests: BTreeMap<String, u32>,
    pub failed_quests: Vec<String>,
    pub unlocked_quests: BTreeSet<String>,
    pub total_quests_completed: u32,
    /// Recent choices per quest, oldest first
    pub choices_history: BTreeMap<String, VecDeque<String>>,
    /// Append-only; repeat completions append again
    pub earned_titles: Vec<String>,
    /// Reserved for quest chains
    #[serde(default)]
    pub quest_chain_progress: BTreeMap<String, i64>,
}

impl PlayerQuestState {
    /// Fresh state with only the starter quest unlocked
    pub fn new(starter_quest: &str) -> Self {
        Self {
            unlocked_quests: BTreeSet::from([starter_quest.to_string()]),
            ..Self::default()
        }
    }

    /// Get active quest progress
    pub fn get_quest(&self, quest_id: &str) -> Option<&ActiveQuest> {
        self.active_quests.get(quest_id)
    }

    /// Get mutable active quest progress
    pub fn get_quest_mut(&mut self, quest_id: &str) -> Option<&mut ActiveQuest> {
        self.active_quests.get_mut(quest_id)
    }

    pub fn is_quest_active(&self, quest_id: &str) -> bool {
        self.active_quests.contains_key(quest_id)
    }

    pub fn is_quest_completed(&self, quest_id: &str) -> bool {
        self.completion_count(quest_id) > 0
    }

    pub fn completion_count(&self, quest_id: &str) -> u32 {
        self.completed_quests.get(quest_id).copied().unwrap_or(0)
    }

    pub fn is_quest_failed(&self, quest_id: &str) -> bool {
        self.failed_quests.iter().any(|id| id == quest_id)
    }

    pub fn is_quest_unlocked(&self, quest_id: &str) -> bool {
        self.unlocked_quests.contains(quest_id)
    }

    /// Make a quest unlockable; returns true if it was not unlocked before
    pub fn unlock_quest(&mut self, quest_id: &str) -> bool {
        self.unlocked_quests.insert(quest_id.to_string())
    }

    /// Record a failure (the id is listed once)
    pub fn mark_failed(&mut self, quest_id: &str) {
        if !self.is_quest_failed(quest_id) {
            self.failed_quests.push(quest_id.to_string());
        }
    }

    pub fn clear_failed(&mut self, quest_id: &str) {
        self.failed_quests.retain(|id| id != quest_id);
    }

    /// Append to the capped choice history, evicting the oldest entries
    pub fn record_choice(&mut self, quest_id: &str, choice: &str) {
        let history = self.choices_history.entry(quest_id.to_string()).or_default();
        history.push_back(choice.to_string());
        while history.len() > CHOICE_HISTORY_CAP {
            history.pop_front();
        }
    }

    pub fn choice_history(&self, quest_id: &str) -> Vec<&str> {
        self.choices_history
            .get(quest_id)
            .map(|h| h.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Progress maps are written as a list so the composite key survives JSON
mod progress_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ProgressKey;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        quest_id: String,
        objective_id: String,
        count: u32,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<ProgressKey, u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<Entry> = map
            .iter()
            .map(|(key, count)| Entry {
                quest_id: key.quest_id.clone(),
                objective_id: key.objective_id.clone(),
                count: *count,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ProgressKey, u32>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| (ProgressKey { quest_id: e.quest_id, objective_id: e.objective_id }, e.count))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::definition::ObjectiveType;

    fn objective(id: &str, required: u32) -> QuestObjective {
        QuestObjective {
            id: id.to_string(),
            objective_type: ObjectiveType::Feed,
            target: "any".to_string(),
            required,
            description: format!("Do {}", id),
            optional: false,
            hint: String::new(),
        }
    }

    #[test]
    fn test_progress_saturates() {
        let snacks = objective("snacks", 5);
        let mut quest = ActiveQuest::new("daily", 1);
        assert_eq!(quest.progress("snacks"), 0);

        assert_eq!(quest.add_progress(&snacks, 3), (3, false));
        assert_eq!(quest.add_progress(&snacks, 4), (5, true));

        // Already complete: stays capped and is not reported as newly completed
        assert_eq!(quest.add_progress(&snacks, 1), (5, false));
        assert!(quest.is_objective_complete(&snacks));
    }

    #[test]
    fn test_progress_keys_are_namespaced_by_quest() {
        let snacks = objective("snacks", 2);
        let mut quest = ActiveQuest::new("daily", 1);
        quest.add_progress(&snacks, 1);

        assert!(quest.step_progress.contains_key(&ProgressKey::new("daily", "snacks")));
        assert!(!quest.step_progress.contains_key(&ProgressKey::new("daily_snacks", "")));
    }

    #[test]
    fn test_choice_history_is_capped() {
        let mut state = PlayerQuestState::new("starter");
        for i in 0..(CHOICE_HISTORY_CAP + 3) {
            state.record_choice("pond", &format!("choice {}", i));
        }

        let history = state.choice_history("pond");
        assert_eq!(history.len(), CHOICE_HISTORY_CAP);
        assert_eq!(history[0], "choice 3");
        assert_eq!(history.last().copied(), Some("choice 52"));
    }

    #[test]
    fn test_player_quest_state() {
        let mut state = PlayerQuestState::new("starter");
        assert!(state.is_quest_unlocked("starter"));
        assert_eq!(state.unlocked_quests.len(), 1);

        assert!(state.unlock_quest("next"));
        assert!(!state.unlock_quest("next"));

        state.mark_failed("next");
        state.mark_failed("next");
        assert_eq!(state.failed_quests, vec!["next".to_string()]);
        state.clear_failed("next");
        assert!(!state.is_quest_failed("next"));
    }
}
