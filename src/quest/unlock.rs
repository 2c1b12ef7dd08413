//! Quest Completion and Unlocks
//!
//! Completion bookkeeping plus the one-hop unlock fan-out. Quests with several
//! prerequisites are unlocked as soon as one of them completes but only show
//! up in `available` once every prerequisite is done.

use tracing::info;

use super::definition::{QuestDefinition, Reward};
use super::events::QuestOutcome;
use super::tracker::QuestTracker;

impl QuestTracker {
    /// Record the completion of `quest` and remove it from the active set
    pub(super) fn complete_quest(
        &mut self,
        quest: &QuestDefinition,
        step_reward: Option<Reward>,
    ) -> QuestOutcome {
        if let Some(active) = self.state.get_quest_mut(&quest.id) {
            active.completed = true;
        }

        let count = self.state.completed_quests.entry(quest.id.clone()).or_insert(0);
        *count += 1;
        let times_completed = *count;
        self.state.total_quests_completed += 1;

        if let Some(title) = &quest.final_reward.title {
            self.state.earned_titles.push(title.clone());
        }

        let newly_unlocked = self.propagate_unlocks(&quest.id);
        self.state.active_quests.remove(&quest.id);

        info!(
            "Completed quest: {} ({}), {} time(s); unlocked {:?}",
            quest.name, quest.id, times_completed, newly_unlocked
        );

        QuestOutcome::QuestCompleted {
            quest_id: quest.id.clone(),
            step_reward,
            reward: quest.final_reward.clone(),
            times_completed,
            newly_unlocked,
        }
    }

    /// Unlock every quest that lists `completed_id` as a prerequisite
    fn propagate_unlocks(&mut self, completed_id: &str) -> Vec<String> {
        let mut newly_unlocked = Vec::new();
        for dependent in self.catalog.dependents_of(completed_id) {
            if self.state.unlock_quest(&dependent.id) {
                newly_unlocked.push(dependent.id.clone());
            }
        }
        newly_unlocked
    }
}

#[cfg(test)]
mod tests {
    use crate::quest::catalog::QuestCatalog;
    use crate::quest::events::QuestOutcome;
    use crate::quest::state::PlayerQuestState;
    use crate::quest::tracker::{QuestTracker, TrackerOptions};

    fn finish_welcome(tracker: &mut QuestTracker) -> Vec<QuestOutcome> {
        tracker.start_quest("welcome_duckling").unwrap();
        let mut outcomes = Vec::new();
        outcomes.extend(tracker.record_action("feed", "any", 1).outcomes);
        outcomes.extend(tracker.record_action("play", "any", 2).outcomes);
        outcomes.extend(tracker.record_action("talk", "any", 1).outcomes);
        outcomes
    }

    #[test]
    fn test_completion_unlocks_direct_dependents() {
        let catalog = QuestCatalog::builtin().unwrap();
        let mut tracker =
            QuestTracker::new_player(catalog, "welcome_duckling", TrackerOptions::default()).unwrap();

        let outcomes = finish_welcome(&mut tracker);
        let Some(QuestOutcome::QuestCompleted { newly_unlocked, times_completed, reward, .. }) =
            outcomes.last()
        else {
            panic!("expected a completion, got {:?}", outcomes);
        };
        assert_eq!(*times_completed, 1);
        assert_eq!(reward.coins, 20);
        assert_eq!(
            newly_unlocked,
            &vec![
                "daily_feeding".to_string(),
                "pond_explorer".to_string(),
                "green_thumb".to_string(),
            ]
        );

        // One hop only: nothing depending on pond_explorer is unlocked yet
        assert!(!tracker.state().is_quest_unlocked("gone_fishing"));
        assert_eq!(tracker.state().total_quests_completed, 1);
    }

    #[test]
    fn test_two_prerequisites_gate_availability() {
        let catalog = QuestCatalog::builtin().unwrap();
        let mut state = PlayerQuestState::new("welcome_duckling");
        for id in ["welcome_duckling", "pond_explorer"] {
            state.completed_quests.insert(id.to_string(), 1);
        }
        for id in ["green_thumb", "gone_fishing"] {
            state.unlock_quest(id);
        }
        let mut tracker = QuestTracker::from_state(catalog, state, TrackerOptions::default());

        tracker.start_quest("gone_fishing").unwrap();
        let report = tracker.record_action("fish", "minnow", 3);
        assert_eq!(report.completed_quests().collect::<Vec<_>>(), vec!["gone_fishing"]);

        // Unlocked by the first prerequisite, still not selectable
        assert!(tracker.state().is_quest_unlocked("master_caretaker"));
        let ids: Vec<String> = tracker.available(10).iter().map(|q| q.id.clone()).collect();
        assert!(!ids.contains(&"master_caretaker".to_string()));

        tracker.start_quest("green_thumb").unwrap();
        tracker.record_action("garden", "any", 3);
        tracker.record_action("collect", "Carrot", 2);
        assert_eq!(tracker.completion_count("green_thumb"), 1);

        let ids: Vec<String> = tracker.available(10).iter().map(|q| q.id.clone()).collect();
        assert!(ids.contains(&"master_caretaker".to_string()));
        // Level still applies
        let ids: Vec<String> = tracker.available(4).iter().map(|q| q.id.clone()).collect();
        assert!(!ids.contains(&"master_caretaker".to_string()));
    }
}
