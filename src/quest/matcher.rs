//! Objective Matching
//!
//! Fans a single action event out to every active quest.

use std::sync::Arc;

use tracing::debug;

use super::events::{ActionEvent, ObjectiveUpdate, ProgressReport};
use super::tracker::QuestTracker;

impl QuestTracker {
    /// Apply an action to every matching objective of every active quest,
    /// then advance any quest whose current step became complete
    pub fn update_progress(&mut self, event: &ActionEvent) -> ProgressReport {
        let mut report = ProgressReport::default();
        if event.amount == 0 {
            return report;
        }

        let catalog = Arc::clone(&self.catalog);
        for active in self.state.active_quests.values_mut() {
            if active.completed || active.failed {
                continue;
            }
            let Some(step) = catalog
                .get(&active.quest_id)
                .and_then(|q| q.step(active.current_step))
            else {
                continue;
            };

            for objective in &step.objectives {
                if active.is_objective_complete(objective)
                    || !objective.matches(event.objective_type, &event.target)
                {
                    continue;
                }

                let (progress, just_completed) = active.add_progress(objective, event.amount);
                debug!(
                    "Quest {} objective {}: {}/{}",
                    active.quest_id, objective.id, progress, objective.required
                );
                report.updates.push(ObjectiveUpdate {
                    quest_id: active.quest_id.clone(),
                    objective_id: objective.id.clone(),
                    description: objective.description.clone(),
                    progress,
                    required: objective.required,
                    just_completed,
                });
            }
        }

        // Every active quest, not only the touched ones
        let quest_ids: Vec<String> = self.state.active_quests.keys().cloned().collect();
        for quest_id in quest_ids {
            report.outcomes.extend(self.check_step_completion(&quest_id));
        }

        report
    }

    /// Loosely typed entry point for gameplay systems
    pub fn record_action(&mut self, objective_type: &str, target: &str, amount: u32) -> ProgressReport {
        match ActionEvent::parse(objective_type, target, amount) {
            Some(event) => self.update_progress(&event),
            None => {
                debug!("Ignoring unknown action type '{}'", objective_type);
                ProgressReport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::quest::catalog::QuestCatalog;
    use crate::quest::definition::ObjectiveType;
    use crate::quest::events::ActionEvent;
    use crate::quest::tracker::{QuestTracker, TrackerOptions};

    const SNACK_RUN: &str = r#"
[quest]
id = "snack_run"
name = "Snack Run"

[[quest.steps]]
id = 1
title = "Snacks"

[[quest.steps.objectives]]
id = "bread"
type = "feed"
target = "Bread"
count = 5
description = "Feed bread five times"

[[quest.steps.objectives]]
id = "anything"
type = "feed"
count = 2
optional = true
description = "Feed anything"
"#;

    fn tracker() -> QuestTracker {
        let catalog = Arc::new(QuestCatalog::from_toml_sources([("snack_run", SNACK_RUN)]).unwrap());
        let mut tracker =
            QuestTracker::new_player(catalog, "snack_run", TrackerOptions::default()).unwrap();
        tracker.start_quest("snack_run").unwrap();
        tracker
    }

    #[test]
    fn test_target_matching_ignores_case() {
        let mut tracker = tracker();
        let report = tracker.update_progress(&ActionEvent::new(ObjectiveType::Feed, "BREAD", 2));

        assert_eq!(report.updates.len(), 2);
        let status = tracker.status("snack_run").unwrap();
        assert_eq!(status.objectives[0].progress, 2);
        assert_eq!(status.objectives[1].progress, 2);
        assert!(report.updates[1].just_completed);

        let report = tracker.record_action("feed", "seeds", 1);
        // Only the "any" objective listens for seeds, and it is already done
        assert!(report.updates.is_empty());
    }

    #[test]
    fn test_progress_saturates_and_never_decreases() {
        let mut tracker = tracker();
        let mut last = 0;
        for amount in [1, 3, 7, 2] {
            tracker.record_action("feed", "bread", amount);
            let progress = tracker
                .state()
                .get_quest("snack_run")
                .map(|q| q.progress("bread"))
                .unwrap_or(5);
            assert!(progress >= last);
            assert!(progress <= 5);
            last = progress;
        }
        // 1 + 3 + 7 saturates and finishes the quest
        assert_eq!(tracker.completion_count("snack_run"), 1);
    }

    #[test]
    fn test_zero_amount_and_unknown_type_are_ignored() {
        let mut tracker = tracker();
        assert!(tracker.record_action("feed", "bread", 0).is_empty());
        assert!(tracker.record_action("juggle", "bread", 3).is_empty());
        assert_eq!(tracker.state().get_quest("snack_run").unwrap().progress("bread"), 0);
    }

    #[test]
    fn test_wrong_type_does_not_match() {
        let mut tracker = tracker();
        let report = tracker.record_action("collect", "bread", 5);
        assert!(report.is_empty());
    }
}
