//! Step Transitions
//!
//! Decides when a step is finished and where the quest goes next, including
//! branching through dialogue choices.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::definition::{ObjectiveType, StepTarget, StepTransition};
use super::error::QuestError;
use super::events::{ChoiceResult, QuestOutcome};
use super::tracker::QuestTracker;

impl QuestTracker {
    /// Advance `quest_id` through every step that is already satisfied.
    ///
    /// Linear steps chain within one call; a branching step waits for
    /// `make_choice`; a terminal step completes the quest.
    pub(super) fn check_step_completion(&mut self, quest_id: &str) -> Vec<QuestOutcome> {
        let mut outcomes = Vec::new();
        let catalog = Arc::clone(&self.catalog);
        let Some(quest) = catalog.get(quest_id) else {
            return outcomes;
        };

        // Visiting more steps than the quest has means a loop of empty steps
        for _ in 0..=quest.steps.len() {
            let Some(active) = self.state.get_quest_mut(quest_id) else {
                return outcomes;
            };
            if active.completed || active.failed {
                return outcomes;
            }
            let Some(step) = quest.step(active.current_step) else {
                warn!("Quest '{}' is on unknown step {}", quest_id, active.current_step);
                return outcomes;
            };
            if !active.is_step_done(step) {
                return outcomes;
            }

            match &step.transition {
                StepTransition::Linear(next) => {
                    let from_step = active.current_step;
                    active.current_step = *next;
                    debug!("Quest {} advanced from step {} to {}", quest_id, from_step, next);
                    outcomes.push(QuestOutcome::StepAdvanced {
                        quest_id: quest_id.to_string(),
                        from_step,
                        to_step: *next,
                        reward: step.reward.clone(),
                        dialogue: quest
                            .step(*next)
                            .map(|s| s.dialogue.clone())
                            .unwrap_or_default(),
                    });
                }
                StepTransition::Terminal => {
                    outcomes.push(self.complete_quest(quest, step.reward.clone()));
                    return outcomes;
                }
                StepTransition::Choice(_) => return outcomes,
            }
        }

        warn!("Quest '{}' loops through steps without objectives", quest_id);
        outcomes
    }

    /// Resolve a dialogue choice on the quest's current step
    pub fn make_choice(&mut self, quest_id: &str, choice: &str) -> Result<ChoiceResult, QuestError> {
        let catalog = Arc::clone(&self.catalog);
        let not_active = || QuestError::QuestNotActive(quest_id.to_string());

        let active = self.state.get_quest(quest_id).ok_or_else(not_active)?;
        let quest = catalog.get(quest_id).ok_or_else(not_active)?;
        let step = quest.step(active.current_step).ok_or_else(not_active)?;

        if step.choices().is_empty() {
            return Err(QuestError::NoChoicesAvailable(quest_id.to_string()));
        }
        let target = step.resolve_choice(choice).ok_or_else(|| QuestError::InvalidChoice {
            quest_id: quest_id.to_string(),
            choice: choice.to_string(),
        })?;

        // Moving on to another step waits for the rest of this step; failing never does
        if let StepTarget::Step(_) = target {
            let ready = step
                .required_objectives()
                .filter(|o| o.objective_type != ObjectiveType::Choice)
                .all(|o| active.is_objective_complete(o));
            if !ready {
                return Err(QuestError::NoChoicesAvailable(quest_id.to_string()));
            }
        }

        self.state.record_choice(quest_id, choice);

        let mut outcomes = Vec::new();
        let Some(active) = self.state.get_quest_mut(quest_id) else {
            return Err(not_active());
        };
        active.choices_made.push(choice.to_string());

        match target {
            StepTarget::Fail => {
                active.failed = true;
                self.state.active_quests.remove(quest_id);
                self.state.mark_failed(quest_id);
                info!("Quest {} failed after choosing '{}'", quest_id, choice);
                outcomes.push(QuestOutcome::QuestFailed {
                    quest_id: quest_id.to_string(),
                });
            }
            StepTarget::Step(next) => {
                for objective in step
                    .objectives
                    .iter()
                    .filter(|o| o.objective_type == ObjectiveType::Choice)
                {
                    active.force_complete(objective);
                }
                let from_step = active.current_step;
                active.current_step = next;
                debug!("Quest {} chose '{}': step {} -> {}", quest_id, choice, from_step, next);

                outcomes.push(QuestOutcome::StepAdvanced {
                    quest_id: quest_id.to_string(),
                    from_step,
                    to_step: next,
                    reward: step.reward.clone(),
                    dialogue: quest.step(next).map(|s| s.dialogue.clone()).unwrap_or_default(),
                });

                if self.options.eager_choice_recheck {
                    outcomes.extend(self.check_step_completion(quest_id));
                }
            }
        }

        Ok(ChoiceResult {
            quest_id: quest_id.to_string(),
            choice: choice.to_string(),
            outcomes,
        })
    }
}
