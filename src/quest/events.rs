//! Quest Event Types
//!
//! Actions reported by gameplay systems and the records produced when they
//! move quests forward.

use serde::{Deserialize, Serialize};

use super::definition::{ObjectiveType, Reward};

/// Something the player did that may count toward objectives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub objective_type: ObjectiveType,
    /// Specific thing acted on (food, area, fish...), matched ignoring case
    pub target: String,
    pub amount: u32,
}

impl ActionEvent {
    pub fn new(objective_type: ObjectiveType, target: impl Into<String>, amount: u32) -> Self {
        Self {
            objective_type,
            target: target.into(),
            amount,
        }
    }

    /// Build an event from loosely typed input; `None` for unknown action types
    pub fn parse(objective_type: &str, target: &str, amount: u32) -> Option<Self> {
        ObjectiveType::from_str(objective_type).map(|ty| Self::new(ty, target, amount))
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        self.objective_type.as_str()
    }
}

/// One objective touched by an action event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectiveUpdate {
    pub quest_id: String,
    pub objective_id: String,
    pub description: String,
    /// New progress value
    pub progress: u32,
    pub required: u32,
    /// Whether this event is what completed the objective
    pub just_completed: bool,
}

/// State changes reported outward for the UI, economy and achievements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestOutcome {
    /// A step finished and the quest moved on
    StepAdvanced {
        quest_id: String,
        from_step: u32,
        to_step: u32,
        /// Reward attached to the finished step
        reward: Option<Reward>,
        /// Dialogue of the step now current
        dialogue: Vec<String>,
    },
    /// The terminal step finished
    QuestCompleted {
        quest_id: String,
        /// Reward of the terminal step, if it has one
        step_reward: Option<Reward>,
        reward: Reward,
        times_completed: u32,
        newly_unlocked: Vec<String>,
    },
    /// A choice led to the fail sentinel; nothing is rewarded
    QuestFailed { quest_id: String },
}

/// Result of feeding one action event through the tracker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub updates: Vec<ObjectiveUpdate>,
    pub outcomes: Vec<QuestOutcome>,
}

impl ProgressReport {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.outcomes.is_empty()
    }

    pub fn completed_quests(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|o| match o {
            QuestOutcome::QuestCompleted { quest_id, .. } => Some(quest_id.as_str()),
            _ => None,
        })
    }
}

/// Result of a successful dialogue choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceResult {
    pub quest_id: String,
    pub choice: String,
    pub outcomes: Vec<QuestOutcome>,
}

impl ChoiceResult {
    pub fn failed(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o, QuestOutcome::QuestFailed { .. }))
    }
}
