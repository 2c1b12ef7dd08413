//! Quest Definition Structures
//!
//! Raw structures are deserialized from TOML quest files and resolved into
//! validated definitions. Step graphs are checked here so a broken quest
//! never reaches a player session.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::error::CatalogError;

/// Step target value reserved for "end the quest in failure"
pub const FAIL_SENTINEL: i64 = -1;

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub level_required: u32,
    /// Quests that must be completed before this one unlocks
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Loaded for completeness; nothing expires quests
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub steps: Vec<RawStep>,
    #[serde(default)]
    pub rewards: Option<RawReward>,
}

fn default_category() -> String {
    "side".to_string()
}

fn default_difficulty() -> String {
    "normal".to_string()
}

/// Raw step as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawStep {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub dialogue: Vec<String>,
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
    #[serde(default)]
    pub reward: Option<RawReward>,
    pub next_step: Option<i64>,
    pub choices: Option<Vec<RawChoice>>,
}

/// A dialogue choice and the step it leads to (-1 fails the quest)
#[derive(Debug, Clone, Deserialize)]
pub struct RawChoice {
    pub text: String,
    pub target: i64,
}

/// Raw objective as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    pub id: String,
    #[serde(rename = "type")]
    pub objective_type: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_count")]
    pub count: u32,
    pub description: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub hint: String,
}

fn default_target() -> String {
    ANY_TARGET.to_string()
}

fn default_count() -> u32 {
    1
}

/// Raw reward as it appears in TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReward {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub coins: u32,
    #[serde(default)]
    pub items: Vec<RawItemReward>,
    #[serde(default)]
    pub unlocks: Vec<String>,
    pub title: Option<String>,
    pub achievement: Option<String>,
}

/// Item reward entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawItemReward {
    pub id: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

/// Objective target that matches every event target
pub const ANY_TARGET: &str = "any";

/// Kinds of player actions an objective can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveType {
    Collect,
    Feed,
    Play,
    Explore,
    Talk,
    Fish,
    Garden,
    Craft,
    Find,
    Wait,
    /// Satisfied by picking a dialogue choice
    Choice,
}

impl ObjectiveType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "collect" => Some(ObjectiveType::Collect),
            "feed" => Some(ObjectiveType::Feed),
            "play" => Some(ObjectiveType::Play),
            "explore" => Some(ObjectiveType::Explore),
            "talk" => Some(ObjectiveType::Talk),
            "fish" => Some(ObjectiveType::Fish),
            "garden" => Some(ObjectiveType::Garden),
            "craft" => Some(ObjectiveType::Craft),
            "find" => Some(ObjectiveType::Find),
            "wait" => Some(ObjectiveType::Wait),
            "choice" => Some(ObjectiveType::Choice),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveType::Collect => "collect",
            ObjectiveType::Feed => "feed",
            ObjectiveType::Play => "play",
            ObjectiveType::Explore => "explore",
            ObjectiveType::Talk => "talk",
            ObjectiveType::Fish => "fish",
            ObjectiveType::Garden => "garden",
            ObjectiveType::Craft => "craft",
            ObjectiveType::Find => "find",
            ObjectiveType::Wait => "wait",
            ObjectiveType::Choice => "choice",
        }
    }
}

/// Quest categories used for grouping in the quest log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestCategory {
    Main,
    Side,
    Daily,
    Hidden,
    Seasonal,
}

impl QuestCategory {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "main" => Some(QuestCategory::Main),
            "side" => Some(QuestCategory::Side),
            "daily" => Some(QuestCategory::Daily),
            "hidden" => Some(QuestCategory::Hidden),
            "seasonal" => Some(QuestCategory::Seasonal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Epic,
}

impl Difficulty {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            "epic" => Some(Difficulty::Epic),
            _ => None,
        }
    }
}

/// A resolved quest objective
#[derive(Debug, Clone, Serialize)]
pub struct QuestObjective {
    /// Unique within the owning quest
    pub id: String,
    pub objective_type: ObjectiveType,
    /// `"any"` or a specific target, compared ignoring case
    pub target: String,
    pub required: u32,
    pub description: String,
    /// Optional objectives never gate step completion
    pub optional: bool,
    pub hint: String,
}

impl QuestObjective {
    fn from_raw(quest_id: &str, raw: &RawObjective) -> Result<Self, CatalogError> {
        let objective_type = ObjectiveType::from_str(&raw.objective_type).ok_or_else(|| {
            CatalogError::invalid(
                quest_id,
                format!("objective '{}' has unknown type '{}'", raw.id, raw.objective_type),
            )
        })?;
        if raw.count == 0 {
            return Err(CatalogError::invalid(
                quest_id,
                format!("objective '{}' requires an amount of at least 1", raw.id),
            ));
        }

        Ok(Self {
            id: raw.id.clone(),
            objective_type,
            target: raw.target.clone(),
            required: raw.count,
            description: raw.description.clone(),
            optional: raw.optional,
            hint: raw.hint.clone(),
        })
    }

    /// Whether an action of `objective_type` on `target` counts toward this objective
    pub fn matches(&self, objective_type: ObjectiveType, target: &str) -> bool {
        self.objective_type == objective_type
            && (self.target.eq_ignore_ascii_case(ANY_TARGET)
                || self.target.to_lowercase() == target.to_lowercase())
    }
}

/// Item reward entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReward {
    pub item_id: String,
    pub count: u32,
}

/// Reward payload reported to the economy and achievement subsystems
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reward {
    pub xp: u32,
    pub coins: u32,
    pub items: Vec<ItemReward>,
    pub unlocks: Vec<String>,
    pub title: Option<String>,
    pub achievement: Option<String>,
}

impl Reward {
    pub fn from_raw(raw: &RawReward) -> Self {
        Self {
            xp: raw.xp,
            coins: raw.coins,
            items: raw.items.iter().map(|i| ItemReward {
                item_id: i.id.clone(),
                count: i.count,
            }).collect(),
            unlocks: raw.unlocks.clone(),
            title: raw.title.clone(),
            achievement: raw.achievement.clone(),
        }
    }
}

/// Where a choice leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepTarget {
    Step(u32),
    /// The -1 sentinel: the quest ends in failure
    Fail,
}

impl StepTarget {
    fn from_raw(value: i64) -> Option<Self> {
        if value == FAIL_SENTINEL {
            Some(StepTarget::Fail)
        } else if value > 0 && value <= u32::MAX as i64 {
            Some(StepTarget::Step(value as u32))
        } else {
            None
        }
    }
}

/// A dialogue choice offered at the end of a step
#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub text: String,
    pub target: StepTarget,
}

/// How a finished step hands over to the rest of the quest
#[derive(Debug, Clone, Serialize)]
pub enum StepTransition {
    /// Advance to the given step
    Linear(u32),
    /// Wait for the player to pick one of these (never empty)
    Choice(Vec<Choice>),
    /// Finishing this step finishes the quest
    Terminal,
}

/// A resolved quest step
#[derive(Debug, Clone, Serialize)]
pub struct QuestStep {
    pub id: u32,
    pub title: String,
    pub dialogue: Vec<String>,
    pub objectives: Vec<QuestObjective>,
    pub reward: Option<Reward>,
    pub transition: StepTransition,
}

impl QuestStep {
    fn from_raw(quest_id: &str, raw: &RawStep) -> Result<Self, CatalogError> {
        let id = match StepTarget::from_raw(raw.id) {
            Some(StepTarget::Step(id)) => id,
            _ => {
                return Err(CatalogError::invalid(
                    quest_id,
                    format!("step id {} is not a positive integer", raw.id),
                ));
            }
        };

        let objectives = raw.objectives
            .iter()
            .map(|o| QuestObjective::from_raw(quest_id, o))
            .collect::<Result<Vec<_>, _>>()?;

        let transition = match (raw.next_step, raw.choices.as_ref()) {
            (Some(_), Some(_)) => {
                return Err(CatalogError::invalid(
                    quest_id,
                    format!("step {} declares both next_step and choices", id),
                ));
            }
            (Some(next), None) => match StepTarget::from_raw(next) {
                Some(StepTarget::Step(next)) => StepTransition::Linear(next),
                _ => {
                    return Err(CatalogError::DanglingStep {
                        quest_id: quest_id.to_string(),
                        step_id: id,
                        target: next,
                    });
                }
            },
            (None, Some(choices)) => {
                if choices.is_empty() {
                    return Err(CatalogError::invalid(
                        quest_id,
                        format!("step {} has an empty choice list", id),
                    ));
                }
                let choices = choices
                    .iter()
                    .map(|c| {
                        StepTarget::from_raw(c.target)
                            .map(|target| Choice { text: c.text.clone(), target })
                            .ok_or_else(|| CatalogError::DanglingStep {
                                quest_id: quest_id.to_string(),
                                step_id: id,
                                target: c.target,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                StepTransition::Choice(choices)
            }
            (None, None) => StepTransition::Terminal,
        };

        Ok(Self {
            id,
            title: raw.title.clone(),
            dialogue: raw.dialogue.clone(),
            objectives,
            reward: raw.reward.as_ref().map(Reward::from_raw),
            transition,
        })
    }

    /// Choices offered by this step (empty unless it branches)
    pub fn choices(&self) -> &[Choice] {
        match &self.transition {
            StepTransition::Choice(choices) => choices,
            _ => &[],
        }
    }

    /// Resolve the player's choice text to its target
    pub fn resolve_choice(&self, text: &str) -> Option<StepTarget> {
        self.choices().iter().find(|c| c.text == text).map(|c| c.target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.transition, StepTransition::Terminal)
    }

    /// Objectives that gate completion of this step
    pub fn required_objectives(&self) -> impl Iterator<Item = &QuestObjective> {
        self.objectives.iter().filter(|o| !o.optional)
    }
}

/// A fully resolved quest definition
#[derive(Debug, Clone, Serialize)]
pub struct QuestDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: QuestCategory,
    pub difficulty: Difficulty,
    /// Steps in authoring order; the first one is where the quest starts
    pub steps: Vec<QuestStep>,
    pub final_reward: Reward,
    pub prerequisites: BTreeSet<String>,
    pub level_required: u32,
    pub time_limit_minutes: Option<u32>,
    pub repeatable: bool,
}

impl QuestDefinition {
    /// Create a quest from raw TOML data, validating its step graph
    pub fn from_raw(raw: &RawQuest) -> Result<Self, CatalogError> {
        let category = QuestCategory::from_str(&raw.category).ok_or_else(|| {
            CatalogError::invalid(&raw.id, format!("unknown category '{}'", raw.category))
        })?;
        let difficulty = Difficulty::from_str(&raw.difficulty).ok_or_else(|| {
            CatalogError::invalid(&raw.id, format!("unknown difficulty '{}'", raw.difficulty))
        })?;

        let steps = raw.steps
            .iter()
            .map(|s| QuestStep::from_raw(&raw.id, s))
            .collect::<Result<Vec<_>, _>>()?;

        let quest = Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            description: raw.description.clone(),
            category,
            difficulty,
            steps,
            final_reward: raw.rewards.as_ref()
                .map(Reward::from_raw)
                .unwrap_or_default(),
            prerequisites: raw.prerequisites.iter().cloned().collect(),
            level_required: raw.level_required,
            time_limit_minutes: raw.time_limit_minutes,
            repeatable: raw.repeatable,
        };
        quest.validate()?;
        Ok(quest)
    }

    /// Check ids and step references within this quest
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.steps.is_empty() {
            return Err(CatalogError::invalid(&self.id, "quest has no steps"));
        }

        let mut step_ids = HashSet::new();
        let mut objective_ids = HashSet::new();
        for step in &self.steps {
            if step.id == 0 {
                return Err(CatalogError::invalid(&self.id, "step id 0 is not allowed"));
            }
            if !step_ids.insert(step.id) {
                return Err(CatalogError::invalid(
                    &self.id,
                    format!("duplicate step id {}", step.id),
                ));
            }
            for objective in &step.objectives {
                if objective.required == 0 {
                    return Err(CatalogError::invalid(
                        &self.id,
                        format!("objective '{}' requires an amount of at least 1", objective.id),
                    ));
                }
                // Progress is keyed by (quest, objective) so ids must not repeat across steps
                if !objective_ids.insert(objective.id.as_str()) {
                    return Err(CatalogError::invalid(
                        &self.id,
                        format!("duplicate objective id '{}'", objective.id),
                    ));
                }
            }
        }

        for step in &self.steps {
            let targets: Vec<i64> = match &step.transition {
                StepTransition::Linear(next) => vec![*next as i64],
                StepTransition::Choice(choices) => {
                    if choices.is_empty() {
                        return Err(CatalogError::invalid(
                            &self.id,
                            format!("step {} has an empty choice list", step.id),
                        ));
                    }
                    choices
                        .iter()
                        .filter_map(|c| match c.target {
                            StepTarget::Step(id) => Some(id as i64),
                            StepTarget::Fail => None,
                        })
                        .collect()
                }
                StepTransition::Terminal => Vec::new(),
            };
            for target in targets {
                if target <= 0 || !step_ids.contains(&(target as u32)) {
                    return Err(CatalogError::DanglingStep {
                        quest_id: self.id.clone(),
                        step_id: step.id,
                        target,
                    });
                }
            }
        }

        Ok(())
    }

    /// Get a step by ID
    pub fn step(&self, step_id: u32) -> Option<&QuestStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// The step a freshly started quest sits on
    pub fn first_step(&self) -> &QuestStep {
        // validate() guarantees at least one step
        &self.steps[0]
    }

    pub fn requires_quest(&self, quest_id: &str) -> bool {
        self.prerequisites.contains(quest_id)
    }

    /// Find an objective in any step
    pub fn objective(&self, objective_id: &str) -> Option<&QuestObjective> {
        self.steps
            .iter()
            .flat_map(|s| s.objectives.iter())
            .find(|o| o.id == objective_id)
    }
}
