//! Quest Save Format
//!
//! Player quest state is stored as versioned JSON. Version 1 saves predate
//! the version field and keyed objective progress by `"{quest}_{objective}"`
//! strings; `migrate` upgrades them to the current layout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::PersistenceError;
use super::state::{CHOICE_HISTORY_CAP, PlayerQuestState};

/// Current save layout
pub const SAVE_VERSION: u64 = 2;

/// Owned form of a save file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedQuestState {
    pub version: u64,
    #[serde(flatten)]
    pub state: PlayerQuestState,
}

#[derive(Serialize)]
struct SavedQuestStateRef<'a> {
    version: u64,
    #[serde(flatten)]
    state: &'a PlayerQuestState,
}

/// Encode a state in the current save layout
pub fn to_json(state: &PlayerQuestState) -> Result<String, PersistenceError> {
    let saved = SavedQuestStateRef {
        version: SAVE_VERSION,
        state,
    };
    Ok(serde_json::to_string(&saved)?)
}

/// Decode a save of any supported version
pub fn from_json(json: &str) -> Result<PlayerQuestState, PersistenceError> {
    let value: Value = serde_json::from_str(json)?;
    migrate(value)
}

/// Upgrade a decoded save to the current layout and type it
pub fn migrate(mut value: Value) -> Result<PlayerQuestState, PersistenceError> {
    let root = value
        .as_object_mut()
        .ok_or_else(|| PersistenceError::Malformed("save is not a JSON object".to_string()))?;

    let version = match root.get("version") {
        None => 1,
        Some(v) => v.as_u64().ok_or_else(|| {
            PersistenceError::Malformed("version must be an unsigned integer".to_string())
        })?,
    };
    if version > SAVE_VERSION {
        return Err(PersistenceError::UnsupportedVersion(version));
    }
    if version < 2 {
        migrate_v1(root)?;
    }

    let saved: SavedQuestState = serde_json::from_value(value)?;
    Ok(saved.state)
}

/// v1 -> v2: composite progress keys, explicit defaults, capped history
fn migrate_v1(root: &mut Map<String, Value>) -> Result<(), PersistenceError> {
    let defaults = [
        ("active_quests", Value::Object(Map::new())),
        ("completed_quests", Value::Object(Map::new())),
        ("failed_quests", Value::Array(Vec::new())),
        ("unlocked_quests", Value::Array(Vec::new())),
        ("total_quests_completed", Value::from(0)),
        ("choices_history", Value::Object(Map::new())),
        ("earned_titles", Value::Array(Vec::new())),
        ("quest_chain_progress", Value::Object(Map::new())),
    ];
    for (field, default) in defaults {
        root.entry(field).or_insert(default);
    }

    if let Some(active_quests) = root.get_mut("active_quests").and_then(Value::as_object_mut) {
        for (quest_id, quest) in active_quests.iter_mut() {
            let quest = quest.as_object_mut().ok_or_else(|| {
                PersistenceError::Malformed(format!("active quest '{}' is not an object", quest_id))
            })?;
            migrate_v1_quest(quest_id, quest)?;
        }
    }

    if let Some(history) = root.get_mut("choices_history").and_then(Value::as_object_mut) {
        for entries in history.values_mut() {
            if let Some(entries) = entries.as_array_mut() {
                let excess = entries.len().saturating_sub(CHOICE_HISTORY_CAP);
                entries.drain(..excess);
            }
        }
    }

    root.insert("version".to_string(), Value::from(SAVE_VERSION));
    Ok(())
}

fn migrate_v1_quest(quest_id: &str, quest: &mut Map<String, Value>) -> Result<(), PersistenceError> {
    quest
        .entry("quest_id")
        .or_insert_with(|| Value::from(quest_id));
    quest
        .entry("started_at")
        .or_insert_with(|| Value::from(chrono::Utc::now().to_rfc3339()));
    quest.entry("choices_made").or_insert_with(|| Value::Array(Vec::new()));
    quest.entry("completed").or_insert(Value::Bool(false));
    quest.entry("failed").or_insert(Value::Bool(false));

    let prefix = format!("{}_", quest_id);
    let mut entries = Vec::new();
    if let Some(progress) = quest.get("step_progress").and_then(Value::as_object) {
        for (key, count) in progress {
            let objective_id = key.strip_prefix(&prefix).ok_or_else(|| {
                PersistenceError::Malformed(format!(
                    "progress key '{}' does not belong to quest '{}'",
                    key, quest_id
                ))
            })?;
            let count = count.as_u64().ok_or_else(|| {
                PersistenceError::Malformed(format!("progress for '{}' is not a count", key))
            })?;
            entries.push(serde_json::json!({
                "quest_id": quest_id,
                "objective_id": objective_id,
                "count": count,
            }));
        }
    }
    quest.insert("step_progress".to_string(), Value::Array(entries));
    Ok(())
}
