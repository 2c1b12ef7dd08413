//! Quest Catalog
//!
//! Loads and validates quest definitions from TOML. The catalog is built once
//! and never mutated; trackers share it through an `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};

use super::definition::{QuestDefinition, RawQuestFile};
use super::error::CatalogError;

/// Quest files shipped with the engine, in declaration order
const BUILTIN_QUESTS: &[(&str, &str)] = &[
    ("welcome_duckling.toml", include_str!("../../data/quests/welcome_duckling.toml")),
    ("daily_feeding.toml", include_str!("../../data/quests/daily_feeding.toml")),
    ("pond_explorer.toml", include_str!("../../data/quests/pond_explorer.toml")),
    ("green_thumb.toml", include_str!("../../data/quests/green_thumb.toml")),
    ("gone_fishing.toml", include_str!("../../data/quests/gone_fishing.toml")),
    ("master_caretaker.toml", include_str!("../../data/quests/master_caretaker.toml")),
    ("moonlit_secret.toml", include_str!("../../data/quests/moonlit_secret.toml")),
    ("harvest_festival.toml", include_str!("../../data/quests/harvest_festival.toml")),
];

static BUILTIN: OnceLock<Arc<QuestCatalog>> = OnceLock::new();

/// Immutable registry of quest definitions
#[derive(Debug)]
pub struct QuestCatalog {
    /// Definitions in declaration order
    quests: Vec<QuestDefinition>,
    /// quest_id -> index into `quests`
    index: HashMap<String, usize>,
}

impl QuestCatalog {
    /// Build a catalog from already-resolved definitions
    pub fn from_definitions(definitions: Vec<QuestDefinition>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(definitions.len());

        for (i, quest) in definitions.iter().enumerate() {
            quest.validate()?;
            if index.insert(quest.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateQuest(quest.id.clone()));
            }
        }

        let catalog = Self { quests: definitions, index };
        catalog.check_prerequisites();
        info!("Loaded {} quest definitions", catalog.len());
        Ok(catalog)
    }

    /// Build a catalog from `(origin, toml)` pairs, keeping their order
    pub fn from_toml_sources<'a, I>(sources: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let definitions = sources
            .into_iter()
            .map(|(origin, content)| Self::parse_quest(origin, content))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_definitions(definitions)
    }

    /// Load every `*.toml` quest file below `quests_dir`, sorted by path
    pub fn load_from_directory(quests_dir: &Path) -> Result<Self, CatalogError> {
        info!("Loading quests from {:?}", quests_dir);

        let mut paths = Vec::new();
        collect_quest_files(quests_dir, &mut paths)?;
        paths.sort();

        let mut definitions = Vec::with_capacity(paths.len());
        for path in &paths {
            let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            definitions.push(Self::parse_quest(&path.to_string_lossy(), &content)?);
        }

        Self::from_definitions(definitions)
    }

    /// The content shipped with the engine, built on first use
    pub fn builtin() -> Result<Arc<Self>, CatalogError> {
        if let Some(catalog) = BUILTIN.get() {
            return Ok(Arc::clone(catalog));
        }
        let catalog = Arc::new(Self::from_toml_sources(BUILTIN_QUESTS.iter().copied())?);
        Ok(Arc::clone(BUILTIN.get_or_init(|| catalog)))
    }

    fn parse_quest(origin: &str, content: &str) -> Result<QuestDefinition, CatalogError> {
        let raw: RawQuestFile = toml::from_str(content).map_err(|e| CatalogError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        let quest = QuestDefinition::from_raw(&raw.quest)?;
        debug!("Loaded quest: {} ({}) from {}", quest.name, quest.id, origin);
        Ok(quest)
    }

    /// Unknown prerequisites are not fatal, the quest just never unlocks
    fn check_prerequisites(&self) {
        for quest in &self.quests {
            for prereq in &quest.prerequisites {
                if !self.contains(prereq) {
                    warn!(
                        "Quest '{}' references non-existent prerequisite '{}'",
                        quest.id, prereq
                    );
                }
            }
        }
    }

    /// Get a quest by ID
    pub fn get(&self, quest_id: &str) -> Option<&QuestDefinition> {
        self.index.get(quest_id).map(|&i| &self.quests[i])
    }

    /// All quests in declaration order
    pub fn all(&self) -> impl Iterator<Item = &QuestDefinition> {
        self.quests.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.quests.iter().map(|q| q.id.as_str())
    }

    /// Quests that list `quest_id` as a prerequisite
    pub fn dependents_of<'a>(&'a self, quest_id: &'a str) -> impl Iterator<Item = &'a QuestDefinition> + 'a {
        self.quests.iter().filter(move |q| q.requires_quest(quest_id))
    }

    pub fn contains(&self, quest_id: &str) -> bool {
        self.index.contains_key(quest_id)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

fn collect_quest_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_quest_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}
