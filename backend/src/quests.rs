use std::{fs, io, path::Path};

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Quest, Waypoint};

/// Quest palette, indexed by a quest record's `questColour`.
pub const QUEST_COLOURS: [&str; 3] = ["#FDBE3D", "#EF9CA5", "#F76F1D"];

#[derive(Debug, thiserror::Error)]
pub enum QuestLoadError {
    #[error("failed to read quest file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid quest document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("quest document must be a JSON array")]
    NotAnArray,
}

/// A quest record as stored in the quest catalogue.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestRecord {
    name: String,
    description: String,
    quest_colour: usize,
    quest_icon_svg_path: String,
    progress: f64,
    locations: Vec<Waypoint>,
}

impl QuestRecord {
    fn into_quest(self) -> Option<Quest> {
        let colour = QUEST_COLOURS.get(self.quest_colour)?;
        Some(Quest {
            name: self.name,
            description: self.description,
            colour: (*colour).to_string(),
            icon: self.quest_icon_svg_path,
            progress: self.progress,
            waypoints: self.locations,
        })
    }
}

/// Parse a quest catalogue, dropping records that are malformed.
///
/// The document itself must be a JSON array; individual entries with a
/// missing or mistyped field, or an unknown colour index, are skipped.
pub fn parse_quests(json: &str) -> Result<Vec<Quest>, QuestLoadError> {
    let Value::Array(entries) = serde_json::from_str::<Value>(json)? else {
        return Err(QuestLoadError::NotAnArray);
    };

    let quests = entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, entry)| {
            match serde_json::from_value::<QuestRecord>(entry) {
                Ok(record) => {
                    let name = record.name.clone();
                    let quest = record.into_quest();
                    if quest.is_none() {
                        tracing::warn!("skipping quest {idx} ({name}): unknown colour index");
                    }
                    quest
                }
                Err(err) => {
                    tracing::warn!("skipping malformed quest {idx}: {err}");
                    None
                }
            }
        })
        .collect();

    Ok(quests)
}

/// Lenient form of [`parse_quests`]: an unreadable document yields no quests.
pub fn load_quests_from_json(json: &str) -> Vec<Quest> {
    parse_quests(json).unwrap_or_else(|err| {
        tracing::error!("error loading quests: {err}");
        Vec::new()
    })
}

/// Read a quest catalogue from disk.
///
/// Only an unreadable file is an error; the contents go through
/// [`load_quests_from_json`].
pub fn load_quests_from_path(path: impl AsRef<Path>) -> Result<Vec<Quest>, QuestLoadError> {
    let json = fs::read_to_string(path)?;
    Ok(load_quests_from_json(&json))
}
