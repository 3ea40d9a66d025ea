use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// A pedal setting value: either a raw number or a label the pedal
/// definition maps to a number (`"Hall"`, `"on"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(i64),
    Label(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Label(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Label(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PedalSetting {
    pub engaged: bool,
    pub preset: Option<Value>,
    pub params: BTreeMap<String, Value>,
    pub setting: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Part {
    pub name: String,
    #[serde(default)]
    pub pedals: BTreeMap<String, PedalSetting>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Song {
    pub name: String,
    #[serde(default = "default_tempo")]
    pub tempo: f32,
    #[serde(default)]
    pub parts: Vec<Part>,
}

fn default_tempo() -> f32 {
    120.0
}

/// On-disk shape of `sets/<name>.toml`: songs are referenced by file stem.
/// The setlist itself is known by its own file stem; `title` is cosmetic.
#[derive(Debug, Deserialize)]
pub struct SetlistFile {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub songs: Vec<String>,
}

/// An ordered collection of songs, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Setlist {
    pub name: String,
    pub songs: Vec<Song>,
}

impl Setlist {
    /// Every setlist needs a song, and every song a part, before it can be
    /// browsed.
    pub fn new(name: impl Into<String>, songs: Vec<Song>) -> Result<Self, ControlError> {
        let name = name.into();
        if songs.is_empty() {
            return Err(ControlError::EmptySetlist(name));
        }
        if let Some(song) = songs.iter().find(|s| s.parts.is_empty()) {
            log::warn!("Song '{}' in setlist '{name}' has no parts", song.name);
            return Err(ControlError::EmptySetlist(name));
        }
        Ok(Self { name, songs })
    }

    pub fn song_index(&self, name: &str) -> Option<usize> {
        self.songs.iter().position(|s| s.name == name)
    }
}

impl Song {
    pub fn part_index(&self, name: &str) -> Option<usize> {
        self.parts.iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
pub(crate) fn song(name: &str, parts: &[&str]) -> Song {
    Song {
        name: name.to_string(),
        tempo: 120.0,
        parts: parts
            .iter()
            .map(|p| Part {
                name: p.to_string(),
                pedals: BTreeMap::new(),
            })
            .collect(),
    }
}
