use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::controller::{BoardAction, Mode};
use crate::error::ControlError;
use crate::input::PinId;
use crate::knob::KnobColor;

/// The controller file, `conf/stomp.toml` by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub buttons: Vec<ButtonConfig>,
    pub knob: KnobConfig,
    pub current: Current,
    pub midi: MidiConfig,
    pub api: ApiConfig,
    pub power: PowerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub sets: PathBuf,
    pub songs: PathBuf,
    pub pedals: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            sets: "sets".into(),
            songs: "songs".into(),
            pedals: "pedals".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub pin: PinId,
    pub number: u8,
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_press: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_func: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<PinId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnobConfig {
    pub push_pin: PinId,
    pub color: KnobColor,
    pub brightness: u8,
}

impl Default for KnobConfig {
    fn default() -> Self {
        Self {
            push_pin: 15,
            color: KnobColor::Blue,
            brightness: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Current {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setlist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    pub pedals: Vec<PedalEntry>,
}

/// A pedal on the board; its commands come from `pedals/<name>.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PedalEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(default)]
    pub engaged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<crate::setlist::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub buttons_locked: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

/// Footswitch actions after label parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Footswitch {
    pub pin: PinId,
    pub number: u8,
    pub function: BoardAction,
    pub long_press: Option<BoardAction>,
    pub partner_func: Option<BoardAction>,
}

impl ButtonConfig {
    pub fn parse(&self) -> Result<Footswitch, ControlError> {
        let parse = |label: &Option<String>| {
            label
                .as_deref()
                .map(str::parse::<BoardAction>)
                .transpose()
        };
        Ok(Footswitch {
            pin: self.pin,
            number: self.number,
            function: self.function.parse()?,
            long_press: parse(&self.long_press)?,
            partner_func: parse(&self.partner_func)?,
        })
    }
}

impl Config {
    pub fn footswitches(&self) -> Result<Vec<Footswitch>, ControlError> {
        self.buttons.iter().map(ButtonConfig::parse).collect()
    }

    /// Partner pairs as declared, for `ButtonBoard::link_partners`.
    pub fn partner_pairs(&self) -> Vec<(PinId, PinId)> {
        self.buttons
            .iter()
            .filter_map(|b| b.partner.map(|p| (b.pin, p)))
            .collect()
    }
}

pub fn load(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    config.footswitches()?;
    Ok(config)
}

pub fn save(path: &Path, config: &Config) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("writing config {}", path.display()))
}

/// Resolve a configured directory relative to the config file's directory.
pub fn resolve(dir: &Path, config_path: &Path) -> PathBuf {
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(dir)
}
