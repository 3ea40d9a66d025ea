use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::error::ControlError;
use crate::midi::MidiMessage;
use crate::setlist::Value;

/// `pedals/<name>.toml` as written by hand.
#[derive(Debug, Deserialize)]
pub struct PedalConfig {
    pub name: String,
    #[serde(default = "default_channel")]
    pub channel: u8,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSpec>,
}

fn default_channel() -> u8 {
    1
}

pub fn load(path: &Path) -> anyhow::Result<PedalConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading pedal definition {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// One `[commands.<label>]` table before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
    pub cc: Option<u8>,
    pub program_change: bool,
    pub multi: Vec<Step>,
    pub value: Option<u8>,
    pub min: Option<u8>,
    pub max: Option<u8>,
    pub on: Option<u8>,
    pub off: Option<u8>,
    pub options: BTreeMap<String, u8>,
}

/// A fixed control change sent as part of a multi-step command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Step {
    pub cc: u8,
    pub value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    ControlChange(u8),
    ProgramChange,
}

/// The values a command accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choices {
    Fixed(u8),
    Range { min: u8, max: u8 },
    Toggle { on: u8, off: u8 },
    Named(Vec<(String, u8)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send { kind: MessageKind, choices: Choices },
    Multi(Vec<Step>),
}

impl CommandSpec {
    pub fn validate(&self, pedal: &str, label: &str) -> Result<Command, ControlError> {
        let invalid = |reason: &str| ControlError::InvalidCommand {
            pedal: pedal.to_string(),
            command: label.to_string(),
            reason: reason.to_string(),
        };

        if !self.multi.is_empty() {
            if self.cc.is_some() || self.program_change {
                return Err(invalid("multi cannot be combined with cc or program_change"));
            }
            if self.multi.iter().any(|s| s.cc > 127 || s.value > 127) {
                return Err(invalid("multi step out of 0..=127"));
            }
            return Ok(Command::Multi(self.multi.clone()));
        }

        let kind = match (self.cc, self.program_change) {
            (Some(_), true) => return Err(invalid("both cc and program_change given")),
            (Some(cc), false) if cc <= 127 => MessageKind::ControlChange(cc),
            (Some(_), false) => return Err(invalid("cc out of 0..=127")),
            (None, true) => MessageKind::ProgramChange,
            (None, false) => return Err(invalid("needs cc, program_change or multi")),
        };

        let mut choices = Vec::new();
        if let Some(v) = self.value {
            choices.push(Choices::Fixed(v));
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) if min <= max => choices.push(Choices::Range { min, max }),
            (None, None) => {}
            _ => return Err(invalid("min and max must both be given, min <= max")),
        }
        match (self.on, self.off) {
            (Some(on), Some(off)) => choices.push(Choices::Toggle { on, off }),
            (None, None) => {}
            _ => return Err(invalid("on and off must both be given")),
        }
        if !self.options.is_empty() {
            let mut named: Vec<(String, u8)> =
                self.options.iter().map(|(k, v)| (k.clone(), *v)).collect();
            named.sort_by_key(|(_, v)| *v);
            choices.push(Choices::Named(named));
        }

        let choices = match choices.len() {
            1 => choices.remove(0),
            0 => return Err(invalid("needs one of value, min/max, on/off or options")),
            _ => return Err(invalid("only one of value, min/max, on/off or options")),
        };
        if choices.values().any(|v| v > 127) {
            return Err(invalid("value out of 0..=127"));
        }
        Ok(Command::Send { kind, choices })
    }
}

impl Choices {
    fn values(&self) -> Box<dyn Iterator<Item = u8> + '_> {
        match self {
            Choices::Fixed(v) => Box::new(std::iter::once(*v)),
            Choices::Range { min, max } => Box::new([*min, *max].into_iter()),
            Choices::Toggle { on, off } => Box::new([*on, *off].into_iter()),
            Choices::Named(named) => Box::new(named.iter().map(|(_, v)| *v)),
        }
    }
}

impl Command {
    /// Menu items offered for this command. Empty when it takes no value,
    /// so it runs straight from its menu node.
    pub fn choice_labels(&self) -> Vec<String> {
        match self {
            Command::Multi(_) => Vec::new(),
            Command::Send { choices, .. } => match choices {
                Choices::Fixed(_) => Vec::new(),
                Choices::Range { min, max } => (*min..=*max).map(|v| v.to_string()).collect(),
                Choices::Toggle { .. } => vec!["on".to_string(), "off".to_string()],
                Choices::Named(named) => named.iter().map(|(k, _)| k.clone()).collect(),
            },
        }
    }

    /// Build the messages for `value`, which must match the command's choices.
    pub fn messages(
        &self,
        channel: u8,
        value: Option<&Value>,
    ) -> Result<Vec<MidiMessage>, String> {
        let (kind, choices) = match self {
            Command::Multi(steps) => {
                return Ok(steps
                    .iter()
                    .map(|s| MidiMessage::ControlChange {
                        channel,
                        controller: s.cc,
                        value: s.value,
                    })
                    .collect());
            }
            Command::Send { kind, choices } => (kind, choices),
        };
        let data = resolve(choices, value)?;
        let message = match *kind {
            MessageKind::ControlChange(controller) => MidiMessage::ControlChange {
                channel,
                controller,
                value: data,
            },
            MessageKind::ProgramChange => MidiMessage::ProgramChange {
                channel,
                program: data,
            },
        };
        Ok(vec![message])
    }
}

fn resolve(choices: &Choices, value: Option<&Value>) -> Result<u8, String> {
    match (choices, value) {
        (Choices::Fixed(v), _) => Ok(*v),
        (_, None) => Err("a value is required".to_string()),
        (Choices::Range { min, max }, Some(Value::Number(n))) => {
            if (*min as i64..=*max as i64).contains(n) {
                Ok(*n as u8)
            } else {
                Err(format!("{n} outside {min}..={max}"))
            }
        }
        (Choices::Toggle { on, off }, Some(v)) => match v {
            Value::Label(s) if s.eq_ignore_ascii_case("on") => Ok(*on),
            Value::Label(s) if s.eq_ignore_ascii_case("off") => Ok(*off),
            Value::Number(1) => Ok(*on),
            Value::Number(0) => Ok(*off),
            other => Err(format!("'{other}' is not on/off")),
        },
        (Choices::Named(named), Some(Value::Label(label))) => named
            .iter()
            .find(|(k, _)| k == label)
            .map(|(_, v)| *v)
            .ok_or_else(|| format!("unknown option '{label}'")),
        (_, Some(other)) => Err(format!("'{other}' does not fit this command")),
    }
}
