use std::collections::BTreeMap;

use crossbeam_channel::Sender;

use super::command::{Choices, Command, PedalConfig};
use super::{CommandInfo, PedalControl};
use crate::error::ControlError;
use crate::midi::MidiMessage;
use crate::setlist::Value;

const ENGAGE: &str = "Engage";
const BYPASS: &str = "Bypass";
const PRESET: &str = "Preset";
const SETTING: &str = "Setting";

/// A pedal driven over MIDI from its TOML definition.
///
/// Well-known command names carry the part-load operations: `Engage` (a
/// toggle, or a fixed value paired with `Bypass`), `Preset` and `Setting`.
/// Part params name any other command directly.
pub struct MidiPedal {
    name: String,
    channel: u8,
    commands: Vec<(String, Command)>,
    tx: Sender<MidiMessage>,
}

impl MidiPedal {
    /// Validate every command up front; one bad command rejects the pedal.
    pub fn new(
        config: PedalConfig,
        channel: Option<u8>,
        tx: Sender<MidiMessage>,
    ) -> Result<Self, ControlError> {
        let commands = config
            .commands
            .iter()
            .map(|(label, spec)| Ok((label.clone(), spec.validate(&config.name, label)?)))
            .collect::<Result<Vec<_>, ControlError>>()?;
        let channel = channel.unwrap_or(config.channel);
        if !(1..=16).contains(&channel) {
            return Err(ControlError::InvalidCommand {
                pedal: config.name,
                command: "channel".into(),
                reason: format!("{channel} outside 1..=16"),
            });
        }
        Ok(Self {
            name: config.name,
            channel,
            commands,
            tx,
        })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    fn find(&self, label: &str) -> Option<usize> {
        self.commands.iter().position(|(name, _)| name == label)
    }

    fn send(&self, index: usize, value: Option<&Value>) -> anyhow::Result<()> {
        let (label, command) = &self.commands[index];
        let messages = command
            .messages(self.channel, value)
            .map_err(|reason| anyhow::anyhow!("{}: {label}: {reason}", self.name))?;
        for message in messages {
            self.tx
                .send(message)
                .map_err(|_| anyhow::anyhow!("MIDI output channel closed"))?;
        }
        match value {
            Some(v) => log::info!("{}: {label} = {v}", self.name),
            None => log::info!("{}: {label}", self.name),
        }
        Ok(())
    }

    fn send_named(&self, label: &str, value: Option<&Value>) -> anyhow::Result<()> {
        match self.find(label) {
            Some(index) => self.send(index, value),
            None => {
                log::warn!("{} has no '{label}' command", self.name);
                Ok(())
            }
        }
    }

    fn engage(&self, on: bool) -> anyhow::Result<()> {
        let toggle = self.find(ENGAGE).filter(|&i| {
            matches!(
                self.commands[i].1,
                Command::Send {
                    choices: Choices::Toggle { .. },
                    ..
                }
            )
        });
        match (toggle, on) {
            (Some(i), true) => self.send(i, Some(&Value::Label("on".into()))),
            (Some(i), false) => self.send(i, Some(&Value::Label("off".into()))),
            (None, true) => self.send_named(ENGAGE, None),
            (None, false) => self.send_named(BYPASS, None),
        }
    }
}

impl PedalControl for MidiPedal {
    fn name(&self) -> &str {
        &self.name
    }

    fn turn_on(&mut self) -> anyhow::Result<()> {
        self.engage(true)
    }

    fn turn_off(&mut self) -> anyhow::Result<()> {
        self.engage(false)
    }

    fn set_preset(&mut self, preset: &Value) -> anyhow::Result<()> {
        self.send_named(PRESET, Some(preset))
    }

    fn set_params(&mut self, params: &BTreeMap<String, Value>) -> anyhow::Result<()> {
        for (label, value) in params {
            self.send_named(label, Some(value))?;
        }
        Ok(())
    }

    fn set_setting(&mut self, setting: &Value) -> anyhow::Result<()> {
        if self.find(SETTING).is_none() {
            log::info!("{}: setting {setting} (no MIDI mapping)", self.name);
            return Ok(());
        }
        self.send_named(SETTING, Some(setting))
    }

    fn commands(&self) -> Vec<CommandInfo> {
        self.commands
            .iter()
            .map(|(name, command)| CommandInfo {
                name: name.clone(),
                choices: command.choice_labels(),
            })
            .collect()
    }

    fn execute(&mut self, command: usize, value: Option<&Value>) -> anyhow::Result<()> {
        if command >= self.commands.len() {
            anyhow::bail!("{}: no command #{command}", self.name);
        }
        self.send(command, value)
    }
}
