pub mod command;
pub mod midi_pedal;

use std::collections::BTreeMap;

pub use midi_pedal::MidiPedal;

use crate::setlist::{Part, PedalSetting, Value};

/// A command as the menu shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: String,
    /// Item labels to pick from; empty for commands that take no value.
    pub choices: Vec<String>,
}

/// One controllable pedal. The core only knows these operations, never the
/// protocol behind them.
pub trait PedalControl: Send {
    fn name(&self) -> &str;
    fn turn_on(&mut self) -> anyhow::Result<()>;
    fn turn_off(&mut self) -> anyhow::Result<()>;
    fn set_preset(&mut self, preset: &Value) -> anyhow::Result<()>;
    fn set_params(&mut self, params: &BTreeMap<String, Value>) -> anyhow::Result<()>;
    fn set_setting(&mut self, setting: &Value) -> anyhow::Result<()>;

    fn commands(&self) -> Vec<CommandInfo>;
    fn execute(&mut self, command: usize, value: Option<&Value>) -> anyhow::Result<()>;
}

/// Every configured pedal, in configuration order.
#[derive(Default)]
pub struct PedalBoard {
    pedals: Vec<Box<dyn PedalControl>>,
}

impl PedalBoard {
    pub fn new(pedals: Vec<Box<dyn PedalControl>>) -> Self {
        Self { pedals }
    }

    pub fn len(&self) -> usize {
        self.pedals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pedals.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn PedalControl> {
        self.pedals.get(index).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut (dyn PedalControl + 'static)> {
        self.pedals.get_mut(index).map(|p| p.as_mut())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pedals.iter().map(|p| p.name())
    }

    /// Apply a part: engage state, then preset, params and extra setting.
    /// A failing pedal is logged and the rest still load.
    pub fn load_part(&mut self, part: &Part) {
        log::info!("Loading part '{}'", part.name);
        for pedal in &mut self.pedals {
            let Some(setting) = part.pedals.get(pedal.name()) else {
                log::debug!("Part '{}' leaves {} untouched", part.name, pedal.name());
                continue;
            };
            if let Err(e) = apply(pedal.as_mut(), setting) {
                log::warn!("Pedal {}: {e:#}", pedal.name());
            }
        }
        for name in part.pedals.keys() {
            if !self.pedals.iter().any(|p| p.name() == name) {
                log::warn!("Part '{}' configures unknown pedal '{name}'", part.name);
            }
        }
    }
}

fn apply(pedal: &mut dyn PedalControl, setting: &PedalSetting) -> anyhow::Result<()> {
    if setting.engaged {
        pedal.turn_on()?;
    } else {
        pedal.turn_off()?;
    }
    if let Some(preset) = &setting.preset {
        pedal.set_preset(preset)?;
    }
    if !setting.params.is_empty() {
        pedal.set_params(&setting.params)?;
    }
    if let Some(extra) = &setting.setting {
        pedal.set_setting(extra)?;
    }
    Ok(())
}
