use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};

use super::{Direction, InputEvent, LatchedPins, PinId};
use crate::controller::{Dpad, ExternalCommand};

/// One timed line of a replay script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptStep {
    /// Offset from the start of the replay.
    pub at: Duration,
    pub event: InputEvent,
    /// Level latched for `Edge` events: false pressed, true released.
    pub level: Option<bool>,
}

impl ScriptStep {
    /// Latch this step's level, if any, so the dispatcher can read it.
    pub fn latch(&self, pins: &mut LatchedPins) {
        if let (InputEvent::Edge(pin), Some(level)) = (&self.event, self.level) {
            pins.push(*pin, level);
        }
    }
}

/// Timed input for exercising the timing contracts without hardware.
///
/// ```text
/// # milliseconds  event
/// 0     press 15
/// 120   release 15
/// 300   quad 1 0
/// 310   quad 0 1
/// 500   turn cw
/// 900   short Song Up
/// 950   long Global
/// 1000  dpad down
/// ```
pub fn load(path: &Path) -> anyhow::Result<Vec<ScriptStep>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    parse(&text).with_context(|| format!("in {}", path.display()))
}

pub fn parse(text: &str) -> anyhow::Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    let mut last = Duration::ZERO;
    for (n, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let step = parse_line(line).with_context(|| format!("line {}: '{line}'", n + 1))?;
        if step.at < last {
            bail!("line {}: time goes backwards", n + 1);
        }
        last = step.at;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_line(line: &str) -> anyhow::Result<ScriptStep> {
    let mut words = line.split_whitespace();
    let at: u64 = words.next().unwrap_or_default().parse().context("bad timestamp")?;
    let verb = words.next().context("missing event")?;
    let rest: Vec<&str> = words.collect();

    let pin = |rest: &[&str]| -> anyhow::Result<PinId> {
        rest.first().context("missing pin")?.parse().context("bad pin")
    };
    let bit = |word: Option<&&str>| -> anyhow::Result<bool> {
        match word.copied() {
            Some("0") => Ok(false),
            Some("1") => Ok(true),
            other => bail!("expected 0 or 1, got {other:?}"),
        }
    };

    let (event, level) = match verb {
        "press" => (InputEvent::Edge(pin(&rest)?), Some(false)),
        "release" => (InputEvent::Edge(pin(&rest)?), Some(true)),
        "quad" => (
            InputEvent::Quadrature {
                a: bit(rest.first())?,
                b: bit(rest.get(1))?,
            },
            None,
        ),
        "turn" => {
            let direction = match rest.first().copied() {
                Some("cw") => Direction::Cw,
                Some("ccw") => Direction::Ccw,
                other => bail!("expected cw or ccw, got {other:?}"),
            };
            (InputEvent::Turn(direction), None)
        }
        "short" | "long" => {
            if rest.is_empty() {
                bail!("missing action label");
            }
            let label = rest.join(" ");
            let command = if verb == "short" {
                ExternalCommand::Short(label)
            } else {
                ExternalCommand::Long(label)
            };
            (InputEvent::External(command), None)
        }
        "dpad" => {
            let pad = match rest.first().copied() {
                Some("up") => Dpad::Up,
                Some("down") => Dpad::Down,
                Some("cw") => Dpad::Cw,
                Some("ccw") => Dpad::Ccw,
                other => bail!("expected up, down, cw or ccw, got {other:?}"),
            };
            (InputEvent::External(ExternalCommand::Dpad(pad)), None)
        }
        other => bail!("unknown event '{other}'"),
    };
    Ok(ScriptStep {
        at: Duration::from_millis(at),
        event,
        level,
    })
}
