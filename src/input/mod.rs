pub mod button;
pub mod keyboard;
pub mod rotary;
pub mod script;

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

pub use button::{ButtonBoard, ButtonEvent, PinId};
pub use rotary::{Direction, RotaryKnob};

use crate::controller::ExternalCommand;

/// Where pin levels come from: a port expander on the real board, the
/// keyboard or a replay script otherwise.
pub trait InputSource {
    /// Level captured when the edge fired; reading clears the latch.
    fn read_and_clear_latched(&mut self, pin: PinId) -> anyhow::Result<bool>;
    fn enable(&mut self, pin: PinId) -> anyhow::Result<()>;
    fn disable(&mut self, pin: PinId) -> anyhow::Result<()>;
}

/// Pin levels queued in edge order, for sources without a latching port
/// expander (keyboard, replay scripts).
#[derive(Debug, Default)]
pub struct LatchedPins {
    levels: HashMap<PinId, VecDeque<bool>>,
    masked: HashSet<PinId>,
}

impl LatchedPins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pin: PinId, released: bool) {
        self.levels.entry(pin).or_default().push_back(released);
    }

    pub fn is_masked(&self, pin: PinId) -> bool {
        self.masked.contains(&pin)
    }
}

impl InputSource for LatchedPins {
    fn read_and_clear_latched(&mut self, pin: PinId) -> anyhow::Result<bool> {
        self.levels
            .get_mut(&pin)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| anyhow::anyhow!("no level latched on pin {pin}"))
    }

    fn enable(&mut self, pin: PinId) -> anyhow::Result<()> {
        self.masked.remove(&pin);
        Ok(())
    }

    fn disable(&mut self, pin: PinId) -> anyhow::Result<()> {
        self.masked.insert(pin);
        Ok(())
    }
}

/// Raw notifications, in arrival order, for the single consumer thread.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// An edge fired on a button pin; the level is read from the source.
    Edge(PinId),
    /// A pair of quadrature samples from the knob.
    Quadrature { a: bool, b: bool },
    /// An already decoded knob turn (d-pad style drivers).
    Turn(Direction),
    External(ExternalCommand),
}

/// Runs the short critical section for one button edge: mask the pin, read
/// the latched level, classify, unmask.
pub struct EdgeDispatcher {
    board: ButtonBoard,
}

impl EdgeDispatcher {
    pub fn new(board: ButtonBoard) -> Self {
        Self { board }
    }

    pub fn on_edge(
        &mut self,
        source: &mut dyn InputSource,
        pin: PinId,
        now: Instant,
    ) -> anyhow::Result<Option<ButtonEvent>> {
        source.disable(pin)?;
        let level = source.read_and_clear_latched(pin);
        let enabled = source.enable(pin);
        let event = self.board.on_edge(pin, level?, now);
        enabled?;
        Ok(event)
    }
}
