use std::collections::HashSet;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use super::{Direction, InputEvent, InputSource, LatchedPins, PinId};
use crate::controller::{Dpad, ExternalCommand};

/// Footswitches and knob on the computer keyboard.
///
/// Keys `1`..`9` are the footswitches in order of their number, space is
/// the knob push-button, left/right turn the knob and up/down act as a
/// d-pad. Uses the Kitty keyboard protocol for press/release detection;
/// without it every key press becomes an instant tap, so long presses and
/// combos are unavailable.
pub struct KeyboardBoard {
    footswitches: Vec<PinId>,
    knob_pin: PinId,
    held_keys: HashSet<KeyCode>,
    pins: LatchedPins,
    press_release: bool,
}

impl KeyboardBoard {
    pub fn new(footswitches: Vec<PinId>, knob_pin: PinId, press_release: bool) -> Self {
        KeyboardBoard {
            footswitches,
            knob_pin,
            held_keys: HashSet::new(),
            pins: LatchedPins::new(),
            press_release,
        }
    }

    pub fn handle_key_event(&mut self, event: KeyEvent) -> Vec<InputEvent> {
        let knob = match event.code {
            KeyCode::Left => Some(InputEvent::Turn(Direction::Ccw)),
            KeyCode::Right => Some(InputEvent::Turn(Direction::Cw)),
            KeyCode::Up => Some(InputEvent::External(ExternalCommand::Dpad(Dpad::Up))),
            KeyCode::Down => Some(InputEvent::External(ExternalCommand::Dpad(Dpad::Down))),
            _ => None,
        };
        if let Some(knob) = knob {
            return match event.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => vec![knob],
                KeyEventKind::Release => Vec::new(),
            };
        }

        let Some(pin) = self.key_to_pin(event.code) else {
            return Vec::new();
        };
        if self.pins.is_masked(pin) {
            log::debug!("Key {:?} ignored, pin {pin} masked", event.code);
            return Vec::new();
        }

        if !self.press_release {
            if event.kind != KeyEventKind::Press {
                return Vec::new();
            }
            self.pins.push(pin, false);
            self.pins.push(pin, true);
            return vec![InputEvent::Edge(pin), InputEvent::Edge(pin)];
        }

        match event.kind {
            KeyEventKind::Press => {
                // Dedup: ignore if already held
                if !self.held_keys.insert(event.code) {
                    return Vec::new();
                }
                self.pins.push(pin, false);
                vec![InputEvent::Edge(pin)]
            }
            KeyEventKind::Release => {
                if !self.held_keys.remove(&event.code) {
                    return Vec::new();
                }
                self.pins.push(pin, true);
                vec![InputEvent::Edge(pin)]
            }
            KeyEventKind::Repeat => Vec::new(),
        }
    }

    fn key_to_pin(&self, code: KeyCode) -> Option<PinId> {
        match code {
            KeyCode::Char(' ') => Some(self.knob_pin),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c.to_digit(10)? as usize - 1;
                self.footswitches.get(index).copied()
            }
            _ => None,
        }
    }
}

impl InputSource for KeyboardBoard {
    fn read_and_clear_latched(&mut self, pin: PinId) -> anyhow::Result<bool> {
        self.pins.read_and_clear_latched(pin)
    }

    fn enable(&mut self, pin: PinId) -> anyhow::Result<()> {
        self.pins.enable(pin)
    }

    fn disable(&mut self, pin: PinId) -> anyhow::Result<()> {
        self.pins.disable(pin)
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEventState, KeyModifiers};

    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn press_and_release_latch_levels() {
        let mut kb = KeyboardBoard::new(vec![0, 8], 15, true);
        assert_eq!(
            kb.handle_key_event(key(KeyCode::Char('2'), KeyEventKind::Press)),
            [InputEvent::Edge(8)]
        );
        // auto-repeat and duplicate presses are dropped
        assert!(kb.handle_key_event(key(KeyCode::Char('2'), KeyEventKind::Repeat)).is_empty());
        assert!(kb.handle_key_event(key(KeyCode::Char('2'), KeyEventKind::Press)).is_empty());
        assert_eq!(
            kb.handle_key_event(key(KeyCode::Char('2'), KeyEventKind::Release)),
            [InputEvent::Edge(8)]
        );
        assert!(!kb.read_and_clear_latched(8).unwrap());
        assert!(kb.read_and_clear_latched(8).unwrap());
    }

    #[test]
    fn space_is_the_knob_and_unmapped_keys_do_nothing() {
        let mut kb = KeyboardBoard::new(vec![0], 15, true);
        assert_eq!(
            kb.handle_key_event(key(KeyCode::Char(' '), KeyEventKind::Press)),
            [InputEvent::Edge(15)]
        );
        assert!(kb.handle_key_event(key(KeyCode::Char('5'), KeyEventKind::Press)).is_empty());
        assert!(kb.handle_key_event(key(KeyCode::Char('x'), KeyEventKind::Press)).is_empty());
    }

    #[test]
    fn arrows_turn_the_knob() {
        let mut kb = KeyboardBoard::new(vec![], 15, true);
        assert_eq!(
            kb.handle_key_event(key(KeyCode::Right, KeyEventKind::Press)),
            [InputEvent::Turn(Direction::Cw)]
        );
        assert_eq!(
            kb.handle_key_event(key(KeyCode::Left, KeyEventKind::Repeat)),
            [InputEvent::Turn(Direction::Ccw)]
        );
        assert!(kb.handle_key_event(key(KeyCode::Left, KeyEventKind::Release)).is_empty());
    }

    #[test]
    fn without_release_events_presses_are_taps() {
        let mut kb = KeyboardBoard::new(vec![3], 15, false);
        assert_eq!(
            kb.handle_key_event(key(KeyCode::Char('1'), KeyEventKind::Press)),
            [InputEvent::Edge(3), InputEvent::Edge(3)]
        );
        assert!(!kb.read_and_clear_latched(3).unwrap());
        assert!(kb.read_and_clear_latched(3).unwrap());
    }

    #[test]
    fn masked_pins_drop_keys() {
        let mut kb = KeyboardBoard::new(vec![3], 15, true);
        kb.disable(3).unwrap();
        assert!(kb.handle_key_event(key(KeyCode::Char('1'), KeyEventKind::Press)).is_empty());
        kb.enable(3).unwrap();
        assert_eq!(kb.handle_key_event(key(KeyCode::Char('1'), KeyEventKind::Press)).len(), 1);
    }
}
