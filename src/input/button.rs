use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::error::ControlError;

pub type PinId = u8;

/// Releases shorter than this are short presses; the bound itself is long.
pub const SHORT_PRESS_THRESHOLD: Duration = Duration::from_millis(500);

/// An independent press is ignored if the partner acted this recently.
pub const PARTNER_GUARD: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    /// Carries how long the button was held.
    LongPress(Duration),
    /// Released while its partner was held; reports the held partner.
    Combo { held: PinId },
}

#[derive(Debug, Clone)]
pub struct ButtonState {
    pin: PinId,
    is_pressed: bool,
    press_started_at: Option<Instant>,
    last_action_at: Option<Instant>,
    partner: Option<PinId>,
    config_changed: bool,
}

impl ButtonState {
    fn new(pin: PinId) -> Self {
        Self {
            pin,
            is_pressed: false,
            press_started_at: None,
            last_action_at: None,
            partner: None,
            config_changed: false,
        }
    }

    pub fn partner(&self) -> Option<PinId> {
        self.partner
    }
}

/// Every physical button, keyed by pin, with symmetric partner links.
///
/// Not reentrant: callers serialise edges (see `EdgeDispatcher`).
#[derive(Debug, Default)]
pub struct ButtonBoard {
    buttons: BTreeMap<PinId, ButtonState>,
}

impl ButtonBoard {
    pub fn new(pins: impl IntoIterator<Item = PinId>) -> Self {
        Self {
            buttons: pins.into_iter().map(|p| (p, ButtonState::new(p))).collect(),
        }
    }

    /// Link each `(pin, partner)` pair both ways. Pairs naming an unknown pin
    /// are logged and skipped; the button keeps working without combos.
    pub fn link_partners(
        &mut self,
        pairs: impl IntoIterator<Item = (PinId, PinId)>,
    ) -> Vec<ControlError> {
        let mut errors = Vec::new();
        for (pin, partner) in pairs {
            if !self.buttons.contains_key(&pin) || !self.buttons.contains_key(&partner) {
                let err = ControlError::MissingPartner { pin, partner };
                log::warn!("{err}; combos disabled for pin {pin}");
                errors.push(err);
                continue;
            }
            if pin == partner {
                log::warn!("Button on pin {pin} cannot partner with itself");
                continue;
            }
            let existing = (self.buttons[&pin].partner, self.buttons[&partner].partner);
            match existing {
                (None, None) => {}
                (Some(a), Some(b)) if a == partner && b == pin => continue,
                _ => {
                    log::warn!(
                        "Pins {pin} and {partner} are already paired elsewhere; ignoring this pairing"
                    );
                    continue;
                }
            }
            if let Some(b) = self.buttons.get_mut(&pin) {
                b.partner = Some(partner);
            }
            if let Some(b) = self.buttons.get_mut(&partner) {
                b.partner = Some(pin);
            }
        }
        errors
    }

    pub fn get(&self, pin: PinId) -> Option<&ButtonState> {
        self.buttons.get(&pin)
    }

    pub fn pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.buttons.keys().copied()
    }

    /// Feed one edge. `released` is the latched pin level: low while the
    /// footswitch is down, high once it is let go.
    pub fn on_edge(&mut self, pin: PinId, released: bool, now: Instant) -> Option<ButtonEvent> {
        let Some(state) = self.buttons.get_mut(&pin) else {
            log::warn!("Edge on unconfigured pin {pin}");
            return None;
        };

        if !released {
            state.is_pressed = true;
            state.press_started_at = Some(now);
            return None;
        }

        if !state.is_pressed {
            log::debug!("Pin {pin}: release without a press, ignored");
            return None;
        }
        state.is_pressed = false;
        let held_for = state
            .press_started_at
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        let partner_pin = state.partner;

        let partner_held = partner_pin
            .and_then(|p| self.buttons.get(&p))
            .is_some_and(|p| p.is_pressed);
        if let Some(held) = partner_pin.filter(|_| partner_held) {
            // this release is the one an earlier combo was waiting for
            if let Some(state) = self.buttons.get_mut(&pin) {
                state.config_changed = false;
            }
            if let Some(partner) = self.buttons.get_mut(&held) {
                partner.config_changed = true;
            }
            log::info!("Pin {pin}: combo with held pin {held}");
            return Some(ButtonEvent::Combo { held });
        }

        let partner_last_action = partner_pin
            .and_then(|p| self.buttons.get(&p))
            .and_then(|p| p.last_action_at);

        let Some(state) = self.buttons.get_mut(&pin) else {
            return None;
        };
        if state.config_changed {
            state.config_changed = false;
            log::debug!("Pin {pin}: release consumed by earlier combo");
            return None;
        }
        if let Some(t) = partner_last_action {
            let since = now.saturating_duration_since(t);
            if since < PARTNER_GUARD {
                log::debug!("Pin {pin}: ignored, partner acted {since:?} ago");
                return None;
            }
        }

        state.last_action_at = Some(now);
        let event = if held_for < SHORT_PRESS_THRESHOLD {
            ButtonEvent::ShortPress
        } else {
            ButtonEvent::LongPress(held_for)
        };
        log::debug!("Pin {pin}: {event:?}");
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn tap(board: &mut ButtonBoard, pin: PinId, at: Instant, hold: Duration) -> Option<ButtonEvent> {
        assert_eq!(board.on_edge(pin, false, at), None);
        board.on_edge(pin, true, at + hold)
    }

    #[test]
    fn duration_thresholds_without_partner() {
        let mut board = ButtonBoard::new([1]);
        let t0 = Instant::now();
        assert_eq!(tap(&mut board, 1, t0, ms(490)), Some(ButtonEvent::ShortPress));
        assert_eq!(
            tap(&mut board, 1, t0 + ms(1000), ms(510)),
            Some(ButtonEvent::LongPress(ms(510)))
        );
        assert_eq!(
            tap(&mut board, 1, t0 + ms(2000), ms(500)),
            Some(ButtonEvent::LongPress(ms(500)))
        );
    }

    #[test]
    fn partners_are_symmetric() {
        let mut board = ButtonBoard::new([0, 8]);
        assert!(board.link_partners([(0, 8)]).is_empty());
        assert_eq!(board.get(0).and_then(|b| b.partner()), Some(8));
        assert_eq!(board.get(8).and_then(|b| b.partner()), Some(0));
        // the reverse declaration is accepted silently
        assert!(board.link_partners([(8, 0)]).is_empty());
    }

    #[test]
    fn missing_partner_degrades() {
        let mut board = ButtonBoard::new([0]);
        let errors = board.link_partners([(0, 9)]);
        assert!(matches!(
            errors.as_slice(),
            [ControlError::MissingPartner { pin: 0, partner: 9 }]
        ));
        assert_eq!(board.get(0).and_then(|b| b.partner()), None);
        assert_eq!(
            tap(&mut board, 0, Instant::now(), ms(100)),
            Some(ButtonEvent::ShortPress)
        );
    }

    #[test]
    fn conflicting_pairing_is_ignored() {
        let mut board = ButtonBoard::new([0, 1, 2]);
        board.link_partners([(0, 1), (2, 1)]);
        assert_eq!(board.get(1).and_then(|b| b.partner()), Some(0));
        assert_eq!(board.get(2).and_then(|b| b.partner()), None);
    }

    #[test]
    fn combo_reports_held_partner_once() {
        let mut board = ButtonBoard::new([0, 8]);
        board.link_partners([(0, 8)]);
        let t0 = Instant::now();

        // hold B (8), tap A (0)
        assert_eq!(board.on_edge(8, false, t0), None);
        assert_eq!(board.on_edge(0, false, t0 + ms(100)), None);
        assert_eq!(
            board.on_edge(0, true, t0 + ms(200)),
            Some(ButtonEvent::Combo { held: 8 })
        );
        // releasing B is consumed by the combo
        assert_eq!(board.on_edge(8, true, t0 + ms(900)), None);

        // B works on its own again afterwards
        assert_eq!(
            tap(&mut board, 8, t0 + ms(2000), ms(100)),
            Some(ButtonEvent::ShortPress)
        );
    }

    #[test]
    fn combo_completed_by_held_switch_clears_its_pending_release() {
        let mut board = ButtonBoard::new([0, 8]);
        board.link_partners([(0, 8)]);
        let t0 = Instant::now();

        // hold B, tap A
        assert_eq!(board.on_edge(8, false, t0), None);
        assert_eq!(
            tap(&mut board, 0, t0 + ms(100), ms(100)),
            Some(ButtonEvent::Combo { held: 8 })
        );
        // press A again and let go of B first
        assert_eq!(board.on_edge(0, false, t0 + ms(400)), None);
        assert_eq!(
            board.on_edge(8, true, t0 + ms(600)),
            Some(ButtonEvent::Combo { held: 0 })
        );
        assert_eq!(board.on_edge(0, true, t0 + ms(800)), None);

        // neither switch is left swallowing its next tap
        assert_eq!(
            tap(&mut board, 8, t0 + ms(3000), ms(100)),
            Some(ButtonEvent::ShortPress)
        );
        assert_eq!(
            tap(&mut board, 0, t0 + ms(4000), ms(100)),
            Some(ButtonEvent::ShortPress)
        );
    }

    #[test]
    fn repeated_combo_while_holding() {
        let mut board = ButtonBoard::new([0, 8]);
        board.link_partners([(0, 8)]);
        let t0 = Instant::now();
        board.on_edge(8, false, t0);
        assert_eq!(
            tap(&mut board, 0, t0 + ms(100), ms(50)),
            Some(ButtonEvent::Combo { held: 8 })
        );
        assert_eq!(
            tap(&mut board, 0, t0 + ms(400), ms(50)),
            Some(ButtonEvent::Combo { held: 8 })
        );
        assert_eq!(board.on_edge(8, true, t0 + ms(800)), None);
    }

    #[test]
    fn partner_guard_suppresses_quick_follow_up() {
        let mut board = ButtonBoard::new([0, 8]);
        board.link_partners([(0, 8)]);
        let t0 = Instant::now();
        assert_eq!(tap(&mut board, 0, t0, ms(100)), Some(ButtonEvent::ShortPress));
        // partner released 200ms after A's action
        assert_eq!(tap(&mut board, 8, t0 + ms(150), ms(150)), None);
        // released exactly 250ms after A's action it counts again
        assert_eq!(
            tap(&mut board, 8, t0 + ms(300), ms(50)),
            Some(ButtonEvent::ShortPress)
        );
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut board = ButtonBoard::new([3]);
        assert_eq!(board.on_edge(3, true, Instant::now()), None);
    }

    #[test]
    fn unknown_pin_is_ignored() {
        let mut board = ButtonBoard::new([3]);
        assert_eq!(board.on_edge(4, false, Instant::now()), None);
    }
}
