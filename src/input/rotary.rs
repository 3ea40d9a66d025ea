use std::time::{Duration, Instant};

/// Minimum spacing between two accepted knob turns.
pub const ROTARY_REFRACTORY: Duration = Duration::from_millis(160);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Cw,
    Ccw,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Cw => Direction::Ccw,
            Direction::Ccw => Direction::Cw,
        }
    }
}

/// Turns pairs of quadrature pin samples into knob directions.
///
/// Phases 1 and 3 are rest states and only get recorded; phase 2 resolves a
/// direction from whichever rest state preceded it. A direction equal to the
/// previously emitted one is flipped, which favours alternation over repeats
/// to ride out chattering contacts.
#[derive(Debug, Default, Clone)]
pub struct RotaryDecoder {
    last_valid_phase: u8,
    last_direction: Option<Direction>,
}

impl RotaryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, a: bool, b: bool) -> Option<Direction> {
        let phase = (b as u8) * 2 + a as u8;
        match phase {
            1 | 3 => {
                self.last_valid_phase = phase;
                None
            }
            2 => {
                let candidate = match self.last_valid_phase {
                    1 => Direction::Cw,
                    3 => Direction::Ccw,
                    _ => return None,
                };
                let emitted = if self.last_direction == Some(candidate) {
                    candidate.opposite()
                } else {
                    candidate
                };
                self.last_direction = Some(emitted);
                Some(emitted)
            }
            _ => None,
        }
    }
}

/// A physical knob: decoder plus the refractory window between turns.
#[derive(Debug, Default)]
pub struct RotaryKnob {
    decoder: RotaryDecoder,
    last_turn_at: Option<Instant>,
}

impl RotaryKnob {
    pub fn new() -> Self {
        Self {
            decoder: RotaryDecoder::new(),
            last_turn_at: None,
        }
    }

    pub fn sample(&mut self, a: bool, b: bool, now: Instant) -> Option<Direction> {
        let direction = self.decoder.decode(a, b)?;
        if let Some(last) = self.last_turn_at {
            if now.saturating_duration_since(last) < ROTARY_REFRACTORY {
                log::trace!("Knob: dropped {direction:?} inside refractory window");
                return None;
            }
        }
        self.last_turn_at = Some(now);
        Some(direction)
    }
}
