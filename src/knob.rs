use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// How long a pulse may run if browsing is never committed.
pub const PULSE_TIMEOUT: Duration = Duration::from_secs(30);
const PULSE_PERIOD: Duration = Duration::from_millis(50);

pub const BRIGHTNESS_STEP: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnobColor {
    Off,
    #[default]
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

impl KnobColor {
    pub const ALL: [KnobColor; 8] = [
        KnobColor::Off,
        KnobColor::Blue,
        KnobColor::Green,
        KnobColor::Cyan,
        KnobColor::Red,
        KnobColor::Magenta,
        KnobColor::Yellow,
        KnobColor::White,
    ];

    /// Red, green and blue channels on or off.
    pub fn rgb(self) -> (bool, bool, bool) {
        match self {
            KnobColor::Off => (false, false, false),
            KnobColor::Blue => (false, false, true),
            KnobColor::Green => (false, true, false),
            KnobColor::Cyan => (false, true, true),
            KnobColor::Red => (true, false, false),
            KnobColor::Magenta => (true, false, true),
            KnobColor::Yellow => (true, true, false),
            KnobColor::White => (true, true, true),
        }
    }
}

impl fmt::Display for KnobColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KnobColor::Off => "Off",
            KnobColor::Blue => "Blue",
            KnobColor::Green => "Green",
            KnobColor::Cyan => "Cyan",
            KnobColor::Red => "Red",
            KnobColor::Magenta => "Magenta",
            KnobColor::Yellow => "Yellow",
            KnobColor::White => "White",
        };
        f.write_str(name)
    }
}

impl FromStr for KnobColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnobColor::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown knob color '{s}'"))
    }
}

/// Menu items for the brightness list: 0, 10, ... 100.
pub fn brightness_levels() -> Vec<String> {
    (0..=100)
        .step_by(BRIGHTNESS_STEP as usize)
        .map(|b| b.to_string())
        .collect()
}

/// The light inside the knob. Called from the pulse worker as well as the
/// control thread.
pub trait KnobLight: Send + Sync {
    fn set_color(&self, color: KnobColor, brightness: u8);
    /// Scale the current brightness, `0.0..=1.0`.
    fn set_intensity(&self, intensity: f32);
}

/// Stand-in light for hosts without LED hardware.
pub struct LogLight;

impl KnobLight for LogLight {
    fn set_color(&self, color: KnobColor, brightness: u8) {
        let (r, g, b) = color.rgb();
        log::info!("Knob light: {color} (r={r} g={g} b={b}) at {brightness}%");
    }

    fn set_intensity(&self, intensity: f32) {
        log::trace!("Knob light intensity {intensity:.2}");
    }
}

/// Tracks pulse animations for one knob; at most one runs at a time.
pub struct PulseWorkers {
    light: Arc<dyn KnobLight>,
    workers: Vec<JoinHandle<()>>,
    timeout: Duration,
    period: Duration,
}

impl PulseWorkers {
    pub fn new(light: Arc<dyn KnobLight>) -> Self {
        Self::with_timing(light, PULSE_TIMEOUT, PULSE_PERIOD)
    }

    pub fn with_timing(light: Arc<dyn KnobLight>, timeout: Duration, period: Duration) -> Self {
        Self {
            light,
            workers: Vec::new(),
            timeout,
            period,
        }
    }

    pub fn light(&self) -> &Arc<dyn KnobLight> {
        &self.light
    }

    pub fn alive(&mut self) -> usize {
        self.workers.retain(|w| !w.is_finished());
        self.workers.len()
    }

    /// Start pulsing until `previewing` clears or the timeout passes. A no-op
    /// returning false while a worker is still alive.
    pub fn start(&mut self, previewing: Arc<AtomicBool>) -> bool {
        if self.alive() > 0 {
            return false;
        }
        let light = Arc::clone(&self.light);
        let (timeout, period) = (self.timeout, self.period);
        let spawned = std::thread::Builder::new()
            .name("knob-pulse".into())
            .spawn(move || pulse(light.as_ref(), &previewing, timeout, period));
        match spawned {
            Ok(handle) => {
                self.workers.push(handle);
                true
            }
            Err(e) => {
                log::warn!("Failed to start knob pulse: {e}");
                false
            }
        }
    }
}

fn pulse(light: &dyn KnobLight, previewing: &AtomicBool, timeout: Duration, period: Duration) {
    let started = Instant::now();
    let mut step = 0u32;
    while previewing.load(Ordering::Relaxed) {
        if started.elapsed() >= timeout {
            log::debug!("Knob pulse timed out");
            break;
        }
        let intensity = (step as f32 / std::f32::consts::TAU).cos().abs();
        light.set_intensity(intensity);
        step = step.wrapping_add(1);
        std::thread::sleep(period);
    }
    light.set_intensity(1.0);
}
