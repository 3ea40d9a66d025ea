use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use crate::config::{self, Config};
use crate::controller::{Controller, Outputs};
use crate::display::StatusDisplay;
use crate::input::script::ScriptStep;
use crate::input::{
    ButtonBoard, EdgeDispatcher, InputEvent, InputSource, LatchedPins, RotaryKnob,
};
use crate::knob::LogLight;
use crate::midi::{MidiMessage, MidiOutputThread};
use crate::pedal::{self, MidiPedal, PedalBoard, PedalControl};
use crate::persistence::{FileStore, Persistence};

/// The single consumer of input events: button edges, knob samples and
/// external commands are applied one at a time, in arrival order.
pub struct App {
    dispatcher: EdgeDispatcher,
    knob: RotaryKnob,
    controller: Controller,
}

impl App {
    pub fn new(dispatcher: EdgeDispatcher, controller: Controller) -> Self {
        Self {
            dispatcher,
            knob: RotaryKnob::new(),
            controller,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn start(&mut self) {
        self.controller.start();
    }

    pub fn process(
        &mut self,
        source: &mut dyn InputSource,
        event: InputEvent,
        now: Instant,
    ) -> anyhow::Result<()> {
        match event {
            InputEvent::Edge(pin) => {
                if let Some(button) = self.dispatcher.on_edge(source, pin, now)? {
                    self.controller.handle_button_event(pin, button);
                }
            }
            InputEvent::Quadrature { a, b } => {
                if let Some(direction) = self.knob.sample(a, b, now) {
                    self.controller.handle_rotary_event(direction);
                }
            }
            InputEvent::Turn(direction) => self.controller.handle_rotary_event(direction),
            InputEvent::External(command) => {
                if let Err(e) = self.controller.handle_external_command(&command) {
                    log::warn!("External command {command:?}: {e}");
                }
            }
        }
        log::trace!("Menu state {:?}", self.controller.state());
        Ok(())
    }

    /// Feed a parsed script with its own clock. Stops early on power off.
    pub fn replay(&mut self, steps: &[ScriptStep], t0: Instant) -> anyhow::Result<()> {
        let mut pins = LatchedPins::new();
        for step in steps {
            step.latch(&mut pins);
            self.process(&mut pins, step.event.clone(), t0 + step.at)
                .with_context(|| format!("at {:?}", step.at))?;
            if self.controller.power_off_requested() {
                break;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MidiOptions {
    /// Overrides `[midi] port`.
    pub port: Option<String>,
    pub dry_run: bool,
}

/// A wired-up controller plus the MIDI thread it feeds.
pub struct Runtime {
    pub app: App,
    pub config: Config,
    pub midi: MidiOutputThread,
}

/// Load everything the controller file references and wire it together.
pub fn build(
    config_path: &Path,
    display: Box<dyn StatusDisplay>,
    midi: &MidiOptions,
) -> anyhow::Result<Runtime> {
    let config = config::load(config_path)?;
    let store = FileStore::new(config_path, &config);

    let setlist_name = match &config.current.setlist {
        Some(name) => name.clone(),
        None => store
            .list_setlists()?
            .into_iter()
            .next()
            .context("no setlists found")?,
    };
    let setlist = store.load_setlist(&setlist_name)?;

    let port = midi.port.as_deref().or(config.midi.port.as_deref());
    let (midi_thread, tx) = MidiOutputThread::start(port, midi.dry_run)?;
    let pedals = load_pedals(config_path, &config, &tx)?;
    drop(tx);

    let footswitches = config.footswitches()?;
    let mut board = ButtonBoard::new(
        footswitches
            .iter()
            .map(|f| f.pin)
            .chain(std::iter::once(config.knob.push_pin)),
    );
    board.link_partners(config.partner_pairs());
    for pin in board.pins() {
        match board.get(pin).and_then(|b| b.partner()) {
            Some(partner) => log::debug!("Pin {pin}: partner pin {partner}"),
            None => log::debug!("Pin {pin}: no partner"),
        }
    }
    if pedals.is_empty() {
        log::warn!("No pedals configured; parts will only change the display");
    }

    let controller = Controller::new(
        &config,
        setlist,
        Outputs {
            pedals,
            display,
            store: Box::new(store),
            light: Arc::new(LogLight),
        },
    )?;
    log::info!(
        "Setlist '{setlist_name}' ready in {} mode",
        controller.mode()
    );
    Ok(Runtime {
        app: App::new(EdgeDispatcher::new(board), controller),
        config,
        midi: midi_thread,
    })
}

fn load_pedals(
    config_path: &Path,
    config: &Config,
    tx: &crossbeam_channel::Sender<MidiMessage>,
) -> anyhow::Result<PedalBoard> {
    let dir = config::resolve(&config.paths.pedals, config_path);
    let mut pedals: Vec<Box<dyn PedalControl>> = Vec::new();
    for entry in &config.midi.pedals {
        let definition = pedal::command::load(&dir.join(format!("{}.toml", entry.name)))?;
        let mut midi_pedal = MidiPedal::new(definition, entry.channel, tx.clone())?;
        let initial = if entry.engaged {
            midi_pedal.turn_on()
        } else {
            midi_pedal.turn_off()
        };
        if let Err(e) = initial.and_then(|_| match &entry.preset {
            Some(preset) => midi_pedal.set_preset(preset),
            None => Ok(()),
        }) {
            log::warn!("Pedal {}: {e:#}", entry.name);
        }
        log::info!(
            "Pedal {} on channel {}: {} commands",
            midi_pedal.name(),
            midi_pedal.channel(),
            midi_pedal.commands().len()
        );
        pedals.push(Box::new(midi_pedal));
    }
    Ok(PedalBoard::new(pedals))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::input::script;

    struct Screen(Arc<Mutex<Vec<String>>>);

    impl StatusDisplay for Screen {
        fn render(&mut self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "stomp.toml",
            r#"
[[buttons]]
pin = 0
number = 1
function = "Song Dn"
partner_func = "Global Menu"
partner = 8

[[buttons]]
pin = 8
number = 2
function = "Song Up"
partner_func = "Setup Menu"
partner = 0

[[buttons]]
pin = 3
number = 3
function = "Select"

[knob]
push_pin = 15

[[midi.pedals]]
name = "drive"
engaged = false
"#,
        );
        write(
            root,
            "pedals/drive.toml",
            "name = \"Drive\"\nchannel = 2\n[commands.Engage]\ncc = 102\non = 127\noff = 0\n",
        );
        write(root, "sets/gig.toml", "songs = [\"one\", \"two\"]\n");
        write(
            root,
            "songs/one.toml",
            "name = \"One\"\ntempo = 100\n[[parts]]\nname = \"Intro\"\n[parts.pedals.Drive]\nengaged = true\n",
        );
        write(
            root,
            "songs/two.toml",
            "name = \"Two\"\ntempo = 80\n[[parts]]\nname = \"Verse\"\n[[parts]]\nname = \"Chorus\"\n",
        );
        dir
    }

    fn runtime(dir: &Path, screen: &Arc<Mutex<Vec<String>>>) -> Runtime {
        build(
            &dir.join("stomp.toml"),
            Box::new(Screen(Arc::clone(screen))),
            &MidiOptions {
                port: None,
                dry_run: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn builds_from_files_and_persists_selection() {
        let dir = fixture();
        let screen = Arc::new(Mutex::new(Vec::new()));
        let Runtime { mut app, midi, .. } = runtime(dir.path(), &screen);
        app.start();
        assert_eq!(app.controller().status(), "One - 100BPM - Intro");

        let steps =
            script::parse("0 press 8\n100 release 8\n400 press 3\n450 release 3").unwrap();
        app.replay(&steps, Instant::now()).unwrap();
        assert_eq!(app.controller().status(), "Two - 80BPM - Verse");
        assert_eq!(app.controller().browser().committed().song, 1);

        drop(app);
        midi.join();
        let saved = config::load(&dir.path().join("stomp.toml")).unwrap();
        assert_eq!(saved.current.setlist.as_deref(), Some("gig"));
        assert_eq!(saved.current.song.as_deref(), Some("Two"));
        assert_eq!(saved.current.part.as_deref(), Some("Verse"));
    }

    #[test]
    fn knob_timing_contracts() {
        let dir = fixture();
        let screen = Arc::new(Mutex::new(Vec::new()));
        let Runtime { mut app, .. } = runtime(dir.path(), &screen);
        app.start();

        // 490 ms on the knob button is short: into Setup
        let steps = script::parse(
            "0 press 15\n490 release 15\n\
             1000 quad 1 0\n1001 quad 0 1\n\
             1100 quad 1 0\n1101 quad 0 1\n\
             1300 quad 1 0\n1301 quad 0 1",
        )
        .unwrap();
        app.replay(&steps, Instant::now()).unwrap();
        // the second turn fell inside the refractory window; the decoder
        // still saw it, so the third resolves clockwise again
        let shown = screen.lock().unwrap().clone();
        assert_eq!(
            shown[1..],
            ["Setup: Sets", "Setup: Songs", "Setup: Parts"]
        );
    }

    #[test]
    fn combo_from_script() {
        let dir = fixture();
        let screen = Arc::new(Mutex::new(Vec::new()));
        let Runtime { mut app, .. } = runtime(dir.path(), &screen);
        app.start();
        // hold 2, tap 1: the held switch's partner function
        let steps =
            script::parse("0 press 8\n100 press 0\n200 release 0\n900 release 8").unwrap();
        app.replay(&steps, Instant::now()).unwrap();
        assert_eq!(app.controller().status(), "Setup: Sets");
        assert_eq!(app.controller().browser().displayed().song, 0);
    }

    #[test]
    fn long_knob_press_from_script() {
        let dir = fixture();
        let screen = Arc::new(Mutex::new(Vec::new()));
        let Runtime { mut app, .. } = runtime(dir.path(), &screen);
        app.start();
        let steps = script::parse(
            "0 press 15\n5000 release 15\n\
             5100 turn cw\n\
             5200 press 15\n5300 release 15\n\
             6000 dpad up",
        )
        .unwrap();
        app.replay(&steps, Instant::now()).unwrap();
        assert!(app.controller().power_off_requested());
        assert_eq!(app.controller().status(), "Goodbye.");
        // stopped before the d-pad line
        assert_eq!(
            screen.lock().unwrap().last().map(String::as_str),
            Some("Goodbye.")
        );
    }
}
