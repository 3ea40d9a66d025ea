mod actions;
pub mod skeleton;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use menu::{DataHandler, MenuTree, NodeId, Shape};

pub use actions::{BoardAction, Dpad, ExternalCommand, MenuAction, Mode};

use crate::browser::SelectionBrowser;
use crate::config::{Config, Footswitch};
use crate::display::StatusDisplay;
use crate::error::ControlError;
use crate::input::{ButtonEvent, Direction, PinId};
use crate::knob::{self, KnobColor, KnobLight, PulseWorkers};
use crate::pedal::PedalBoard;
use crate::persistence::{Persistence, RuntimeUpdate};
use crate::setlist::{Setlist, Value};

/// Knob long presses at least this long jump to root (or Global at root).
pub const RESET_HOLD: Duration = Duration::from_secs(2);
/// Knob long presses at least this long open the power-off prompt.
pub const POWER_HOLD: Duration = Duration::from_secs(5);

pub const ERROR_STATUS: &str = "Error!!";
pub const GOODBYE_STATUS: &str = "Goodbye.";

/// Where the menu focus is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    AtRoot,
    AtBranch(NodeId),
    AtLeafList(NodeId),
    AtPowerPrompt,
}

/// Collaborators the controller drives.
pub struct Outputs {
    pub pedals: PedalBoard,
    pub display: Box<dyn StatusDisplay>,
    pub store: Box<dyn Persistence>,
    pub light: Arc<dyn KnobLight>,
}

/// The menu state machine. Owns the tree, the selection browser and every
/// output; driven from a single thread.
pub struct Controller {
    tree: MenuTree<MenuAction>,
    landmarks: skeleton::Landmarks,
    browser: SelectionBrowser,
    pedals: PedalBoard,
    display: Box<dyn StatusDisplay>,
    store: Box<dyn Persistence>,
    pulse: PulseWorkers,
    knob_pin: PinId,
    knob_color: KnobColor,
    knob_brightness: u8,
    mode: Mode,
    footswitches: BTreeMap<PinId, Footswitch>,
    buttons_locked: bool,
    power_off: bool,
    status: String,
}

impl Controller {
    pub fn new(config: &Config, setlist: Setlist, outputs: Outputs) -> Result<Self, ControlError> {
        let footswitches = config
            .footswitches()?
            .into_iter()
            .map(|f| (f.pin, f))
            .collect();
        let browser = SelectionBrowser::new(
            setlist,
            config.current.song.as_deref(),
            config.current.part.as_deref(),
        );
        let (tree, landmarks) = skeleton::build(&outputs.pedals);
        Ok(Self {
            tree,
            landmarks,
            browser,
            pedals: outputs.pedals,
            display: outputs.display,
            store: outputs.store,
            pulse: PulseWorkers::new(outputs.light),
            knob_pin: config.knob.push_pin,
            knob_color: config.knob.color,
            knob_brightness: config.knob.brightness.min(100),
            mode: config.current.mode,
            footswitches,
            buttons_locked: config.api.buttons_locked,
            power_off: false,
            status: String::new(),
        })
    }

    /// Light the knob, send the starting part and show the root summary.
    pub fn start(&mut self) {
        self.pulse
            .light()
            .set_color(self.knob_color, self.knob_brightness);
        self.pedals.load_part(self.browser.committed_part());
        self.show_root();
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn browser(&self) -> &SelectionBrowser {
        &self.browser
    }

    pub fn power_off_requested(&self) -> bool {
        self.power_off
    }

    pub fn state(&self) -> NavState {
        let current = self.tree.current();
        if current == self.landmarks.power {
            NavState::AtPowerPrompt
        } else if self.tree.is_at_root() {
            NavState::AtRoot
        } else if self.tree.shape(current) == Shape::Branch {
            NavState::AtBranch(current)
        } else {
            NavState::AtLeafList(current)
        }
    }

    pub fn handle_button_event(&mut self, pin: PinId, event: ButtonEvent) {
        if pin == self.knob_pin {
            self.handle_knob_press(event);
            return;
        }
        let Some(switch) = self.footswitches.get(&pin).cloned() else {
            log::warn!("No footswitch configured on pin {pin}");
            return;
        };
        match (event, self.mode) {
            (ButtonEvent::Combo { held }, _) => {
                let action = self
                    .footswitches
                    .get(&held)
                    .and_then(|partner| partner.partner_func);
                match action {
                    Some(action) => self.run_board_action(action),
                    None => log::debug!("Pin {held} has no partner function"),
                }
            }
            (ButtonEvent::ShortPress, Mode::Standard) => self.run_board_action(switch.function),
            (ButtonEvent::LongPress(_), Mode::Standard) => match switch.long_press {
                Some(action) => self.run_board_action(action),
                None => log::debug!("Footswitch {} has no long press", switch.number),
            },
            (ButtonEvent::ShortPress, Mode::Favorite) => self.load_favorite(switch.number),
            (ButtonEvent::LongPress(_), Mode::Favorite) => {
                log::debug!("Long press ignored in favorite mode");
            }
        }
    }

    pub fn handle_rotary_event(&mut self, direction: Direction) {
        if self.tree.is_at_root() {
            log::debug!("Knob turned at root, ignored");
            return;
        }
        let moved = match direction {
            Direction::Cw => self.tree.next_sibling_or_list_item(),
            Direction::Ccw => self.tree.prev_sibling_or_list_item(),
        };
        if moved {
            self.show_current();
        }
    }

    /// Entry point for remote clients and replays.
    pub fn handle_external_command(
        &mut self,
        command: &ExternalCommand,
    ) -> Result<(), ControlError> {
        if self.buttons_locked {
            log::warn!("External command {command:?} rejected: buttons locked");
            return Ok(());
        }
        match command {
            ExternalCommand::Short(label) => {
                let action: BoardAction = label.parse()?;
                self.run_board_action(action);
            }
            ExternalCommand::Long(label) => {
                if let Ok(action) = label.parse::<BoardAction>() {
                    self.run_board_action(action.select_variant().unwrap_or(action));
                } else if let Some(node) = self.tree.find(label) {
                    self.change_node(node);
                } else {
                    return Err(ControlError::UnknownAction(label.clone()));
                }
            }
            ExternalCommand::Dpad(Dpad::Up) => self.ascend(),
            ExternalCommand::Dpad(Dpad::Down) => self.select(),
            ExternalCommand::Dpad(Dpad::Cw) => self.handle_rotary_event(Direction::Cw),
            ExternalCommand::Dpad(Dpad::Ccw) => self.handle_rotary_event(Direction::Ccw),
        }
        Ok(())
    }

    fn handle_knob_press(&mut self, event: ButtonEvent) {
        match event {
            ButtonEvent::ShortPress => self.select(),
            ButtonEvent::LongPress(held) if held >= POWER_HOLD => {
                let power = self.landmarks.power;
                self.tree.node_mut(power).data_mut().set_position(0);
                self.change_node(power);
            }
            ButtonEvent::LongPress(held) if held >= RESET_HOLD => {
                if self.tree.is_at_root() {
                    self.change_node(self.landmarks.global);
                } else {
                    self.change_node(self.tree.root());
                }
            }
            ButtonEvent::LongPress(_) => self.ascend(),
            ButtonEvent::Combo { .. } => log::debug!("Combo on the knob button ignored"),
        }
    }

    fn ascend(&mut self) {
        if let Some(parent) = self.tree.current_node().parent() {
            self.change_node(parent);
        }
    }

    /// A short press on the knob.
    fn select(&mut self) {
        let current = self.tree.current();
        if self.tree.is_at_root() {
            self.change_node(self.landmarks.setup);
            return;
        }
        match self.tree.shape(current) {
            Shape::Branch => {
                if let Some(child) = self.tree.current_node().current_child() {
                    self.change_node(child);
                }
            }
            Shape::List => {
                let data = self.tree.current_node().data();
                let action = match data.handler() {
                    DataHandler::Callback(action) => Some(*action),
                    DataHandler::Dispatch(table) => {
                        data.selected().and_then(|item| table.get(item).copied())
                    }
                    DataHandler::StaticList => None,
                };
                match action {
                    Some(action) => self.run_menu_action(action),
                    None => self.ascend(),
                }
            }
            Shape::Action | Shape::Loader | Shape::Empty => self.change_node(current),
        }
    }

    /// Focus `id` and render it. Loaders run on every visit; an action node
    /// runs its action and hands focus back to its parent.
    fn change_node(&mut self, id: NodeId) {
        self.tree.jump_to(id);
        if self.tree.is_at_root() {
            self.show_root();
            return;
        }
        if self.tree.shape(id) != Shape::Branch {
            if let Some(loader) = self.tree.node(id).loader().copied() {
                self.run_loader(loader, id);
            }
        }
        match self.tree.shape(id) {
            Shape::Action => {
                if let Some(action) = self.tree.node(id).action().copied() {
                    self.run_menu_action(action);
                }
            }
            Shape::Branch | Shape::List => self.show_current(),
            Shape::Loader | Shape::Empty => {
                let err = ControlError::Configuration(self.tree.node(id).name().to_string());
                log::error!("{err}");
                self.render(ERROR_STATUS.to_string());
            }
        }
    }

    fn show_current(&mut self) {
        let node = self.tree.current_node();
        let message = match node.current_child() {
            Some(child) => format!("{}: {}", node.name(), self.tree.node(child).name()),
            None => match node.data().selected() {
                Some(item) => format!("{} - {item}", node.data().prompt()),
                None => ERROR_STATUS.to_string(),
            },
        };
        self.render(message);
    }

    fn show_root(&mut self) {
        let song = self.browser.displayed_song();
        let part = self.browser.displayed_part();
        let message = format!("{} - {}BPM - {}", song.name, song.tempo, part.name);
        self.render(message);
    }

    fn render(&mut self, message: String) {
        log::info!("Status: {message}");
        self.display.render(&message);
        self.status = message;
    }

    fn run_loader(&mut self, loader: MenuAction, id: NodeId) {
        let (items, position) = match loader {
            MenuAction::ListSetlists => match self.store.list_setlists() {
                Ok(names) => {
                    let current = &self.browser.setlist().name;
                    let pos = names.iter().position(|n| n == current);
                    (names, pos)
                }
                Err(e) => {
                    log::error!("{e}");
                    (Vec::new(), None)
                }
            },
            MenuAction::ListSongs => {
                let names = self.browser.setlist().songs.iter().map(|s| s.name.clone());
                (names.collect(), Some(self.browser.committed().song))
            }
            MenuAction::ListParts => {
                let song = self.browser.committed_song();
                let names = song.parts.iter().map(|p| p.name.clone()).collect();
                (names, Some(self.browser.committed().part))
            }
            MenuAction::ListKnobColors => {
                let names = KnobColor::ALL.iter().map(|c| c.to_string()).collect();
                let pos = KnobColor::ALL.iter().position(|c| *c == self.knob_color);
                (names, pos)
            }
            MenuAction::ListBrightness => (
                knob::brightness_levels(),
                Some((self.knob_brightness / knob::BRIGHTNESS_STEP) as usize),
            ),
            MenuAction::ListModes => {
                let names = Mode::ALL.iter().map(|m| m.to_string()).collect();
                (names, Mode::ALL.iter().position(|m| *m == self.mode))
            }
            MenuAction::ListAbout => (self.about(), None),
            MenuAction::ListPedalChoices { pedal, command } => {
                let choices = self
                    .pedals
                    .get(pedal)
                    .and_then(|p| p.commands().into_iter().nth(command))
                    .map(|c| c.choices)
                    .unwrap_or_default();
                (choices, None)
            }
            other => {
                log::warn!("{other:?} is not a loader");
                return;
            }
        };
        let data = self.tree.node_mut(id).data_mut();
        data.set_items(items);
        data.set_position(position.unwrap_or(0));
    }

    fn about(&self) -> Vec<String> {
        vec![
            format!("Version {}", env!("CARGO_PKG_VERSION")),
            format!("Setlist {}", self.browser.setlist().name),
            format!("Songs {}", self.browser.setlist().songs.len()),
            format!("Pedals {}", self.pedals.len()),
            format!("Mode {}", self.mode),
        ]
    }

    fn selected_item(&self) -> Option<(usize, String)> {
        let data = self.tree.current_node().data();
        Some((data.position()?, data.selected()?.to_string()))
    }

    fn run_menu_action(&mut self, action: MenuAction) {
        log::debug!("Menu action {action:?}");
        match action {
            MenuAction::GoRoot => self.change_node(self.tree.root()),
            MenuAction::PowerOff => {
                log::info!("Power off confirmed");
                self.power_off = true;
                self.render(GOODBYE_STATUS.to_string());
            }
            MenuAction::RunPedalCommand { pedal, command } => {
                self.execute_pedal_command(pedal, command, None);
                self.ascend();
            }
            other => {
                let Some((index, item)) = self.selected_item() else {
                    log::warn!("{other:?} with nothing selected");
                    self.ascend();
                    return;
                };
                self.run_item_action(other, index, &item);
            }
        }
    }

    fn run_item_action(&mut self, action: MenuAction, index: usize, item: &str) {
        match action {
            MenuAction::LoadSetlist => {
                match self.store.load_setlist(item) {
                    Ok(setlist) => {
                        self.browser.replace_setlist(setlist);
                        self.apply_committed();
                    }
                    Err(e) => log::error!("Setlist '{item}' not loaded: {e}"),
                }
                self.change_node(self.tree.root());
            }
            MenuAction::LoadSong => {
                self.browser.load_song(index);
                self.apply_committed();
                self.change_node(self.tree.root());
            }
            MenuAction::LoadPart => {
                self.browser.load_part(index);
                self.apply_committed();
                self.change_node(self.tree.root());
            }
            MenuAction::SetKnobColor => {
                match item.parse() {
                    Ok(color) => {
                        self.knob_color = color;
                        self.apply_knob();
                    }
                    Err(e) => log::warn!("{e}"),
                }
                self.ascend();
            }
            MenuAction::SetBrightness => {
                match item.parse::<u8>() {
                    Ok(level) => {
                        self.knob_brightness = level.min(100);
                        self.apply_knob();
                    }
                    Err(e) => log::warn!("Brightness '{item}': {e}"),
                }
                self.ascend();
            }
            MenuAction::SetMode => {
                match item.parse() {
                    Ok(mode) => self.set_mode(mode),
                    Err(e) => log::warn!("{e}"),
                }
                self.ascend();
            }
            MenuAction::SendPedalCommand { pedal, command } => {
                self.execute_pedal_command(pedal, command, Some(&Value::from(item)));
                self.ascend();
            }
            other => {
                log::warn!("{other:?} cannot run on an item");
                self.ascend();
            }
        }
    }

    fn execute_pedal_command(&mut self, pedal: usize, command: usize, value: Option<&Value>) {
        let Some(p) = self.pedals.get_mut(pedal) else {
            log::warn!("No pedal #{pedal}");
            return;
        };
        if let Err(e) = p.execute(command, value) {
            log::warn!("Pedal command failed: {e:#}");
        }
    }

    fn run_board_action(&mut self, action: BoardAction) {
        log::info!("Board action: {action}");
        match action {
            BoardAction::SongDown => self.browse(SelectionBrowser::preview_prev_song),
            BoardAction::SongUp => self.browse(SelectionBrowser::preview_next_song),
            BoardAction::PartDown => self.browse(SelectionBrowser::preview_prev_part),
            BoardAction::PartUp => self.browse(SelectionBrowser::preview_next_part),
            BoardAction::Select => self.commit(),
            BoardAction::SelectSongDown => self.step_and_commit(SelectionBrowser::preview_prev_song),
            BoardAction::SelectSongUp => self.step_and_commit(SelectionBrowser::preview_next_song),
            BoardAction::SelectPartDown => self.step_and_commit(SelectionBrowser::preview_prev_part),
            BoardAction::SelectPartUp => self.step_and_commit(SelectionBrowser::preview_next_part),
            BoardAction::ToggleMode => {
                self.set_mode(self.mode.toggled());
                self.change_node(self.tree.root());
            }
            BoardAction::SetupMenu => self.change_node(self.landmarks.setup),
            BoardAction::GlobalMenu => self.change_node(self.landmarks.global),
        }
    }

    fn browse(&mut self, step: fn(&mut SelectionBrowser) -> bool) {
        self.tree.jump_to(self.tree.root());
        if step(&mut self.browser) {
            self.pulse.start(self.browser.previewing_flag());
        }
        self.show_root();
    }

    fn step_and_commit(&mut self, step: fn(&mut SelectionBrowser) -> bool) {
        step(&mut self.browser);
        self.commit();
    }

    fn commit(&mut self) {
        self.tree.jump_to(self.tree.root());
        if !self.browser.is_previewing() {
            log::debug!("Select with nothing previewed");
        }
        if self.browser.commit().is_some() {
            self.apply_committed();
        }
        self.show_root();
    }

    fn load_favorite(&mut self, number: u8) {
        let index = usize::from(number.max(1)) - 1;
        if index >= self.browser.committed_song().parts.len() {
            log::info!(
                "Song '{}' has no part {number}",
                self.browser.committed_song().name
            );
            return;
        }
        self.browser.load_part(index);
        self.apply_committed();
        self.change_node(self.tree.root());
    }

    /// Send the committed part to the pedals and remember it. Pedal state is
    /// not rolled back if saving fails.
    fn apply_committed(&mut self) {
        self.pedals.load_part(self.browser.committed_part());
        let update = RuntimeUpdate::Selection {
            setlist: self.browser.setlist().name.clone(),
            song: self.browser.committed_song().name.clone(),
            part: self.browser.committed_part().name.clone(),
        };
        self.save(update);
    }

    fn apply_knob(&mut self) {
        self.pulse
            .light()
            .set_color(self.knob_color, self.knob_brightness);
        self.save(RuntimeUpdate::Knob {
            color: self.knob_color,
            brightness: self.knob_brightness,
        });
    }

    fn set_mode(&mut self, mode: Mode) {
        log::info!("Mode: {mode}");
        self.mode = mode;
        self.save(RuntimeUpdate::Mode(mode));
    }

    fn save(&mut self, update: RuntimeUpdate) {
        if let Err(e) = self.store.save_runtime_state(update) {
            log::error!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;
    use crate::knob::LogLight;
    use crate::pedal::testing::RecordingPedal;
    use crate::setlist::{Part, PedalSetting, Song};

    type Shared<T> = Arc<Mutex<T>>;

    struct RecordingDisplay(Shared<Vec<String>>);

    impl StatusDisplay for RecordingDisplay {
        fn render(&mut self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    struct MemoryStore {
        saved: Shared<Vec<RuntimeUpdate>>,
        fail: bool,
    }

    impl Persistence for MemoryStore {
        fn load_setlist(&self, name: &str) -> Result<Setlist, ControlError> {
            if name == "B" {
                Setlist::new("B", vec![song("Other", 90.0, &["Solo"])])
            } else {
                Err(ControlError::Persistence(anyhow::anyhow!("no setlist {name}")))
            }
        }

        fn list_setlists(&self) -> Result<Vec<String>, ControlError> {
            Ok(vec!["A".into(), "B".into()])
        }

        fn save_runtime_state(&mut self, update: RuntimeUpdate) -> Result<(), ControlError> {
            if self.fail {
                return Err(ControlError::Persistence(anyhow::anyhow!("disk full")));
            }
            self.saved.lock().unwrap().push(update);
            Ok(())
        }
    }

    fn song(name: &str, tempo: f32, parts: &[&str]) -> Song {
        Song {
            name: name.into(),
            tempo,
            parts: parts
                .iter()
                .map(|p| Part {
                    name: p.to_string(),
                    pedals: BTreeMap::from([(
                        "Drive".to_string(),
                        PedalSetting {
                            engaged: true,
                            preset: Some(Value::Label(format!("{name}/{p}"))),
                            ..Default::default()
                        },
                    )]),
                })
                .collect(),
        }
    }

    const KNOB: PinId = 15;
    const FS1: PinId = 0;
    const FS2: PinId = 8;
    const FS3: PinId = 3;

    const CONFIG: &str = r#"
[[buttons]]
pin = 0
number = 1
function = "Song Dn"
long_press = "Select Song Dn"
partner_func = "Toggle Mode"
partner = 8

[[buttons]]
pin = 8
number = 2
function = "Song Up"
long_press = "Select Song Up"
partner_func = "Global Menu"
partner = 0

[[buttons]]
pin = 3
number = 3
function = "Select"

[knob]
push_pin = 15
"#;

    struct Rig {
        controller: Controller,
        screen: Shared<Vec<String>>,
        pedal_log: Shared<Vec<String>>,
        saved: Shared<Vec<RuntimeUpdate>>,
    }

    impl Rig {
        fn new() -> Self {
            Self::with(CONFIG, false, vec!["Drive"])
        }

        fn with(config: &str, fail_saves: bool, pedals: Vec<&str>) -> Self {
            let config: Config = toml::from_str(config).unwrap();
            let setlist = Setlist::new(
                "A",
                vec![
                    song("S1", 120.0, &["P1", "P2"]),
                    song("S2", 96.5, &["P1"]),
                    song("S3", 140.0, &["P1"]),
                ],
            )
            .unwrap();
            let screen = Arc::new(Mutex::new(Vec::new()));
            let pedal_log = Arc::new(Mutex::new(Vec::new()));
            let saved = Arc::new(Mutex::new(Vec::new()));
            let board = PedalBoard::new(
                pedals
                    .into_iter()
                    .map(|name| match name {
                        "Empty" => Box::new(RecordingPedal {
                            name: name.into(),
                            log: Arc::clone(&pedal_log),
                            commands: vec![],
                        }) as Box<dyn crate::pedal::PedalControl>,
                        _ => RecordingPedal::boxed(name, &pedal_log),
                    })
                    .collect(),
            );
            let controller = Controller::new(
                &config,
                setlist,
                Outputs {
                    pedals: board,
                    display: Box::new(RecordingDisplay(Arc::clone(&screen))),
                    store: Box::new(MemoryStore {
                        saved: Arc::clone(&saved),
                        fail: fail_saves,
                    }),
                    light: Arc::new(LogLight),
                },
            )
            .unwrap();
            Self {
                controller,
                screen,
                pedal_log,
                saved,
            }
        }

        fn status(&self) -> &str {
            self.controller.status()
        }

        fn short(&mut self, pin: PinId) {
            self.controller
                .handle_button_event(pin, ButtonEvent::ShortPress);
        }

        fn long(&mut self, pin: PinId, secs: f32) {
            let held = Duration::from_secs_f32(secs);
            self.controller
                .handle_button_event(pin, ButtonEvent::LongPress(held));
        }

        fn turn(&mut self, direction: Direction, times: usize) {
            for _ in 0..times {
                self.controller.handle_rotary_event(direction);
            }
        }

        fn pedal_calls(&self) -> Vec<String> {
            std::mem::take(&mut *self.pedal_log.lock().unwrap())
        }
    }

    #[test]
    fn start_loads_committed_part() {
        let mut rig = Rig::new();
        rig.controller.start();
        assert_eq!(rig.status(), "S1 - 120BPM - P1");
        assert_eq!(rig.pedal_calls(), ["Drive on", "Drive preset S1/P1"]);
        assert_eq!(rig.controller.state(), NavState::AtRoot);
    }

    #[test]
    fn setup_and_back() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.short(KNOB);
        assert_eq!(rig.status(), "Setup: Sets");
        assert!(matches!(rig.controller.state(), NavState::AtBranch(_)));
        rig.long(KNOB, 1.0);
        assert_eq!(rig.status(), "S1 - 120BPM - P1");
        assert_eq!(rig.controller.state(), NavState::AtRoot);
        // every transition was rendered
        assert_eq!(rig.screen.lock().unwrap().len(), 3);
    }

    #[test]
    fn rotation_saturates_and_is_ignored_at_root() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.turn(Direction::Cw, 1);
        assert_eq!(rig.status(), "S1 - 120BPM - P1");
        rig.short(KNOB);
        rig.turn(Direction::Cw, 10);
        assert_eq!(rig.status(), "Setup: Midi Pedals");
        rig.turn(Direction::Ccw, 1);
        assert_eq!(rig.status(), "Setup: Parts");
    }

    #[test]
    fn browsing_sends_nothing_until_select() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.pedal_calls();
        rig.short(FS2);
        assert_eq!(rig.status(), "S2 - 96.5BPM - P1");
        assert!(rig.controller.browser().is_previewing());
        assert!(rig.pedal_calls().is_empty());
        assert_eq!(rig.controller.browser().committed().song, 0);

        rig.short(FS3);
        assert_eq!(rig.pedal_calls(), ["Drive on", "Drive preset S2/P1"]);
        assert!(!rig.controller.browser().is_previewing());
        assert_eq!(
            rig.saved.lock().unwrap().last(),
            Some(&RuntimeUpdate::Selection {
                setlist: "A".into(),
                song: "S2".into(),
                part: "P1".into()
            })
        );

        // nothing changed, nothing sent
        rig.short(FS3);
        assert!(rig.pedal_calls().is_empty());
    }

    #[test]
    fn long_footswitch_commits_directly() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.pedal_calls();
        rig.long(FS2, 0.8);
        assert_eq!(rig.controller.browser().committed().song, 1);
        assert_eq!(rig.pedal_calls(), ["Drive on", "Drive preset S2/P1"]);
    }

    #[test]
    fn combo_runs_held_partner_function() {
        let mut rig = Rig::new();
        rig.controller.start();
        // FS1 released while FS2 held: FS2's partner function
        rig.controller
            .handle_button_event(FS1, ButtonEvent::Combo { held: FS2 });
        assert_eq!(rig.status(), "Global: Knob Color");
        rig.controller
            .handle_button_event(FS2, ButtonEvent::Combo { held: FS1 });
        assert_eq!(rig.controller.mode(), Mode::Favorite);
    }

    #[test]
    fn favorite_mode_loads_part_by_number() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.pedal_calls();
        rig.controller
            .handle_button_event(FS1, ButtonEvent::Combo { held: FS2 });
        rig.controller
            .handle_button_event(FS2, ButtonEvent::Combo { held: FS1 });
        assert_eq!(rig.controller.mode(), Mode::Favorite);
        rig.short(FS2);
        assert_eq!(rig.status(), "S1 - 120BPM - P2");
        assert_eq!(rig.pedal_calls(), ["Drive on", "Drive preset S1/P2"]);
        // no part 3, long presses ignored
        rig.short(FS3);
        rig.long(FS1, 1.0);
        assert_eq!(rig.status(), "S1 - 120BPM - P2");
        assert!(rig.pedal_calls().is_empty());
    }

    #[test]
    fn long_press_tiers() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.long(KNOB, 3.0);
        assert_eq!(rig.status(), "Global: Knob Color");
        rig.short(KNOB);
        assert_eq!(rig.status(), "Color - Blue");
        rig.long(KNOB, 2.0);
        assert_eq!(rig.controller.state(), NavState::AtRoot);
        rig.long(KNOB, 4.9);
        assert_eq!(rig.status(), "Global: Knob Color");
        rig.long(KNOB, 5.0);
        assert_eq!(rig.controller.state(), NavState::AtPowerPrompt);
        assert_eq!(rig.status(), "Power Off? - NO yes");
    }

    #[test]
    fn power_prompt() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.long(KNOB, 6.0);
        rig.short(KNOB);
        assert_eq!(rig.controller.state(), NavState::AtRoot);
        assert!(!rig.controller.power_off_requested());

        rig.long(KNOB, 6.0);
        rig.turn(Direction::Cw, 1);
        assert_eq!(rig.status(), "Power Off? - no YES");
        rig.short(KNOB);
        assert_eq!(rig.status(), "Goodbye.");
        assert!(rig.controller.power_off_requested());
    }

    #[test]
    fn load_song_from_menu() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.pedal_calls();
        rig.short(KNOB);
        rig.turn(Direction::Cw, 1);
        rig.short(KNOB);
        assert_eq!(rig.status(), "Song - S1");
        assert!(matches!(rig.controller.state(), NavState::AtLeafList(_)));
        rig.turn(Direction::Cw, 2);
        assert_eq!(rig.status(), "Song - S3");
        rig.short(KNOB);
        assert_eq!(rig.status(), "S3 - 140BPM - P1");
        assert_eq!(rig.pedal_calls(), ["Drive on", "Drive preset S3/P1"]);

        // the list is reloaded and positioned on the current song
        rig.short(KNOB);
        assert_eq!(rig.status(), "Setup: Songs");
        rig.short(KNOB);
        assert_eq!(rig.status(), "Song - S3");
    }

    #[test]
    fn load_part_from_menu_uses_committed_song() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.pedal_calls();
        rig.short(FS2);
        assert_eq!(rig.status(), "S2 - 96.5BPM - P1");

        rig.short(KNOB);
        rig.turn(Direction::Cw, 2);
        assert_eq!(rig.status(), "Setup: Parts");
        rig.short(KNOB);
        assert_eq!(rig.status(), "Part - P1");
        rig.turn(Direction::Cw, 1);
        assert_eq!(rig.status(), "Part - P2");
        rig.short(KNOB);

        assert_eq!(rig.status(), "S1 - 120BPM - P2");
        assert_eq!(rig.pedal_calls(), ["Drive on", "Drive preset S1/P2"]);
        assert!(!rig.controller.browser().is_previewing());
        assert_eq!(
            rig.saved.lock().unwrap().last(),
            Some(&RuntimeUpdate::Selection {
                setlist: "A".into(),
                song: "S1".into(),
                part: "P2".into()
            })
        );
    }

    #[test]
    fn load_setlist_from_menu() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.short(KNOB);
        rig.short(KNOB);
        assert_eq!(rig.status(), "Setlist - A");
        rig.turn(Direction::Cw, 1);
        rig.short(KNOB);
        assert_eq!(rig.status(), "Other - 90BPM - Solo");
        assert_eq!(rig.controller.browser().setlist().name, "B");
    }

    #[test]
    fn knob_settings_persist() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.long(KNOB, 3.0);
        rig.turn(Direction::Cw, 1);
        rig.short(KNOB);
        assert_eq!(rig.status(), "Brightness - 100");
        rig.turn(Direction::Ccw, 3);
        rig.short(KNOB);
        assert_eq!(rig.status(), "Global: Knob Brightness");
        assert_eq!(
            rig.saved.lock().unwrap().last(),
            Some(&RuntimeUpdate::Knob {
                color: KnobColor::Blue,
                brightness: 70
            })
        );
    }

    #[test]
    fn pedal_commands_from_menu() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.pedal_calls();
        let _ = rig
            .controller
            .handle_external_command(&ExternalCommand::Long("Drive".into()));
        assert_eq!(rig.status(), "Drive: Tap");
        rig.short(KNOB);
        assert_eq!(rig.pedal_calls(), ["Drive Tap"]);
        assert_eq!(rig.status(), "Drive: Tap");
        rig.turn(Direction::Cw, 1);
        rig.short(KNOB);
        assert_eq!(rig.status(), "Mode - Hall");
        rig.turn(Direction::Cw, 1);
        rig.short(KNOB);
        assert_eq!(rig.pedal_calls(), ["Drive Mode Room"]);
        assert_eq!(rig.status(), "Drive: Mode");
    }

    #[test]
    fn empty_node_shows_error() {
        let mut rig = Rig::with(CONFIG, false, vec!["Empty"]);
        rig.controller.start();
        let _ = rig
            .controller
            .handle_external_command(&ExternalCommand::Long("Midi Pedals".into()));
        assert_eq!(rig.status(), "Midi Pedals: Empty");
        rig.short(KNOB);
        assert_eq!(rig.status(), ERROR_STATUS);
        // still navigable
        rig.long(KNOB, 1.0);
        assert_eq!(rig.status(), "Midi Pedals: Empty");
    }

    #[test]
    fn external_commands() {
        let mut rig = Rig::new();
        rig.controller.start();
        rig.controller
            .handle_external_command(&ExternalCommand::Short("Song Up".into()))
            .unwrap();
        assert_eq!(rig.controller.browser().committed().song, 0);
        rig.controller
            .handle_external_command(&ExternalCommand::Long("Song Up".into()))
            .unwrap();
        assert_eq!(rig.controller.browser().committed().song, 2);
        rig.controller
            .handle_external_command(&ExternalCommand::Long("Global".into()))
            .unwrap();
        assert_eq!(rig.status(), "Global: Knob Color");
        rig.controller
            .handle_external_command(&ExternalCommand::Dpad(Dpad::Cw))
            .unwrap();
        rig.controller
            .handle_external_command(&ExternalCommand::Dpad(Dpad::Down))
            .unwrap();
        assert_eq!(rig.status(), "Brightness - 100");
        rig.controller
            .handle_external_command(&ExternalCommand::Dpad(Dpad::Up))
            .unwrap();
        assert_eq!(rig.status(), "Global: Knob Brightness");
        assert!(matches!(
            rig.controller
                .handle_external_command(&ExternalCommand::Short("Nope".into())),
            Err(ControlError::UnknownAction(_))
        ));
    }

    #[test]
    fn locked_buttons_reject_external_commands() {
        let config = format!("{CONFIG}\n[api]\nbuttons_locked = true\n");
        let mut rig = Rig::with(&config, false, vec!["Drive"]);
        rig.controller.start();
        rig.controller
            .handle_external_command(&ExternalCommand::Long("Song Up".into()))
            .unwrap();
        assert_eq!(rig.controller.browser().committed().song, 0);
        // footswitches still work
        rig.long(FS2, 1.0);
        assert_eq!(rig.controller.browser().committed().song, 1);
    }

    #[test]
    fn save_failure_keeps_state_in_memory() {
        let mut rig = Rig::with(CONFIG, true, vec!["Drive"]);
        rig.controller.start();
        rig.pedal_calls();
        rig.long(FS2, 1.0);
        assert_eq!(rig.controller.browser().committed().song, 1);
        assert_eq!(rig.pedal_calls(), ["Drive on", "Drive preset S2/P1"]);
        assert!(rig.saved.lock().unwrap().is_empty());
    }
}
