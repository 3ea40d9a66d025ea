#![allow(clippy::collapsible_if)]

mod app;
mod browser;
mod cli;
mod config;
mod controller;
mod display;
mod enumerate;
mod error;
mod input;
mod knob;
mod midi;
mod pedal;
mod persistence;
mod setlist;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use clap::Parser;
use cli::{Cli, Command, EnumerateTarget, MidiArgs, RunArgs};
use crossterm::event::{
    self, Event, KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};

use crate::app::{MidiOptions, Runtime};
use crate::display::{LineDisplay, TerminalDisplay};
use crate::input::keyboard::KeyboardBoard;
use crate::persistence::{FileStore, Persistence};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run(RunArgs {
            config: cli
                .config
                .unwrap_or_else(|| PathBuf::from(cli::DEFAULT_CONFIG)),
            midi: MidiArgs {
                midi_port: None,
                no_midi: false,
            },
        }),
        Some(Command::Run(args)) => run(args),
        Some(Command::Replay {
            config,
            script,
            midi,
        }) => {
            env_logger::init();
            replay(&config, &script, &midi)
        }
        Some(Command::Enumerate(target)) => {
            env_logger::init();
            match target {
                EnumerateTarget::Midi => enumerate::midi(),
                EnumerateTarget::Setlists { config } => enumerate::setlists(&config),
            }
        }
        Some(Command::Describe { config, setlist }) => {
            env_logger::init();
            describe(&config, &setlist)
        }
    }
}

/// Custom logger that writes to stderr with \r\n line endings for raw mode.
struct RawModeLogger;

impl log::Log for RawModeLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let now = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default();
            let secs = now.as_secs() % 86400; // time of day
            let h = secs / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            let ms = now.subsec_millis();
            let _ = write!(
                std::io::stderr(),
                "[{h:02}:{m:02}:{s:02}.{ms:03} {}] {}\r\n",
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static RAW_MODE_LOGGER: RawModeLogger = RawModeLogger;

impl From<&MidiArgs> for MidiOptions {
    fn from(args: &MidiArgs) -> Self {
        Self {
            port: args.midi_port.clone(),
            dry_run: args.no_midi,
        }
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    log::set_logger(&RAW_MODE_LOGGER).ok();
    log::set_max_level(
        std::env::var("RUST_LOG")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
    );

    let Runtime {
        mut app,
        config,
        midi,
    } = app::build(
        &args.config,
        Box::new(TerminalDisplay::new()),
        &MidiOptions::from(&args.midi),
    )?;

    let mut footswitches = config.footswitches()?;
    footswitches.sort_by_key(|f| f.number);

    // Probe keyboard enhancement support (must be done before entering raw mode)
    let kitty_supported = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);

    crossterm::terminal::enable_raw_mode()?;

    if kitty_supported {
        crossterm::execute!(
            std::io::stderr(),
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                    | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
            )
        )?;
        log::info!("Kitty keyboard protocol enabled (press/release detection active)");
    } else {
        log::warn!(
            "Terminal does not support Kitty keyboard protocol, keys act as taps (no long presses or combos)"
        );
    }

    let mut keyboard = KeyboardBoard::new(
        footswitches.iter().map(|f| f.pin).collect(),
        config.knob.push_pin,
        kitty_supported,
    );

    log::info!(
        "Footswitches on keys 1..{}, knob on space and arrows. Ctrl+Q or Ctrl+C to quit.",
        footswitches.len()
    );
    app.start();

    while !app.controller().power_off_requested() {
        if !event::poll(Duration::from_millis(10))? {
            continue;
        }
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event
            .modifiers
            .contains(crossterm::event::KeyModifiers::CONTROL)
        {
            match key_event.code {
                KeyCode::Char('c') | KeyCode::Char('q') => break,
                _ => {}
            }
        }
        for input in keyboard.handle_key_event(key_event) {
            if let Err(e) = app.process(&mut keyboard, input, Instant::now()) {
                log::warn!("Input dropped: {e:#}");
            }
        }
    }

    let power_off = app.controller().power_off_requested();

    if kitty_supported {
        crossterm::execute!(std::io::stderr(), PopKeyboardEnhancementFlags).ok();
    }
    crossterm::terminal::disable_raw_mode()?;
    println!();

    log::info!("Stopping...");

    // Pedals hold the MIDI senders; drop them before joining the output thread
    drop(app);
    midi.join();

    if power_off {
        power_command(&config.power.command)?;
    }
    Ok(())
}

fn power_command(argv: &[String]) -> anyhow::Result<()> {
    let Some((program, args)) = argv.split_first() else {
        log::info!("No power command configured");
        return Ok(());
    };
    log::info!("Running power command: {}", argv.join(" "));
    let status = std::process::Command::new(program).args(args).status()?;
    if !status.success() {
        anyhow::bail!("power command exited with {status}");
    }
    Ok(())
}

fn replay(config: &Path, script: &Path, midi_args: &MidiArgs) -> anyhow::Result<()> {
    let steps = input::script::load(script)?;
    let Runtime { mut app, midi, .. } =
        app::build(config, Box::new(LineDisplay), &MidiOptions::from(midi_args))?;
    log::info!("Replaying {} events from {}", steps.len(), script.display());
    app.start();
    let result = app.replay(&steps, Instant::now());
    if app.controller().power_off_requested() {
        log::info!("Replay stopped at power off");
    }
    drop(app);
    midi.join();
    result
}

fn describe(config_path: &Path, name: &str) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let store = FileStore::new(config_path, &config);
    let setlist = store.load_setlist(name)?;

    println!("{}", setlist.name);
    println!("  Songs: {}", setlist.songs.len());
    for (i, song) in setlist.songs.iter().enumerate() {
        println!("  {}. {} ({} BPM)", i + 1, song.name, song.tempo);
        for part in &song.parts {
            println!("       {}", part.name);
            for (pedal, setting) in &part.pedals {
                let mut line = format!(
                    "         {pedal}: {}",
                    if setting.engaged { "on" } else { "off" }
                );
                if let Some(preset) = &setting.preset {
                    line.push_str(&format!(", preset {preset}"));
                }
                for (param, value) in &setting.params {
                    line.push_str(&format!(", {param}={value}"));
                }
                if let Some(extra) = &setting.setting {
                    line.push_str(&format!(", setting {extra}"));
                }
                println!("{line}");
            }
        }
    }
    Ok(())
}
