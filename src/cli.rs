use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_CONFIG: &str = "conf/stomp.toml";

#[derive(Parser)]
#[command(name = "stomp", about = "Footswitch and knob controller for MIDI pedalboards")]
pub struct Cli {
    /// Controller config (runs the keyboard-driven board)
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the board from the computer keyboard
    Run(RunArgs),
    /// Feed a timed input script through the controller
    Replay {
        /// Path to the controller config (.toml)
        config: PathBuf,
        /// Script of timed press/release/quad/turn/short/long/dpad lines
        script: PathBuf,

        #[command(flatten)]
        midi: MidiArgs,
    },
    /// List MIDI outputs or setlists
    #[command(subcommand)]
    Enumerate(EnumerateTarget),
    /// Print the songs, tempos and parts of a setlist
    Describe {
        /// Path to the controller config (.toml)
        config: PathBuf,
        /// Setlist name (file stem under the sets directory)
        setlist: String,
    },
}

#[derive(Subcommand)]
pub enum EnumerateTarget {
    /// List available MIDI output ports
    Midi,
    /// List setlists found next to a config
    Setlists {
        /// Path to the controller config (.toml)
        #[arg(default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to the controller config (.toml)
    #[arg(default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    #[command(flatten)]
    pub midi: MidiArgs,
}

#[derive(clap::Args)]
pub struct MidiArgs {
    /// MIDI output port name filter (overrides the config)
    #[arg(long)]
    pub midi_port: Option<String>,

    /// Log MIDI messages instead of opening a port
    #[arg(long)]
    pub no_midi: bool,
}
