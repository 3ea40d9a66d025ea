use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// What a footswitch can be configured to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    SongDown,
    SongUp,
    PartDown,
    PartUp,
    Select,
    SelectSongDown,
    SelectSongUp,
    SelectPartDown,
    SelectPartUp,
    ToggleMode,
    SetupMenu,
    GlobalMenu,
}

const LABELS: [(BoardAction, &str); 12] = [
    (BoardAction::SongDown, "Song Dn"),
    (BoardAction::SongUp, "Song Up"),
    (BoardAction::PartDown, "Part Dn"),
    (BoardAction::PartUp, "Part Up"),
    (BoardAction::Select, "Select"),
    (BoardAction::SelectSongDown, "Select Song Dn"),
    (BoardAction::SelectSongUp, "Select Song Up"),
    (BoardAction::SelectPartDown, "Select Part Dn"),
    (BoardAction::SelectPartUp, "Select Part Up"),
    (BoardAction::ToggleMode, "Toggle Mode"),
    (BoardAction::SetupMenu, "Setup Menu"),
    (BoardAction::GlobalMenu, "Global Menu"),
];

impl BoardAction {
    pub fn label(self) -> &'static str {
        LABELS
            .iter()
            .find(|(a, _)| *a == self)
            .map(|(_, l)| *l)
            .unwrap_or("?")
    }

    /// The committing counterpart of a browse action, used for long
    /// external commands.
    pub fn select_variant(self) -> Option<BoardAction> {
        match self {
            BoardAction::SongDown => Some(BoardAction::SelectSongDown),
            BoardAction::SongUp => Some(BoardAction::SelectSongUp),
            BoardAction::PartDown => Some(BoardAction::SelectPartDown),
            BoardAction::PartUp => Some(BoardAction::SelectPartUp),
            _ => None,
        }
    }
}

impl FromStr for BoardAction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LABELS
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(s.trim()))
            .map(|(a, _)| *a)
            .ok_or_else(|| ControlError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for BoardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Behaviour attached to menu nodes: loaders fill a node's items, the rest
/// run when a node or item is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    ListSetlists,
    ListSongs,
    ListParts,
    ListKnobColors,
    ListBrightness,
    ListModes,
    ListAbout,
    ListPedalChoices { pedal: usize, command: usize },

    LoadSetlist,
    LoadSong,
    LoadPart,
    SetKnobColor,
    SetBrightness,
    SetMode,
    SendPedalCommand { pedal: usize, command: usize },
    RunPedalCommand { pedal: usize, command: usize },

    GoRoot,
    PowerOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Standard,
    /// Footswitch N loads part N of the current song.
    Favorite,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Standard, Mode::Favorite];

    pub fn toggled(self) -> Self {
        match self {
            Mode::Standard => Mode::Favorite,
            Mode::Favorite => Mode::Standard,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Standard => f.write_str("Standard"),
            Mode::Favorite => f.write_str("Favorite"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mode '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dpad {
    Up,
    Down,
    Cw,
    Ccw,
}

/// Commands from outside the footswitches (remote clients, replay scripts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalCommand {
    /// Same as a short press of a footswitch with this action label.
    Short(String),
    /// The label's committing variant, or jump into the menu node so named.
    Long(String),
    Dpad(Dpad),
}
