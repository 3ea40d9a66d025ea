use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{self, Config};
use crate::controller::Mode;
use crate::error::ControlError;
use crate::knob::KnobColor;
use crate::setlist::{Setlist, SetlistFile, Song};

/// Runtime state written back to the controller file. Song and part
/// content is never written.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeUpdate {
    Selection {
        setlist: String,
        song: String,
        part: String,
    },
    Knob {
        color: KnobColor,
        brightness: u8,
    },
    Mode(Mode),
}

/// Storage behind setlists and runtime state. Callers log failures and
/// carry on in memory; nothing is retried.
pub trait Persistence {
    fn load_setlist(&self, name: &str) -> Result<Setlist, ControlError>;
    fn list_setlists(&self) -> Result<Vec<String>, ControlError>;
    fn save_runtime_state(&mut self, update: RuntimeUpdate) -> Result<(), ControlError>;
}

/// TOML files next to the controller config.
pub struct FileStore {
    config_path: PathBuf,
    sets_dir: PathBuf,
    songs_dir: PathBuf,
}

impl FileStore {
    pub fn new(config_path: &Path, config: &Config) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            sets_dir: config::resolve(&config.paths.sets, config_path),
            songs_dir: config::resolve(&config.paths.songs, config_path),
        }
    }

    fn load_song(&self, stem: &str) -> anyhow::Result<Song> {
        let path = self.songs_dir.join(format!("{stem}.toml"));
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading song {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    fn read_setlist_file(&self, name: &str) -> anyhow::Result<SetlistFile> {
        let path = self.sets_dir.join(format!("{name}.toml"));
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading setlist {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    fn update_config(&self, update: &RuntimeUpdate) -> anyhow::Result<()> {
        let mut config = config::load(&self.config_path)?;
        match update {
            RuntimeUpdate::Selection {
                setlist,
                song,
                part,
            } => {
                config.current.setlist = Some(setlist.clone());
                config.current.song = Some(song.clone());
                config.current.part = Some(part.clone());
            }
            RuntimeUpdate::Knob { color, brightness } => {
                config.knob.color = *color;
                config.knob.brightness = *brightness;
            }
            RuntimeUpdate::Mode(mode) => config.current.mode = *mode,
        }
        config::save(&self.config_path, &config)
    }
}

impl Persistence for FileStore {
    fn load_setlist(&self, name: &str) -> Result<Setlist, ControlError> {
        let file = self
            .read_setlist_file(name)
            .map_err(ControlError::Persistence)?;
        let mut songs = Vec::with_capacity(file.songs.len());
        for stem in &file.songs {
            match self.load_song(stem) {
                Ok(song) => songs.push(song),
                Err(e) => log::warn!("Setlist '{name}': skipping song: {e:#}"),
            }
        }
        log::info!(
            "Loaded setlist '{name}'{} with {} songs",
            file.title.map(|t| format!(" ({t})")).unwrap_or_default(),
            songs.len()
        );
        Setlist::new(name, songs)
    }

    fn list_setlists(&self) -> Result<Vec<String>, ControlError> {
        let entries = std::fs::read_dir(&self.sets_dir)
            .with_context(|| format!("listing {}", self.sets_dir.display()))
            .map_err(ControlError::Persistence)?;
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    fn save_runtime_state(&mut self, update: RuntimeUpdate) -> Result<(), ControlError> {
        self.update_config(&update)
            .map_err(ControlError::Persistence)?;
        log::debug!("Saved {update:?}");
        Ok(())
    }
}
