use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::setlist::{Part, Setlist, Song};

/// A song/part pair, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub song: usize,
    pub part: usize,
}

impl Selection {
    /// One-based song number, as shown to the player.
    pub fn song_number(&self) -> usize {
        self.song + 1
    }

    pub fn part_number(&self) -> usize {
        self.part + 1
    }
}

/// Browses a setlist without side effects. Only [`commit`](Self::commit),
/// [`load_song`](Self::load_song) and [`load_part`](Self::load_part) move the
/// committed selection; the caller applies pedal changes for the returned
/// selection.
pub struct SelectionBrowser {
    setlist: Setlist,
    committed: Selection,
    displayed: Selection,
    previewing: Arc<AtomicBool>,
}

impl SelectionBrowser {
    /// Start on the named song and part, falling back to the first entry
    /// when a name is missing or stale.
    pub fn new(setlist: Setlist, song: Option<&str>, part: Option<&str>) -> Self {
        let start = locate(&setlist, song, part);
        Self {
            setlist,
            committed: start,
            displayed: start,
            previewing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn setlist(&self) -> &Setlist {
        &self.setlist
    }

    pub fn committed(&self) -> Selection {
        self.committed
    }

    pub fn displayed(&self) -> Selection {
        self.displayed
    }

    pub fn is_previewing(&self) -> bool {
        self.previewing.load(Ordering::Relaxed)
    }

    /// Shared with the pulse worker so it can stop once browsing ends.
    pub fn previewing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.previewing)
    }

    pub fn committed_song(&self) -> &Song {
        &self.setlist.songs[self.committed.song]
    }

    pub fn committed_part(&self) -> &Part {
        &self.committed_song().parts[self.committed.part]
    }

    pub fn displayed_song(&self) -> &Song {
        &self.setlist.songs[self.displayed.song]
    }

    pub fn displayed_part(&self) -> &Part {
        &self.displayed_song().parts[self.displayed.part]
    }

    pub fn preview_next_song(&mut self) -> bool {
        if self.displayed.song + 1 >= self.setlist.songs.len() {
            return false;
        }
        self.displayed = Selection {
            song: self.displayed.song + 1,
            part: 0,
        };
        self.mark_previewing();
        true
    }

    pub fn preview_prev_song(&mut self) -> bool {
        if self.displayed.song == 0 {
            return false;
        }
        self.displayed = Selection {
            song: self.displayed.song - 1,
            part: 0,
        };
        self.mark_previewing();
        true
    }

    pub fn preview_next_part(&mut self) -> bool {
        if self.displayed.part + 1 >= self.displayed_song().parts.len() {
            return false;
        }
        self.displayed.part += 1;
        self.mark_previewing();
        true
    }

    pub fn preview_prev_part(&mut self) -> bool {
        if self.displayed.part == 0 {
            return false;
        }
        self.displayed.part -= 1;
        self.mark_previewing();
        true
    }

    /// Make the displayed selection current. Returns it only if it changed,
    /// so an idle commit sends nothing to the pedals.
    pub fn commit(&mut self) -> Option<Selection> {
        self.previewing.store(false, Ordering::Relaxed);
        if self.displayed == self.committed {
            return None;
        }
        self.committed = self.displayed;
        log::info!(
            "Committed song {} '{}' part {} '{}'",
            self.committed.song_number(),
            self.committed_song().name,
            self.committed.part_number(),
            self.committed_part().name
        );
        Some(self.committed)
    }

    /// Jump to a song's first part and commit immediately. Out of range
    /// indices clamp to the last song.
    pub fn load_song(&mut self, song: usize) -> Selection {
        let song = song.min(self.setlist.songs.len() - 1);
        self.displayed = Selection { song, part: 0 };
        self.force_commit()
    }

    /// Jump to a part of the committed song and commit immediately. A pending
    /// song preview is dropped.
    pub fn load_part(&mut self, part: usize) -> Selection {
        let song = self.committed.song;
        let part = part.min(self.setlist.songs[song].parts.len() - 1);
        self.displayed = Selection { song, part };
        self.force_commit()
    }

    /// Swap in a freshly loaded setlist and start at its first song.
    pub fn replace_setlist(&mut self, setlist: Setlist) -> Selection {
        self.setlist = setlist;
        self.displayed = Selection::default();
        self.force_commit()
    }

    fn force_commit(&mut self) -> Selection {
        self.previewing.store(false, Ordering::Relaxed);
        self.committed = self.displayed;
        self.committed
    }

    fn mark_previewing(&self) {
        self.previewing.store(true, Ordering::Relaxed);
        log::debug!(
            "Previewing song {} part {}",
            self.displayed.song_number(),
            self.displayed.part_number()
        );
    }
}

fn locate(setlist: &Setlist, song: Option<&str>, part: Option<&str>) -> Selection {
    let Some(song_index) = song.and_then(|name| setlist.song_index(name)) else {
        if let Some(name) = song {
            log::warn!("Song '{name}' not in setlist '{}', using first", setlist.name);
        }
        return Selection::default();
    };
    let part_index = part
        .and_then(|name| setlist.songs[song_index].part_index(name))
        .unwrap_or(0);
    Selection {
        song: song_index,
        part: part_index,
    }
}
