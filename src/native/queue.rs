//! The native player's own queue: which file is current and what plays next.
//!
//! Kept free of audio so the ordering rules can be exercised without a device.

use std::path::{Path, PathBuf};

use crate::bridge::{BridgeError, Platform, incoming_move_target};
use crate::state::RepeatMode;

/// What to do once the current track has run out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Advance {
    Play(usize),
    Stop,
}

/// Effect of removing an entry on what is loaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Removal {
    /// The loaded track is untouched (its index may have shifted).
    Kept,
    /// The loaded track was removed; load `Some(i)` in its place, or stop.
    Replaced(Option<usize>),
}

#[derive(Debug, Default)]
pub(super) struct NativeQueue {
    paths: Vec<PathBuf>,
    index: Option<usize>,
    /// Index as of the last sync push; the UI's view of `index`.
    reported: Option<usize>,
    repeat: RepeatMode,
    platform: Platform,
}

impl NativeQueue {
    pub(super) fn new(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    pub(super) fn len(&self) -> usize {
        self.paths.len()
    }

    pub(super) fn index(&self) -> Option<usize> {
        self.index
    }

    pub(super) fn current(&self) -> Option<&Path> {
        self.index
            .and_then(|i| self.paths.get(i))
            .map(PathBuf::as_path)
    }

    pub(super) fn path(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    /// Record that `index` has just been pushed to the UI.
    pub(super) fn mark_reported(&mut self) {
        self.reported = self.index;
    }

    pub(super) fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub(super) fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    pub(super) fn set_index(&mut self, index: Option<usize>) {
        self.index = index.filter(|&i| i < self.paths.len());
    }

    pub(super) fn add(&mut self, paths: Vec<PathBuf>) {
        self.paths.extend(paths);
    }

    pub(super) fn clear(&mut self) {
        self.paths.clear();
        self.index = None;
        self.reported = None;
    }

    pub(super) fn remove(&mut self, index: usize) -> Result<Removal, BridgeError> {
        self.check(index)?;
        self.paths.remove(index);

        let removal = match self.index {
            Some(c) if index < c => {
                self.index = Some(c - 1);
                Removal::Kept
            }
            Some(c) if index == c => {
                // The entry that slid into the slot takes over.
                let next = (c < self.paths.len()).then_some(c);
                self.index = next;
                Removal::Replaced(next)
            }
            _ => Removal::Kept,
        };
        self.reported = match self.reported {
            Some(c) if index < c => Some(c - 1),
            Some(c) if index == c => (c < self.paths.len()).then_some(c),
            other => other,
        };
        Ok(removal)
    }

    /// Apply a move received with `wire_to`. The loaded entry stays loaded.
    ///
    /// The wire target was adjusted against the index the UI last saw, so it
    /// is undone against `reported`, not the live index.
    pub(super) fn move_to(&mut self, from: usize, wire_to: usize) -> Result<(), BridgeError> {
        let to = incoming_move_target(self.platform, from, wire_to, self.reported);
        self.check(from)?;
        self.check(to)?;

        let moved = self.paths.remove(from);
        self.paths.insert(to, moved);

        self.index = self.index.map(|c| shifted(c, from, to));
        self.reported = self.reported.map(|c| shifted(c, from, to));
        Ok(())
    }

    pub(super) fn check(&self, index: usize) -> Result<(), BridgeError> {
        if index >= self.paths.len() {
            return Err(BridgeError::Rejected(format!(
                "index {index} out of range for {} entries",
                self.paths.len()
            )));
        }
        Ok(())
    }

    /// Target of an explicit "next". Wraps only under `RepeatMode::All`.
    pub(super) fn next(&self) -> Option<usize> {
        let last = self.paths.len().checked_sub(1)?;
        match self.index {
            None => Some(0),
            Some(c) if c < last => Some(c + 1),
            Some(_) if self.repeat == RepeatMode::All => Some(0),
            Some(_) => None,
        }
    }

    /// Target once the current track has finished on its own.
    pub(super) fn after_end(&self) -> Advance {
        let Some(c) = self.index else {
            return Advance::Stop;
        };
        match self.repeat {
            RepeatMode::One => Advance::Play(c),
            RepeatMode::All | RepeatMode::None => self.next().map_or(Advance::Stop, Advance::Play),
        }
    }
}

/// Where the entry at `index` ends up after moving `from` to `to`.
fn shifted(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        to
    } else if from < index && index <= to {
        index - 1
    } else if to <= index && index < from {
        index + 1
    } else {
        index
    }
}
