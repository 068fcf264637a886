//! Shared player state mirrored from the native player.
//!
//! One `PlayerState` lives behind a `StateHandle` and is passed explicitly to
//! every service that reads or mutates it. The native player stays
//! authoritative: anything written here is an optimistic projection until a
//! sync event confirms it.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::config::RepeatModeSetting;
use crate::library::Track;

/// Repeat behaviour once the current track ends.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepeatMode {
    #[default]
    None,
    All,
    One,
}

impl RepeatMode {
    /// Cycle `None -> All -> One -> One`.
    ///
    /// `One` loops onto itself; there is no transition back to `None`.
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::None => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::One,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(RepeatMode::None),
            "all" => Some(RepeatMode::All),
            "one" => Some(RepeatMode::One),
            _ => None,
        }
    }
}

impl From<RepeatModeSetting> for RepeatMode {
    fn from(s: RepeatModeSetting) -> Self {
        match s {
            RepeatModeSetting::None => RepeatMode::None,
            RepeatModeSetting::All => RepeatMode::All,
            RepeatModeSetting::One => RepeatMode::One,
        }
    }
}

/// How the queue changed most recently, for watchers that redraw on change.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum QueueChange {
    #[default]
    None,
    Appended,
    Replaced,
    Removed,
    Moved,
}

/// The playback state the UI presents.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub queue: Vec<Track>,
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub progress: f64,
    pub repeat_mode: RepeatMode,
    /// Set while the queue is being replaced wholesale.
    pub reset: bool,
    pub last_change: QueueChange,
    /// Bumped on every queue mutation.
    pub revision: u64,
}

impl PlayerState {
    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.queue.get(i))
    }

    pub fn last_index(&self) -> Option<usize> {
        self.queue.len().checked_sub(1)
    }

    pub fn playback(&self) -> PlaybackState {
        match (self.current_index, self.is_playing) {
            (_, true) => PlaybackState::Playing,
            (Some(_), false) => PlaybackState::Paused,
            (None, false) => PlaybackState::Stopped,
        }
    }

    pub(crate) fn mark_changed(&mut self, change: QueueChange) {
        self.last_change = change;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Point `current_index` back at the track with `path`.
    ///
    /// `hint` is where the track is expected to be; it wins when it holds the
    /// same path, which keeps duplicates of one file apart.
    pub(crate) fn relocate_current(&mut self, path: Option<&Path>, hint: Option<usize>) {
        let Some(path) = path else {
            self.current_index = None;
            return;
        };
        let at_hint = hint.filter(|&h| self.queue.get(h).is_some_and(|t| t.path == path));
        self.current_index = at_hint.or_else(|| self.queue.iter().position(|t| t.path == path));
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateHandle(Arc<Mutex<PlayerState>>);

impl StateHandle {
    pub fn new(state: PlayerState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    /// Lock the state. A poisoned lock is recovered: the state holds plain data
    /// and every writer leaves it consistent between statements.
    pub fn lock(&self) -> MutexGuard<'_, PlayerState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> PlayerState {
        self.lock().clone()
    }
}
