//! The command bridge between the queue mirror and the native player.
//!
//! Every request is a small serializable payload; the native side answers
//! each one with `Ok(())` or a `BridgeError` and, independently, pushes
//! `SyncEvent`s describing its authoritative state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PlatformSetting;
use crate::state::RepeatMode;

/// Name of the pushed sync event.
pub const SYNC_EVENT: &str = "music_player_sync";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransportCommand {
    Play,
    Pause,
    Next,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeRequest {
    /// Control native playback.
    Transport { command: TransportCommand },
    /// Seek to an absolute position in milliseconds.
    SetPosition { position: u64 },
    /// Ask for an out-of-band sync push.
    RequestSync,
    /// Append tracks (by path) to the native queue.
    QueueAdd { playlist: Vec<PathBuf> },
    /// Remove the entry at `index` from the native queue.
    QueueRemove { index: usize },
    /// Jump playback to `index`.
    QueueGoTo { index: usize },
    /// Reorder the native queue.
    QueueMoveTo { from: usize, to: usize },
    SetRepeat { mode: RepeatMode },
}

/// Authoritative snapshot pushed by the native player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    /// Queue index of the current track, `-1` when nothing is loaded.
    pub index: i64,
    /// Position in the current track (milliseconds).
    pub current_position: f64,
    pub is_playing: bool,
    /// Duration of the current track (milliseconds), `0` when unknown.
    pub duration: f64,
    #[serde(default)]
    pub repeat_mode: Option<RepeatMode>,
}

impl SyncEvent {
    pub fn current_index(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }
}

/// Which native queue the bridge talks to. They disagree on move targets.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Platform {
    /// Counts a downward move's target as an insertion point *before* removal,
    /// but only when the move crosses the playing entry.
    #[default]
    Desktop,
    Mobile,
}

impl From<PlatformSetting> for Platform {
    fn from(s: PlatformSetting) -> Self {
        match s {
            PlatformSetting::Desktop => Platform::Desktop,
            PlatformSetting::Mobile => Platform::Mobile,
        }
    }
}

fn crosses_current_downward(from: usize, to: usize, current: Option<usize>) -> bool {
    current.is_some_and(|c| from < c && c <= to)
}

/// Target index to put on the wire for moving `from` to final position `to`.
pub fn outgoing_move_target(
    platform: Platform,
    from: usize,
    to: usize,
    current: Option<usize>,
) -> usize {
    if platform == Platform::Desktop && crosses_current_downward(from, to, current) {
        to + 1
    } else {
        to
    }
}

/// Final position for a move received with `wire_to`; inverse of [`outgoing_move_target`].
pub fn incoming_move_target(
    platform: Platform,
    from: usize,
    wire_to: usize,
    current: Option<usize>,
) -> usize {
    let crossed = current.is_some_and(|c| from < c && wire_to > c);
    if platform == Platform::Desktop && crossed {
        wire_to - 1
    } else {
        wire_to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("native player is not running")]
    Disconnected,
    #[error("native player rejected the request: {0}")]
    Rejected(String),
    #[error("native player failed: {0}")]
    Native(String),
}

/// A channel to the native player. Calls block until the native side replies.
pub trait PlayerBridge: Send + Sync {
    fn call(&self, request: BridgeRequest) -> Result<(), BridgeError>;

    fn transport(&self, command: TransportCommand) -> Result<(), BridgeError> {
        self.call(BridgeRequest::Transport { command })
    }

    fn set_position(&self, position_ms: u64) -> Result<(), BridgeError> {
        self.call(BridgeRequest::SetPosition {
            position: position_ms,
        })
    }

    fn request_sync(&self) -> Result<(), BridgeError> {
        self.call(BridgeRequest::RequestSync)
    }

    fn queue_add(&self, playlist: Vec<PathBuf>) -> Result<(), BridgeError> {
        self.call(BridgeRequest::QueueAdd { playlist })
    }

    fn queue_remove(&self, index: usize) -> Result<(), BridgeError> {
        self.call(BridgeRequest::QueueRemove { index })
    }

    fn queue_go_to(&self, index: usize) -> Result<(), BridgeError> {
        self.call(BridgeRequest::QueueGoTo { index })
    }

    fn queue_move_to(&self, from: usize, to: usize) -> Result<(), BridgeError> {
        self.call(BridgeRequest::QueueMoveTo { from, to })
    }

    fn set_repeat(&self, mode: RepeatMode) -> Result<(), BridgeError> {
        self.call(BridgeRequest::SetRepeat { mode })
    }
}
