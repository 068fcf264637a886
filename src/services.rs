//! Services that keep the local queue mirror in step with the native player.
//!
//! - `ProgressService` interpolates playback progress between syncs.
//! - `MoveQueue` runs reorder operations one at a time, in submission order.
//! - `QueueService` owns queue mutations and pairs each with a bridge call.
//! - `MusicPlayerService` sends transport commands and reconciles sync events.

mod move_queue;
mod player;
mod progress;
mod queue;

pub use move_queue::{MoveQueue, MoveTicket};
pub use player::MusicPlayerService;
pub use progress::{ProgressService, format_duration};
pub use queue::QueueService;

use thiserror::Error;

use crate::bridge::BridgeError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("index {index} is out of range for a queue of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("queued operation panicked: {0}")]
    Panicked(String),
    #[error("move queue shut down before the operation finished")]
    Dropped,
}

#[cfg(test)]
mod tests;
