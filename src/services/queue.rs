//! Queue mutations, each paired with the matching bridge call.

use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::{Platform, PlayerBridge, TransportCommand, outgoing_move_target};
use crate::library::Track;
use crate::state::{QueueChange, StateHandle};

use super::move_queue::{MoveQueue, MoveTicket};
use super::progress::ProgressService;
use super::QueueError;

pub struct QueueService {
    bridge: Arc<dyn PlayerBridge>,
    state: StateHandle,
    progress: Arc<ProgressService>,
    moves: MoveQueue,
    platform: Platform,
}

impl QueueService {
    pub fn new(
        bridge: Arc<dyn PlayerBridge>,
        state: StateHandle,
        progress: Arc<ProgressService>,
        platform: Platform,
    ) -> Self {
        Self {
            bridge,
            state,
            progress,
            moves: MoveQueue::new(),
            platform,
        }
    }

    pub fn add(&self, track: Track) -> Result<(), QueueError> {
        self.add_list(vec![track])
    }

    /// Append `tracks` once the native queue has accepted them. No dedup.
    pub fn add_list(&self, tracks: Vec<Track>) -> Result<(), QueueError> {
        if tracks.is_empty() {
            return Ok(());
        }
        self.bridge.queue_add(paths_of(&tracks))?;

        let mut s = self.state.lock();
        s.queue.extend(tracks);
        s.mark_changed(QueueChange::Appended);
        Ok(())
    }

    pub fn reset_and_add(&self, track: Track) -> Result<(), QueueError> {
        self.reset_and_add_list(vec![track])
    }

    /// Replace the whole queue. `reset` stays raised for the duration so
    /// watchers can tell a replacement from an append.
    pub fn reset_and_add_list(&self, tracks: Vec<Track>) -> Result<(), QueueError> {
        self.state.lock().reset = true;
        let result = self.replace(tracks);
        self.state.lock().reset = false;
        result
    }

    fn replace(&self, tracks: Vec<Track>) -> Result<(), QueueError> {
        self.progress.reset();
        self.bridge.transport(TransportCommand::Clear)?;
        {
            let mut s = self.state.lock();
            s.queue.clear();
            s.current_index = None;
            s.is_playing = false;
        }

        if !tracks.is_empty() {
            self.bridge.queue_add(paths_of(&tracks))?;
        }
        {
            let mut s = self.state.lock();
            s.queue = tracks;
            s.mark_changed(QueueChange::Replaced);
        }

        self.progress.start();
        Ok(())
    }

    /// Remove the entry at `index`. Out of range is a silent no-op.
    pub fn remove(&self, index: usize) -> Result<(), QueueError> {
        let len = self.state.lock().queue.len();
        if index >= len {
            log::debug!("remove({index}) ignored, queue has {len} entries");
            return Ok(());
        }
        self.bridge.queue_remove(index)?;

        let mut s = self.state.lock();
        if index >= s.queue.len() {
            return Ok(());
        }
        s.queue.remove(index);
        s.current_index = match s.current_index {
            Some(c) if index < c => Some(c - 1),
            Some(c) if c < s.queue.len() => Some(c),
            _ => None,
        };
        s.mark_changed(QueueChange::Removed);
        Ok(())
    }

    /// Jump native playback to `index`. The local index follows on the next sync.
    pub fn go_to(&self, index: usize) -> Result<(), QueueError> {
        self.bridge.queue_go_to(index)?;
        Ok(())
    }

    /// Queue a move of the entry at `from` to final position `to`.
    ///
    /// Returns `None` when there is nothing to move. Moves run in submission
    /// order; the returned ticket resolves once this one has been applied.
    pub fn move_to(&self, from: usize, to: usize) -> Option<MoveTicket> {
        if from == to {
            return None;
        }

        let bridge = self.bridge.clone();
        let state = self.state.clone();
        let platform = self.platform;

        Some(self.moves.add(move || {
            let wire_to = {
                let s = state.lock();
                check_move_bounds(from, to, s.queue.len())?;
                outgoing_move_target(platform, from, to, s.current_index)
            };
            bridge.queue_move_to(from, wire_to)?;

            let mut s = state.lock();
            check_move_bounds(from, to, s.queue.len())?;
            let current = s.current_index;
            let current_path = s.current_track().map(|t| t.path.clone());

            let moved = s.queue.remove(from);
            s.queue.insert(to, moved);

            let hint = current.map(|c| shifted_index(c, from, to));
            s.relocate_current(current_path.as_deref(), hint);
            s.mark_changed(QueueChange::Moved);
            Ok(())
        }))
    }

    /// Moves queued or running.
    pub fn pending_moves(&self) -> usize {
        self.moves.pending()
    }
}

fn paths_of(tracks: &[Track]) -> Vec<PathBuf> {
    tracks.iter().map(|t| t.path.clone()).collect()
}

fn check_move_bounds(from: usize, to: usize, len: usize) -> Result<(), QueueError> {
    let index = from.max(to);
    if index >= len {
        return Err(QueueError::IndexOutOfRange { index, len });
    }
    Ok(())
}

/// Where the entry at `index` ends up after moving `from` to `to`.
fn shifted_index(index: usize, from: usize, to: usize) -> usize {
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

#[cfg(test)]
mod tests {
    use super::shifted_index;

    #[test]
    fn shifted_index_follows_the_moved_entry_and_its_neighbours() {
        // [A B C D], move B (1) to 3 -> [A C D B]
        assert_eq!(shifted_index(1, 1, 3), 3);
        assert_eq!(shifted_index(2, 1, 3), 1);
        assert_eq!(shifted_index(3, 1, 3), 2);
        assert_eq!(shifted_index(0, 1, 3), 0);
        // [A B C D], move D (3) to 0 -> [D A B C]
        assert_eq!(shifted_index(0, 3, 0), 1);
        assert_eq!(shifted_index(2, 3, 0), 3);
    }
}
