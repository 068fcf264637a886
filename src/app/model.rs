//! Application model: cursor, follow mode and status line.
//!
//! The queue itself lives in the shared `PlayerState`; `App` only holds what
//! the terminal UI adds on top of it.

use crate::services::{MoveTicket, QueueError};

/// The main application model.
pub struct App {
    /// Cursor position in the queue.
    pub selected: usize,
    /// Whether the cursor jumps to the current track when it changes.
    pub follow_playback: bool,
    pub current_dir: Option<String>,
    pub metadata_window: bool,
    /// Last message for the status line (errors and confirmations).
    pub status: Option<String>,
    pending_moves: Vec<MoveTicket>,
}

impl App {
    pub fn new(follow_playback: bool) -> Self {
        Self {
            selected: 0,
            follow_playback,
            current_dir: None,
            metadata_window: false,
            status: None,
            pending_moves: Vec::new(),
        }
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn toggle_follow_playback(&mut self) {
        self.follow_playback = !self.follow_playback;
    }

    /// Move the cursor down, wrapping. Manual movement leaves follow mode.
    pub fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.follow_playback = false;
        self.selected = (self.selected + 1) % len;
    }

    /// Move the cursor up, wrapping. Manual movement leaves follow mode.
    pub fn select_prev(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        self.follow_playback = false;
        self.selected = if self.selected == 0 {
            len - 1
        } else {
            self.selected - 1
        };
    }

    pub fn select_first(&mut self) {
        self.follow_playback = false;
        self.selected = 0;
    }

    pub fn select_last(&mut self, len: usize) {
        self.follow_playback = false;
        self.selected = len.saturating_sub(1);
    }

    /// Keep the cursor inside a queue of `len` entries.
    pub fn clamp_selection(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// Jump to `current` when following playback.
    pub fn follow(&mut self, current: Option<usize>) {
        if let (true, Some(idx)) = (self.follow_playback, current) {
            self.selected = idx;
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    pub fn report(&mut self, err: &QueueError) {
        log::warn!("{err}");
        self.set_status(format!("error: {err}"));
    }

    /// Remember a queued move so its outcome reaches the status line.
    pub fn track_move(&mut self, ticket: MoveTicket) {
        self.pending_moves.push(ticket);
    }

    /// Collect finished moves. Failures are reported; returns how many finished.
    pub fn poll_moves(&mut self) -> usize {
        let mut finished = Vec::new();
        self.pending_moves.retain(|t| match t.try_result() {
            Some(outcome) => {
                finished.push(outcome);
                false
            }
            None => true,
        });

        for outcome in &finished {
            if let Err(e) = outcome {
                self.report(e);
            }
        }
        finished.len()
    }
}
