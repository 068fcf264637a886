//! Transport control and reconciliation with pushed sync events.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use crate::bridge::{PlayerBridge, SYNC_EVENT, SyncEvent, TransportCommand};
use crate::state::{RepeatMode, StateHandle};

use super::progress::ProgressService;
use super::queue::QueueService;
use super::QueueError;

pub struct MusicPlayerService {
    bridge: Arc<dyn PlayerBridge>,
    state: StateHandle,
    progress: Arc<ProgressService>,
    queue: Arc<QueueService>,
}

impl MusicPlayerService {
    pub fn new(
        bridge: Arc<dyn PlayerBridge>,
        state: StateHandle,
        progress: Arc<ProgressService>,
        queue: Arc<QueueService>,
    ) -> Self {
        Self {
            bridge,
            state,
            progress,
            queue,
        }
    }

    pub fn queue(&self) -> &QueueService {
        &self.queue
    }

    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    pub fn play(&self) -> Result<(), QueueError> {
        {
            let mut s = self.state.lock();
            if s.queue.is_empty() {
                log::warn!("play() with an empty queue, ignoring");
                return Ok(());
            }
            if s.is_playing {
                log::warn!("play() while already playing");
            }
            // Flag first so nothing renders "paused" while the command is in flight.
            s.is_playing = true;
        }
        self.bridge.transport(TransportCommand::Play)?;
        self.progress.start();
        Ok(())
    }

    pub fn pause(&self) -> Result<(), QueueError> {
        {
            let mut s = self.state.lock();
            if !s.is_playing {
                log::warn!("pause() while not playing");
            }
            s.is_playing = false;
        }
        self.bridge.transport(TransportCommand::Pause)?;
        self.progress.stop();
        Ok(())
    }

    pub fn toggle_play(&self) -> Result<(), QueueError> {
        let playing = self.state.lock().is_playing;
        if playing { self.pause() } else { self.play() }
    }

    /// Skip forward. At the last entry this does nothing at all: no command is
    /// sent and the index stays where it is.
    pub fn next(&self) -> Result<(), QueueError> {
        let (current, last) = {
            let s = self.state.lock();
            (s.current_index, s.last_index())
        };
        if current == last {
            log::debug!("next() at end of queue, nothing to do");
            return Ok(());
        }
        self.bridge.transport(TransportCommand::Next)?;
        Ok(())
    }

    /// Jump to the entry before the current one; no-op at the first entry.
    pub fn previous(&self) -> Result<(), QueueError> {
        let current = self.state.lock().current_index;
        match current {
            Some(c) if c > 0 => self.queue.go_to(c - 1),
            _ => Ok(()),
        }
    }

    /// Seek to `pct` percent of the current track, then ask for a fresh sync.
    ///
    /// Returns the position sent, in milliseconds.
    pub fn seek_by_percentage(&self, pct: f64) -> Result<Option<u64>, QueueError> {
        if pct.is_nan() {
            return Ok(None);
        }
        let pct = pct.clamp(0.0, 100.0);

        let duration = self
            .state
            .lock()
            .current_track()
            .and_then(|t| t.duration_ms())
            .filter(|&d| d > 0);
        let Some(duration) = duration else {
            log::warn!("seek ignored: no current track duration");
            return Ok(None);
        };

        let position = (duration as f64 * pct / 100.0).round() as u64;
        self.bridge.set_position(position)?;
        self.bridge.request_sync()?;
        Ok(Some(position))
    }

    /// Seek relative to the current progress, in percent of the track.
    pub fn seek_relative(&self, delta_pct: f64) -> Result<Option<u64>, QueueError> {
        self.seek_by_percentage(self.progress.percentage() + delta_pct)
    }

    /// Cycle the repeat mode (`None -> All -> One`, then stays at `One`).
    pub fn toggle_repeat_mode(&self) -> Result<RepeatMode, QueueError> {
        let mode = {
            let mut s = self.state.lock();
            s.repeat_mode = s.repeat_mode.cycled();
            s.repeat_mode
        };
        self.bridge.set_repeat(mode)?;
        Ok(mode)
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<(), QueueError> {
        self.state.lock().repeat_mode = mode;
        self.bridge.set_repeat(mode)?;
        Ok(())
    }

    /// Overwrite local state with an authoritative sync event.
    pub fn reconcile(&self, event: &SyncEvent) {
        // The ticker must not write between here and the restart below.
        self.progress.stop();

        let playing = {
            let mut s = self.state.lock();
            match event.current_index() {
                Some(i) => {
                    let duration = if i < s.queue.len() {
                        s.current_index = Some(i);
                        s.current_track()
                            .and_then(|t| t.duration_ms())
                            .map(|d| d as f64)
                            .filter(|&d| d > 0.0)
                            .unwrap_or(event.duration)
                    } else {
                        log::warn!(
                            "sync index {i} outside local queue of {}, keeping {:?}",
                            s.queue.len(),
                            s.current_index
                        );
                        // The kept track is not the one playing.
                        event.duration
                    };
                    s.progress = self.progress.normalize(event.current_position, duration);
                }
                None => {
                    s.current_index = None;
                    s.progress = self.progress.settings().min;
                }
            }
            s.is_playing = event.is_playing;
            if let Some(mode) = event.repeat_mode {
                s.repeat_mode = mode;
            }
            s.is_playing
        };

        if playing {
            self.progress.start();
        }
    }

    /// Reconcile every event from `rx` on a listener thread until the sender hangs up.
    pub fn listen_sync_events(
        self: &Arc<Self>,
        rx: Receiver<SyncEvent>,
    ) -> io::Result<JoinHandle<()>> {
        let this = self.clone();
        thread::Builder::new()
            .name("sync-listener".into())
            .spawn(move || {
                for event in rx {
                    log::trace!(target: SYNC_EVENT, "recv {event:?}");
                    this.reconcile(&event);
                }
                log::debug!("sync channel closed, listener exiting");
            })
    }
}
