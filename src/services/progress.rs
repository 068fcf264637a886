//! Local interpolation of playback progress between sync events.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::ProgressSettings;
use crate::state::StateHandle;

/// Inputs at or above this are taken as milliseconds, below it as seconds.
const MILLIS_THRESHOLD: f64 = 10_000.0;

struct Ticker {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

pub struct ProgressService {
    state: StateHandle,
    settings: ProgressSettings,
    ticker: Mutex<Option<Ticker>>,
}

impl ProgressService {
    pub fn new(state: StateHandle, settings: ProgressSettings) -> Self {
        Self {
            state,
            settings,
            ticker: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ProgressSettings {
        &self.settings
    }

    fn ticker(&self) -> MutexGuard<'_, Option<Ticker>> {
        self.ticker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Time between ticks for a track of `duration_ms` so that every tick
    /// advances progress by exactly one `step`.
    pub fn tick_interval(&self, duration_ms: u64) -> Duration {
        let span = self.settings.max - self.settings.min;
        let ms = (duration_ms as f64 / span) * self.settings.step;
        Duration::from_secs_f64(ms.max(1.0) / 1000.0)
    }

    /// Map a position inside a track onto `[min, max]`.
    pub fn normalize(&self, position_ms: f64, duration_ms: f64) -> f64 {
        let ProgressSettings { min, max, .. } = self.settings;
        if !(duration_ms > 0.0) || !position_ms.is_finite() {
            return min;
        }
        (min + (position_ms / duration_ms) * (max - min)).clamp(min, max)
    }

    /// Progress as a percentage of `[min, max]`.
    pub fn percentage(&self) -> f64 {
        let ProgressSettings { min, max, .. } = self.settings;
        let value = self.state.lock().progress;
        ((value - min) / (max - min) * 100.0).clamp(0.0, 100.0)
    }

    pub fn set(&self, value: f64) {
        let ProgressSettings { min, max, .. } = self.settings;
        self.state.lock().progress = value.clamp(min, max);
    }

    /// (Re)start the ticker for the current track. Any running ticker is stopped first.
    pub fn start(&self) {
        let mut ticker = self.ticker();
        stop_ticker(ticker.take());

        let duration_ms = self
            .state
            .lock()
            .current_track()
            .and_then(|t| t.duration_ms())
            .filter(|&d| d > 0);
        let Some(duration_ms) = duration_ms else {
            log::debug!("progress ticker not started: no current track duration");
            return;
        };

        let interval = self.tick_interval(duration_ms);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = self.state.clone();
        let settings = self.settings.clone();

        let spawned = thread::Builder::new()
            .name("progress-ticker".into())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if advance(&state, &settings) {
                                // Hold at max; the native player's next sync moves us on.
                                log::debug!("progress reached max, ticker idle until next sync");
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        match spawned {
            Ok(join) => *ticker = Some(Ticker { stop_tx, join }),
            Err(e) => log::error!("failed to spawn progress ticker: {e}"),
        }
    }

    /// Stop the ticker. Safe to call when nothing is running.
    pub fn stop(&self) {
        let taken = self.ticker().take();
        stop_ticker(taken);
    }

    /// Stop the ticker and put progress back to `min`.
    pub fn reset(&self) {
        self.stop();
        self.set(self.settings.min);
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.ticker()
            .as_ref()
            .is_some_and(|t| !t.join.is_finished())
    }
}

impl Drop for ProgressService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stop_ticker(ticker: Option<Ticker>) {
    if let Some(Ticker { stop_tx, join }) = ticker {
        drop(stop_tx);
        if join.join().is_err() {
            log::error!("progress ticker panicked");
        }
    }
}

/// Advance progress by one step. Returns true once `max` is reached.
fn advance(state: &StateHandle, settings: &ProgressSettings) -> bool {
    let mut s = state.lock();
    if !s.is_playing {
        return false;
    }
    s.progress = (s.progress + settings.step).clamp(settings.min, settings.max);
    s.progress >= settings.max
}

/// Format a duration as `m:ss`.
///
/// Values `>= 10000` are read as milliseconds, anything smaller as seconds.
/// Seconds are rounded and a rounded `60` carries into the minutes, so the
/// output never shows `:60`. `negative` prefixes a minus sign (remaining time).
pub fn format_duration(value: f64, negative: bool) -> String {
    let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
    let total_secs = if value >= MILLIS_THRESHOLD {
        value / 1000.0
    } else {
        value
    };

    let mut minutes = (total_secs / 60.0).floor() as u64;
    let mut secs = (total_secs % 60.0).round() as u64;
    if secs == 60 {
        minutes += 1;
        secs = 0;
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{minutes}:{secs:02}")
}
