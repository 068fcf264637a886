use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::bridge::{BridgeError, BridgeRequest, Platform, PlayerBridge, SyncEvent};
use crate::state::RepeatMode;

use super::thread::{NativeCmd, spawn_native_thread};

#[derive(Debug, Clone, Copy)]
pub struct NativeOptions {
    pub platform: Platform,
    /// Period of the unsolicited sync push.
    pub sync_interval: Duration,
    pub repeat: RepeatMode,
}

/// The in-process native player. Owns the audio thread; talks to it only
/// through its command channel.
pub struct NativePlayer {
    tx: Sender<NativeCmd>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl NativePlayer {
    /// Open the default output device and start the audio thread. Sync
    /// events are pushed into `sync_tx`.
    pub fn spawn(options: NativeOptions, sync_tx: Sender<SyncEvent>) -> Result<Self, BridgeError> {
        let (tx, rx) = mpsc::channel::<NativeCmd>();
        let handle = spawn_native_thread(rx, sync_tx, options)?;
        Ok(Self {
            tx,
            join: Mutex::new(Some(handle)),
        })
    }

    /// Fade out, stop the audio thread and wait for it.
    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.tx.send(NativeCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

impl PlayerBridge for NativePlayer {
    fn call(&self, request: BridgeRequest) -> Result<(), BridgeError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(NativeCmd::Call { request, reply })
            .map_err(|_| BridgeError::Disconnected)?;
        rx.recv().map_err(|_| BridgeError::Disconnected)?
    }
}
