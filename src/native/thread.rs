use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use crate::bridge::{BridgeError, BridgeRequest, SYNC_EVENT, SyncEvent, TransportCommand};

use super::clock::Clock;
use super::player::NativeOptions;
use super::queue::{Advance, NativeQueue, Removal};
use super::sink::{fade_out, open_sink_at};

/// Upper bound on how long a finished track goes unnoticed.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub(super) enum NativeCmd {
    Call {
        request: BridgeRequest,
        reply: Sender<Result<(), BridgeError>>,
    },
    Quit {
        fade_out_ms: u64,
    },
}

/// Start the audio thread. Returns once the output device is open, or with
/// the reason it could not be.
pub(super) fn spawn_native_thread(
    rx: Receiver<NativeCmd>,
    sync_tx: Sender<SyncEvent>,
    options: NativeOptions,
) -> Result<JoinHandle<()>, BridgeError> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<(), BridgeError>>();

    let handle = thread::Builder::new()
        .name("native-player".into())
        .spawn(move || {
            let mut stream = match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(BridgeError::Native(format!(
                        "no audio output device: {e}"
                    ))));
                    return;
                }
            };
            // rodio prints to stderr when the stream drops, which garbles the TUI.
            stream.log_on_drop(false);
            let _ = ready_tx.send(Ok(()));

            let mut queue = NativeQueue::new(options.platform);
            queue.set_repeat(options.repeat);
            let mut engine = Engine {
                stream,
                queue,
                sink: None,
                duration: None,
                clock: Clock::default(),
                sync_tx,
            };
            engine.run(rx, options.sync_interval);
        })
        .map_err(|e| BridgeError::Native(format!("failed to spawn audio thread: {e}")))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(handle),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(BridgeError::Disconnected)
        }
    }
}

struct Engine {
    stream: OutputStream,
    queue: NativeQueue,
    sink: Option<Sink>,
    duration: Option<Duration>,
    clock: Clock,
    sync_tx: Sender<SyncEvent>,
}

impl Engine {
    fn run(&mut self, rx: Receiver<NativeCmd>, sync_interval: Duration) {
        let poll = sync_interval.min(POLL_INTERVAL);
        let mut last_sync = Instant::now();

        loop {
            match rx.recv_timeout(poll) {
                Ok(NativeCmd::Call { request, reply }) => {
                    log::debug!("native <- {request:?}");
                    let result = self.handle(request);
                    if let Err(e) = &result {
                        log::warn!("native request failed: {e}");
                    }
                    let _ = reply.send(result);
                    self.push_sync();
                    last_sync = Instant::now();
                }
                Ok(NativeCmd::Quit { fade_out_ms }) => {
                    if let Some(sink) = self.sink.take() {
                        fade_out(&sink, fade_out_ms);
                        sink.stop();
                    }
                    self.clock.pause();
                    self.push_sync();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.advance_if_finished() || last_sync.elapsed() >= sync_interval {
                        self.push_sync();
                        last_sync = Instant::now();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::debug!("native player thread exiting");
    }

    fn is_playing(&self) -> bool {
        self.sink.is_some() && self.clock.is_running()
    }

    fn handle(&mut self, request: BridgeRequest) -> Result<(), BridgeError> {
        match request {
            BridgeRequest::Transport { command } => self.transport(command),
            BridgeRequest::SetPosition { position } => {
                let Some(i) = self.queue.index() else {
                    return Err(BridgeError::Rejected("no track loaded".into()));
                };
                let mut at = Duration::from_millis(position);
                if let Some(d) = self.duration {
                    at = at.min(d);
                }
                let playing = self.is_playing();
                self.load(i, at, playing)
            }
            BridgeRequest::RequestSync => Ok(()),
            BridgeRequest::QueueAdd { playlist } => {
                self.queue.add(playlist);
                Ok(())
            }
            BridgeRequest::QueueRemove { index } => match self.queue.remove(index)? {
                Removal::Kept => Ok(()),
                Removal::Replaced(Some(i)) => {
                    let playing = self.is_playing();
                    self.load(i, Duration::ZERO, playing)
                        .inspect_err(|_| self.unload())
                }
                Removal::Replaced(None) => {
                    self.unload();
                    Ok(())
                }
            },
            BridgeRequest::QueueGoTo { index } => {
                self.queue.check(index)?;
                self.load(index, Duration::ZERO, true)
            }
            BridgeRequest::QueueMoveTo { from, to } => self.queue.move_to(from, to),
            BridgeRequest::SetRepeat { mode } => {
                self.queue.set_repeat(mode);
                Ok(())
            }
        }
    }

    fn transport(&mut self, command: TransportCommand) -> Result<(), BridgeError> {
        match command {
            TransportCommand::Play => {
                if let Some(sink) = &self.sink {
                    sink.play();
                    self.clock.resume();
                    return Ok(());
                }
                match self.queue.index().or_else(|| self.queue.next()) {
                    Some(i) => self.load(i, Duration::ZERO, true),
                    None => {
                        log::debug!("play with an empty native queue");
                        Ok(())
                    }
                }
            }
            TransportCommand::Pause => {
                if let Some(sink) = &self.sink {
                    sink.pause();
                }
                self.clock.pause();
                Ok(())
            }
            TransportCommand::Next => match self.queue.next() {
                Some(i) => self.load(i, Duration::ZERO, true),
                None => Ok(()),
            },
            TransportCommand::Clear => {
                self.unload();
                self.queue.clear();
                Ok(())
            }
        }
    }

    /// Load entry `index` at `at`. On failure nothing changes.
    fn load(&mut self, index: usize, at: Duration, play: bool) -> Result<(), BridgeError> {
        let Some(path) = self.queue.path(index) else {
            return Err(BridgeError::Rejected(format!("no entry at {index}")));
        };
        let (sink, duration) = open_sink_at(&self.stream, path, at)?;

        if let Some(old) = self.sink.replace(sink) {
            old.stop();
        }
        self.queue.set_index(Some(index));
        self.duration = duration;
        self.clock = Clock::at(at);
        if play {
            if let Some(sink) = &self.sink {
                sink.play();
            }
            self.clock.resume();
        }
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.queue.set_index(None);
        self.duration = None;
        self.clock = Clock::default();
    }

    /// Move on when the loaded track has played out. Returns true if anything changed.
    fn advance_if_finished(&mut self) -> bool {
        let finished = self.is_playing() && self.sink.as_ref().is_some_and(Sink::empty);
        if !finished {
            return false;
        }

        match self.queue.after_end() {
            Advance::Play(i) => {
                if let Err(e) = self.load(i, Duration::ZERO, true) {
                    log::error!("auto-advance to {i} failed: {e}");
                    self.unload();
                }
            }
            Advance::Stop => self.unload(),
        }
        true
    }

    fn push_sync(&mut self) {
        self.queue.mark_reported();
        let event = SyncEvent {
            index: self.queue.index().map_or(-1, |i| i as i64),
            current_position: self.clock.elapsed().as_millis() as f64,
            is_playing: self.is_playing(),
            duration: self.duration.map_or(0.0, |d| d.as_millis() as f64),
            repeat_mode: Some(self.queue.repeat()),
        };
        log::trace!(target: SYNC_EVENT, "push {event:?}");
        // Nobody listening is fine; the UI may already be gone.
        let _ = self.sync_tx.send(event);
    }
}
