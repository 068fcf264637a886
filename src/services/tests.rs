use super::*;
use crate::bridge::{BridgeError, BridgeRequest, Platform, PlayerBridge, SyncEvent, TransportCommand};
use crate::config::ProgressSettings;
use crate::library::Track;
use crate::state::{PlayerState, QueueChange, RepeatMode, StateHandle};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// What the bridge saw in shared state while a request was in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Observed {
    reset: bool,
    is_playing: bool,
}

#[derive(Default)]
struct FakeBridge {
    requests: Mutex<Vec<BridgeRequest>>,
    observed: Mutex<Vec<Observed>>,
    fail_when: Mutex<Option<fn(&BridgeRequest) -> bool>>,
    state: OnceLock<StateHandle>,
}

impl FakeBridge {
    fn requests(&self) -> Vec<BridgeRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn fail_when(&self, pred: fn(&BridgeRequest) -> bool) {
        *self.fail_when.lock().unwrap() = Some(pred);
    }
}

impl PlayerBridge for FakeBridge {
    fn call(&self, request: BridgeRequest) -> Result<(), BridgeError> {
        if let Some(state) = self.state.get() {
            let s = state.lock();
            self.observed.lock().unwrap().push(Observed {
                reset: s.reset,
                is_playing: s.is_playing,
            });
        }
        let fail = self.fail_when.lock().unwrap().is_some_and(|p| p(&request));
        self.requests.lock().unwrap().push(request);
        if fail {
            return Err(BridgeError::Rejected("test failure".into()));
        }
        Ok(())
    }
}

fn track(name: &str, secs: u64) -> Track {
    Track {
        path: PathBuf::from(format!("/music/{name}.flac")),
        title: name.into(),
        artist: None,
        album: None,
        track_number: None,
        cover: None,
        duration: Some(Duration::from_secs(secs)),
        display: name.into(),
    }
}

fn abc() -> Vec<Track> {
    vec![track("A", 200), track("B", 180), track("C", 240)]
}

struct Fixture {
    bridge: Arc<FakeBridge>,
    state: StateHandle,
    player: Arc<MusicPlayerService>,
}

impl Fixture {
    fn queue(&self) -> &QueueService {
        self.player.queue()
    }

    fn titles(&self) -> Vec<String> {
        self.state
            .lock()
            .queue
            .iter()
            .map(|t| t.title.clone())
            .collect()
    }
}

fn fixture_on(platform: Platform, tracks: Vec<Track>, current: Option<usize>) -> Fixture {
    let state = StateHandle::new(PlayerState {
        queue: tracks,
        current_index: current,
        ..PlayerState::default()
    });
    let bridge = Arc::new(FakeBridge::default());
    let _ = bridge.state.set(state.clone());
    let dyn_bridge: Arc<dyn PlayerBridge> = bridge.clone();

    let progress = Arc::new(ProgressService::new(
        state.clone(),
        ProgressSettings::default(),
    ));
    let queue = Arc::new(QueueService::new(
        dyn_bridge.clone(),
        state.clone(),
        progress.clone(),
        platform,
    ));
    let player = Arc::new(MusicPlayerService::new(
        dyn_bridge,
        state.clone(),
        progress,
        queue,
    ));

    Fixture {
        bridge,
        state,
        player,
    }
}

fn fixture(tracks: Vec<Track>, current: Option<usize>) -> Fixture {
    fixture_on(Platform::Mobile, tracks, current)
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// --- MoveQueue ---------------------------------------------------------------

#[test]
fn move_queue_runs_operations_in_submission_order() {
    let moves = MoveQueue::new();
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let tickets: Vec<MoveTicket> = [60u64, 20, 0]
        .into_iter()
        .enumerate()
        .map(|(i, delay)| {
            let log = log.clone();
            moves.add(move || {
                log.lock().unwrap().push(format!("start {i}"));
                thread::sleep(Duration::from_millis(delay));
                log.lock().unwrap().push(format!("end {i}"));
                Ok(())
            })
        })
        .collect();

    for t in tickets {
        assert_eq!(t.wait(), Ok(()));
    }
    assert_eq!(
        *log.lock().unwrap(),
        vec!["start 0", "end 0", "start 1", "end 1", "start 2", "end 2"]
    );
    assert_eq!(moves.pending(), 0);
}

#[test]
fn move_queue_isolates_failures_and_panics() {
    let moves = MoveQueue::new();
    let ran_last = Arc::new(Mutex::new(false));

    let t1 = moves.add(|| Ok(()));
    let t2 = moves.add(|| Err(QueueError::IndexOutOfRange { index: 9, len: 3 }));
    let t3 = moves.add(|| panic!("drag handler blew up"));
    let ran = ran_last.clone();
    let t4 = moves.add(move || {
        *ran.lock().unwrap() = true;
        Ok(())
    });

    assert_eq!(t1.wait(), Ok(()));
    assert_eq!(
        t2.wait(),
        Err(QueueError::IndexOutOfRange { index: 9, len: 3 })
    );
    assert_eq!(
        t3.wait(),
        Err(QueueError::Panicked("drag handler blew up".into()))
    );
    assert_eq!(t4.wait(), Ok(()));
    assert!(*ran_last.lock().unwrap());
}

#[test]
fn move_ticket_try_result_is_none_until_done() {
    let moves = MoveQueue::new();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let ticket = moves.add(move || {
        let _ = go_rx.recv();
        Ok(())
    });

    assert_eq!(ticket.try_result(), None);
    assert_eq!(moves.pending(), 1);
    go_tx.send(()).unwrap();
    assert!(wait_until(|| moves.pending() == 0));
    assert_eq!(ticket.wait(), Ok(()));
}

// --- QueueService --------------------------------------------------------------

#[test]
fn add_appends_after_bridge_confirms_without_dedup() {
    let f = fixture(vec![], None);
    f.queue().add(track("A", 10)).unwrap();
    f.queue().add(track("A", 10)).unwrap();

    assert_eq!(f.titles(), vec!["A", "A"]);
    assert_eq!(
        f.bridge.requests()[0],
        BridgeRequest::QueueAdd {
            playlist: vec![PathBuf::from("/music/A.flac")]
        }
    );
    assert_eq!(f.state.lock().last_change, QueueChange::Appended);
}

#[test]
fn add_failure_leaves_local_queue_untouched() {
    let f = fixture(abc(), None);
    f.bridge
        .fail_when(|r| matches!(r, BridgeRequest::QueueAdd { .. }));

    let err = f.queue().add_list(vec![track("D", 1)]).unwrap_err();
    assert!(matches!(err, QueueError::Bridge(BridgeError::Rejected(_))));
    assert_eq!(f.titles(), vec!["A", "B", "C"]);
}

#[test]
fn reset_and_add_clears_then_replaces_with_reset_flag_raised() {
    let f = fixture(abc(), Some(1));
    f.state.lock().progress = 42.0;

    f.queue()
        .reset_and_add_list(vec![track("X", 60), track("Y", 60)])
        .unwrap();

    assert_eq!(
        f.bridge.requests(),
        vec![
            BridgeRequest::Transport {
                command: TransportCommand::Clear
            },
            BridgeRequest::QueueAdd {
                playlist: vec!["/music/X.flac".into(), "/music/Y.flac".into()]
            },
        ]
    );
    assert!(f.bridge.observed.lock().unwrap().iter().all(|o| o.reset));

    let s = f.state.snapshot();
    assert!(!s.reset);
    assert_eq!(s.current_index, None);
    assert_eq!(s.progress, 0.0);
    assert_eq!(s.last_change, QueueChange::Replaced);
    assert_eq!(f.titles(), vec!["X", "Y"]);
}

#[test]
fn reset_flag_drops_even_when_clear_fails() {
    let f = fixture(abc(), None);
    f.bridge.fail_when(|r| {
        matches!(
            r,
            BridgeRequest::Transport {
                command: TransportCommand::Clear
            }
        )
    });

    assert!(f.queue().reset_and_add(track("X", 1)).is_err());
    assert!(!f.state.lock().reset);
    assert_eq!(f.titles(), vec!["A", "B", "C"]);
}

#[test]
fn remove_out_of_range_is_silent() {
    let f = fixture(abc(), Some(0));
    f.queue().remove(3).unwrap();
    assert!(f.bridge.requests().is_empty());
    assert_eq!(f.titles(), vec!["A", "B", "C"]);
}

#[test]
fn remove_keeps_current_track_current() {
    let f = fixture(abc(), Some(2));
    f.queue().remove(0).unwrap();

    assert_eq!(f.bridge.requests(), vec![BridgeRequest::QueueRemove { index: 0 }]);
    assert_eq!(f.titles(), vec!["B", "C"]);
    assert_eq!(f.state.lock().current_index, Some(1));

    // Removing the current last entry leaves nothing current.
    f.queue().remove(1).unwrap();
    assert_eq!(f.state.lock().current_index, None);
}

#[test]
fn go_to_only_talks_to_bridge() {
    let f = fixture(abc(), Some(0));
    f.queue().go_to(2).unwrap();
    assert_eq!(f.bridge.requests(), vec![BridgeRequest::QueueGoTo { index: 2 }]);
    assert_eq!(f.state.lock().current_index, Some(0));
}

#[test]
fn move_to_same_index_is_a_no_op() {
    let f = fixture(abc(), Some(0));
    assert!(f.queue().move_to(1, 1).is_none());
    assert!(f.bridge.requests().is_empty());
}

#[test]
fn move_to_keeps_the_current_track_current() {
    let f = fixture(abc(), Some(1));

    f.queue().move_to(1, 0).unwrap().wait().unwrap();

    assert_eq!(f.titles(), vec!["B", "A", "C"]);
    assert_eq!(f.state.lock().current_index, Some(0));
    assert_eq!(
        f.bridge.requests(),
        vec![BridgeRequest::QueueMoveTo { from: 1, to: 0 }]
    );
    assert_eq!(f.state.lock().last_change, QueueChange::Moved);
}

#[test]
fn desktop_move_across_current_sends_adjusted_target() {
    let mut tracks = abc();
    tracks.push(track("D", 30));
    let f = fixture_on(Platform::Desktop, tracks, Some(2));

    f.queue().move_to(0, 3).unwrap().wait().unwrap();

    assert_eq!(
        f.bridge.requests(),
        vec![BridgeRequest::QueueMoveTo { from: 0, to: 4 }]
    );
    assert_eq!(f.titles(), vec!["B", "C", "D", "A"]);
    assert_eq!(f.state.lock().current_index, Some(1));
}

#[test]
fn concurrent_moves_apply_in_order() {
    let mut tracks = abc();
    tracks.push(track("D", 30));
    let f = fixture(tracks, Some(0));

    let t1 = f.queue().move_to(0, 3).unwrap();
    let t2 = f.queue().move_to(0, 1).unwrap();
    let t3 = f.queue().move_to(3, 0).unwrap();
    for t in [t1, t2, t3] {
        t.wait().unwrap();
    }

    // [A B C D] -> [B C D A] -> [C B D A] -> [A C B D]
    assert_eq!(f.titles(), vec!["A", "C", "B", "D"]);
    assert_eq!(f.state.lock().current_index, Some(0));
    assert_eq!(f.queue().pending_moves(), 0);
}

#[test]
fn failed_move_does_not_block_later_moves() {
    let f = fixture(abc(), None);
    f.bridge
        .fail_when(|r| matches!(r, BridgeRequest::QueueMoveTo { from: 0, .. }));

    let bad = f.queue().move_to(0, 2).unwrap();
    let oob = f.queue().move_to(1, 7).unwrap();
    let good = f.queue().move_to(2, 1).unwrap();

    assert!(matches!(bad.wait(), Err(QueueError::Bridge(_))));
    assert_eq!(
        oob.wait(),
        Err(QueueError::IndexOutOfRange { index: 7, len: 3 })
    );
    assert_eq!(good.wait(), Ok(()));
    assert_eq!(f.titles(), vec!["A", "C", "B"]);
}

// --- MusicPlayerService --------------------------------------------------------

#[test]
fn play_with_empty_queue_does_nothing() {
    let f = fixture(vec![], None);
    f.player.play().unwrap();
    assert!(f.bridge.requests().is_empty());
    assert!(!f.state.lock().is_playing);
}

#[test]
fn play_sets_flag_before_sending_and_starts_ticker() {
    let f = fixture(abc(), Some(0));
    f.player.play().unwrap();

    assert_eq!(
        f.bridge.requests(),
        vec![BridgeRequest::Transport {
            command: TransportCommand::Play
        }]
    );
    assert!(f.bridge.observed.lock().unwrap()[0].is_playing);
    assert!(f.player.progress().is_running());

    // Redundant play still goes through.
    f.player.play().unwrap();
    assert_eq!(f.bridge.requests().len(), 2);

    f.player.pause().unwrap();
    assert!(!f.state.lock().is_playing);
    assert!(!f.player.progress().is_running());
    assert_eq!(
        f.bridge.requests()[2],
        BridgeRequest::Transport {
            command: TransportCommand::Pause
        }
    );
}

#[test]
fn next_at_last_index_is_a_no_op() {
    let f = fixture(abc(), Some(2));
    f.player.next().unwrap();
    assert!(f.bridge.requests().is_empty());
    assert_eq!(f.state.lock().current_index, Some(2));

    let empty = fixture(vec![], None);
    empty.player.next().unwrap();
    assert!(empty.bridge.requests().is_empty());
}

#[test]
fn next_sends_transport_and_waits_for_sync() {
    let f = fixture(abc(), Some(0));
    f.player.next().unwrap();
    assert_eq!(
        f.bridge.requests(),
        vec![BridgeRequest::Transport {
            command: TransportCommand::Next
        }]
    );
    assert_eq!(f.state.lock().current_index, Some(0));
}

#[test]
fn previous_is_an_index_jump() {
    let f = fixture(abc(), Some(0));
    f.player.previous().unwrap();
    assert!(f.bridge.requests().is_empty());

    f.state.lock().current_index = Some(2);
    f.player.previous().unwrap();
    assert_eq!(f.bridge.requests(), vec![BridgeRequest::QueueGoTo { index: 1 }]);
}

#[test]
fn seek_sends_absolute_position_then_requests_sync() {
    let f = fixture(abc(), Some(0)); // A is 200 s

    assert_eq!(f.player.seek_by_percentage(50.0).unwrap(), Some(100_000));
    assert_eq!(
        f.bridge.requests(),
        vec![
            BridgeRequest::SetPosition { position: 100_000 },
            BridgeRequest::RequestSync,
        ]
    );

    f.player.reconcile(&SyncEvent {
        index: 0,
        current_position: 100_000.0,
        is_playing: false,
        duration: 200_000.0,
        repeat_mode: None,
    });
    assert_eq!(f.state.lock().progress, 50.0);
}

#[test]
fn seek_clamps_percentage() {
    let f = fixture(abc(), Some(0));
    assert_eq!(f.player.seek_by_percentage(250.0).unwrap(), Some(200_000));
    assert_eq!(f.player.seek_by_percentage(-3.0).unwrap(), Some(0));

    let idle = fixture(abc(), None);
    assert_eq!(idle.player.seek_by_percentage(50.0).unwrap(), None);
    assert!(idle.bridge.requests().is_empty());
}

#[test]
fn toggle_repeat_mode_cycles_and_sticks_at_one() {
    let f = fixture(abc(), None);
    let modes: Vec<RepeatMode> = (0..4)
        .map(|_| f.player.toggle_repeat_mode().unwrap())
        .collect();
    assert_eq!(
        modes,
        vec![
            RepeatMode::All,
            RepeatMode::One,
            RepeatMode::One,
            RepeatMode::One
        ]
    );
    assert_eq!(
        f.bridge.requests()[0],
        BridgeRequest::SetRepeat {
            mode: RepeatMode::All
        }
    );
}

#[test]
fn reconcile_overwrites_local_state_idempotently() {
    let f = fixture(abc(), Some(0));
    let ev = SyncEvent {
        index: 2,
        current_position: 60_000.0,
        is_playing: true,
        duration: 240_000.0,
        repeat_mode: Some(RepeatMode::All),
    };

    f.player.reconcile(&ev);
    let first = f.state.snapshot();
    f.player.reconcile(&ev);
    let second = f.state.snapshot();

    assert_eq!(first.current_index, Some(2));
    assert_eq!(first.progress, 25.0);
    assert!(first.is_playing);
    assert_eq!(first.repeat_mode, RepeatMode::All);
    assert_eq!(first.current_index, second.current_index);
    assert!(f.player.progress().is_running());

    f.player.reconcile(&SyncEvent {
        is_playing: false,
        ..ev
    });
    assert!(!f.player.progress().is_running());
}

#[test]
fn reconcile_without_track_resets_progress() {
    let f = fixture(abc(), Some(1));
    f.state.lock().progress = 70.0;

    f.player.reconcile(&SyncEvent {
        index: -1,
        current_position: 0.0,
        is_playing: false,
        duration: 0.0,
        repeat_mode: None,
    });

    let s = f.state.snapshot();
    assert_eq!(s.progress, 0.0);
    assert_eq!(s.current_index, None);
    assert!(!s.is_playing);
}

#[test]
fn reconcile_ignores_index_outside_local_queue() {
    let f = fixture(abc(), Some(1));
    f.player.reconcile(&SyncEvent {
        index: 9,
        current_position: 0.0,
        is_playing: false,
        duration: 0.0,
        repeat_mode: None,
    });
    assert_eq!(f.state.lock().current_index, Some(1));
}

#[test]
fn reconcile_outside_local_queue_uses_the_pushed_duration() {
    let f = fixture(abc(), Some(1));
    f.player.reconcile(&SyncEvent {
        index: 9,
        current_position: 10_000.0,
        is_playing: false,
        duration: 40_000.0,
        repeat_mode: None,
    });
    let s = f.state.lock();
    assert_eq!(s.current_index, Some(1));
    // B is 180 s long; the playing track is the native one.
    assert_eq!(s.progress, 25.0);
}

#[test]
fn listener_reconciles_pushed_events() {
    let f = fixture(abc(), None);
    let (tx, rx) = mpsc::channel();
    let handle = f.player.listen_sync_events(rx).unwrap();

    tx.send(SyncEvent {
        index: 1,
        current_position: 90_000.0,
        is_playing: false,
        duration: 180_000.0,
        repeat_mode: None,
    })
    .unwrap();
    drop(tx);
    handle.join().unwrap();

    let s = f.state.snapshot();
    assert_eq!(s.current_index, Some(1));
    assert_eq!(s.progress, 50.0);
}

// --- ProgressService -----------------------------------------------------------

#[test]
fn ticker_clamps_at_max_and_stops() {
    let state = StateHandle::new(PlayerState {
        queue: vec![Track {
            duration: Some(Duration::from_millis(200)),
            ..track("short", 0)
        }],
        current_index: Some(0),
        is_playing: true,
        progress: 98.0,
        ..PlayerState::default()
    });
    let progress = ProgressService::new(
        state.clone(),
        ProgressSettings {
            min: 0.0,
            max: 100.0,
            step: 1.5,
        },
    );

    progress.start();
    assert!(wait_until(|| !progress.is_running()));
    assert_eq!(state.lock().progress, 100.0);
}

#[test]
fn ticker_needs_a_current_track() {
    let state = StateHandle::new(PlayerState {
        queue: abc(),
        is_playing: true,
        ..PlayerState::default()
    });
    let progress = ProgressService::new(state, ProgressSettings::default());
    progress.start();
    assert!(!progress.is_running());
    progress.stop();
    progress.stop();
}

#[test]
fn set_clamps_into_range() {
    let state = StateHandle::default();
    let progress = ProgressService::new(state.clone(), ProgressSettings::default());
    progress.set(140.0);
    assert_eq!(state.lock().progress, 100.0);
    progress.set(-1.0);
    assert_eq!(state.lock().progress, 0.0);
    assert_eq!(progress.percentage(), 0.0);
}
