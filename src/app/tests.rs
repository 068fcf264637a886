use super::*;
use crate::services::{MoveQueue, QueueError};
use std::time::{Duration, Instant};

#[test]
fn selection_wraps_both_ways() {
    let mut app = App::new(false);
    app.select_prev(3);
    assert_eq!(app.selected, 2);
    app.select_next(3);
    assert_eq!(app.selected, 0);
    app.select_next(3);
    assert_eq!(app.selected, 1);
}

#[test]
fn selection_on_empty_queue_stays_put() {
    let mut app = App::new(true);
    app.select_next(0);
    app.select_prev(0);
    assert_eq!(app.selected, 0);
    assert!(app.follow_playback);
}

#[test]
fn manual_navigation_leaves_follow_mode() {
    let mut app = App::new(true);
    app.follow(Some(4));
    assert_eq!(app.selected, 4);

    app.select_first();
    assert!(!app.follow_playback);
    app.follow(Some(2));
    assert_eq!(app.selected, 0);

    app.toggle_follow_playback();
    app.follow(Some(2));
    assert_eq!(app.selected, 2);
    app.follow(None);
    assert_eq!(app.selected, 2);
}

#[test]
fn clamp_selection_after_queue_shrinks() {
    let mut app = App::new(false);
    app.select_last(5);
    assert_eq!(app.selected, 4);
    app.clamp_selection(2);
    assert_eq!(app.selected, 1);
    app.clamp_selection(0);
    assert_eq!(app.selected, 0);
}

#[test]
fn failed_moves_surface_in_status() {
    let moves = MoveQueue::new();
    let mut app = App::new(false);
    app.track_move(moves.add(|| Ok(())));
    app.track_move(moves.add(|| Err(QueueError::IndexOutOfRange { index: 5, len: 2 })));

    let deadline = Instant::now() + Duration::from_secs(3);
    let mut finished = 0;
    while finished < 2 && Instant::now() < deadline {
        finished += app.poll_moves();
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(finished, 2);
    assert_eq!(app.poll_moves(), 0);
    let status = app.status.as_deref().unwrap_or_default();
    assert!(status.contains("out of range"), "status was {status:?}");
}
