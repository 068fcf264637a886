use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::config;
use crate::library::scan;
use crate::mpris::{ControlCmd, MprisHandle};
use crate::runtime::mpris_sync::update_mpris;
use crate::services::{MusicPlayerService, QueueError};
use crate::state::{PlaybackState, PlayerState, QueueChange, RepeatMode, StateHandle};
use crate::store::{KeyValueStore, REPEAT_MODE};
use crate::ui;

/// Everything the loop drives besides the app model.
pub struct Context<'a> {
    pub settings: &'a config::Settings,
    pub player: &'a MusicPlayerService,
    pub state: &'a StateHandle,
    pub mpris: &'a MprisHandle,
    pub store: &'a mut dyn KeyValueStore,
}

/// What MPRIS was last told, so it is only updated on change.
type MprisView = (Option<usize>, PlaybackState, RepeatMode, u64);

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    last_mpris: Option<MprisView>,
    last_revision: u64,
}

/// Main terminal event loop: handles input, drawing, MPRIS commands and the
/// status of queued moves. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    ctx: &mut Context<'_>,
    app: &mut App,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.poll_moves();

        let view = ctx.state.snapshot();
        if state.last_revision != view.revision {
            if view.last_change == QueueChange::Replaced {
                app.selected = 0;
            }
            state.last_revision = view.revision;
        }
        app.clamp_selection(view.queue.len());
        app.follow(view.current_index);

        // Media keys and auto-advance change playback behind the UI's back.
        let mpris_view = (
            view.current_index,
            view.playback(),
            view.repeat_mode,
            view.revision,
        );
        if state.last_mpris != Some(mpris_view) {
            update_mpris(ctx.mpris, &view);
            state.last_mpris = Some(mpris_view);
        }

        let settings = ctx.settings;
        let pending_moves = ctx.player.queue().pending_moves();
        terminal.draw(|f| {
            ui::draw(
                f,
                app,
                &view,
                pending_moves,
                &settings.progress,
                &settings.ui,
                &settings.controls,
            )
        })?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, ctx, app, &view) {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, ctx, app, &view, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Surface a failed operation on the status line; nothing here is fatal.
fn attempt<T>(app: &mut App, result: Result<T, QueueError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            app.report(&e);
            None
        }
    }
}

fn set_repeat(ctx: &mut Context<'_>, app: &mut App, mode: RepeatMode) {
    if attempt(app, ctx.player.set_repeat_mode(mode)).is_some() {
        persist_repeat(ctx, app, mode);
    }
}

fn persist_repeat(ctx: &mut Context<'_>, app: &mut App, mode: RepeatMode) {
    if let Err(e) = ctx.store.set(REPEAT_MODE, mode.as_str()) {
        log::warn!("could not persist repeat mode: {e}");
    }
    app.set_status(format!("repeat: {}", mode.as_str()));
}

/// Relative seek by `offset_micros`, converted to a share of the current track.
fn seek_micros(ctx: &Context<'_>, app: &mut App, view: &PlayerState, offset_micros: i64) {
    let Some(duration_ms) = view.current_track().and_then(|t| t.duration_ms()) else {
        return;
    };
    if duration_ms == 0 {
        return;
    }
    let delta_pct = offset_micros as f64 / 1000.0 / duration_ms as f64 * 100.0;
    attempt(app, ctx.player.seek_relative(delta_pct));
}

fn handle_control_cmd(
    cmd: ControlCmd,
    ctx: &mut Context<'_>,
    app: &mut App,
    view: &PlayerState,
) -> bool {
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            attempt(app, ctx.player.play());
        }
        // There is no stop on the bridge; pausing is the closest thing.
        ControlCmd::Pause | ControlCmd::Stop => {
            attempt(app, ctx.player.pause());
        }
        ControlCmd::PlayPause => {
            attempt(app, ctx.player.toggle_play());
        }
        ControlCmd::Next => {
            attempt(app, ctx.player.next());
        }
        ControlCmd::Prev => {
            attempt(app, ctx.player.previous());
        }
        ControlCmd::Seek(offset) => seek_micros(ctx, app, view, offset),
        ControlCmd::SetRepeat(mode) => set_repeat(ctx, app, mode),
    }
    false
}

fn reload_dir(ctx: &Context<'_>, app: &mut App) {
    let Some(dir) = app.current_dir.clone() else {
        return;
    };
    let tracks = scan(Path::new(&dir), &ctx.settings.library);
    let count = tracks.len();
    if attempt(app, ctx.player.queue().reset_and_add_list(tracks)).is_some() {
        app.set_status(format!("reloaded {count} tracks"));
    }
}

fn handle_key_event(
    key: KeyEvent,
    ctx: &mut Context<'_>,
    app: &mut App,
    view: &PlayerState,
    state: &mut EventLoopState,
) -> bool {
    let len = view.queue.len();
    let selected = app.selected;
    let player = ctx.player;
    let queue = player.queue();

    if key.code != KeyCode::Char('g') {
        state.pending_gg = false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('g') => {
            if state.pending_gg {
                state.pending_gg = false;
                app.select_first();
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => app.select_last(len),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(len),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(len),
        KeyCode::Enter => {
            if selected < len && attempt(app, queue.go_to(selected)).is_some() {
                app.follow_playback = true;
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            attempt(app, player.toggle_play());
        }
        KeyCode::Char('l') => {
            attempt(app, player.next());
        }
        KeyCode::Char('h') => {
            attempt(app, player.previous());
        }
        KeyCode::Char('L') => {
            attempt(app, player.seek_relative(ctx.settings.controls.seek_step_percent));
        }
        KeyCode::Char('H') => {
            attempt(app, player.seek_relative(-ctx.settings.controls.seek_step_percent));
        }
        KeyCode::Char('J') => {
            let from = selected;
            if from + 1 < len {
                if let Some(ticket) = queue.move_to(from, from + 1) {
                    app.track_move(ticket);
                    app.selected = from + 1;
                }
            }
        }
        KeyCode::Char('K') => {
            let from = selected;
            if from > 0 && from < len {
                if let Some(ticket) = queue.move_to(from, from - 1) {
                    app.track_move(ticket);
                    app.selected = from - 1;
                }
            }
        }
        KeyCode::Char('a') => {
            if let Some(track) = view.queue.get(selected).cloned() {
                let title = track.display.clone();
                if attempt(app, queue.add(track)).is_some() {
                    app.set_status(format!("queued again: {title}"));
                }
            }
        }
        KeyCode::Char('d') => {
            attempt(app, queue.remove(selected));
        }
        KeyCode::Char('R') => reload_dir(ctx, app),
        KeyCode::Char('r') => {
            if let Some(mode) = attempt(app, player.toggle_repeat_mode()) {
                persist_repeat(ctx, app, mode);
            }
        }
        KeyCode::Char('f') => app.toggle_follow_playback(),
        KeyCode::Char('i') => app.toggle_metadata_window(),
        KeyCode::Esc => app.status = None,
        _ => {}
    }

    false
}
