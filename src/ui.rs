//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::app::App;
use crate::config::{ControlsSettings, ProgressSettings, UiSettings};
use crate::library::Track;
use crate::services::format_duration;
use crate::state::{PlaybackState, PlayerState, RepeatMode};

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("g/G", "top/bottom");
    map.insert("enter", "play selected");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next");
    // H/L is filled dynamically from config.
    map.insert("J/K", "move down/up");
    map.insert("a", "queue again");
    map.insert("d", "remove");
    map.insert("R", "reload dir");
    map.insert("r", "repeat");
    map.insert("f", "follow");
    map.insert("i", "info");
    map.insert("q", "quit");
    map
});

/// Render the controls help text, incorporating the seek step.
fn controls_text(seek_step_percent: f64) -> String {
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "J/K", "a", "d", "g/G", "R", "r", "f", "i", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] seek -/+{seek_step_percent}%"))
            } else {
                CONTROLS_MAP.get(k).map(|v| format!("[{k}] {v}"))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

fn repeat_label(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::None => "REPEAT: Off",
        RepeatMode::All => "REPEAT: All",
        RepeatMode::One => "REPEAT: One",
    }
}

/// Progress as a fraction of `[min, max]`.
fn progress_ratio(progress: f64, settings: &ProgressSettings) -> f64 {
    ((progress - settings.min) / (settings.max - settings.min)).clamp(0.0, 1.0)
}

/// `m:ss` for a span in seconds.
///
/// `format_duration` reads large values as milliseconds, so anything that
/// would cross its threshold is handed over in milliseconds instead.
fn clock_label(secs: f64, negative: bool) -> String {
    let millis = secs * 1000.0;
    if millis >= 10_000.0 {
        format_duration(millis, negative)
    } else {
        format_duration(secs, negative)
    }
}

/// Elapsed and remaining labels for the gauge, e.g. `("1:05", "-2:55")`.
fn time_labels(ratio: f64, track: Option<&Track>) -> (String, String) {
    let Some(total_ms) = track.and_then(Track::duration_ms) else {
        return ("-:--".to_string(), "-:--".to_string());
    };
    let total = total_ms as f64 / 1000.0;
    let elapsed = total * ratio;
    (
        clock_label(elapsed, false),
        clock_label(total - elapsed, true),
    )
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Visible window `[start, end)` of `total` rows around `selected`, plus the
/// selection's offset inside it.
fn visible_window(total: usize, height: usize, selected: usize) -> (usize, usize, usize) {
    if total <= height || height == 0 {
        return (0, total, selected.min(total.saturating_sub(1)));
    }
    let half = height / 2;
    let mut start = selected.saturating_sub(half);
    if start + height > total {
        start = total - height;
    }
    (start, start + height, selected - start)
}

fn queue_row(index: usize, track: &Track, current: Option<usize>) -> ListItem<'_> {
    let marker = if current == Some(index) { "▶" } else { " " };
    let length = track
        .duration
        .map(|d| clock_label(d.as_secs_f64(), false))
        .unwrap_or_default();
    let row = format!("{marker} {:>3}  {}  {length}", index + 1, track.display);
    if current == Some(index) {
        ListItem::new(row).bold()
    } else {
        ListItem::new(row)
    }
}

fn bordered(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into `frame` from the app model and a state snapshot.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    view: &PlayerState,
    pending_moves: usize,
    progress_settings: &ProgressSettings,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" cadence ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status = {
        let mut parts: Vec<String> = Vec::new();
        parts.push(
            match view.playback() {
                PlaybackState::Playing => "Playing",
                PlaybackState::Paused => "Paused",
                PlaybackState::Stopped => "Stopped",
            }
            .to_string(),
        );
        if let Some(track) = view.current_track() {
            parts.push(format!("Song: {}", track.display));
        }
        parts.push(repeat_label(view.repeat_mode).to_string());
        parts.push(
            if app.follow_playback {
                "CURSOR: Follow"
            } else {
                "CURSOR: Free-roam"
            }
            .to_string(),
        );
        if view.reset {
            parts.push("replacing queue…".to_string());
        }
        if pending_moves > 0 {
            parts.push(format!("moving {pending_moves}…"));
        }
        if let Some(dir) = &app.current_dir {
            parts.push(format!("Dir: {dir}"));
        }
        if let Some(msg) = &app.status {
            parts.push(msg.clone());
        }
        parts.join(" • ")
    };
    let status_par = Paragraph::new(status)
        .block(bordered(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Only build rows for the visible window.
    let total = view.queue.len();
    let list_height = chunks[2].height.saturating_sub(2) as usize;
    let (start, end, selected_in_window) = visible_window(total, list_height, app.selected);
    let rows: Vec<ListItem> = view.queue[start..end]
        .iter()
        .enumerate()
        .map(|(offset, track)| queue_row(start + offset, track, view.current_index))
        .collect();
    let list = List::new(rows)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" queue ({total}) ")),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut list_state = ListState::default();
    if total > 0 {
        list_state.select(Some(selected_in_window));
    }
    frame.render_stateful_widget(list, chunks[2], &mut list_state);

    let ratio = progress_ratio(view.progress, progress_settings);
    let (elapsed, remaining) = time_labels(ratio, view.current_track());
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" progress "))
        .gauge_style(Style::default().add_modifier(Modifier::BOLD))
        .ratio(ratio)
        .label(format!("{elapsed} / {remaining}"));
    frame.render_widget(gauge, chunks[3]);

    if app.metadata_window {
        let popup_area = centered_rect_sized(72, 10, chunks[2]);
        frame.render_widget(Clear, popup_area);

        let meta = match view.queue.get(app.selected) {
            Some(track) => format!(
                "Title: {}\nArtist: {}\nAlbum: {}\nTrack: {}\nDuration: {}\nCover: {}\nPath: {}",
                track.title,
                track.artist.as_deref().unwrap_or("-"),
                track.album.as_deref().unwrap_or("-"),
                track
                    .track_number
                    .map_or_else(|| "-".to_string(), |n| n.to_string()),
                track
                    .duration
                    .map_or_else(|| "-".to_string(), |d| clock_label(d.as_secs_f64(), false)),
                track
                    .cover
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |p| p.display().to_string()),
                track.path.display()
            ),
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(bordered(" info (i closes) "))
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let footer = Paragraph::new(controls_text(controls_settings.seek_step_percent))
        .block(bordered(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}
