use std::env;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::bridge::PlayerBridge;
use crate::library::scan;
use crate::logging::setup_logger;
use crate::mpris::ControlCmd;
use crate::native::{NativeOptions, NativePlayer};
use crate::services::{MusicPlayerService, ProgressService, QueueService};
use crate::state::{PlayerState, StateHandle};
use crate::store::LAST_DIR;

mod event_loop;
mod mpris_sync;
mod settings;
mod startup;

const QUIT_FADE_OUT: Duration = Duration::from_millis(300);

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, settings_warning) = settings::load_settings();

    match settings.log_file() {
        Some(file) => {
            if let Err(e) = setup_logger(&settings.log.level, &file) {
                // The terminal is still ours at this point.
                eprintln!("cadence: logging disabled, {}: {e}", file.display());
            }
        }
        None => eprintln!("cadence: logging disabled, no log file path could be resolved"),
    }
    if let Some(warning) = settings_warning {
        log::warn!("{warning}");
    }

    let mut store = startup::open_store(&settings);
    let dir = startup::resolve_dir(env::args().nth(1), store.as_ref());
    let repeat = startup::initial_repeat(store.as_ref(), &settings);
    log::info!("starting in {} with repeat {}", dir.display(), repeat.as_str());

    let tracks = scan(&dir, &settings.library);

    let (sync_tx, sync_rx) = mpsc::channel();
    let platform = settings.player.platform.into();
    let native = Arc::new(NativePlayer::spawn(
        NativeOptions {
            platform,
            sync_interval: Duration::from_millis(settings.player.sync_interval_ms),
            repeat,
        },
        sync_tx,
    )?);
    let bridge: Arc<dyn PlayerBridge> = native.clone();

    let state = StateHandle::new(PlayerState {
        repeat_mode: repeat,
        ..PlayerState::default()
    });
    let progress = Arc::new(ProgressService::new(state.clone(), settings.progress.clone()));
    let queue = Arc::new(QueueService::new(
        bridge.clone(),
        state.clone(),
        progress.clone(),
        platform,
    ));
    let player = Arc::new(MusicPlayerService::new(
        bridge,
        state.clone(),
        progress,
        queue,
    ));
    let listener = player.listen_sync_events(sync_rx)?;

    player.queue().reset_and_add_list(tracks)?;

    let dir_text = dir.display().to_string();
    if let Err(e) = store.set(LAST_DIR, &dir_text) {
        log::warn!("could not persist last directory: {e}");
    }

    let mut app = App::new(settings.ui.follow_playback);
    app.set_current_dir(dir_text);

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut ctx = event_loop::Context {
            settings: &settings,
            player: &player,
            state: &state,
            mpris: &mpris,
            store: store.as_mut(),
        };
        let mut loop_state = event_loop::EventLoopState::default();
        event_loop::run(&mut terminal, &mut ctx, &mut app, &control_rx, &mut loop_state)
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    native.quit_softly(QUIT_FADE_OUT);
    player.progress().stop();
    // The native thread owned the sync sender; the listener ends with it.
    if listener.join().is_err() {
        log::error!("sync listener panicked");
    }
    log::info!("shut down");

    run_result
}
