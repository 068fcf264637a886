use std::env;
use std::path::PathBuf;

use crate::config;
use crate::state::RepeatMode;
use crate::store::{KeyValueStore, LAST_DIR, MemoryStore, REPEAT_MODE, TomlStore};

/// Open the persistent store, or a session-only one if that is impossible.
pub fn open_store(settings: &config::Settings) -> Box<dyn KeyValueStore> {
    let Some(path) = settings.store_path() else {
        log::warn!("no store path could be resolved, state will not persist");
        return Box::new(MemoryStore::default());
    };
    match TomlStore::open(&path) {
        Ok(store) => {
            log::debug!("store opened at {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            log::warn!("store {} unusable, state will not persist: {e}", path.display());
            Box::new(MemoryStore::default())
        }
    }
}

/// Directory to scan: the CLI argument, else the last stored directory if it
/// still exists, else the working directory.
pub fn resolve_dir(arg: Option<String>, store: &dyn KeyValueStore) -> PathBuf {
    if let Some(arg) = arg {
        return PathBuf::from(arg);
    }
    if let Some(last) = store.get(LAST_DIR).map(PathBuf::from).filter(|p| p.is_dir()) {
        return last;
    }
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Repeat mode to start with: the stored one wins over the configured one.
pub fn initial_repeat(store: &dyn KeyValueStore, settings: &config::Settings) -> RepeatMode {
    store
        .get(REPEAT_MODE)
        .and_then(|s| RepeatMode::parse(&s))
        .unwrap_or_else(|| settings.player.repeat_mode.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins_over_stored_dir() {
        let mut store = MemoryStore::default();
        store.set(LAST_DIR, "/").unwrap();
        assert_eq!(
            resolve_dir(Some("/srv/music".into()), &store),
            PathBuf::from("/srv/music")
        );
        assert_eq!(resolve_dir(None, &store), PathBuf::from("/"));
    }

    #[test]
    fn vanished_stored_dir_falls_back_to_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        let mut store = MemoryStore::default();
        store.set(LAST_DIR, &gone.to_string_lossy()).unwrap();
        assert_eq!(resolve_dir(None, &store), env::current_dir().unwrap());
    }

    #[test]
    fn stored_repeat_mode_wins_over_config() {
        let mut settings = config::Settings::default();
        settings.player.repeat_mode = config::RepeatModeSetting::All;
        let mut store = MemoryStore::default();
        assert_eq!(initial_repeat(&store, &settings), RepeatMode::All);

        store.set(REPEAT_MODE, "one").unwrap();
        assert_eq!(initial_repeat(&store, &settings), RepeatMode::One);

        store.set(REPEAT_MODE, "garbage").unwrap();
        assert_eq!(initial_repeat(&store, &settings), RepeatMode::All);
    }
}
