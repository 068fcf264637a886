use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` layers struct defaults, an optional config file and
/// environment variables (prefix `CADENCE__`), in increasing priority.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("CADENCE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let p = &self.progress;
        if !(p.max > p.min) {
            return Err("progress.max must be greater than progress.min".to_string());
        }
        if !(p.step > 0.0) || p.step > p.max - p.min {
            return Err("progress.step must be > 0 and fit inside [min, max]".to_string());
        }
        if self.player.sync_interval_ms == 0 {
            return Err("player.sync_interval_ms must be >= 1".to_string());
        }
        if !(0.0..=100.0).contains(&self.controls.seek_step_percent) {
            return Err("controls.seek_step_percent must be within 0..=100".to_string());
        }
        if self.log.level.parse::<log::LevelFilter>().is_err() {
            return Err(format!("log.level `{}` is not a log level", self.log.level));
        }
        Ok(())
    }

    /// Log file path: configured, or `cadence.log` beside the config file.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.log
            .file
            .clone()
            .or_else(|| default_config_dir().map(|d| d.join("cadence.log")))
    }

    /// Key-value store path: configured, or `state.toml` under the XDG data dir.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store
            .path
            .clone()
            .or_else(|| default_data_dir().map(|d| d.join("state.toml")))
    }
}

/// Resolve the config path from `CADENCE_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("CADENCE_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/cadence/config.toml`
/// or `~/.config/cadence/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("config.toml"))
}

fn default_config_dir() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

fn default_data_dir() -> Option<PathBuf> {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

fn xdg_dir(var: &str, home_fallback: &str) -> Option<PathBuf> {
    let base = if let Some(xdg) = env::var_os(var) {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(home_fallback))
    };

    base.map(|d| d.join("cadence"))
}
