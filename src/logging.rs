use std::path::Path;
use std::time::SystemTime;

use log::LevelFilter;

/// Route `log` records to `file`. The terminal belongs to the TUI, so nothing
/// goes to stdout or stderr.
pub fn setup_logger(level: &str, file: &Path) -> Result<(), fern::InitError> {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    if let Some(dir) = file.parent() {
        std::fs::create_dir_all(dir)?;
    }

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ));
        })
        // Decoder chatter drowns out our own records at debug level.
        .level_for("symphonia_core", LevelFilter::Warn)
        .level_for("symphonia_bundle_mp3", LevelFilter::Warn)
        .level_for("zbus", LevelFilter::Warn)
        .level(level)
        .chain(fern::log_file(file)?)
        .apply()?;
    Ok(())
}
