use std::path::PathBuf;
use std::time::Duration;

/// A playable audio item. `path` is the stable identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
    /// Cover image found next to the audio file, if any.
    pub cover: Option<PathBuf>,
    pub duration: Option<Duration>,
    pub display: String,
}

impl Track {
    /// Duration in milliseconds, `None` when the scanner could not read it.
    pub fn duration_ms(&self) -> Option<u64> {
        self.duration.map(|d| d.as_millis() as u64)
    }
}
