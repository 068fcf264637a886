//! Opening files as `rodio` sinks.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use lofty::file::AudioFile;
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::bridge::BridgeError;

/// A paused sink positioned at `start_at`, plus the file's duration if known.
pub(super) fn open_sink_at(
    stream: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), BridgeError> {
    let file = File::open(path)
        .map_err(|e| BridgeError::Native(format!("failed to open {}: {e}", path.display())))?;

    let decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| BridgeError::Native(format!("failed to decode {}: {e}", path.display())))?;
    let duration = decoder.total_duration().or_else(|| probe_duration(path));

    let sink = Sink::connect_new(stream.mixer());
    // `skip_duration` is the seek primitive; Duration::ZERO is a no-op.
    sink.append(decoder.skip_duration(start_at));
    sink.pause();
    Ok((sink, duration))
}

/// Some decoders cannot tell their length up front; ask the tag reader instead.
fn probe_duration(path: &Path) -> Option<Duration> {
    lofty::read_from_path(path)
        .ok()
        .map(|tagged| tagged.properties().duration())
        .filter(|d| !d.is_zero())
}

pub(super) fn fade_out(sink: &Sink, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        sink.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        sink.set_volume(1.0 - t);
        std::thread::sleep(Duration::from_millis(step_ms));
    }
}
