use std::path::Path;

use crate::config::TrackDisplayField;

/// Tag values read for one file, borrowed while building its display string.
pub(super) struct DisplayParts<'a> {
    pub path: &'a Path,
    pub title: &'a str,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub track_number: Option<u32>,
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Build the display string for a track from the configured `fields`, joined by `sep`.
///
/// Falls back to the title when none of the fields produced anything.
pub(super) fn display_from_fields(
    parts: &DisplayParts<'_>,
    fields: &[TrackDisplayField],
    sep: &str,
) -> String {
    let mut out: Vec<String> = Vec::new();
    let title = parts.title.trim();

    for f in fields {
        match f {
            TrackDisplayField::Display => {
                // "display" inside the list means the classic "artist - title".
                if let Some(a) = non_blank(parts.artist) {
                    out.push(a.to_string());
                }
                if !title.is_empty() {
                    out.push(title.to_string());
                }
            }
            TrackDisplayField::Title => {
                if !title.is_empty() {
                    out.push(title.to_string());
                }
            }
            TrackDisplayField::Artist => {
                if let Some(a) = non_blank(parts.artist) {
                    out.push(a.to_string());
                }
            }
            TrackDisplayField::Album => {
                if let Some(a) = non_blank(parts.album) {
                    out.push(a.to_string());
                }
            }
            TrackDisplayField::TrackNumber => {
                if let Some(n) = parts.track_number {
                    out.push(format!("{n:02}"));
                }
            }
            TrackDisplayField::Filename => {
                if let Some(stem) = non_blank(parts.path.file_stem().and_then(|s| s.to_str())) {
                    out.push(stem.to_string());
                }
            }
            TrackDisplayField::Path => {
                out.push(parts.path.display().to_string());
            }
        }
    }

    if out.is_empty() {
        parts.title.to_string()
    } else {
        out.join(sep)
    }
}
