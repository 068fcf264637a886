//! Music library: the `Track` model and the directory scanner that builds it.
//!
//! Tracks are immutable once scanned; everything downstream (queue mirror,
//! native player, UI) refers to them by `path`.

mod display;
mod model;
mod scan;

pub use model::Track;
pub use scan::scan;
