//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the cursor, follow mode
//! and status line layered over the shared queue state.

mod model;

pub use model::*;

#[cfg(test)]
mod tests;
