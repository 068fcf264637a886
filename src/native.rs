//! In-process native player built on `rodio`.
//!
//! It is the authoritative side of the bridge: it owns the real queue and
//! the output device, answers every `BridgeRequest`, and pushes `SyncEvent`s
//! on every change and every `sync_interval` while idle.

mod clock;
mod player;
mod queue;
mod sink;
mod thread;

pub use player::{NativeOptions, NativePlayer};
