//! `vtcore`: a VT-compatible terminal emulation core.
//!
//! This crate owns the parser, the grid/screen model, input encoding, and
//! the render-buffer builder that turns screen state into a flat draw list
//! for a display backend to consume. It owns no I/O: callers feed PTY bytes
//! into [`Terminal::write`] and pull replies, host events, and render
//! buffers back out. Spawning a PTY, wiring up a shell, and talking to a
//! window toolkit are all host concerns that live outside this crate.

pub mod atlas;
pub mod cell;
pub mod charset;
pub mod color;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod events;
pub mod grid;
pub mod hyperlink;
pub mod image;
pub mod input;
pub mod line;
pub mod parser;
pub mod primitives;
pub mod render;
pub mod screen;
pub mod selection;
pub mod sequencer;
pub mod tabstops;
pub mod terminal;

pub use concurrency::SharedTerminal;
pub use config::Config;
pub use error::{VtError, VtResult};
pub use events::HostEvent;
pub use render::RenderBuffer;
pub use terminal::Terminal;

/// Initialize `tracing` output for embedders that don't already run their
/// own subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vtcore=info".into()),
        )
        .try_init();
}
