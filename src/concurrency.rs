//! Concurrency support types (§5 "Concurrency & resource model"). This
//! crate spawns no threads of its own and owns no PTY/GUI I/O; a host
//! embedding it typically runs a terminal thread, a render thread, and one
//! or more GUI/input threads as described there. These are the shared
//! types that let those threads cooperate without each host redefining
//! its own locking/channel choices.
//!
//! Grounded on `pty/reader.rs`'s two-thread (parser thread / render-pump
//! thread) model: its `parking_lot::Mutex` locking discipline and
//! channel-based handoff between the reader thread and the terminal owner
//! carry over here as plain type aliases, since actual thread spawning
//! stays the host's responsibility.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::events::HostEvent;
use crate::terminal::Terminal;

/// A [`Terminal`] shared between the terminal thread and any render or
/// GUI/input threads. The terminal thread should hold the lock only for
/// the duration of one byte-chunk or input-event application (§5
/// "Ordering guarantees"), so a render thread's read never blocks long.
pub type SharedTerminal = Arc<Mutex<Terminal>>;

/// Wrap a [`Terminal`] for sharing across threads.
pub fn share(terminal: Terminal) -> SharedTerminal {
    Arc::new(Mutex::new(terminal))
}

/// Outbound byte chunks produced by [`Terminal::take_replies`], handed off
/// to whatever thread owns the PTY writer (§6 "Outbound byte stream").
pub fn reply_channel() -> (Sender<Vec<u8>>, Receiver<Vec<u8>>) {
    unbounded()
}

/// [`HostEvent`]s produced by the terminal thread, for hosts that prefer a
/// channel over draining [`Terminal::take_host_events`] from the same
/// thread that owns the lock (§6 "Events emitted to the host").
pub fn host_event_channel() -> (Sender<HostEvent>, Receiver<HostEvent>) {
    unbounded()
}
