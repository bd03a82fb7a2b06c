//! Events emitted to the host (§6 "Events emitted to the host"). These are
//! the terminal's outbound notification surface — everything the host needs
//! to react to that isn't a render buffer update.

use serde::Serialize;

/// Which screen a [`HostEvent::BufferChanged`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BufferKind {
    Main,
    Alternate,
}

/// A topic a permission-gated operation belongs to (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionTopic {
    CaptureBuffer,
    ChangeFont,
    ClipboardWrite,
    ClipboardRead,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    Bell,
    BufferChanged {
        buffer: BufferKind,
    },
    ScreenUpdated,
    RenderBufferUpdated,
    RequestCaptureBuffer {
        start_line: i64,
        line_count: usize,
    },
    SetWindowTitle {
        title: String,
    },
    Notify {
        title: String,
        body: String,
    },
    ResizeWindow {
        width: u32,
        height: u32,
        in_pixels: bool,
    },
    CopyToClipboard {
        text: String,
    },
    FollowHyperlink {
        uri: String,
    },
    RequestPermission {
        topic: PermissionTopic,
    },
    ScrollbackCleared,
}
