//! Mouse reporting vocabulary (`DECSET` modes 9/1000/1002/1003, transports
//! 1005/1006/1015/1016).

use serde::{Deserialize, Serialize};

/// Which mouse events get reported at all, and with what granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseProtocol {
    /// Mode 9: press only, no release, no modifiers.
    X10,
    /// Mode 1000: press and release, with modifiers.
    NormalTracking,
    /// Mode 1002: `NormalTracking` plus drag events while a button is held.
    ButtonTracking,
    /// Mode 1003: `ButtonTracking` plus motion events with no button held.
    AnyEventTracking,
    /// Mode 1001: not implemented, recognized so `SM`/`RM` don't error.
    HighlightTracking,
}

/// The coordinate/byte encoding used to report mouse events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseTransport {
    /// Mode 9 default: single bytes, coordinates capped at 223.
    Default,
    /// Mode 1005: UTF-8 encoded coordinates.
    Extended,
    /// Mode 1006: `CSI < ... M`/`m`, unbounded decimal coordinates.
    Sgr,
    /// Mode 1015: urxvt's decimal-coordinate variant.
    Urxvt,
    /// Mode 1016: like SGR but coordinates are in pixels.
    SgrPixels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Release,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
}

impl MouseButton {
    pub fn is_wheel(self) -> bool {
        matches!(
            self,
            MouseButton::WheelUp | MouseButton::WheelDown | MouseButton::WheelLeft | MouseButton::WheelRight
        )
    }
}

/// How wheel events are reported when no mouse-tracking protocol is active:
/// as plain cursor-key escape sequences so wheel scrolling still works in
/// e.g. `less` or `vim` without the application opting into mouse tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseWheelMode {
    Default,
    NormalCursorKeys,
    ApplicationCursorKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventType {
    Press,
    Release,
    Drag,
}

/// A pixel-space coordinate, used by the 1016 (SGR-Pixels) transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelCoordinate {
    pub x: i32,
    pub y: i32,
}
