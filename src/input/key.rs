//! Key and modifier vocabulary for [`super::generator::InputGenerator`].

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT   = 1 << 0;
        const ALT     = 1 << 1;
        const CONTROL = 1 << 2;
        const META    = 1 << 3;
    }
}

impl Modifiers {
    pub fn none(self) -> bool {
        self.is_empty()
    }
}

/// Whether a key/mouse event is a press, a held-down repeat, or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardEventType {
    Press,
    Repeat,
    Release,
}

/// `DECCKM`/numeric-keypad application mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    Normal,
    Application,
}

/// Non-printable keys the host can report (function keys, navigation keys,
/// and the handful of keys the generator deliberately ignores because they
/// carry no VT encoding of their own, like bare modifier presses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    F13, F14, F15, F16, F17, F18, F19, F20,
    F21, F22, F23, F24, F25, F26, F27, F28, F29, F30,
    F31, F32, F33, F34, F35,
    Escape,
    Enter,
    Tab,
    Backspace,
    UpArrow,
    DownArrow,
    LeftArrow,
    RightArrow,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Bare modifier/media/lock keys that never generate a byte sequence by
    /// themselves.
    Unencodable,
}
