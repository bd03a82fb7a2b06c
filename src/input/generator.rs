//! InputGenerator (C6): turns host keyboard/mouse/paste/focus events into
//! the byte sequences written to the PTY, honoring `DECCKM`/application
//! keypad mode, bracketed paste, focus-event reporting, and the mouse
//! tracking protocol/transport pair currently enabled via `DECSET`.
//!
//! Grounded on `original_source/src/vtbackend/InputGenerator.cpp`'s
//! `StandardKeyboardInputGenerator`/`InputGenerator` pair, re-expressed
//! without the C++ `select()`-template trick: each function key's
//! std/modified/application-mode encodings are plain `&str` fields on a
//! lookup table.

use std::collections::HashSet;

use crate::input::key::{Key, KeyMode, KeyboardEventType, Modifiers};
use crate::input::mouse::{
    MouseButton, MouseEventType, MouseProtocol, MouseTransport, MouseWheelMode, PixelCoordinate,
};
use crate::primitives::CellLocation;

/// The std/modified/application-mode encodings of one navigation or
/// function key.
struct KeyMapping {
    std: &'static str,
    mods: Option<&'static str>,
    app_cursor: Option<&'static str>,
    app_keypad: Option<&'static str>,
}

const fn simple(std: &'static str) -> KeyMapping {
    KeyMapping { std, mods: None, app_cursor: None, app_keypad: None }
}

const fn with_mods(std: &'static str, mods: &'static str) -> KeyMapping {
    KeyMapping { std, mods: Some(mods), app_cursor: None, app_keypad: None }
}

const fn cursor(std: &'static str, mods: &'static str, app_cursor: &'static str) -> KeyMapping {
    KeyMapping { std, mods: Some(mods), app_cursor: Some(app_cursor), app_keypad: None }
}

/// The xterm "virtual terminal parameter" used in `CSI 1;{}X`-style
/// modified key sequences: 1 + shift(1) + alt(2) + ctrl(4) + meta(8).
fn virtual_terminal_param(modifier: Modifiers) -> u8 {
    let mut v = 1u8;
    if modifier.contains(Modifiers::SHIFT) {
        v += 1;
    }
    if modifier.contains(Modifiers::ALT) || modifier.contains(Modifiers::META) {
        v += 2;
    }
    if modifier.contains(Modifiers::CONTROL) {
        v += 4;
    }
    v
}

fn function_key_mapping(key: Key) -> Option<KeyMapping> {
    use Key::*;
    Some(match key {
        F1 => cursor("\x1bOP", "\x1bO{}P", "\x1bOP"),
        F2 => cursor("\x1bOQ", "\x1bO{}Q", "\x1bOQ"),
        F3 => cursor("\x1bOR", "\x1bO{}R", "\x1bOR"),
        F4 => cursor("\x1bOS", "\x1bO{}S", "\x1bOS"),
        F5 => with_mods("\x1b[15~", "\x1b[15;{}~"),
        F6 => with_mods("\x1b[17~", "\x1b[17;{}~"),
        F7 => with_mods("\x1b[18~", "\x1b[18;{}~"),
        F8 => with_mods("\x1b[19~", "\x1b[19;{}~"),
        F9 => with_mods("\x1b[20~", "\x1b[20;{}~"),
        F10 => with_mods("\x1b[21~", "\x1b[21;{}~"),
        F11 => with_mods("\x1b[23~", "\x1b[23;{}~"),
        F12 => with_mods("\x1b[24~", "\x1b[24;{}~"),
        F13 => with_mods("\x1b[25~", "\x1b[25;{}~"),
        F14 => with_mods("\x1b[26~", "\x1b[26;{}~"),
        F15 => with_mods("\x1b[28~", "\x1b[28;{}~"),
        F16 => with_mods("\x1b[29~", "\x1b[29;{}~"),
        F17 => with_mods("\x1b[31~", "\x1b[31;{}~"),
        F18 => with_mods("\x1b[32~", "\x1b[32;{}~"),
        F19 => with_mods("\x1b[33~", "\x1b[33;{}~"),
        F20 => with_mods("\x1b[34~", "\x1b[34;{}~"),
        F21 => with_mods("\x1b[35~", "\x1b[35;{}~"),
        F22 => with_mods("\x1b[36~", "\x1b[36;{}~"),
        F23 => with_mods("\x1b[37~", "\x1b[37;{}~"),
        F24 => with_mods("\x1b[38~", "\x1b[38;{}~"),
        F25 => with_mods("\x1b[39~", "\x1b[39;{}~"),
        F26 => with_mods("\x1b[40~", "\x1b[40;{}~"),
        F27 => with_mods("\x1b[41~", "\x1b[41;{}~"),
        F28 => with_mods("\x1b[42~", "\x1b[42;{}~"),
        F29 => with_mods("\x1b[43~", "\x1b[43;{}~"),
        F30 => with_mods("\x1b[44~", "\x1b[44;{}~"),
        F31 => with_mods("\x1b[45~", "\x1b[45;{}~"),
        F32 => with_mods("\x1b[46~", "\x1b[46;{}~"),
        F33 => with_mods("\x1b[47~", "\x1b[47;{}~"),
        F34 => with_mods("\x1b[48~", "\x1b[48;{}~"),
        F35 => with_mods("\x1b[49~", "\x1b[49;{}~"),
        UpArrow => cursor("\x1b[A", "\x1b[1;{}A", "\x1bOA"),
        DownArrow => cursor("\x1b[B", "\x1b[1;{}B", "\x1bOB"),
        RightArrow => cursor("\x1b[C", "\x1b[1;{}C", "\x1bOC"),
        LeftArrow => cursor("\x1b[D", "\x1b[1;{}D", "\x1bOD"),
        Home => cursor("\x1b[H", "\x1b[1;{}H", "\x1bOH"),
        End => cursor("\x1b[F", "\x1b[1;{}F", "\x1bOF"),
        PageUp => with_mods("\x1b[5~", "\x1b[5;{}~"),
        PageDown => with_mods("\x1b[6~", "\x1b[6;{}~"),
        Insert => with_mods("\x1b[2~", "\x1b[2;{}~"),
        Delete => with_mods("\x1b[3~", "\x1b[3;{}~"),
        _ => return None,
    })
}

/// Accumulates pending output bytes and tracks the small amount of state
/// (cursor/numpad keys mode, mouse tracking, bracketed paste, focus
/// reporting) that changes how host input is encoded.
#[derive(Debug)]
pub struct InputGenerator {
    pending: String,
    cursor_keys_mode: KeyMode,
    numpad_keys_mode: KeyMode,
    application_keypad: bool,
    bracketed_paste: bool,
    generate_focus_events: bool,
    mouse_protocol: Option<MouseProtocol>,
    mouse_transport: MouseTransport,
    mouse_wheel_mode: MouseWheelMode,
    passive_mouse_tracking: bool,
    currently_pressed: HashSet<MouseButtonKey>,
    current_mouse_position: CellLocation,
}

/// `MouseButton` doesn't derive `Hash`/`Eq` (it's a plain copy enum used in
/// hot paths); this newtype gives the tracking set what it needs without
/// widening the public type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MouseButtonKey(u8);

fn button_key(b: MouseButton) -> MouseButtonKey {
    MouseButtonKey(match b {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::Release => 3,
        MouseButton::WheelUp => 4,
        MouseButton::WheelDown => 5,
        MouseButton::WheelLeft => 6,
        MouseButton::WheelRight => 7,
    })
}

impl Default for InputGenerator {
    fn default() -> Self {
        Self {
            pending: String::new(),
            cursor_keys_mode: KeyMode::Normal,
            numpad_keys_mode: KeyMode::Normal,
            application_keypad: false,
            bracketed_paste: false,
            generate_focus_events: false,
            mouse_protocol: None,
            mouse_transport: MouseTransport::Default,
            mouse_wheel_mode: MouseWheelMode::Default,
            passive_mouse_tracking: false,
            currently_pressed: HashSet::new(),
            current_mouse_position: CellLocation::default(),
        }
    }
}

impl InputGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything generated since the last call.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_cursor_keys_mode(&mut self, mode: KeyMode) {
        self.cursor_keys_mode = mode;
    }

    pub fn set_numpad_keys_mode(&mut self, mode: KeyMode) {
        self.numpad_keys_mode = mode;
    }

    pub fn set_application_keypad_mode(&mut self, enabled: bool) {
        self.application_keypad = enabled;
    }

    pub fn set_bracketed_paste(&mut self, enabled: bool) {
        self.bracketed_paste = enabled;
    }

    pub fn set_focus_events(&mut self, enabled: bool) {
        self.generate_focus_events = enabled;
    }

    pub fn set_mouse_protocol(&mut self, protocol: MouseProtocol, enabled: bool) {
        self.mouse_protocol = if enabled {
            self.mouse_wheel_mode = MouseWheelMode::Default;
            Some(protocol)
        } else {
            None
        };
    }

    pub fn set_mouse_transport(&mut self, transport: MouseTransport) {
        self.mouse_transport = transport;
    }

    pub fn set_mouse_wheel_mode(&mut self, mode: MouseWheelMode) {
        self.mouse_wheel_mode = mode;
    }

    pub fn set_passive_mouse_tracking(&mut self, enabled: bool) {
        self.passive_mouse_tracking = enabled;
    }

    pub fn cursor_keys_mode(&self) -> KeyMode {
        self.cursor_keys_mode
    }

    pub fn mouse_protocol(&self) -> Option<MouseProtocol> {
        self.mouse_protocol
    }

    pub fn mouse_transport(&self) -> MouseTransport {
        self.mouse_transport
    }

    pub fn bracketed_paste(&self) -> bool {
        self.bracketed_paste
    }

    /// Encode one printable character per the "Alt and Meta Keys" rules in
    /// xterm's ctlseqs: raw C0 codes under `Control`, an `ESC` prefix under
    /// `Alt`, otherwise the character (or its C0 equivalent for control
    /// combinations) verbatim.
    pub fn generate_char(&mut self, c: char, modifier: Modifiers, event: KeyboardEventType) -> bool {
        if event == KeyboardEventType::Release {
            return false;
        }

        if modifier.contains(Modifiers::ALT) {
            self.pending.push('\u{1b}');
        }

        if c == '\u{8}' {
            self.pending.push(if modifier.contains(Modifiers::CONTROL) { '\u{8}' } else { '\u{7f}' });
            return true;
        }

        if modifier == Modifiers::SHIFT && c == '\t' {
            self.pending.push_str("\x1b[Z");
            return true;
        }

        if modifier.contains(Modifiers::CONTROL) {
            let cu = c as u32;
            if cu < 32 {
                self.pending.push(c);
                return true;
            }
            if c == ' ' {
                self.pending.push('\u{0}');
                return true;
            }
            if c.is_ascii_uppercase() || c.is_ascii_lowercase() {
                let upper = c.to_ascii_uppercase();
                self.pending.push((upper as u8 - b'A' + 1) as char);
                return true;
            }
            if ('['..='_').contains(&c) {
                self.pending.push((c as u8 - b'A' + 1) as char);
                return true;
            }
        }

        let without_alt = modifier.difference(Modifiers::ALT);
        if without_alt.none() || modifier == Modifiers::SHIFT {
            self.pending.push(c);
            return true;
        }

        self.pending.push(c);
        true
    }

    /// Encode a non-printable key per [`function_key_mapping`], selecting
    /// the application-cursor/application-keypad/modified/standard encoding
    /// in that priority order. Returns `false` for keys with no VT encoding
    /// (bare modifier presses, media keys, lock keys).
    pub fn generate_key(&mut self, key: Key, modifier: Modifiers, event: KeyboardEventType) -> bool {
        if event == KeyboardEventType::Release {
            return false;
        }

        match key {
            Key::Escape => {
                self.pending.push('\u{1b}');
                return true;
            }
            Key::Enter => {
                self.pending.push('\r');
                return true;
            }
            Key::Tab => {
                self.pending.push('\t');
                return true;
            }
            Key::Backspace => {
                self.pending.push(if modifier.contains(Modifiers::CONTROL) { '\u{7f}' } else { '\u{8}' });
                return true;
            }
            Key::Unencodable => return false,
            _ => {}
        }

        let Some(mapping) = function_key_mapping(key) else {
            return false;
        };

        let application_cursor = matches!(key, Key::UpArrow | Key::DownArrow | Key::LeftArrow | Key::RightArrow | Key::Home | Key::End)
            && self.cursor_keys_mode == KeyMode::Application;

        if application_cursor {
            if let Some(seq) = mapping.app_cursor {
                self.pending.push_str(seq);
                return true;
            }
        }
        if self.application_keypad {
            if let Some(seq) = mapping.app_keypad {
                self.pending.push_str(seq);
                return true;
            }
        }
        if !modifier.none() {
            if let Some(template) = mapping.mods {
                let param = virtual_terminal_param(modifier);
                self.pending.push_str(&template.replace("{}", &param.to_string()));
                return true;
            }
        }
        self.pending.push_str(mapping.std);
        true
    }

    /// `DECSET 2004`-bracketed paste wraps the text in `ESC [ 200 ~` / `ESC
    /// [ 201 ~` when the mode is enabled.
    pub fn generate_paste(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.bracketed_paste {
            self.pending.push_str("\x1b[200~");
        }
        self.pending.push_str(text);
        if self.bracketed_paste {
            self.pending.push_str("\x1b[201~");
        }
    }

    pub fn generate_focus_in(&mut self) -> bool {
        if self.generate_focus_events {
            self.pending.push_str("\x1b[I");
            true
        } else {
            false
        }
    }

    pub fn generate_focus_out(&mut self) -> bool {
        if self.generate_focus_events {
            self.pending.push_str("\x1b[O");
        }
        true
    }

    pub fn generate_raw(&mut self, raw: &str) {
        self.pending.push_str(raw);
    }

    fn modifier_bits(modifier: Modifiers) -> u8 {
        let mut mods = 0u8;
        if modifier.contains(Modifiers::SHIFT) {
            mods |= 4;
        }
        if modifier.contains(Modifiers::META) || modifier.contains(Modifiers::ALT) {
            mods |= 8;
        }
        if modifier.contains(Modifiers::CONTROL) {
            mods |= 16;
        }
        mods
    }

    fn button_number(button: MouseButton) -> u8 {
        button_key(button).0
    }

    fn button_x10(button: MouseButton) -> u8 {
        if button.is_wheel() {
            Self::button_number(button) + 0x3c
        } else {
            Self::button_number(button)
        }
    }

    fn button_normal(button: MouseButton, event: MouseEventType) -> u8 {
        if event == MouseEventType::Release {
            3
        } else {
            Self::button_x10(button)
        }
    }

    fn mouse_transport_x10(&mut self, button: u8, modifier: u8, pos: CellLocation) -> bool {
        const SKIP: u32 = 0x20;
        const MAX: u32 = 255 - SKIP;
        if (pos.line.get() as u32) < MAX && (pos.column.get() as u32) < MAX {
            self.pending.push_str("\x1b[M");
            self.pending.push((SKIP as u8 + (button | modifier)) as char);
            self.pending.push((SKIP as u8 + pos.column.get() as u8 + 1) as char);
            self.pending.push((SKIP as u8 + pos.line.get() as u8 + 1) as char);
            true
        } else {
            false
        }
    }

    fn mouse_transport_sgr(&mut self, event: MouseEventType, button: u8, modifier: u8, x: i32, y: i32) -> bool {
        self.pending.push_str("\x1b[<");
        self.pending.push_str(&(button | modifier).to_string());
        self.pending.push(';');
        self.pending.push_str(&x.to_string());
        self.pending.push(';');
        self.pending.push_str(&y.to_string());
        if self.passive_mouse_tracking {
            self.pending.push_str(";1");
        }
        self.pending.push(if event != MouseEventType::Release { 'M' } else { 'm' });
        true
    }

    fn mouse_transport_urxvt(&mut self, event: MouseEventType, button: u8, modifier: u8, pos: CellLocation) -> bool {
        if event == MouseEventType::Press {
            self.pending.push_str("\x1b[");
            self.pending.push_str(&(button | modifier).to_string());
            self.pending.push(';');
            self.pending.push_str(&(pos.column.get() + 1).to_string());
            self.pending.push(';');
            self.pending.push_str(&(pos.line.get() + 1).to_string());
            self.pending.push('M');
        }
        true
    }

    fn mouse_transport(
        &mut self,
        event: MouseEventType,
        button: u8,
        modifier: u8,
        pos: CellLocation,
        pixel: PixelCoordinate,
    ) -> bool {
        if pos.line.get() < 0 || pos.column.get() < 0 {
            return true;
        }
        match self.mouse_transport {
            MouseTransport::Default => self.mouse_transport_x10(button, modifier, pos),
            MouseTransport::Extended => self.mouse_transport_x10(button, modifier, pos),
            MouseTransport::Sgr => {
                self.mouse_transport_sgr(event, button, modifier, pos.column.get() + 1, pos.line.get() + 1)
            }
            MouseTransport::Urxvt => self.mouse_transport_urxvt(event, button, modifier, pos),
            MouseTransport::SgrPixels => self.mouse_transport_sgr(event, button, modifier, pixel.x, pixel.y),
        }
    }

    fn generate_mouse(
        &mut self,
        event: MouseEventType,
        modifier: Modifiers,
        button: MouseButton,
        pos: CellLocation,
        pixel: PixelCoordinate,
    ) -> bool {
        let Some(protocol) = self.mouse_protocol else {
            return false;
        };
        let mods = Self::modifier_bits(modifier);
        match protocol {
            MouseProtocol::X10 => {
                if event == MouseEventType::Press {
                    self.mouse_transport(event, Self::button_x10(button), mods, pos, pixel);
                }
                true
            }
            MouseProtocol::NormalTracking => {
                if event == MouseEventType::Press || event == MouseEventType::Release {
                    let value = if self.mouse_transport != MouseTransport::Sgr {
                        Self::button_normal(button, event)
                    } else {
                        Self::button_x10(button)
                    };
                    self.mouse_transport(event, value, mods, pos, pixel);
                }
                true
            }
            MouseProtocol::ButtonTracking => {
                if matches!(event, MouseEventType::Press | MouseEventType::Drag | MouseEventType::Release) {
                    let base = if self.mouse_transport != MouseTransport::Sgr {
                        Self::button_normal(button, event)
                    } else {
                        Self::button_x10(button)
                    };
                    let value = if event == MouseEventType::Drag { base + 0x20 } else { base };
                    self.mouse_transport(event, value, mods, pos, pixel);
                    true
                } else {
                    false
                }
            }
            MouseProtocol::AnyEventTracking => {
                let base = if self.mouse_transport != MouseTransport::Sgr {
                    Self::button_normal(button, event)
                } else {
                    Self::button_x10(button)
                };
                let value = if event == MouseEventType::Drag { base + 0x20 } else { base };
                self.mouse_transport(event, value, mods, pos, pixel);
                true
            }
            MouseProtocol::HighlightTracking => false,
        }
    }

    pub fn generate_mouse_press(
        &mut self,
        modifier: Modifiers,
        button: MouseButton,
        pos: CellLocation,
        pixel: PixelCoordinate,
    ) -> bool {
        self.current_mouse_position = pos;

        if self.mouse_protocol.is_none() {
            return false;
        }

        if !self.passive_mouse_tracking {
            match (self.mouse_wheel_mode, button) {
                (MouseWheelMode::NormalCursorKeys, MouseButton::WheelUp) => {
                    self.pending.push_str("\x1b[A");
                    return true;
                }
                (MouseWheelMode::NormalCursorKeys, MouseButton::WheelDown) => {
                    self.pending.push_str("\x1b[B");
                    return true;
                }
                (MouseWheelMode::ApplicationCursorKeys, MouseButton::WheelUp) => {
                    self.pending.push_str("\x1bOA");
                    return true;
                }
                (MouseWheelMode::ApplicationCursorKeys, MouseButton::WheelDown) => {
                    self.pending.push_str("\x1bOB");
                    return true;
                }
                _ => {}
            }
        }

        if !button.is_wheel() {
            self.currently_pressed.insert(button_key(button));
        }

        self.generate_mouse(MouseEventType::Press, modifier, button, pos, pixel)
    }

    pub fn generate_mouse_release(
        &mut self,
        modifier: Modifiers,
        button: MouseButton,
        pos: CellLocation,
        pixel: PixelCoordinate,
    ) -> bool {
        self.current_mouse_position = pos;
        self.currently_pressed.remove(&button_key(button));
        self.generate_mouse(MouseEventType::Release, modifier, button, pos, pixel)
    }

    pub fn generate_mouse_move(&mut self, modifier: Modifiers, pos: CellLocation, pixel: PixelCoordinate) -> bool {
        if pos == self.current_mouse_position && self.mouse_transport != MouseTransport::SgrPixels {
            return false;
        }
        self.current_mouse_position = pos;

        let Some(protocol) = self.mouse_protocol else {
            return false;
        };

        let pressed = !self.currently_pressed.is_empty();
        let report = (protocol == MouseProtocol::ButtonTracking && pressed)
            || protocol == MouseProtocol::AnyEventTracking;

        if report {
            let button = if pressed { MouseButton::Left } else { MouseButton::Release };
            self.generate_mouse(MouseEventType::Drag, modifier, button, pos, pixel)
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{ColumnOffset, LineOffset};

    #[test]
    fn control_letter_generates_c0_code() {
        let mut gen = InputGenerator::new();
        gen.generate_char('c', Modifiers::CONTROL, KeyboardEventType::Press);
        assert_eq!(gen.take(), "\u{3}");
    }

    #[test]
    fn alt_prefixes_escape() {
        let mut gen = InputGenerator::new();
        gen.generate_char('x', Modifiers::ALT, KeyboardEventType::Press);
        assert_eq!(gen.take(), "\u{1b}x");
    }

    #[test]
    fn application_cursor_keys_use_ss3() {
        let mut gen = InputGenerator::new();
        gen.set_cursor_keys_mode(KeyMode::Application);
        gen.generate_key(Key::UpArrow, Modifiers::empty(), KeyboardEventType::Press);
        assert_eq!(gen.take(), "\x1bOA");
    }

    #[test]
    fn modified_arrow_key_uses_virtual_terminal_param() {
        let mut gen = InputGenerator::new();
        gen.generate_key(Key::UpArrow, Modifiers::SHIFT, KeyboardEventType::Press);
        assert_eq!(gen.take(), "\x1b[1;2A");
    }

    #[test]
    fn bracketed_paste_wraps_text() {
        let mut gen = InputGenerator::new();
        gen.set_bracketed_paste(true);
        gen.generate_paste("hi");
        assert_eq!(gen.take(), "\x1b[200~hi\x1b[201~");
    }

    #[test]
    fn sgr_mouse_press_reports_one_indexed_coordinates() {
        let mut gen = InputGenerator::new();
        gen.set_mouse_protocol(MouseProtocol::NormalTracking, true);
        gen.set_mouse_transport(MouseTransport::Sgr);
        let pos = CellLocation::new(LineOffset(2), ColumnOffset(4));
        gen.generate_mouse_press(Modifiers::empty(), MouseButton::Left, pos, PixelCoordinate::default());
        assert_eq!(gen.take(), "\x1b[<0;5;3M");
    }
}
