//! Configuration inputs recognized by the core (§6). Loading configuration
//! from a file is out of scope (§1) — callers construct or deserialize a
//! [`Config`] themselves and hand it to [`crate::terminal::Terminal::new`].

use serde::{Deserialize, Serialize};

use crate::color::Palette;
use crate::input::mouse::MouseProtocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub columns: usize,
    pub lines: usize,
}

/// Scrollback cap: a fixed line count or unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxHistoryLines {
    Count(usize),
    Unbounded,
}

impl Default for MaxHistoryLines {
    fn default() -> Self {
        MaxHistoryLines::Count(10_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorDisplay {
    Steady,
    Blink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorShapeConfig {
    Block,
    Underline,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorConfig {
    pub shape: CursorShapeConfig,
    pub display: CursorDisplay,
    pub blink_interval_ms: u32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            shape: CursorShapeConfig::Block,
            display: CursorDisplay::Blink,
            blink_interval_ms: 530,
        }
    }
}

/// A host permission decision for a gated operation (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Allow,
    Deny,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub capture_buffer: Permission,
    pub change_font: Permission,
    pub clipboard_write: Permission,
    pub clipboard_read: Permission,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            capture_buffer: Permission::Allow,
            change_font: Permission::Ask,
            clipboard_write: Permission::Allow,
            clipboard_read: Permission::Ask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnicodeMode {
    /// Grapheme-cluster-aware width/segmentation (`unicode-segmentation`).
    GraphemeClusters,
    /// Classic `wcwidth`-style per-codepoint width.
    Wcwidth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub page_size: PageSize,
    pub max_history_lines: MaxHistoryLines,
    pub reflow_on_resize: bool,
    pub word_delimiters: String,
    pub palette: Palette,
    pub cursor: CursorConfig,
    pub mouse_protocol: Option<MouseProtocol>,
    pub permissions: Permissions,
    pub unicode_mode: UnicodeMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: PageSize {
                columns: 80,
                lines: 24,
            },
            max_history_lines: MaxHistoryLines::default(),
            reflow_on_resize: true,
            word_delimiters: " \t,;|!\"'#$%&()*+,-./:;<=>?@[\\]^`{|}~".to_string(),
            palette: Palette::default(),
            cursor: CursorConfig::default(),
            mouse_protocol: None,
            permissions: Permissions::default(),
            unicode_mode: UnicodeMode::GraphemeClusters,
        }
    }
}
