//! The atomic grid unit (§3 Cell).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::color::Color;
use crate::image::ImageFragment;

/// Extra combining codepoints a grapheme cluster needs beyond its first.
/// Inline-stored up to 6 (7 total including the primary codepoint, matching
/// §3's "up to N (>=7) base codepoints").
pub type ClusterTail = SmallVec<[char; 6]>;

bitflags! {
    /// Style flag set (§3 Cell "style flag set").
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellFlags: u16 {
        const BOLD          = 1 << 0;
        const FAINT         = 1 << 1;
        const ITALIC        = 1 << 2;
        const UNDERLINE      = 1 << 3;
        const BLINK         = 1 << 4;
        const RAPID_BLINK    = 1 << 5;
        const INVERSE       = 1 << 6;
        const HIDDEN        = 1 << 7;
        const CROSSED_OUT    = 1 << 8;
        const FRAMED        = 1 << 9;
        const ENCIRCLED     = 1 << 10;
        const OVERLINE      = 1 << 11;
        /// Protected against selective erase (`DECSCA`).
        const PROTECTED     = 1 << 12;
        /// This cell is the trailing zero-width continuation of a wide
        /// (2-column) cell to its left.
        const WIDE_CONTINUATION = 1 << 13;
    }
}

/// `4:0..4:5` underline sub-styles (SGR 4 with a colon-separated subparam,
/// or the legacy double-underline `21`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnderlineStyle {
    #[default]
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

/// One grid position and its styled content.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// The first (base) codepoint of the grapheme cluster occupying this
    /// cell.
    pub codepoint: char,
    /// Any additional codepoints (combining marks, ZWJ sequences) that were
    /// merged into this cluster after the base codepoint.
    pub cluster_tail: ClusterTail,
    /// Display width of the whole cluster: 0 (continuation), 1, or 2.
    pub width: u8,
    pub fg: Color,
    pub bg: Color,
    pub underline_color: Color,
    pub underline_style: UnderlineStyle,
    pub flags: CellFlags,
    /// Weak reference into the owning [`crate::hyperlink::HyperlinkTable`].
    pub hyperlink: Option<String>,
    pub image: Option<ImageFragment>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            codepoint: ' ',
            cluster_tail: ClusterTail::new(),
            width: 1,
            fg: Color::Default,
            bg: Color::Default,
            underline_color: Color::CellForeground,
            underline_style: UnderlineStyle::Single,
            flags: CellFlags::empty(),
            hyperlink: None,
            image: None,
        }
    }
}

impl Cell {
    /// A blank cell erased with the given background color (ECMA-48 erase
    /// semantics: SGR resets to defaults, but the background carries the
    /// cursor's current background at the time of the erase).
    pub fn erased(bg: Color) -> Self {
        Self {
            bg,
            ..Default::default()
        }
    }

    /// The zero-width continuation cell following a width-2 cell.
    pub fn wide_continuation() -> Self {
        Self {
            codepoint: ' ',
            width: 0,
            flags: CellFlags::WIDE_CONTINUATION,
            ..Default::default()
        }
    }

    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    pub fn is_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// True if this cell carries only default content: blank codepoint, no
    /// style, no hyperlink/image. Used by the trivial-line fast path.
    pub fn is_blank_default(&self) -> bool {
        self.codepoint == ' '
            && self.cluster_tail.is_empty()
            && self.width == 1
            && self.fg == Color::Default
            && self.bg == Color::Default
            && self.flags.is_empty()
            && self.hyperlink.is_none()
            && self.image.is_none()
    }

    /// Append a combining codepoint to this cluster (unicode cluster mode,
    /// §4.3 text-writing rule 2). Does not change display width unless
    /// the combining mark itself is wide (rare; callers pass the computed
    /// width explicitly).
    pub fn append_combining(&mut self, c: char) {
        self.cluster_tail.push(c);
    }

    /// The full grapheme cluster as a `String`, for search/selection/render.
    pub fn text(&self) -> String {
        let mut s = String::with_capacity(1 + self.cluster_tail.len());
        s.push(self.codepoint);
        for c in &self.cluster_tail {
            s.push(*c);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_blank() {
        assert!(Cell::default().is_blank_default());
    }

    #[test]
    fn erased_cell_keeps_background() {
        let c = Cell::erased(Color::Indexed(4));
        assert_eq!(c.bg, Color::Indexed(4));
        assert_eq!(c.fg, Color::Default);
    }

    #[test]
    fn combining_mark_extends_cluster_text() {
        let mut c = Cell::default();
        c.codepoint = 'e';
        c.append_combining('\u{0301}'); // combining acute accent
        assert_eq!(c.text(), "e\u{0301}");
    }
}
