//! The flat render-buffer types produced by one [`super::builder::RenderBufferBuilder`]
//! pass (§6 "Render buffer (core -> display backend)").

use bitflags::bitflags;
use serde::Serialize;

use crate::cell::UnderlineStyle;
use crate::color::Rgb;

bitflags! {
    /// Per-cell style flags surviving into the render buffer (a render-time
    /// mirror of [`crate::cell::CellFlags`], without the storage-only
    /// `WIDE_CONTINUATION` bit and with `reverse_video` already folded in).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
    pub struct RenderCellFlags: u16 {
        const BOLD       = 1 << 0;
        const FAINT      = 1 << 1;
        const ITALIC     = 1 << 2;
        const BLINK      = 1 << 3;
        const RAPID_BLINK = 1 << 4;
        const HIDDEN     = 1 << 5;
        const CROSSED_OUT = 1 << 6;
        const FRAMED     = 1 << 7;
        const ENCIRCLED  = 1 << 8;
        const OVERLINE   = 1 << 9;
        /// This cell is already drawn by an IME preedit overlay; the text
        /// renderer should skip it (§4.7 "Input Method Editor preedit").
        const IME_SKIP   = 1 << 10;
    }
}

bitflags! {
    /// Per-line flags the renderer needs (subset of [`crate::line::LineFlags`]
    /// plus render-only additions).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
    pub struct RenderLineFlags: u8 {
        const DOUBLE_WIDTH = 1 << 0;
        const DOUBLE_HEIGHT_TOP = 1 << 1;
        const DOUBLE_HEIGHT_BOTTOM = 1 << 2;
        const MARKED = 1 << 3;
    }
}

/// A fully resolved color triple plus style flags, ready to hand to a
/// display backend with no further lookups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderAttributes {
    pub fg: Rgb,
    pub bg: Rgb,
    pub underline_color: Rgb,
    pub underline_style: UnderlineStyle,
    pub flags: RenderCellFlags,
    pub line_flags: RenderLineFlags,
}

/// Shared text styling for a whole [`RenderLine`] in the trivial fast path.
pub type TextAttrs = RenderAttributes;

/// One grid line taking the trivial fast path: uniform attributes across the
/// whole line, no cursor/selection/search-hit intersecting it (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderLine {
    pub line_offset: i32,
    pub used_columns: u16,
    pub display_width: u16,
    pub text: String,
    pub text_attrs: TextAttrs,
    pub fill_attrs: TextAttrs,
    pub flags: RenderLineFlags,
}

/// One grid cell taking the slow, per-cell path (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderCell {
    pub line: i32,
    pub column: i32,
    pub width: u8,
    pub codepoints: String,
    pub attrs: RenderAttributes,
    pub image: Option<RenderImageRef>,
    /// This cell starts a contiguous shaping run.
    pub group_start: bool,
    /// This cell ends a contiguous shaping run.
    pub group_end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderImageRef {
    pub image_id: String,
    pub offset_in_image: (u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
    /// Forced when the terminal is unfocused, regardless of the configured
    /// shape (§4.7 "Cursor").
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderCursor {
    pub position: (i32, i32),
    pub shape: CursorShape,
    /// Cell-width the cursor spans: 2 over a wide glyph, else 1.
    pub width: u8,
    /// `[0, 1]` blink/fade animation phase; cosmetic only (§5 "Cancellation
    /// and timeouts").
    pub animation_progress: f32,
}

/// One frame's complete render description (§6).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderBuffer {
    pub frame_id: u64,
    pub cells: Vec<RenderCell>,
    pub lines: Vec<RenderLine>,
    pub cursor: Option<RenderCursor>,
}
