//! Color model (§3 Color). A [`Color`] is a tagged union resolved to RGB only
//! at render time against the active [`Palette`] — kept lazily resolved so
//! that a palette change (OSC 4/10/11/104/110/111) doesn't require touching
//! every cell that referenced a named slot.

use serde::{Deserialize, Serialize};

/// Terminal color: default, indexed (0-255), or direct RGB, plus the two
/// cursor-relative aliases used by `DECSCA`-protected "use the cell's own
/// foreground/background" semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Default,
    Indexed(u8),
    Rgb(u8, u8, u8),
    /// Resolves to whatever the owning cell's own foreground is (used by
    /// underline-color defaulting to the text color).
    CellForeground,
    /// Resolves to whatever the owning cell's own background is.
    CellBackground,
}

impl Default for Color {
    fn default() -> Self {
        Color::Default
    }
}

/// An already-resolved display color, ready to hand to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// 256-slot ANSI palette plus the named dynamic-color slots addressed by
/// OSC 10/11/12/17/19 (foreground, background, cursor, highlight-fg,
/// highlight-bg).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub ansi: [Rgb; 256],
    pub default_foreground: Rgb,
    pub default_background: Rgb,
    pub cursor_color: Rgb,
    pub selection_background: Rgb,
    pub selection_foreground: Option<Rgb>,
    pub search_highlight: Rgb,
    pub search_highlight_focused: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        let mut ansi = [Rgb::new(0, 0, 0); 256];
        for i in 0..256u16 {
            let (r, g, b) = indexed_to_rgb(i as u8);
            ansi[i as usize] = Rgb::new(r, g, b);
        }
        Self {
            ansi,
            default_foreground: Rgb::new(0xd4, 0xd4, 0xd4),
            default_background: Rgb::new(0x0e, 0x0e, 0x0e),
            cursor_color: Rgb::new(0xd4, 0xd4, 0xd4),
            selection_background: Rgb::new(0x3a, 0x3d, 0x41),
            selection_foreground: None,
            search_highlight: Rgb::new(0x62, 0x5a, 0x1a),
            search_highlight_focused: Rgb::new(0xb3, 0x8f, 0x00),
        }
    }
}

impl Palette {
    /// Resolve a [`Color`] against this palette given the cell's own fg/bg
    /// (needed for the `CellForeground`/`CellBackground` aliases).
    pub fn resolve(&self, color: Color, cell_fg: Rgb, cell_bg: Rgb) -> Rgb {
        match color {
            Color::Default => self.default_foreground,
            Color::Indexed(i) => self.ansi[i as usize],
            Color::Rgb(r, g, b) => Rgb::new(r, g, b),
            Color::CellForeground => cell_fg,
            Color::CellBackground => cell_bg,
        }
    }

    pub fn resolve_fg(&self, color: Color) -> Rgb {
        match color {
            Color::Default => self.default_foreground,
            Color::Indexed(i) => self.ansi[i as usize],
            Color::Rgb(r, g, b) => Rgb::new(r, g, b),
            Color::CellForeground | Color::CellBackground => self.default_foreground,
        }
    }

    pub fn resolve_bg(&self, color: Color) -> Rgb {
        match color {
            Color::Default => self.default_background,
            Color::Indexed(i) => self.ansi[i as usize],
            Color::Rgb(r, g, b) => Rgb::new(r, g, b),
            Color::CellForeground | Color::CellBackground => self.default_background,
        }
    }
}

/// Convert a 256-color index to an RGB tuple.
/// 0-15 are the standard/bright ANSI colors (Tokyo Night theme defaults),
/// 16-231 are a 6x6x6 color cube, 232-255 are a grayscale ramp.
pub fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0 => (0x15, 0x16, 0x1e),
        1 => (0xf7, 0x76, 0x8e),
        2 => (0x9e, 0xce, 0x6a),
        3 => (0xe0, 0xaf, 0x68),
        4 => (0x7a, 0xa2, 0xf7),
        5 => (0xbb, 0x9a, 0xf7),
        6 => (0x7d, 0xcf, 0xff),
        7 => (0xa9, 0xb1, 0xd6),
        8 => (0x41, 0x48, 0x68),
        9 => (0xff, 0x9e, 0x9e),
        10 => (0xb9, 0xf2, 0x7c),
        11 => (0xff, 0x9e, 0x64),
        12 => (0x82, 0xaa, 0xff),
        13 => (0xd4, 0xb0, 0xff),
        14 => (0xa9, 0xe1, 0xff),
        15 => (0xc0, 0xca, 0xf5),
        16..=231 => {
            let idx = index - 16;
            let r = idx / 36;
            let g = (idx % 36) / 6;
            let b = idx % 6;
            let to_val = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            (to_val(r), to_val(g), to_val(b))
        }
        232..=255 => {
            let v = 8 + 10 * (index - 232);
            (v, v, v)
        }
    }
}

/// Clamp two colors to be visually distinct, used as the final step of the
/// render-time color resolution order (§4.7 step 6).
pub fn clamp_distinct(fg: Rgb, bg: Rgb) -> (Rgb, Rgb) {
    if fg == bg {
        let bump = |c: u8| if c < 128 { c.saturating_add(40) } else { c.saturating_sub(40) };
        (Rgb::new(bump(fg.r), bump(fg.g), bump(fg.b)), bg)
    } else {
        (fg, bg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_cube_black_is_zero() {
        assert_eq!(indexed_to_rgb(16), (0, 0, 0));
    }

    #[test]
    fn grayscale_ramp_starts_at_8() {
        assert_eq!(indexed_to_rgb(232), (8, 8, 8));
    }

    #[test]
    fn distinct_clamp_perturbs_equal_colors() {
        let c = Rgb::new(10, 10, 10);
        let (fg, bg) = clamp_distinct(c, c);
        assert_ne!(fg, bg);
    }
}
