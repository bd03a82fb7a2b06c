//! A single grid line (§3 Line). Storage is either *trivial* — a contiguous
//! run of uniformly-styled single-width ASCII/Latin text, stored as a plain
//! `String` — or *inflated* — a full `Cell` array. The transition between
//! the two is transparent: every accessor works against either
//! representation, materializing cells from the trivial form on demand.
//!
//! This mirrors the optimization `original_source/src/vtbackend/Grid.h`
//! documents for `Line<Cell>`: most terminal output is monochrome text, so
//! keeping it as a byte run avoids a `Cell` allocation per column until
//! something actually needs per-cell styling.

use bitflags::bitflags;

use crate::cell::{Cell, CellFlags};
use crate::color::Color;

bitflags! {
    /// Per-line flags (§3 Line).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct LineFlags: u8 {
        /// This line is the continuation of a wrapped logical line.
        const WRAPPED        = 1 << 0;
        /// This line may reflow on resize (DEC TextReflow mode).
        const WRAPPABLE      = 1 << 1;
        const MARKED         = 1 << 2;
        const DOUBLE_WIDTH    = 1 << 3;
        const DOUBLE_HEIGHT_TOP = 1 << 4;
        const DOUBLE_HEIGHT_BOTTOM = 1 << 5;
    }
}

#[derive(Debug, Clone)]
enum Storage {
    Trivial {
        text: Vec<char>,
        fg: Color,
        bg: Color,
    },
    Inflated(Vec<Cell>),
}

#[derive(Debug, Clone)]
pub struct Line {
    storage: Storage,
    pub flags: LineFlags,
    dirty: bool,
}

impl Line {
    pub fn blank(columns: usize, wrappable: bool) -> Self {
        let mut flags = LineFlags::empty();
        if wrappable {
            flags |= LineFlags::WRAPPABLE;
        }
        Self {
            storage: Storage::Trivial {
                text: vec![' '; columns],
                fg: Color::Default,
                bg: Color::Default,
            },
            flags,
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Trivial { text, .. } => text.len(),
            Storage::Inflated(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Whether this line is in the fast trivial representation.
    pub fn is_trivial(&self) -> bool {
        matches!(self.storage, Storage::Trivial { .. })
    }

    fn inflate(&mut self) {
        if let Storage::Trivial { text, fg, bg } = &self.storage {
            let cells = text
                .iter()
                .map(|&c| Cell {
                    codepoint: c,
                    fg: *fg,
                    bg: *bg,
                    ..Default::default()
                })
                .collect();
            self.storage = Storage::Inflated(cells);
        }
    }

    /// Materialize the cell at `col` (allocating a temporary default cell if
    /// out of range is not done here — callers must bounds-check).
    pub fn cell_at(&self, col: usize) -> Cell {
        match &self.storage {
            Storage::Trivial { text, fg, bg } => Cell {
                codepoint: text[col],
                fg: *fg,
                bg: *bg,
                ..Default::default()
            },
            Storage::Inflated(cells) => cells[col].clone(),
        }
    }

    pub fn set_cell(&mut self, col: usize, cell: Cell) {
        self.dirty = true;
        // A non-trivial cell (styled, wide, cluster tail, hyperlink, image)
        // forces inflation; otherwise try to keep the fast path alive.
        let trivial_compatible = cell.cluster_tail.is_empty()
            && cell.width == 1
            && cell.underline_color == Color::CellForeground
            && cell.flags.is_empty()
            && cell.hyperlink.is_none()
            && cell.image.is_none();

        if let Storage::Trivial { text, fg, bg } = &mut self.storage {
            if trivial_compatible && (text.iter().all(|_| true)) {
                // Trivial storage requires uniform fg/bg across the whole
                // line; if this write matches the line's current uniform
                // style (or the line is otherwise all-blank so any style
                // becomes the new uniform), keep it trivial.
                let uniform_ok = (*fg == cell.fg && *bg == cell.bg)
                    || text.iter().enumerate().all(|(i, &c)| i == col || c == ' ');
                if uniform_ok {
                    text[col] = cell.codepoint;
                    *fg = cell.fg;
                    *bg = cell.bg;
                    return;
                }
            }
        }
        self.inflate();
        if let Storage::Inflated(cells) = &mut self.storage {
            cells[col] = cell;
        }
    }

    pub fn erase(&mut self, col: usize, bg: Color) {
        self.set_cell(col, Cell::erased(bg));
    }

    pub fn erase_range(&mut self, from: usize, to_exclusive: usize, bg: Color) {
        for c in from..to_exclusive.min(self.len()) {
            self.erase(c, bg);
        }
    }

    pub fn clear(&mut self) {
        let n = self.len();
        self.storage = Storage::Trivial {
            text: vec![' '; n],
            fg: Color::Default,
            bg: Color::Default,
        };
        self.dirty = true;
    }

    pub fn resize(&mut self, columns: usize) {
        match &mut self.storage {
            Storage::Trivial { text, .. } => text.resize(columns, ' '),
            Storage::Inflated(cells) => cells.resize(columns, Cell::default()),
        }
        self.dirty = true;
    }

    /// Insert `count` blank cells at `col`, shifting the remainder right and
    /// dropping cells that fall off the end (`DCH`/`ICH` support via
    /// `Grid::insert_cells`).
    pub fn insert_blanks(&mut self, col: usize, count: usize, bg: Color) {
        self.inflate();
        if let Storage::Inflated(cells) = &mut self.storage {
            let len = cells.len();
            let col = col.min(len);
            let count = count.min(len - col);
            cells.truncate(len - count);
            for _ in 0..count {
                cells.insert(col, Cell::erased(bg));
            }
        }
        self.dirty = true;
    }

    /// Delete `count` cells at `col`, shifting the remainder left and
    /// filling vacated trailing cells with blanks.
    pub fn delete_cells(&mut self, col: usize, count: usize, bg: Color) {
        self.inflate();
        if let Storage::Inflated(cells) = &mut self.storage {
            let len = cells.len();
            let col = col.min(len);
            let count = count.min(len - col);
            for _ in 0..count {
                cells.remove(col);
                cells.push(Cell::erased(bg));
            }
        }
        self.dirty = true;
    }

    /// Iterate the full grapheme text of the line, right-trimmed of
    /// trailing blanks (for search and logical-line reflow).
    pub fn text_trimmed(&self) -> String {
        let mut out = String::new();
        for col in 0..self.len() {
            if self.cell_at(col).is_continuation() {
                continue;
            }
            out.push_str(&self.cell_at(col).text());
        }
        out.trim_end_matches(' ').to_string()
    }

    pub fn all_cells(&self) -> Vec<Cell> {
        (0..self.len()).map(|c| self.cell_at(c)).collect()
    }

    pub fn from_cells(cells: Vec<Cell>, wrappable: bool) -> Self {
        let mut flags = LineFlags::empty();
        if wrappable {
            flags |= LineFlags::WRAPPABLE;
        }
        Self {
            storage: Storage::Inflated(cells),
            flags,
            dirty: true,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        self.flags.contains(LineFlags::WRAPPED)
    }

    pub fn set_wrapped(&mut self, wrapped: bool) {
        self.flags.set(LineFlags::WRAPPED, wrapped);
        self.dirty = true;
    }
}

impl CellFlags {
    /// Whether these flags alone would still permit trivial-line storage.
    pub fn trivial_compatible(self) -> bool {
        self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_is_trivial() {
        let line = Line::blank(10, true);
        assert!(line.is_trivial());
        assert_eq!(line.cell_at(0).codepoint, ' ');
    }

    #[test]
    fn styled_write_inflates() {
        let mut line = Line::blank(10, true);
        let mut cell = Cell::default();
        cell.flags = CellFlags::BOLD;
        line.set_cell(3, cell);
        assert!(!line.is_trivial());
        assert!(line.cell_at(3).flags.contains(CellFlags::BOLD));
    }

    #[test]
    fn text_trimmed_drops_trailing_blanks() {
        let mut line = Line::blank(5, true);
        line.set_cell(0, Cell {
            codepoint: 'h',
            ..Default::default()
        });
        line.set_cell(1, Cell {
            codepoint: 'i',
            ..Default::default()
        });
        assert_eq!(line.text_trimmed(), "hi");
    }
}
