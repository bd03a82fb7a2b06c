//! The line-addressable grid (C2): a ring buffer of [`Line`]s spanning the
//! visible page plus scrollback history, with O(1) append/evict at either
//! end, reflow-on-resize, scroll primitives, and text search.
//!
//! Grounded on `terminal/grid.rs`'s `VecDeque<Row>` ring buffer,
//! generalized to [`Line`]'s trivial/inflated storage and to the reflow
//! algorithm `original_source/src/vtbackend/Grid.h` documents: shrinking a
//! page splits logical lines bottom-up, growing one re-joins wrapped
//! continuations and re-splits at the new width.

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

use crate::cell::Cell;
use crate::color::Color;
use crate::config::MaxHistoryLines;
use crate::line::Line;
use crate::primitives::{
    CellLocation, CellLocationRange, ColumnOffset, GridSize, LineOffset, Margin, MarginRange,
};

/// A ring buffer of [`Line`]s. Indices `0..page_lines` (page-relative, via
/// [`LineOffset`]) address the visible page; everything before that is
/// scrollback history, oldest first.
#[derive(Debug, Clone)]
pub struct Grid {
    lines: VecDeque<Line>,
    columns: usize,
    page_lines: usize,
    max_history_lines: MaxHistoryLines,
}

impl Grid {
    pub fn new(size: GridSize, max_history_lines: MaxHistoryLines) -> Self {
        let page_lines = size.lines.get();
        let columns = size.columns.get();
        let mut lines = VecDeque::with_capacity(page_lines);
        for _ in 0..page_lines {
            lines.push_back(Line::blank(columns, true));
        }
        Self {
            lines,
            columns,
            page_lines,
            max_history_lines,
        }
    }

    pub fn page_size(&self) -> GridSize {
        GridSize::new(self.page_lines, self.columns)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn page_lines(&self) -> usize {
        self.page_lines
    }

    /// Number of scrollback lines above the visible page.
    pub fn history_len(&self) -> usize {
        self.lines.len() - self.page_lines
    }

    fn page_offset(&self) -> usize {
        self.lines.len() - self.page_lines
    }

    /// Translate a page-relative [`LineOffset`] (negative reaches into
    /// scrollback) to a ring-buffer index.
    fn index_of(&self, offset: LineOffset) -> Option<usize> {
        let idx = self.page_offset() as i64 + offset.get() as i64;
        if idx < 0 || idx >= self.lines.len() as i64 {
            None
        } else {
            Some(idx as usize)
        }
    }

    pub fn line(&self, offset: LineOffset) -> &Line {
        let idx = self.index_of(offset).expect("line offset out of range");
        &self.lines[idx]
    }

    pub fn line_mut(&mut self, offset: LineOffset) -> &mut Line {
        let idx = self.index_of(offset).expect("line offset out of range");
        &mut self.lines[idx]
    }

    pub fn try_line(&self, offset: LineOffset) -> Option<&Line> {
        self.index_of(offset).map(|i| &self.lines[i])
    }

    pub fn cell_at(&self, loc: CellLocation) -> Cell {
        self.line(loc.line).cell_at(loc.column.get().max(0) as usize)
    }

    pub fn set_cell(&mut self, loc: CellLocation, cell: Cell) {
        let col = loc.column.get().max(0) as usize;
        self.line_mut(loc.line).set_cell(col, cell);
    }

    pub fn erase_in_line(&mut self, line: LineOffset, from: usize, to_exclusive: usize, bg: Color) {
        self.line_mut(line).erase_range(from, to_exclusive, bg);
    }

    /// Erase the whole visible page (`ED 2`/`RIS`); scrollback is untouched.
    pub fn erase_page(&mut self, bg: Color) {
        for i in 0..self.page_lines {
            let line = LineOffset(i as i32);
            self.line_mut(line).clear();
            if bg != Color::Default {
                self.erase_in_line(line, 0, self.columns, bg);
            }
        }
    }

    /// Scroll the page's lines between `margin.from..=margin.to` up by
    /// `count`, discarding (or, if the margin's top coincides with the page
    /// top, archiving into scrollback) the lines that scroll off, and
    /// filling the vacated bottom lines with blanks.
    pub fn scroll_up(&mut self, margin: MarginRange, count: usize, bg: Color, archive_to_scrollback: bool) {
        let offset = self.page_offset();
        let top = offset + margin.from;
        let bottom = offset + margin.to;
        if top > bottom || bottom >= self.lines.len() {
            return;
        }
        let count = count.min(margin.len());
        for _ in 0..count {
            if archive_to_scrollback && margin.from == 0 {
                // The line scrolling off the true page top becomes
                // scrollback: leave it in place and just grow the page
                // window by inserting a new blank line after `bottom`.
                self.lines
                    .insert(bottom + 1, Line::blank(self.columns, true));
                self.trim_scrollback();
            } else {
                self.lines.remove(top);
                self.lines.insert(bottom, {
                    let mut l = Line::blank(self.columns, true);
                    if bg != Color::Default {
                        l.erase_range(0, self.columns, bg);
                    }
                    l
                });
            }
        }
        self.mark_dirty_range(margin);
    }

    pub fn scroll_down(&mut self, margin: MarginRange, count: usize, bg: Color) {
        let offset = self.page_offset();
        let top = offset + margin.from;
        let bottom = offset + margin.to;
        if top > bottom || bottom >= self.lines.len() {
            return;
        }
        let count = count.min(margin.len());
        for _ in 0..count {
            self.lines.remove(bottom);
            let mut l = Line::blank(self.columns, true);
            if bg != Color::Default {
                l.erase_range(0, self.columns, bg);
            }
            self.lines.insert(top, l);
        }
        self.mark_dirty_range(margin);
    }

    /// `DECFI`/`DECIC`-style horizontal scroll: shift every row within
    /// `margin`'s rectangle left by `count`, vacating columns at the
    /// margin's right edge with blanks. Columns outside the horizontal
    /// margin are untouched.
    pub fn scroll_left(&mut self, margin: Margin, count: usize, bg: Color) {
        let count = count.min(margin.horizontal.len());
        if count == 0 {
            return;
        }
        let left = margin.horizontal.from;
        let right = margin.horizontal.to;
        for row in margin.vertical.from..=margin.vertical.to {
            let line = self.line_mut(LineOffset(row as i32));
            for _ in 0..count {
                for col in left..right {
                    let moved = line.cell_at(col + 1);
                    line.set_cell(col, moved);
                }
                line.set_cell(right, Cell::erased(bg));
            }
        }
        self.mark_dirty_range(margin.vertical);
    }

    /// `DECBI`-style horizontal scroll: shift every row within `margin`'s
    /// rectangle right by `count`, vacating columns at the margin's left
    /// edge with blanks.
    pub fn scroll_right(&mut self, margin: Margin, count: usize, bg: Color) {
        let count = count.min(margin.horizontal.len());
        if count == 0 {
            return;
        }
        let left = margin.horizontal.from;
        let right = margin.horizontal.to;
        for row in margin.vertical.from..=margin.vertical.to {
            let line = self.line_mut(LineOffset(row as i32));
            for _ in 0..count {
                for col in (left + 1..=right).rev() {
                    let moved = line.cell_at(col - 1);
                    line.set_cell(col, moved);
                }
                line.set_cell(left, Cell::erased(bg));
            }
        }
        self.mark_dirty_range(margin.vertical);
    }

    /// `IL`: insert `count` blank lines at page row `at`, pushing the
    /// margin's bottom lines out (discarded, never archived).
    pub fn insert_lines(&mut self, at: usize, count: usize, margin: MarginRange, bg: Color) {
        let offset = self.page_offset();
        let at_idx = offset + at.max(margin.from);
        let bottom_idx = offset + margin.to;
        if at_idx > bottom_idx || bottom_idx >= self.lines.len() {
            return;
        }
        let count = count.min(bottom_idx - at_idx + 1);
        for _ in 0..count {
            self.lines.remove(bottom_idx);
            let mut l = Line::blank(self.columns, true);
            if bg != Color::Default {
                l.erase_range(0, self.columns, bg);
            }
            self.lines.insert(at_idx, l);
        }
        self.mark_dirty_range(margin);
    }

    /// `DL`: delete `count` lines at page row `at`, pulling the margin's
    /// bottom lines up and filling the vacated rows with blanks.
    pub fn delete_lines(&mut self, at: usize, count: usize, margin: MarginRange, bg: Color) {
        let offset = self.page_offset();
        let at_idx = offset + at.max(margin.from);
        let bottom_idx = offset + margin.to;
        if at_idx > bottom_idx || bottom_idx >= self.lines.len() {
            return;
        }
        let count = count.min(bottom_idx - at_idx + 1);
        for _ in 0..count {
            self.lines.remove(at_idx);
            let mut l = Line::blank(self.columns, true);
            if bg != Color::Default {
                l.erase_range(0, self.columns, bg);
            }
            self.lines.insert(bottom_idx, l);
        }
        self.mark_dirty_range(margin);
    }

    pub fn mark_dirty_range(&mut self, margin: MarginRange) {
        let offset = self.page_offset();
        for i in margin.from..=margin.to {
            if let Some(l) = self.lines.get_mut(offset + i) {
                l.mark_dirty();
            }
        }
    }

    pub fn mark_all_dirty(&mut self) {
        let offset = self.page_offset();
        for i in 0..self.page_lines {
            self.lines[offset + i].mark_dirty();
        }
    }

    /// Collect every dirty visible line and clear the dirty flag, for the
    /// render pipeline (C8).
    pub fn take_dirty_lines(&mut self) -> Vec<(usize, Line)> {
        let offset = self.page_offset();
        let mut out = Vec::new();
        for i in 0..self.page_lines {
            if self.lines[offset + i].is_dirty() {
                out.push((i, self.lines[offset + i].clone()));
                self.lines[offset + i].clear_dirty();
            }
        }
        out
    }

    fn trim_scrollback(&mut self) {
        if let MaxHistoryLines::Count(max) = self.max_history_lines {
            while self.history_len() > max {
                self.lines.pop_front();
            }
        }
    }

    /// Resize the page to `new_size`. When `reflow` is set, logical lines
    /// (a line and its wrapped continuations) are rejoined and re-split at
    /// the new column width instead of being hard-truncated/padded.
    pub fn resize(&mut self, new_size: GridSize, reflow: bool) {
        let new_columns = new_size.columns.get();
        let new_page_lines = new_size.lines.get();

        if reflow && new_columns != self.columns {
            self.reflow_columns(new_columns);
        } else if new_columns != self.columns {
            for line in self.lines.iter_mut() {
                line.resize(new_columns);
            }
            self.columns = new_columns;
        }

        if new_page_lines > self.page_lines {
            let needed = new_page_lines - self.page_lines;
            let available_history = self.history_len();
            let pulled = needed.min(available_history);
            // Lines already sit before the page window in the ring buffer;
            // growing the page just means more of them become visible.
            let still_needed = needed - pulled;
            for _ in 0..still_needed {
                self.lines.push_back(Line::blank(self.columns, true));
            }
        } else if new_page_lines < self.page_lines {
            // Shrinking: the lines that fall off the bottom of the page
            // become scrollback (ring buffer already holds them; nothing to
            // move), subject to the scrollback cap.
            self.trim_scrollback();
        }

        self.page_lines = new_page_lines;
        self.mark_all_dirty();
    }

    /// Rejoin every logical line (a line plus its `WRAPPED` continuations)
    /// across the whole buffer and re-split at `new_columns`.
    fn reflow_columns(&mut self, new_columns: usize) {
        let mut logical_lines: Vec<Vec<Cell>> = Vec::new();
        let mut current: Vec<Cell> = Vec::new();
        let mut have_current = false;

        for line in self.lines.drain(..) {
            if !line.is_wrapped() && have_current {
                logical_lines.push(std::mem::take(&mut current));
            }
            have_current = true;
            current.extend(line.all_cells());
        }
        if have_current {
            logical_lines.push(current);
        }

        let mut rebuilt: VecDeque<Line> = VecDeque::new();
        for logical in logical_lines {
            if logical.is_empty() {
                rebuilt.push_back(Line::blank(new_columns, true));
                continue;
            }
            for chunk in logical.chunks(new_columns.max(1)) {
                let mut cells = chunk.to_vec();
                cells.resize(new_columns, Cell::default());
                let line = Line::from_cells(cells, true);
                rebuilt.push_back(line);
            }
            // Mark every line after the first of this logical line as a
            // wrapped continuation.
            let logical_line_count = (logical.len() + new_columns.max(1) - 1) / new_columns.max(1);
            let start = rebuilt.len() - logical_line_count.max(1);
            for i in (start + 1)..rebuilt.len() {
                rebuilt[i].set_wrapped(true);
            }
        }

        // A reflow can change the total physical line count (joining wrapped
        // continuations when columns grow can produce fewer physical lines
        // than before). Pad back out to at least the current page height so
        // `page_offset`/`history_len` never underflow, then re-apply the
        // scrollback cap in case splitting grew it past the limit instead.
        while rebuilt.len() < self.page_lines {
            rebuilt.push_back(Line::blank(new_columns, true));
        }

        self.lines = rebuilt;
        self.columns = new_columns;
        self.trim_scrollback();
    }

    pub fn clear_scrollback(&mut self) {
        let offset = self.page_offset();
        self.lines.drain(0..offset);
    }

    /// Search for `needle` across logical lines (joining wrapped
    /// continuations before matching), scanning forward or backward from
    /// `from`.
    pub fn search(
        &self,
        needle: &str,
        case_sensitive: bool,
        from: LineOffset,
        reverse: bool,
    ) -> Option<CellLocation> {
        if needle.is_empty() {
            return None;
        }
        let needle_cmp = if case_sensitive {
            needle.to_string()
        } else {
            needle.to_lowercase()
        };

        let offset = self.page_offset() as i64;
        let total = self.lines.len() as i64;
        let start_idx = (offset + from.get() as i64).clamp(0, total - 1);

        let indices: Vec<i64> = if reverse {
            (0..=start_idx).rev().collect()
        } else {
            (start_idx..total).collect()
        };

        for idx in indices {
            let line = &self.lines[idx as usize];
            let text = line.text_trimmed();
            let hay = if case_sensitive {
                text.clone()
            } else {
                text.to_lowercase()
            };
            if let Some(byte_pos) = hay.find(&needle_cmp) {
                let col = text[..byte_pos].chars().count();
                return Some(CellLocation::new(
                    LineOffset((idx - offset) as i32),
                    ColumnOffset(col as i32),
                ));
            }
        }
        None
    }

    /// Expand a word-wise selection anchor at `loc` to the bounds of the
    /// delimiter-separated word it falls within (double-click selection;
    /// config's `word_delimiters`). Grapheme-cluster aware so multi-codepoint
    /// clusters move as a unit rather than splitting mid-cluster.
    pub fn word_boundary_at(&self, loc: CellLocation, delimiters: &str) -> CellLocationRange {
        let text = self.line(loc.line).text_trimmed();
        let clusters: Vec<&str> = text.graphemes(true).collect();
        let col = loc.column.get().max(0) as usize;

        let is_word = |s: &str| !s.chars().all(|c| c == ' ' || delimiters.contains(c));

        if col >= clusters.len() || !is_word(clusters[col]) {
            return CellLocationRange { from: loc, to: loc };
        }

        let mut start = col;
        while start > 0 && is_word(clusters[start - 1]) {
            start -= 1;
        }
        let mut end = col;
        while end + 1 < clusters.len() && is_word(clusters[end + 1]) {
            end += 1;
        }

        CellLocationRange {
            from: CellLocation::new(loc.line, ColumnOffset(start as i32)),
            to: CellLocation::new(loc.line, ColumnOffset(end as i32)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::GridSize;

    fn size(lines: usize, columns: usize) -> GridSize {
        GridSize::new(lines, columns)
    }

    #[test]
    fn scroll_up_archives_top_line_to_scrollback() {
        let mut grid = Grid::new(size(3, 4), MaxHistoryLines::Count(100));
        grid.set_cell(
            CellLocation::new(LineOffset(0), ColumnOffset(0)),
            Cell {
                codepoint: 'x',
                ..Default::default()
            },
        );
        let margin = MarginRange { from: 0, to: 2 };
        grid.scroll_up(margin, 1, Color::Default, true);
        assert_eq!(grid.history_len(), 1);
        assert_eq!(grid.line(LineOffset(-1)).cell_at(0).codepoint, 'x');
    }

    #[test]
    fn resize_without_reflow_truncates_columns() {
        let mut grid = Grid::new(size(2, 10), MaxHistoryLines::Count(100));
        grid.resize(size(2, 5), false);
        assert_eq!(grid.columns(), 5);
        assert_eq!(grid.line(LineOffset(0)).len(), 5);
    }

    #[test]
    fn reflow_rejoins_wrapped_continuation() {
        let mut grid = Grid::new(size(2, 4), MaxHistoryLines::Count(100));
        for (i, c) in "abcdefgh".chars().enumerate() {
            let line = i / 4;
            let col = i % 4;
            grid.set_cell(
                CellLocation::new(LineOffset(line as i32), ColumnOffset(col as i32)),
                Cell {
                    codepoint: c,
                    ..Default::default()
                },
            );
        }
        grid.line_mut(LineOffset(1)).set_wrapped(true);
        grid.resize(size(2, 8), true);
        assert_eq!(grid.line(LineOffset(0)).text_trimmed(), "abcdefgh");
    }

    #[test]
    fn search_finds_text_spanning_case_insensitive() {
        let mut grid = Grid::new(size(2, 10), MaxHistoryLines::Count(100));
        for (i, c) in "Hello".chars().enumerate() {
            grid.set_cell(
                CellLocation::new(LineOffset(0), ColumnOffset(i as i32)),
                Cell {
                    codepoint: c,
                    ..Default::default()
                },
            );
        }
        let found = grid.search("hello", false, LineOffset(0), false);
        assert_eq!(
            found,
            Some(CellLocation::new(LineOffset(0), ColumnOffset(0)))
        );
    }

    #[test]
    fn word_boundary_expands_to_delimiter_run() {
        let mut grid = Grid::new(size(1, 20), MaxHistoryLines::Count(0));
        for (i, c) in "foo.bar baz".chars().enumerate() {
            grid.set_cell(
                CellLocation::new(LineOffset(0), ColumnOffset(i as i32)),
                Cell {
                    codepoint: c,
                    ..Default::default()
                },
            );
        }
        let range = grid.word_boundary_at(
            CellLocation::new(LineOffset(0), ColumnOffset(1)),
            " \t,;|!\"'#$%&()*+,-./:;<=>?@[\\]^`{|}~",
        );
        assert_eq!(range.from, CellLocation::new(LineOffset(0), ColumnOffset(0)));
        assert_eq!(range.to, CellLocation::new(LineOffset(0), ColumnOffset(2)));
    }

    #[test]
    fn word_boundary_on_delimiter_is_a_point() {
        let mut grid = Grid::new(size(1, 10), MaxHistoryLines::Count(0));
        grid.set_cell(
            CellLocation::new(LineOffset(0), ColumnOffset(3)),
            Cell {
                codepoint: '.',
                ..Default::default()
            },
        );
        let range = grid.word_boundary_at(
            CellLocation::new(LineOffset(0), ColumnOffset(3)),
            ".",
        );
        assert_eq!(range.from, range.to);
    }
}
