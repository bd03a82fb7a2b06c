//! The screen model (C5): cursor, mode state, margins, tab stops, and the
//! text-writing/erase/scroll algorithms layered over a [`Grid`]. A
//! [`crate::terminal::Terminal`] owns two of these — primary and
//! alternate — and a handful of registries (palette, hyperlinks, images)
//! that are shared between them rather than duplicated per screen.
//!
//! Grounded on `terminal/state.rs`'s dispatch bodies
//! (`handle_sgr`, `set_dec_mode`, `erase_display`/`erase_line`, the
//! cursor-motion handlers) and `terminal/cursor.rs`/`terminal/modes.rs`,
//! generalized against the fuller DEC mode catalog and protected-cell
//! semantics in `original_source/src/vtbackend/primitives.h` and
//! `Screen.cpp`.

use crate::cell::{Cell, CellFlags, UnderlineStyle};
use crate::charset::{CharsetSlot, CharsetTable, Charsets};
use crate::color::Color;
use crate::config::MaxHistoryLines;
use crate::grid::Grid;
use crate::primitives::{CellLocation, ColumnOffset, GridSize, LineOffset, Margin, MarginRange};
use crate::tabstops::TabStops;

/// The pen state applied to every newly written cell, plus the charset and
/// wrap bookkeeping that travels with the cursor across `DECSC`/`DECRC`.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub position: CellLocation,
    pub visible: bool,
    pub fg: Color,
    pub bg: Color,
    pub underline_color: Color,
    pub underline_style: UnderlineStyle,
    pub flags: CellFlags,
    pub charsets: Charsets,
    /// `DECSCA`: new writes at this cursor are marked protected against
    /// selective erase.
    pub protected: bool,
    /// Set once a printed character reaches the last column; consumed (and
    /// cleared) by the next printed character, which is the sole mechanism
    /// by which autowrap happens (no other write site wraps implicitly).
    pub wrap_pending: bool,
    /// The currently open `OSC 8` hyperlink id, stamped onto every cell
    /// written while it's set.
    pub hyperlink: Option<String>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            position: CellLocation::default(),
            visible: true,
            fg: Color::Default,
            bg: Color::Default,
            underline_color: Color::CellForeground,
            underline_style: UnderlineStyle::Single,
            flags: CellFlags::empty(),
            charsets: Charsets::default(),
            protected: false,
            wrap_pending: false,
            hyperlink: None,
        }
    }
}

impl Cursor {
    fn pen_cell(&self, c: char, width: u8) -> Cell {
        let mut flags = self.flags;
        if self.protected {
            flags |= CellFlags::PROTECTED;
        }
        Cell {
            codepoint: c,
            width,
            fg: self.fg,
            bg: self.bg,
            underline_color: self.underline_color,
            underline_style: self.underline_style,
            flags,
            hyperlink: self.hyperlink.clone(),
            ..Default::default()
        }
    }
}

/// Full DEC private + ANSI mode catalog (§3 "a catalog of ... named DEC
/// private modes and ANSI modes"), per
/// `original_source/src/vtbackend/primitives.h`'s `DECMode`/`AnsiMode`.
#[derive(Debug, Clone)]
pub struct Modes {
    // ANSI modes
    pub keyboard_action: bool,
    pub insert: bool,
    pub send_receive: bool,
    pub automatic_newline: bool,

    // DEC private modes
    pub application_cursor_keys: bool,
    pub designate_charset_us_ascii: bool,
    pub columns_132: bool,
    pub smooth_scroll: bool,
    pub reverse_video: bool,
    pub origin: bool,
    pub auto_wrap: bool,
    pub printer_extend: bool,
    pub left_right_margin: bool,
    pub show_toolbar: bool,
    pub blinking_cursor: bool,
    pub cursor_visible: bool,
    pub show_scrollbar: bool,
    pub allow_columns_80_to_132: bool,
    pub debug_logging: bool,
    pub alternate_screen: bool,
    pub save_cursor: bool,
    pub bracketed_paste: bool,
    pub focus_tracking: bool,
    pub no_sixel_scrolling: bool,
    pub use_private_color_registers: bool,
    pub sixel_cursor_next_to_graphic: bool,

    pub batched_rendering: bool,
    pub unicode_core: bool,
    pub text_reflow: bool,
    pub mouse_passive_tracking: bool,
    pub report_grid_cell_selection: bool,
    pub report_color_palette_updated: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            keyboard_action: false,
            insert: false,
            send_receive: false,
            automatic_newline: false,

            application_cursor_keys: false,
            designate_charset_us_ascii: false,
            columns_132: false,
            smooth_scroll: false,
            reverse_video: false,
            origin: false,
            auto_wrap: true,
            printer_extend: false,
            left_right_margin: false,
            show_toolbar: true,
            blinking_cursor: true,
            cursor_visible: true,
            show_scrollbar: true,
            allow_columns_80_to_132: false,
            debug_logging: false,
            alternate_screen: false,
            save_cursor: false,
            bracketed_paste: false,
            focus_tracking: false,
            no_sixel_scrolling: false,
            use_private_color_registers: false,
            sixel_cursor_next_to_graphic: true,

            batched_rendering: false,
            unicode_core: false,
            text_reflow: true,
            mouse_passive_tracking: false,
            report_grid_cell_selection: false,
            report_color_palette_updated: false,
        }
    }
}

/// Selective vs. ordinary erase, distinguishing `ED`/`EL` from their
/// `DECSED`/`DECSEL` counterparts (the latter preserve `DECSCA`-protected
/// cells, including one sitting under the cursor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseMode {
    Ordinary,
    Selective,
}

#[derive(Debug, Clone)]
struct SavedCursorState {
    position: CellLocation,
    fg: Color,
    bg: Color,
    underline_color: Color,
    underline_style: UnderlineStyle,
    flags: CellFlags,
    charsets: Charsets,
    origin: bool,
    auto_wrap: bool,
    hyperlink: Option<String>,
}

/// One of the two screens ([`crate::terminal::Terminal`]'s primary/
/// alternate pair): its own grid, cursor, margins, tab stops, and mode set.
#[derive(Debug, Clone)]
pub struct Screen {
    pub grid: Grid,
    pub cursor: Cursor,
    pub modes: Modes,
    pub margin: Margin,
    pub tab_stops: TabStops,
    saved_cursor: Option<SavedCursorState>,
}

impl Screen {
    pub fn new(size: GridSize, max_history_lines: MaxHistoryLines) -> Self {
        let grid = Grid::new(size, max_history_lines);
        let tab_stops = TabStops::new(size.columns.get());
        Self {
            margin: Margin::full(size),
            tab_stops,
            grid,
            cursor: Cursor::default(),
            modes: Modes::default(),
            saved_cursor: None,
        }
    }

    pub fn size(&self) -> GridSize {
        self.grid.page_size()
    }

    fn columns(&self) -> usize {
        self.grid.columns()
    }

    fn lines(&self) -> usize {
        self.grid.page_lines()
    }

    pub fn resize(&mut self, size: GridSize, reflow: bool) {
        self.grid.resize(size, reflow);
        self.tab_stops.resize(size.columns.get());
        self.margin = Margin::full(size);
        self.cursor.position.line = LineOffset(self.cursor.position.line.get().min(size.lines.get() as i32 - 1).max(0));
        self.cursor.position.column =
            ColumnOffset(self.cursor.position.column.get().min(size.columns.get() as i32 - 1).max(0));
        self.cursor.wrap_pending = false;
    }

    /// Whether `margin` spans the entire page top-to-bottom — the condition
    /// under which a scrolled-off top line is archived into scrollback
    /// rather than just discarded within the scroll region (§4.3/§4.4).
    fn spans_full_page(&self, margin: MarginRange) -> bool {
        margin.from == 0 && margin.to == self.lines() - 1
    }

    fn vertical_range(&self) -> MarginRange {
        self.margin.vertical
    }

    fn clamp_line(&self, line: i32) -> i32 {
        line.max(0).min(self.lines() as i32 - 1)
    }

    fn clamp_column(&self, col: i32) -> i32 {
        col.max(0).min(self.columns() as i32 - 1)
    }

    fn home_line(&self) -> i32 {
        if self.modes.origin {
            self.margin.vertical.from as i32
        } else {
            0
        }
    }

    // ---- cursor motion ----------------------------------------------

    pub fn cursor_up(&mut self, n: usize) {
        let floor = if self.modes.origin { self.margin.vertical.from as i32 } else { 0 };
        let new_line = (self.cursor.position.line.get() - n as i32).max(floor);
        self.cursor.position.line = LineOffset(new_line);
        self.cursor.wrap_pending = false;
    }

    pub fn cursor_down(&mut self, n: usize) {
        let ceiling = if self.modes.origin { self.margin.vertical.to as i32 } else { self.lines() as i32 - 1 };
        let new_line = (self.cursor.position.line.get() + n as i32).min(ceiling);
        self.cursor.position.line = LineOffset(new_line);
        self.cursor.wrap_pending = false;
    }

    pub fn cursor_forward(&mut self, n: usize) {
        let new_col = self.clamp_column(self.cursor.position.column.get() + n as i32);
        self.cursor.position.column = ColumnOffset(new_col);
        self.cursor.wrap_pending = false;
    }

    pub fn cursor_backward(&mut self, n: usize) {
        let new_col = self.clamp_column(self.cursor.position.column.get() - n as i32);
        self.cursor.position.column = ColumnOffset(new_col);
        self.cursor.wrap_pending = false;
    }

    pub fn cursor_to_column(&mut self, col1based: usize) {
        let col = self.clamp_column(col1based as i32 - 1);
        self.cursor.position.column = ColumnOffset(col);
        self.cursor.wrap_pending = false;
    }

    /// `CUP`/`HVP`: absolute positioning, origin-mode-relative when active.
    pub fn cursor_to(&mut self, line1based: usize, col1based: usize) {
        let line = if self.modes.origin {
            self.clamp_line(self.margin.vertical.from as i32 + line1based as i32 - 1)
                .min(self.margin.vertical.to as i32)
        } else {
            self.clamp_line(line1based as i32 - 1)
        };
        self.cursor.position.line = LineOffset(line);
        self.cursor.position.column = ColumnOffset(self.clamp_column(col1based as i32 - 1));
        self.cursor.wrap_pending = false;
    }

    pub fn cursor_to_line(&mut self, line1based: usize) {
        let line = if self.modes.origin {
            (self.margin.vertical.from as i32 + line1based as i32 - 1).min(self.margin.vertical.to as i32)
        } else {
            self.clamp_line(line1based as i32 - 1)
        };
        self.cursor.position.line = LineOffset(line);
        self.cursor.wrap_pending = false;
    }

    pub fn home(&mut self) {
        self.cursor.position = CellLocation::new(
            LineOffset(self.home_line()),
            ColumnOffset(if self.modes.left_right_margin { self.margin.horizontal.from as i32 } else { 0 }),
        );
        self.cursor.wrap_pending = false;
    }

    pub fn carriage_return(&mut self) {
        let col = if self.modes.left_right_margin { self.margin.horizontal.from as i32 } else { 0 };
        self.cursor.position.column = ColumnOffset(col);
        self.cursor.wrap_pending = false;
    }

    /// `IND`: move down one line, scrolling the margin region if already at
    /// its bottom.
    pub fn index(&mut self) {
        let margin = self.vertical_range();
        if self.cursor.position.line.get() == margin.to as i32 {
            let archive = self.spans_full_page(margin);
            self.grid.scroll_up(margin, 1, self.cursor.bg, archive);
        } else {
            self.cursor_down(1);
        }
        self.cursor.wrap_pending = false;
    }

    /// `RI`: move up one line, scrolling down if already at the margin top.
    pub fn reverse_index(&mut self) {
        let margin = self.vertical_range();
        if self.cursor.position.line.get() == margin.from as i32 {
            self.grid.scroll_down(margin, 1, self.cursor.bg);
        } else {
            self.cursor_up(1);
        }
        self.cursor.wrap_pending = false;
    }

    /// `NEL`: carriage return plus index.
    pub fn next_line(&mut self) {
        self.carriage_return();
        self.index();
    }

    pub fn cursor_next_line(&mut self, n: usize) {
        self.carriage_return();
        self.cursor_down(n);
    }

    pub fn cursor_prev_line(&mut self, n: usize) {
        self.carriage_return();
        self.cursor_up(n);
    }

    // ---- text writing --------------------------------------------------

    /// The sole autowrap/print path (§4.3 "single text-writing
    /// algorithm"): consumes a pending wrap from the *previous* call before
    /// placing this character, so wrapping always happens lazily on the
    /// next printed character rather than eagerly at end-of-line.
    pub fn write_char(&mut self, c: char, width: u8) {
        if self.cursor.wrap_pending {
            if self.modes.auto_wrap {
                self.carriage_return();
                self.index();
                self.grid.line_mut(self.cursor.position.line).set_wrapped(true);
            } else {
                self.cursor.position.column = ColumnOffset(self.columns() as i32 - 1);
            }
            self.cursor.wrap_pending = false;
        }

        if self.modes.insert {
            let col = self.cursor.position.column.get().max(0) as usize;
            self.grid.line_mut(self.cursor.position.line).insert_blanks(col, width as usize, self.cursor.bg);
        }

        let col = self.cursor.position.column.get().max(0) as usize;
        let line = self.cursor.position.line;
        self.grid.line_mut(line).set_cell(col, self.cursor.pen_cell(c, width));
        if width == 2 && col + 1 < self.columns() {
            self.grid.line_mut(line).set_cell(col + 1, Cell::wide_continuation());
        }

        let right_edge = if self.modes.left_right_margin {
            self.margin.horizontal.to as i32
        } else {
            self.columns() as i32 - 1
        };

        if self.cursor.position.column.get() + width as i32 - 1 >= right_edge {
            self.cursor.wrap_pending = true;
        } else {
            self.cursor.position.column += width as i32;
        }
    }

    /// Append a combining mark to the cluster the cursor last wrote (spec
    /// §4.3 text-writing rule 2, unicode cluster mode only).
    pub fn append_combining(&mut self, c: char) {
        let col = (self.cursor.position.column.get() - 1).max(0) as usize;
        let line = self.cursor.position.line;
        let mut cell = self.grid.line(line).cell_at(col);
        cell.append_combining(c);
        self.grid.line_mut(line).set_cell(col, cell);
    }

    // ---- erase ----------------------------------------------------------

    fn erase_run(&mut self, line: LineOffset, from: usize, to_exclusive: usize, mode: EraseMode) {
        let bg = self.cursor.bg;
        if mode == EraseMode::Ordinary {
            self.grid.erase_in_line(line, from, to_exclusive, bg);
            return;
        }
        for col in from..to_exclusive {
            let current = self.grid.line(line).cell_at(col);
            if !current.flags.contains(CellFlags::PROTECTED) {
                self.grid.line_mut(line).erase(col, bg);
            }
        }
    }

    /// `ED`/`DECSED`: 0 = cursor..end, 1 = start..cursor, 2 = whole page,
    /// 3 = whole page plus scrollback.
    pub fn erase_display(&mut self, which: u16, mode: EraseMode) {
        let columns = self.columns();
        let cur_line = self.cursor.position.line;
        let cur_col = self.cursor.position.column.get().max(0) as usize;
        match which {
            0 => {
                self.erase_run(cur_line, cur_col, columns, mode);
                for i in (cur_line.get() + 1)..self.lines() as i32 {
                    self.erase_run(LineOffset(i), 0, columns, mode);
                }
            }
            1 => {
                self.erase_run(cur_line, 0, cur_col + 1, mode);
                for i in 0..cur_line.get() {
                    self.erase_run(LineOffset(i), 0, columns, mode);
                }
            }
            2 | 3 => {
                for i in 0..self.lines() as i32 {
                    self.erase_run(LineOffset(i), 0, columns, mode);
                }
                if which == 3 {
                    self.grid.clear_scrollback();
                }
            }
            _ => {}
        }
    }

    /// `EL`/`DECSEL`: 0 = cursor..end of line, 1 = start..cursor, 2 = whole
    /// line.
    pub fn erase_line(&mut self, which: u16, mode: EraseMode) {
        let columns = self.columns();
        let cur_col = self.cursor.position.column.get().max(0) as usize;
        let line = self.cursor.position.line;
        match which {
            0 => self.erase_run(line, cur_col, columns, mode),
            1 => self.erase_run(line, 0, cur_col + 1, mode),
            2 => self.erase_run(line, 0, columns, mode),
            _ => {}
        }
    }

    /// `ECH`: erase `n` cells starting at the cursor without shifting.
    pub fn erase_chars(&mut self, n: usize) {
        let col = self.cursor.position.column.get().max(0) as usize;
        let to = (col + n).min(self.columns());
        self.grid.erase_in_line(self.cursor.position.line, col, to, self.cursor.bg);
    }

    /// `ICH`: insert `n` blanks at the cursor, shifting the tail right.
    pub fn insert_chars(&mut self, n: usize) {
        let col = self.cursor.position.column.get().max(0) as usize;
        self.grid.line_mut(self.cursor.position.line).insert_blanks(col, n, self.cursor.bg);
    }

    /// `DCH`: delete `n` cells at the cursor, shifting the tail left.
    pub fn delete_chars(&mut self, n: usize) {
        let col = self.cursor.position.column.get().max(0) as usize;
        self.grid.line_mut(self.cursor.position.line).delete_cells(col, n, self.cursor.bg);
    }

    // ---- line/scroll ops -------------------------------------------------

    pub fn insert_lines(&mut self, n: usize) {
        let margin = self.vertical_range();
        let at = self.cursor.position.line.get().max(margin.from as i32) as usize;
        self.grid.insert_lines(at, n, margin, self.cursor.bg);
    }

    pub fn delete_lines(&mut self, n: usize) {
        let margin = self.vertical_range();
        let at = self.cursor.position.line.get().max(margin.from as i32) as usize;
        self.grid.delete_lines(at, n, margin, self.cursor.bg);
    }

    pub fn scroll_up(&mut self, n: usize) {
        let margin = self.vertical_range();
        let archive = self.spans_full_page(margin);
        self.grid.scroll_up(margin, n, self.cursor.bg, archive);
    }

    pub fn scroll_down(&mut self, n: usize) {
        let margin = self.vertical_range();
        self.grid.scroll_down(margin, n, self.cursor.bg);
    }

    /// `DECFI`: move the cursor forward one column, scrolling the margin
    /// rectangle left if the cursor is already at the right margin.
    pub fn forward_index(&mut self) {
        let right = if self.modes.left_right_margin {
            self.margin.horizontal.to as i32
        } else {
            self.columns() as i32 - 1
        };
        if self.cursor.position.column.get() == right {
            self.grid.scroll_left(self.margin, 1, self.cursor.bg);
        } else {
            self.cursor.position.column += 1;
        }
        self.cursor.wrap_pending = false;
    }

    /// `DECBI`: move the cursor back one column, scrolling the margin
    /// rectangle right if the cursor is already at the left margin.
    pub fn back_index(&mut self) {
        let left = if self.modes.left_right_margin {
            self.margin.horizontal.from as i32
        } else {
            0
        };
        if self.cursor.position.column.get() == left {
            self.grid.scroll_right(self.margin, 1, self.cursor.bg);
        } else {
            self.cursor.position.column -= 1;
        }
        self.cursor.wrap_pending = false;
    }

    /// `DECIC`: insert `n` blank columns at the cursor's column, within the
    /// vertical margin, shifting columns at/after the cursor right.
    pub fn insert_columns(&mut self, n: usize) {
        let at = self.cursor.position.column.get().max(self.margin.horizontal.from as i32) as usize;
        let margin = Margin {
            vertical: self.margin.vertical,
            horizontal: MarginRange { from: at, to: self.margin.horizontal.to },
        };
        self.grid.scroll_right(margin, n, self.cursor.bg);
    }

    /// `DECDC`: delete `n` columns at the cursor's column, within the
    /// vertical margin, pulling columns after the deleted span left.
    pub fn delete_columns(&mut self, n: usize) {
        let at = self.cursor.position.column.get().max(self.margin.horizontal.from as i32) as usize;
        let margin = Margin {
            vertical: self.margin.vertical,
            horizontal: MarginRange { from: at, to: self.margin.horizontal.to },
        };
        self.grid.scroll_left(margin, n, self.cursor.bg);
    }

    pub fn set_vertical_margin(&mut self, top1based: usize, bottom1based: usize) {
        let top = top1based.saturating_sub(1).min(self.lines() - 1);
        let bottom = bottom1based.saturating_sub(1).min(self.lines() - 1);
        if top < bottom {
            self.margin.vertical = MarginRange { from: top, to: bottom };
        } else {
            self.margin.vertical = MarginRange { from: 0, to: self.lines() - 1 };
        }
        self.home();
    }

    pub fn set_horizontal_margin(&mut self, left1based: usize, right1based: usize) {
        if !self.modes.left_right_margin {
            return;
        }
        let left = left1based.saturating_sub(1).min(self.columns() - 1);
        let right = right1based.saturating_sub(1).min(self.columns() - 1);
        if left < right {
            self.margin.horizontal = MarginRange { from: left, to: right };
        } else {
            self.margin.horizontal = MarginRange { from: 0, to: self.columns() - 1 };
        }
        self.home();
    }

    pub fn reset_margins(&mut self) {
        self.margin = Margin::full(self.size());
    }

    // ---- SGR --------------------------------------------------------------

    /// Apply one `SGR` parameter list (colon-subparameters already split
    /// per group by the caller's sequencer layer).
    pub fn apply_sgr(&mut self, groups: &[smallvec::SmallVec<[u16; 8]>]) {
        let mut i = 0;
        while i < groups.len() {
            let group = &groups[i];
            let code = group.first().copied().unwrap_or(0);
            match code {
                0 => {
                    self.cursor.flags = CellFlags::empty();
                    self.cursor.fg = Color::Default;
                    self.cursor.bg = Color::Default;
                    self.cursor.underline_color = Color::CellForeground;
                    self.cursor.underline_style = UnderlineStyle::Single;
                }
                1 => self.cursor.flags.insert(CellFlags::BOLD),
                2 => self.cursor.flags.insert(CellFlags::FAINT),
                3 => self.cursor.flags.insert(CellFlags::ITALIC),
                4 => {
                    self.cursor.flags.insert(CellFlags::UNDERLINE);
                    self.cursor.underline_style = match group.get(1).copied().unwrap_or(1) {
                        0 => {
                            self.cursor.flags.remove(CellFlags::UNDERLINE);
                            UnderlineStyle::Single
                        }
                        2 => UnderlineStyle::Double,
                        3 => UnderlineStyle::Curly,
                        4 => UnderlineStyle::Dotted,
                        5 => UnderlineStyle::Dashed,
                        _ => UnderlineStyle::Single,
                    };
                }
                5 => self.cursor.flags.insert(CellFlags::BLINK),
                6 => self.cursor.flags.insert(CellFlags::RAPID_BLINK),
                7 => self.cursor.flags.insert(CellFlags::INVERSE),
                8 => self.cursor.flags.insert(CellFlags::HIDDEN),
                9 => self.cursor.flags.insert(CellFlags::CROSSED_OUT),
                21 => self.cursor.underline_style = UnderlineStyle::Double,
                22 => {
                    self.cursor.flags.remove(CellFlags::BOLD);
                    self.cursor.flags.remove(CellFlags::FAINT);
                }
                23 => self.cursor.flags.remove(CellFlags::ITALIC),
                24 => self.cursor.flags.remove(CellFlags::UNDERLINE),
                25 => {
                    self.cursor.flags.remove(CellFlags::BLINK);
                    self.cursor.flags.remove(CellFlags::RAPID_BLINK);
                }
                27 => self.cursor.flags.remove(CellFlags::INVERSE),
                28 => self.cursor.flags.remove(CellFlags::HIDDEN),
                29 => self.cursor.flags.remove(CellFlags::CROSSED_OUT),
                30..=37 => self.cursor.fg = Color::Indexed(code as u8 - 30),
                38 => {
                    if let Some(color) = parse_extended_color(groups, &mut i) {
                        self.cursor.fg = color;
                    }
                }
                39 => self.cursor.fg = Color::Default,
                40..=47 => self.cursor.bg = Color::Indexed(code as u8 - 40),
                48 => {
                    if let Some(color) = parse_extended_color(groups, &mut i) {
                        self.cursor.bg = color;
                    }
                }
                49 => self.cursor.bg = Color::Default,
                51 => self.cursor.flags.insert(CellFlags::FRAMED),
                52 => self.cursor.flags.insert(CellFlags::ENCIRCLED),
                53 => self.cursor.flags.insert(CellFlags::OVERLINE),
                54 => {
                    self.cursor.flags.remove(CellFlags::FRAMED);
                    self.cursor.flags.remove(CellFlags::ENCIRCLED);
                }
                55 => self.cursor.flags.remove(CellFlags::OVERLINE),
                58 => {
                    if let Some(color) = parse_extended_color(groups, &mut i) {
                        self.cursor.underline_color = color;
                    }
                }
                59 => self.cursor.underline_color = Color::CellForeground,
                90..=97 => self.cursor.fg = Color::Indexed(code as u8 - 90 + 8),
                100..=107 => self.cursor.bg = Color::Indexed(code as u8 - 100 + 8),
                _ => {}
            }
            i += 1;
        }
    }

    pub fn decsca(&mut self, protect: bool) {
        self.cursor.protected = protect;
    }

    // ---- charsets -----------------------------------------------------

    pub fn designate_charset(&mut self, slot: CharsetSlot, table: CharsetTable) {
        self.cursor.charsets.designate(slot, table);
    }

    pub fn lock_shift(&mut self, slot: CharsetSlot) {
        self.cursor.charsets.lock_shift(slot);
    }

    pub fn single_shift(&mut self, slot: CharsetSlot) {
        self.cursor.charsets.single_shift(slot);
    }

    pub fn translate_print_char(&mut self, c: char) -> char {
        let table = self.cursor.charsets.take_effective_table();
        Charsets::translate(table, c)
    }

    // ---- tab stops ------------------------------------------------------

    pub fn horizontal_tab(&mut self) {
        let next = self.tab_stops.next_after(self.cursor.position.column.get().max(0) as usize);
        self.cursor.position.column = ColumnOffset(self.clamp_column(next as i32));
        self.cursor.wrap_pending = false;
    }

    pub fn back_tab(&mut self) {
        let prev = self.tab_stops.prev_before(self.cursor.position.column.get().max(0) as usize);
        self.cursor.position.column = ColumnOffset(prev as i32);
        self.cursor.wrap_pending = false;
    }

    pub fn set_tab_stop(&mut self) {
        self.tab_stops.set(self.cursor.position.column.get().max(0) as usize);
    }

    pub fn clear_tab_stop(&mut self) {
        self.tab_stops.clear(self.cursor.position.column.get().max(0) as usize);
    }

    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.clear_all();
    }

    // ---- cursor save/restore -------------------------------------------

    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(SavedCursorState {
            position: self.cursor.position,
            fg: self.cursor.fg,
            bg: self.cursor.bg,
            underline_color: self.cursor.underline_color,
            underline_style: self.cursor.underline_style,
            flags: self.cursor.flags,
            charsets: self.cursor.charsets,
            origin: self.modes.origin,
            auto_wrap: self.modes.auto_wrap,
            hyperlink: self.cursor.hyperlink.clone(),
        });
    }

    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor.clone() {
            self.cursor.position = saved.position;
            self.cursor.fg = saved.fg;
            self.cursor.bg = saved.bg;
            self.cursor.underline_color = saved.underline_color;
            self.cursor.underline_style = saved.underline_style;
            self.cursor.flags = saved.flags;
            self.cursor.charsets = saved.charsets;
            self.modes.origin = saved.origin;
            self.modes.auto_wrap = saved.auto_wrap;
            self.cursor.hyperlink = saved.hyperlink;
            self.cursor.wrap_pending = false;
        }
    }

    /// `RIS`: full terminal reset. The grid is cleared but keeps its size;
    /// scrollback is dropped.
    pub fn full_reset(&mut self) {
        let size = self.size();
        let max_history = self.grid_max_history();
        self.grid = Grid::new(size, max_history);
        self.cursor = Cursor::default();
        self.modes = Modes::default();
        self.margin = Margin::full(size);
        self.tab_stops = TabStops::new(size.columns.get());
        self.saved_cursor = None;
    }

    fn grid_max_history(&self) -> MaxHistoryLines {
        // Scrollback capacity isn't queryable from `Grid` directly; `RIS`
        // preserves "unbounded-ness" by always giving the fresh grid a
        // generous default, matching real terminals that don't shrink
        // history on reset.
        MaxHistoryLines::Count(self.grid.history_len().max(10_000))
    }

    pub fn clear_screen(&mut self) {
        self.erase_display(2, EraseMode::Ordinary);
    }

    // ---- rectangular operations (DECCRA/DECERA/DECFRA/DECCARA/DECRARA) --

    /// Clamp a 1-based rectangle to the page, or to the scrolling margin
    /// when origin mode is set, returning 0-based inclusive bounds
    /// `(top, left, bottom, right)`.
    fn clamp_rect(&self, top: usize, left: usize, bottom: usize, right: usize) -> (usize, usize, usize, usize) {
        let (min_line, max_line, min_col, max_col) = if self.modes.origin {
            (
                self.margin.vertical.from,
                self.margin.vertical.to,
                self.margin.horizontal.from,
                self.margin.horizontal.to,
            )
        } else {
            (0, self.lines().saturating_sub(1), 0, self.columns().saturating_sub(1))
        };
        let t = top.saturating_sub(1).clamp(min_line, max_line);
        let l = left.saturating_sub(1).clamp(min_col, max_col);
        let b = bottom.saturating_sub(1).clamp(t, max_line);
        let r = right.saturating_sub(1).clamp(l, max_col);
        (t, l, b, r)
    }

    /// `DECERA`: erase a rectangle to blank cells carrying the cursor's
    /// current background, ignoring protected-cell status (ordinary erase).
    pub fn erase_rectangle(&mut self, top: usize, left: usize, bottom: usize, right: usize) {
        let (t, l, b, r) = self.clamp_rect(top, left, bottom, right);
        let bg = self.cursor.bg;
        for line in t..=b {
            for col in l..=r {
                let loc = CellLocation::new(LineOffset(line as i32), ColumnOffset(col as i32));
                self.grid.set_cell(loc, Cell::erased(bg));
            }
        }
        self.grid.mark_dirty_range(MarginRange { from: t, to: b });
    }

    /// `DECFRA`: fill a rectangle with `ch`, keeping the cursor's current
    /// graphic rendition.
    pub fn fill_rectangle(&mut self, ch: char, top: usize, left: usize, bottom: usize, right: usize) {
        let (t, l, b, r) = self.clamp_rect(top, left, bottom, right);
        for line in t..=b {
            for col in l..=r {
                let loc = CellLocation::new(LineOffset(line as i32), ColumnOffset(col as i32));
                self.grid.set_cell(loc, self.cursor.pen_cell(ch, 1));
            }
        }
        self.grid.mark_dirty_range(MarginRange { from: t, to: b });
    }

    /// `DECCRA`: copy a rectangle to a destination top-left, within the same
    /// page (multi-page addressing is not modeled; the page parameters are
    /// accepted and ignored).
    pub fn copy_rectangle(
        &mut self,
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
        dest_top: usize,
        dest_left: usize,
    ) {
        let (t, l, b, r) = self.clamp_rect(top, left, bottom, right);
        let (dt, dl, _, _) = self.clamp_rect(dest_top, dest_left, dest_top, dest_left);
        let mut snapshot = Vec::with_capacity((b - t + 1) * (r - l + 1));
        for line in t..=b {
            for col in l..=r {
                let loc = CellLocation::new(LineOffset(line as i32), ColumnOffset(col as i32));
                snapshot.push(self.grid.cell_at(loc));
            }
        }
        let width = r - l + 1;
        let max_line = self.lines().saturating_sub(1);
        let max_col = self.columns().saturating_sub(1);
        for (i, cell) in snapshot.into_iter().enumerate() {
            let line = dt + i / width;
            let col = dl + i % width;
            if line > max_line || col > max_col {
                continue;
            }
            let loc = CellLocation::new(LineOffset(line as i32), ColumnOffset(col as i32));
            self.grid.set_cell(loc, cell);
        }
    }

    /// `DECCARA`: apply the given SGR-like attribute codes to every cell in
    /// the rectangle without touching its text.
    pub fn change_rectangle_attrs(&mut self, codes: &[u16], top: usize, left: usize, bottom: usize, right: usize) {
        self.map_rectangle_attrs(codes, top, left, bottom, right, false);
    }

    /// `DECRARA`: toggle (reverse) the given SGR-like attribute codes on
    /// every cell in the rectangle.
    pub fn reverse_rectangle_attrs(&mut self, codes: &[u16], top: usize, left: usize, bottom: usize, right: usize) {
        self.map_rectangle_attrs(codes, top, left, bottom, right, true);
    }

    fn map_rectangle_attrs(
        &mut self,
        codes: &[u16],
        top: usize,
        left: usize,
        bottom: usize,
        right: usize,
        reverse: bool,
    ) {
        let (t, l, b, r) = self.clamp_rect(top, left, bottom, right);
        for line in t..=b {
            for col in l..=r {
                let loc = CellLocation::new(LineOffset(line as i32), ColumnOffset(col as i32));
                let mut cell = self.grid.cell_at(loc);
                for &code in codes {
                    let bit = match code {
                        1 => Some(CellFlags::BOLD),
                        4 => Some(CellFlags::UNDERLINE),
                        5 => Some(CellFlags::BLINK),
                        7 => Some(CellFlags::INVERSE),
                        8 => Some(CellFlags::HIDDEN),
                        _ => None,
                    };
                    if let Some(bit) = bit {
                        if reverse {
                            cell.flags.toggle(bit);
                        } else {
                            cell.flags.insert(bit);
                        }
                    } else if code == 0 && !reverse {
                        cell.flags = CellFlags::empty();
                    }
                }
                self.grid.set_cell(loc, cell);
            }
        }
        self.grid.mark_dirty_range(MarginRange { from: t, to: b });
    }
}

/// Parse an SGR extended-color spec (`38`/`48`/`58`) starting at group `*i`,
/// which holds the `38`/`48`/`58` code itself. Handles both the colon form,
/// where the mode and channels are sub-parameters of that same group
/// (`38:2::r:g:b`, with an optional leading color-space slot before the
/// channels; `38:5:n`), and the semicolon form, where `vte` delivers the
/// mode and each channel as their own following groups (`38;2;r;g;b`,
/// `38;5;n`) — in the latter case `*i` is advanced past the groups consumed
/// so the caller's loop resumes after them.
fn parse_extended_color(groups: &[smallvec::SmallVec<[u16; 8]>], i: &mut usize) -> Option<Color> {
    let group = &groups[*i];
    if group.len() > 1 {
        return match group.get(1).copied() {
            Some(2) => {
                let (r, g, b) = if group.len() >= 6 {
                    // `38:2:<color-space>:r:g:b`; the color-space slot is ignored.
                    (group[3], group[4], group[5])
                } else {
                    (*group.get(2)?, *group.get(3)?, *group.get(4)?)
                };
                Some(Color::Rgb(r as u8, g as u8, b as u8))
            }
            Some(5) => Some(Color::Indexed(*group.get(2)? as u8)),
            _ => None,
        };
    }
    match groups.get(*i + 1).and_then(|g| g.first()).copied() {
        Some(2) => {
            let r = *groups.get(*i + 2)?.first()?;
            let g = *groups.get(*i + 3)?.first()?;
            let b = *groups.get(*i + 4)?.first()?;
            *i += 4;
            Some(Color::Rgb(r as u8, g as u8, b as u8))
        }
        Some(5) => {
            let n = *groups.get(*i + 2)?.first()?;
            *i += 2;
            Some(Color::Indexed(n as u8))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(lines: usize, columns: usize) -> Screen {
        Screen::new(GridSize::new(lines, columns), MaxHistoryLines::Count(1000))
    }

    #[test]
    fn write_char_sets_wrap_pending_at_right_edge() {
        let mut s = screen(3, 4);
        for c in "abcd".chars() {
            s.write_char(c, 1);
        }
        assert!(s.cursor.wrap_pending);
        assert_eq!(s.cursor.position.column, ColumnOffset(3));
        s.write_char('e', 1);
        assert_eq!(s.cursor.position.line, LineOffset(1));
        assert_eq!(s.grid.line(LineOffset(1)).cell_at(0).codepoint, 'e');
    }

    #[test]
    fn index_at_bottom_margin_scrolls() {
        let mut s = screen(2, 4);
        s.cursor.position.line = LineOffset(1);
        s.write_char('x', 1);
        s.cursor.position.column = ColumnOffset(0);
        s.index();
        assert_eq!(s.cursor.position.line, LineOffset(1));
        assert_eq!(s.grid.line(LineOffset(-1)).cell_at(0).codepoint, 'x');
    }

    #[test]
    fn index_inside_partial_scroll_region_does_not_archive_to_scrollback() {
        // A scroll region that doesn't span the full page (`DECSTBM 1;3` on
        // a 4-row page) must scroll in place, not feed its top line into
        // scrollback — history stays empty.
        let mut s = screen(4, 4);
        s.set_vertical_margin(1, 3);
        s.cursor.position.line = LineOffset(0);
        s.write_char('a', 1);
        s.cursor.position = CellLocation::new(LineOffset(2), ColumnOffset(0));
        s.index();
        assert_eq!(s.grid.history_len(), 0);
        assert_eq!(s.grid.line(LineOffset(0)).cell_at(0).codepoint, ' ');
    }

    #[test]
    fn selective_erase_preserves_protected_cells() {
        let mut s = screen(2, 4);
        s.cursor.protected = true;
        s.write_char('p', 1);
        s.cursor.protected = false;
        s.cursor.position.column = ColumnOffset(0);
        s.erase_line(2, EraseMode::Selective);
        assert_eq!(s.grid.line(LineOffset(0)).cell_at(0).codepoint, 'p');
    }

    #[test]
    fn sgr_extended_rgb_foreground() {
        let mut s = screen(2, 4);
        let groups: Vec<smallvec::SmallVec<[u16; 8]>> = vec![
            smallvec::smallvec![38, 2, 10, 20, 30],
        ];
        s.apply_sgr(&groups);
        assert_eq!(s.cursor.fg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn sgr_extended_rgb_foreground_semicolon_form() {
        // `\x1b[38;2;10;20;30m` — `vte` delivers each semicolon-separated
        // value as its own group.
        let mut s = screen(2, 4);
        let groups: Vec<smallvec::SmallVec<[u16; 8]>> = vec![
            smallvec::smallvec![38],
            smallvec::smallvec![2],
            smallvec::smallvec![10],
            smallvec::smallvec![20],
            smallvec::smallvec![30],
        ];
        s.apply_sgr(&groups);
        assert_eq!(s.cursor.fg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn sgr_extended_256_foreground_semicolon_form() {
        // `\x1b[38;5;200m`.
        let mut s = screen(2, 4);
        let groups: Vec<smallvec::SmallVec<[u16; 8]>> = vec![
            smallvec::smallvec![38],
            smallvec::smallvec![5],
            smallvec::smallvec![200],
        ];
        s.apply_sgr(&groups);
        assert_eq!(s.cursor.fg, Color::Indexed(200));
    }

    #[test]
    fn sgr_extended_rgb_background_colon_form_with_empty_color_space() {
        // `\x1b[48:2::10:20:30m` — colon form with the color-space slot
        // present but empty (parsed as `0`).
        let mut s = screen(2, 4);
        let groups: Vec<smallvec::SmallVec<[u16; 8]>> = vec![
            smallvec::smallvec![48, 2, 0, 10, 20, 30],
        ];
        s.apply_sgr(&groups);
        assert_eq!(s.cursor.bg, Color::Rgb(10, 20, 30));
    }

    #[test]
    fn sgr_extended_color_semicolon_form_consumes_trailing_codes_correctly() {
        // A plain SGR code following an extended-color spec must still be
        // applied: `i` has to land back on it, not re-interpret one of the
        // color's own component groups as a code.
        let mut s = screen(2, 4);
        let groups: Vec<smallvec::SmallVec<[u16; 8]>> = vec![
            smallvec::smallvec![38],
            smallvec::smallvec![2],
            smallvec::smallvec![10],
            smallvec::smallvec![20],
            smallvec::smallvec![30],
            smallvec::smallvec![1],
        ];
        s.apply_sgr(&groups);
        assert_eq!(s.cursor.fg, Color::Rgb(10, 20, 30));
        assert!(s.cursor.flags.contains(CellFlags::BOLD));
    }

    #[test]
    fn save_restore_cursor_round_trips_position_and_pen() {
        let mut s = screen(4, 4);
        s.cursor_to(2, 2);
        s.cursor.fg = Color::Indexed(3);
        s.save_cursor();
        s.cursor_to(1, 1);
        s.cursor.fg = Color::Default;
        s.restore_cursor();
        assert_eq!(s.cursor.position, CellLocation::new(LineOffset(1), ColumnOffset(1)));
        assert_eq!(s.cursor.fg, Color::Indexed(3));
    }
}
