//! Selection model (§3 Selection): derived from host input events, queried
//! during render by [`crate::render::builder::RenderBufferBuilder`].

use crate::primitives::CellLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    None,
    Linear { begin: CellLocation, end: CellLocation },
    Block { top_left: CellLocation, bottom_right: CellLocation },
    Wordwise { begin: CellLocation, end: CellLocation },
    Linewise { begin: CellLocation, end: CellLocation },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::None
    }
}

impl Selection {
    pub fn is_active(&self) -> bool {
        !matches!(self, Selection::None)
    }

    /// Whether `loc` falls inside the selection, accounting for the
    /// different shapes (linear ranges span partial first/last lines; block
    /// selections are a rectangle; linewise selects whole lines).
    pub fn contains(&self, loc: CellLocation, page_width: usize) -> bool {
        match *self {
            Selection::None => false,
            Selection::Linear { begin, end } | Selection::Wordwise { begin, end } => {
                let (begin, end) = ordered(begin, end);
                let lo = linearize(begin, page_width);
                let hi = linearize(end, page_width);
                let cur = linearize(loc, page_width);
                cur >= lo && cur <= hi
            }
            Selection::Linewise { begin, end } => {
                let (begin, end) = ordered(begin, end);
                loc.line >= begin.line && loc.line <= end.line
            }
            Selection::Block { top_left, bottom_right } => {
                loc.line >= top_left.line
                    && loc.line <= bottom_right.line
                    && loc.column >= top_left.column
                    && loc.column <= bottom_right.column
            }
        }
    }
}

fn ordered(a: CellLocation, b: CellLocation) -> (CellLocation, CellLocation) {
    let a_key = (a.line.0, a.column.0);
    let b_key = (b.line.0, b.column.0);
    if a_key <= b_key {
        (a, b)
    } else {
        (b, a)
    }
}

fn linearize(loc: CellLocation, page_width: usize) -> i64 {
    loc.line.0 as i64 * page_width as i64 + loc.column.0 as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{ColumnOffset, LineOffset};

    fn loc(l: i32, c: i32) -> CellLocation {
        CellLocation::new(LineOffset(l), ColumnOffset(c))
    }

    #[test]
    fn linear_selection_spans_partial_lines() {
        let sel = Selection::Linear {
            begin: loc(0, 5),
            end: loc(1, 2),
        };
        assert!(sel.contains(loc(0, 79), 80));
        assert!(!sel.contains(loc(0, 4), 80));
        assert!(sel.contains(loc(1, 2), 80));
        assert!(!sel.contains(loc(1, 3), 80));
    }

    #[test]
    fn block_selection_is_rectangular() {
        let sel = Selection::Block {
            top_left: loc(0, 2),
            bottom_right: loc(2, 5),
        };
        assert!(sel.contains(loc(1, 3), 80));
        assert!(!sel.contains(loc(1, 6), 80));
    }
}
