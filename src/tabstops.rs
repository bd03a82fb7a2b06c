//! Tab stops (§3 "Tab stops"): a sorted set of column offsets, default every
//! 8 columns until explicitly overridden by `HTS`/`TBC`.

#[derive(Debug, Clone)]
pub struct TabStops {
    stops: Vec<bool>,
}

impl TabStops {
    /// Build the default tab-stop set for a page of `columns` width: a stop
    /// every 8 columns starting at 0.
    pub fn new(columns: usize) -> Self {
        let mut stops = vec![false; columns];
        for i in (0..columns).step_by(8) {
            stops[i] = true;
        }
        Self { stops }
    }

    pub fn resize(&mut self, columns: usize) {
        self.stops.resize(columns, false);
    }

    /// Reset to the default every-8-columns layout (`RIS`).
    pub fn reset(&mut self) {
        let columns = self.stops.len();
        *self = Self::new(columns);
    }

    /// `HTS`: set a tab stop at `column`.
    pub fn set(&mut self, column: usize) {
        if let Some(slot) = self.stops.get_mut(column) {
            *slot = true;
        }
    }

    /// `TBC 0`: clear the stop at `column`.
    pub fn clear(&mut self, column: usize) {
        if let Some(slot) = self.stops.get_mut(column) {
            *slot = false;
        }
    }

    /// `TBC 3`: clear every stop.
    pub fn clear_all(&mut self) {
        for s in &mut self.stops {
            *s = false;
        }
    }

    /// The next stop strictly after `from`, or the last column if none.
    pub fn next_after(&self, from: usize) -> usize {
        for i in (from + 1)..self.stops.len() {
            if self.stops[i] {
                return i;
            }
        }
        self.stops.len().saturating_sub(1)
    }

    /// The previous stop strictly before `from` (for `CSI Z` / back-tab), or
    /// 0 if none.
    pub fn prev_before(&self, from: usize) -> usize {
        for i in (0..from).rev() {
            if self.stops[i] {
                return i;
            }
        }
        0
    }

    pub fn is_stop(&self, column: usize) -> bool {
        self.stops.get(column).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stops_every_eight_columns() {
        let t = TabStops::new(24);
        assert!(t.is_stop(0));
        assert!(t.is_stop(8));
        assert!(!t.is_stop(5));
    }

    #[test]
    fn next_after_skips_cleared_stop() {
        let mut t = TabStops::new(24);
        t.clear(8);
        assert_eq!(t.next_after(0), 16);
    }
}
