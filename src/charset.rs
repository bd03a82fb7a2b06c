//! Charset translation tables (§3 Charsets). Four Gn slots, each loaded by
//! `SCS` with a named table; the cursor holds the active GL slot plus a
//! one-shot single-shift override.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetTable {
    UsAscii,
    DecSpecialGraphics,
    British,
    French,
    German,
    Dutch,
    FinnishSwedish,
    Norwegian,
    Spanish,
    Swiss,
    Italian,
    Portuguese,
}

impl Default for CharsetTable {
    fn default() -> Self {
        CharsetTable::UsAscii
    }
}

/// Which Gn slot (`G0`..`G3`) is active, or a one-shot single-shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSlot {
    G0,
    G1,
    G2,
    G3,
}

/// The four charset slots plus the active-slot selector. Owned by the
/// [`crate::screen::Cursor`] (charsets are part of saved/restored cursor
/// state per `DECSC`/`DECRC`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charsets {
    pub g: [CharsetTable; 4],
    pub active: CharsetSlot,
    /// A pending `SS2`/`SS3` single-shift, consumed by the next printed
    /// character only.
    pub single_shift: Option<CharsetSlot>,
}

impl Default for Charsets {
    fn default() -> Self {
        Self {
            g: [CharsetTable::UsAscii; 4],
            active: CharsetSlot::G0,
            single_shift: None,
        }
    }
}

impl Charsets {
    pub fn designate(&mut self, slot: CharsetSlot, table: CharsetTable) {
        self.g[slot as usize] = table;
    }

    pub fn lock_shift(&mut self, slot: CharsetSlot) {
        self.active = slot;
    }

    pub fn single_shift(&mut self, slot: CharsetSlot) {
        self.single_shift = Some(slot);
    }

    /// The table that applies to the *next* printed character, consuming a
    /// pending single-shift if present.
    pub fn take_effective_table(&mut self) -> CharsetTable {
        if let Some(slot) = self.single_shift.take() {
            self.g[slot as usize]
        } else {
            self.g[self.active as usize]
        }
    }

    /// Translate one ASCII-range input byte through the given table. Tables
    /// other than `DecSpecialGraphics` only remap a handful of national
    /// substitution characters (punctuation); unmapped code points pass
    /// through unchanged.
    pub fn translate(table: CharsetTable, c: char) -> char {
        match table {
            CharsetTable::UsAscii => c,
            CharsetTable::DecSpecialGraphics => dec_special_graphics(c),
            CharsetTable::British => match c {
                '#' => '\u{00a3}', // pound sign
                _ => c,
            },
            CharsetTable::French => match c {
                '#' => '\u{00a3}',
                '@' => '\u{00e0}',
                '[' => '\u{00b0}',
                '\\' => '\u{00e7}',
                ']' => '\u{00a7}',
                '{' => '\u{00e9}',
                '|' => '\u{00f9}',
                '}' => '\u{00e8}',
                _ => c,
            },
            CharsetTable::German => match c {
                '@' => '\u{00a7}',
                '[' => '\u{00c4}',
                '\\' => '\u{00d6}',
                ']' => '\u{00dc}',
                '{' => '\u{00e4}',
                '|' => '\u{00f6}',
                '}' => '\u{00fc}',
                '~' => '\u{00df}',
                _ => c,
            },
            _ => c,
        }
    }
}

/// DEC Special Graphics (line drawing) substitution table, `ESC ( 0`.
fn dec_special_graphics(c: char) -> char {
    match c {
        '`' => '\u{25c6}',
        'a' => '\u{2592}',
        'b' => '\u{2409}',
        'c' => '\u{240c}',
        'd' => '\u{240d}',
        'e' => '\u{240a}',
        'f' => '\u{00b0}',
        'g' => '\u{00b1}',
        'h' => '\u{2424}',
        'i' => '\u{240b}',
        'j' => '\u{2518}',
        'k' => '\u{2510}',
        'l' => '\u{250c}',
        'm' => '\u{2514}',
        'n' => '\u{253c}',
        'o' => '\u{23ba}',
        'p' => '\u{23bb}',
        'q' => '\u{2500}',
        'r' => '\u{23bc}',
        's' => '\u{23bd}',
        't' => '\u{251c}',
        'u' => '\u{2524}',
        'v' => '\u{2534}',
        'w' => '\u{252c}',
        'x' => '\u{2502}',
        'y' => '\u{2264}',
        'z' => '\u{2265}',
        '{' => '\u{03c0}',
        '|' => '\u{2260}',
        '}' => '\u{00a3}',
        '~' => '\u{00b7}',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_shift_is_one_shot() {
        let mut cs = Charsets::default();
        cs.designate(CharsetSlot::G2, CharsetTable::DecSpecialGraphics);
        cs.single_shift(CharsetSlot::G2);
        assert_eq!(cs.take_effective_table(), CharsetTable::DecSpecialGraphics);
        assert_eq!(cs.take_effective_table(), CharsetTable::UsAscii);
    }

    #[test]
    fn dec_special_graphics_maps_line_drawing() {
        assert_eq!(
            Charsets::translate(CharsetTable::DecSpecialGraphics, 'q'),
            '\u{2500}'
        );
    }
}
