//! Byte-stream parser (C3): feeds a terminal's incoming byte stream through
//! the `vte` state machine, with a fast path that hands runs of plain
//! printable text to the sink in one call instead of one [`vte::Perform::print`]
//! call per character.
//!
//! Grounded on `terminal/state.rs`'s `vte::Parser::new()` / `parser.advance(self, b)`
//! usage (single-byte `advance`, `vte` 0.13) — kept exactly, generalized into
//! a standalone wrapper any `vte::Perform` sink can use instead of being
//! fused into the terminal type itself (§4.1 "Parser").

use vte::Perform;

/// A [`vte::Perform`] sink that additionally accepts runs of plain text in
/// bulk, letting [`Parser::advance_bytes`] skip the per-byte state-machine
/// dispatch for the common case (printable ASCII/UTF-8 with no embedded
/// control bytes).
pub trait BulkPrintSink: Perform {
    /// A contiguous run of printable, non-control-byte text. Default
    /// implementation falls back to calling [`vte::Perform::print`] once per
    /// character, so implementing this is an optimization, not a
    /// correctness requirement.
    fn print_run(&mut self, text: &str) {
        for c in text.chars() {
            self.print(c);
        }
    }
}

/// Wraps a `vte::Parser`, scanning ahead for runs of bulk-printable bytes
/// before falling back to the byte-at-a-time state machine.
pub struct Parser {
    inner: vte::Parser,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            inner: vte::Parser::new(),
        }
    }

    /// Feed a chunk of bytes through the parser. UTF-8 sequences that
    /// straddle a chunk boundary are tolerated: any trailing incomplete
    /// sequence is left for `vte`'s own internal byte-at-a-time handling to
    /// pick back up on the next call, the same as the original
    /// `for b in data { parser.advance(self, b) }` loop. Malformed bytes
    /// never corrupt parser state; the state machine falls back to Ground
    /// on any byte it doesn't recognize as part of the in-progress
    /// sequence.
    pub fn advance_bytes<S: BulkPrintSink>(&mut self, sink: &mut S, data: &[u8]) {
        let mut i = 0;
        while i < data.len() {
            let run_len = plain_text_run_len(&data[i..]);
            if run_len > 0 {
                if let Ok(text) = std::str::from_utf8(&data[i..i + run_len]) {
                    sink.print_run(text);
                    i += run_len;
                    continue;
                }
            }
            self.inner.advance(sink, data[i]);
            i += 1;
        }
    }

    /// Feed a single byte through the underlying state machine directly,
    /// bypassing the bulk fast path (used by callers that already know they
    /// have a control byte, e.g. tests).
    pub fn advance_one<S: Perform>(&mut self, sink: &mut S, byte: u8) {
        self.inner.advance(sink, byte);
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of the longest prefix of `data` that is definitely plain
/// printable text: complete UTF-8 code points with no embedded C0/C1
/// control byte or ESC. Stops before any byte that could start an escape
/// or control sequence, and before a UTF-8 sequence that isn't fully
/// present in `data` yet.
fn plain_text_run_len(data: &[u8]) -> usize {
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        if b < 0x20 || b == 0x7f {
            break;
        }
        if b < 0x80 {
            i += 1;
            continue;
        }
        let seq_len = match b {
            0xc2..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf4 => 4,
            _ => break,
        };
        if i + seq_len > data.len() {
            break;
        }
        if data[i + 1..i + seq_len].iter().any(|&c| c & 0xc0 != 0x80) {
            break;
        }
        i += seq_len;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        printed: String,
        runs: Vec<String>,
        executed: Vec<u8>,
    }

    impl Perform for Recorder {
        fn print(&mut self, c: char) {
            self.printed.push(c);
        }
        fn execute(&mut self, byte: u8) {
            self.executed.push(byte);
        }
    }

    impl BulkPrintSink for Recorder {
        fn print_run(&mut self, text: &str) {
            self.printed.push_str(text);
            self.runs.push(text.to_string());
        }
    }

    #[test]
    fn plain_ascii_takes_one_bulk_run() {
        let mut parser = Parser::new();
        let mut sink = Recorder::default();
        parser.advance_bytes(&mut sink, b"hello world");
        assert_eq!(sink.printed, "hello world");
        assert_eq!(sink.runs, vec!["hello world".to_string()]);
    }

    #[test]
    fn multibyte_utf8_is_included_in_the_bulk_run() {
        let mut parser = Parser::new();
        let mut sink = Recorder::default();
        parser.advance_bytes(&mut sink, "héllo→".as_bytes());
        assert_eq!(sink.printed, "héllo→");
        assert_eq!(sink.runs.len(), 1);
    }

    #[test]
    fn control_byte_breaks_the_bulk_run_and_is_executed() {
        let mut parser = Parser::new();
        let mut sink = Recorder::default();
        parser.advance_bytes(&mut sink, b"ab\ncd");
        assert_eq!(sink.printed, "abcd");
        assert_eq!(sink.executed, vec![b'\n']);
        assert_eq!(sink.runs, vec!["ab".to_string(), "cd".to_string()]);
    }

    #[test]
    fn truncated_multibyte_sequence_falls_back_to_byte_at_a_time() {
        let mut parser = Parser::new();
        let mut sink = Recorder::default();
        // Lone UTF-8 continuation-ambiguous lead byte with nothing after it:
        // plain_text_run_len should stop before it rather than panic on
        // out-of-bounds indexing.
        parser.advance_bytes(&mut sink, &[0xe2]);
        // vte's own state machine receives the stray byte; no panic, no
        // bulk run recorded for it.
        assert!(sink.runs.is_empty());
    }
}
