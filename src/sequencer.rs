//! Parameter extraction and function lookup helpers (C4) shared by
//! `terminal.rs`'s `vte::Perform` dispatch.
//!
//! Grounded on `terminal/state.rs`'s `extract_params`/`param` helpers (kept
//! nearly verbatim) plus the colon-subparameter grouping
//! `screen.rs::apply_sgr` expects, generalized from flat `Vec<u16>` to
//! `SmallVec` per-group storage so SGR's extended-color subparameters
//! (`38:2::r:g:b`) survive extraction instead of being flattened away.

use smallvec::SmallVec;

/// One CSI parameter group: the leading value plus any colon-separated
/// subparameters (e.g. `4:3` -> `[4, 3]`, `38:2:0:255:0:0` -> `[38, 2, 0,
/// 255, 0, 0]`).
pub type ParamGroup = SmallVec<[u16; 8]>;

/// Flatten a `vte::Params` into one value per semicolon-separated group,
/// discarding colon subparameters (used by cursor motion / erase counts /
/// anything that doesn't care about extended color subparameters).
pub fn flat_params(params: &vte::Params) -> Vec<u16> {
    params
        .iter()
        .map(|group| group.first().copied().unwrap_or(0))
        .collect()
}

/// Group a `vte::Params` into one [`ParamGroup`] per semicolon-separated
/// parameter, preserving colon subparameters within each group. This is the
/// shape `Screen::apply_sgr` consumes.
pub fn grouped_params(params: &vte::Params) -> Vec<ParamGroup> {
    params
        .iter()
        .map(|group| group.iter().copied().collect())
        .collect()
}

/// Read parameter `idx`, returning `default` if absent or explicitly `0`
/// (ECMA-48 "a parameter value of 0 means use the default").
pub fn param_or(params: &[u16], idx: usize, default: u16) -> u16 {
    params
        .get(idx)
        .copied()
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

/// Read parameter `idx` literally, with no default substitution for an
/// explicit `0` (needed by e.g. `SGR 0` reset, where `0` is itself
/// meaningful rather than "use the default").
pub fn param_raw(params: &[u16], idx: usize, default: u16) -> u16 {
    params.get(idx).copied().unwrap_or(default)
}

/// `CSI ? ... h`/`CSI ? ... l`/`CSI ? ... $ p` private-mode markers, and the
/// `CSI > ...` secondary-DA marker, read from the dispatch intermediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiMarkers {
    pub private: bool,
    pub greater_than: bool,
    pub dollar: bool,
}

impl CsiMarkers {
    pub fn from_intermediates(intermediates: &[u8]) -> Self {
        Self {
            private: intermediates.contains(&b'?'),
            greater_than: intermediates.contains(&b'>'),
            dollar: intermediates.contains(&b'$'),
        }
    }
}

/// One `DECRQSS` query this terminal knows how to answer, and the control
/// string it should reply with given the current state (closures are built
/// by `terminal.rs`, which owns the state to answer from).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrqssRequest {
    /// `SGR` — current graphic rendition.
    Sgr,
    /// `DECSTBM` — current scroll region.
    Decstbm,
    /// `DECSCUSR` — current cursor shape/blink.
    Decscusr,
    /// `DECSLRM` — current left/right margin.
    Decslrm,
    Unknown,
}

impl DecrqssRequest {
    /// Parse the `Pt` payload of a `DECRQSS` DCS (e.g. `"m"`, `"r"`, `" q"`).
    pub fn parse(payload: &str) -> Self {
        match payload {
            "m" => Self::Sgr,
            "r" => Self::Decstbm,
            "s" => Self::Decslrm,
            " q" => Self::Decscusr,
            _ => Self::Unknown,
        }
    }
}

/// Format a valid `DECRQSS` reply: `DCS 1 $ r <Pt> ST`.
pub fn decrqss_valid_reply(pt: &str) -> Vec<u8> {
    format!("\x1bP1$r{pt}\x1b\\").into_bytes()
}

/// Format an invalid/unsupported `DECRQSS` reply: `DCS 0 $ r ST`.
pub fn decrqss_invalid_reply() -> Vec<u8> {
    b"\x1bP0$r\x1b\\".to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_or_substitutes_default_for_explicit_zero() {
        assert_eq!(param_or(&[0, 5], 0, 1), 1);
        assert_eq!(param_or(&[0, 5], 1, 1), 5);
        assert_eq!(param_or(&[], 0, 1), 1);
    }

    #[test]
    fn param_raw_keeps_explicit_zero() {
        assert_eq!(param_raw(&[0], 0, 9), 0);
        assert_eq!(param_raw(&[], 0, 9), 9);
    }

    #[test]
    fn decrqss_parses_known_requests() {
        assert_eq!(DecrqssRequest::parse("m"), DecrqssRequest::Sgr);
        assert_eq!(DecrqssRequest::parse("r"), DecrqssRequest::Decstbm);
        assert_eq!(DecrqssRequest::parse(" q"), DecrqssRequest::Decscusr);
        assert_eq!(DecrqssRequest::parse("??"), DecrqssRequest::Unknown);
    }

    #[test]
    fn decrqss_reply_framing() {
        assert_eq!(decrqss_valid_reply("0;1m"), b"\x1bP1$r0;1m\x1b\\".to_vec());
        assert_eq!(decrqss_invalid_reply(), b"\x1bP0$r\x1b\\".to_vec());
    }
}
