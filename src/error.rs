//! Error types for the fallible boundary operations described in §7.
//! Byte-stream parsing and screen mutation are themselves infallible
//! (malformed input is logged and clamped, never rejected); this module
//! only covers operations with a genuine failure mode: registries, the
//! reply channel, and host-gated permissions.

use thiserror::Error;

/// Errors surfaced by registries and channels with bounded capacity, and by
/// permission-gated operations a host may deny.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VtError {
    #[error("hyperlink id {0:?} not found")]
    UnknownHyperlink(String),

    #[error("image {0:?} not found in registry")]
    UnknownImage(String),

    #[error("reply channel full; oldest reply dropped")]
    ReplyChannelOverflow,

    #[error("operation {0:?} denied by host permission policy")]
    PermissionDenied(&'static str),

    #[error("atlas has no free direct-mapped slot")]
    AtlasDirectMapFull,
}

pub type VtResult<T> = Result<T, VtError>;
