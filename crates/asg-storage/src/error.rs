//! Storage error types for asg-storage.
//!
//! [`StorageError`] covers all anticipated failure modes of the binary
//! codec: I/O, malformed or truncated streams, version and schema
//! mismatches, plus core graph errors surfacing while the loaded store is
//! rebuilt (dangling edge targets arrive through the `Core` variant).

use asg_core::AsgError;
use thiserror::Error;

/// Errors produced by binary save/load.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the underlying file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream's format version is not one this codec reads.
    #[error("format version mismatch: stream has {found}, codec supports {expected}")]
    FormatVersionMismatch { found: u32, expected: u32 },

    /// The stream records a node kind tag unknown to the current schema.
    /// There is no partial or forward-compatible load.
    #[error("unsupported node kind tag: {tag}")]
    UnsupportedNodeKind { tag: u32 },

    /// The stream records an enum attribute value unknown to the current
    /// schema.
    #[error("unsupported {attribute} tag: {tag}")]
    UnsupportedEnumTag { attribute: &'static str, tag: u32 },

    /// The stream ended mid-field.
    #[error("truncated stream at byte {offset}")]
    TruncatedStream { offset: usize },

    /// A string table entry is not valid UTF-8.
    #[error("invalid utf-8 in string table entry {key}")]
    InvalidUtf8 { key: u32 },

    /// A core graph error while rebuilding the loaded store.
    #[error(transparent)]
    Core(#[from] AsgError),
}
