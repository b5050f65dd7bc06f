//! Source position attribute for positioned nodes.
//!
//! A position names the source file (as an interned key into the owning
//! factory's string table) and a line/column range. Nodes carry it
//! optionally; structural hashing ignores it so that identical subtrees
//! from different files hash alike.

use serde::{Deserialize, Serialize};

use crate::id::StringKey;

/// A source range attached to a node.
///
/// `path` is a key into the same [`StringTable`](crate::StringTable) as the
/// node's other string attributes, so position paths participate in string
/// compaction and persistence like any other interned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    /// Source file path, if known.
    pub path: Option<StringKey>,
    /// 1-based start line.
    pub line: u32,
    /// 1-based start column.
    pub column: u32,
    /// 1-based end line.
    pub end_line: u32,
    /// 1-based end column.
    pub end_column: u32,
}

impl SourcePosition {
    /// Creates a position spanning a single range in the given file.
    pub fn new(path: Option<StringKey>, line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        SourcePosition {
            path,
            line,
            column,
            end_line,
            end_column,
        }
    }
}
