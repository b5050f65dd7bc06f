//! Binary persistence for `asg-core` factories.
//!
//! One versioned stream holds the whole store: the persisted slice of the
//! string table, then every live node record in ascending id order. Load is
//! the exact inverse and hands back a factory indistinguishable from the
//! saved one under structural hash and field-by-field comparison, with
//! parent links and the reverse-edge index rebuilt.
//!
//! # Modules
//!
//! - [`error`]: `StorageError` enum with all failure modes
//! - [`codec`]: the wire format, `save`/`load` and the file helpers

pub mod codec;
pub mod error;

// Re-export key items for ergonomic use.
pub use codec::{load, load_from_file, save, save_to_file, FORMAT_VERSION};
pub use error::StorageError;
