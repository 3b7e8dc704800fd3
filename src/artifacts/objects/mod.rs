//! Content-addressed object types
//!
//! Everything the store holds is one of four immutable objects identified
//! by the SHA-1 digest of its canonical serialization:
//!
//! - **Blob**: file content (raw bytes)
//! - **Tree**: directory listing (names, modes, and object ids)
//! - **Commit**: snapshot with metadata (author, message, parents, tree)
//! - **Tag**: annotated, named pointer to a commit
//!
//! All objects serialize as `<type> <size>\0<payload>`, so identical content
//! always produces the identical id and storing it twice is a no-op.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tag;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Shortest object-id prefix accepted for abbreviated lookups
pub const MIN_PREFIX_LENGTH: usize = 4;
