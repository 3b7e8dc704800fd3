//! Staging set file format
//!
//! The index tracks which blobs land in the next commit's tree. On disk:
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "MIDX" (4 bytes)
//!   - Version: 1 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length, 8-byte aligned):
//!   - mtime, size, mode (network-endian u32 each)
//!   - object id (20 bytes)
//!   - path length (u16) and path bytes, NUL-padded
//!
//! Checksum (20 bytes):
//!   - SHA-1 of all preceding bytes
//! ```

pub mod checksum;
pub mod index_entry;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12; // 4 bytes signature, 4 version, 4 entry count

/// Magic signature identifying index files
pub const SIGNATURE: &str = "MIDX";

/// Index file format version
pub const VERSION: u32 = 1;

/// Block size for entry alignment
pub const ENTRY_BLOCK: usize = 8;
