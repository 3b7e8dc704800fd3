//! Data structures and algorithms
//!
//! - `branch`: reference and branch name validation
//! - `checkout`: checkout migration planning and conflict detection
//! - `core`: shared output utilities (pager wrapper)
//! - `diff`: tree diffing and Myers' text diff
//! - `graph`: commit graph walks and merge-base search
//! - `index`: staging set file format
//! - `merge`: merge classification and three-way combination
//! - `objects`: content-addressed object types
//! - `patch`: unified diff and patch rendering
//! - `status`: working tree status inspection

pub mod branch;
pub mod checkout;
pub mod core;
pub mod diff;
pub mod graph;
pub mod index;
pub mod merge;
pub mod objects;
pub mod patch;
pub mod status;
