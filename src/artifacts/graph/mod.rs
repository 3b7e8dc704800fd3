//! Commit graph traversal
//!
//! Ancestry queries over the parent-link DAG: lazy ancestor walks,
//! reachability checks, and merge-base computation.

pub mod walker;
