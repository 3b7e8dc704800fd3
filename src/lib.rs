//! A minimal git-style object store and reference core
//!
//! Content-addressed storage of immutable objects, reference management
//! with compare-and-swap updates, structural tree diffing, commit-graph
//! ancestry queries and fast-forward/three-way merging, composed behind a
//! small repository facade. Network transport is pluggable and outside the
//! core.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
pub mod transport;
