//! Diff algorithms
//!
//! - `tree_diff`: structural tree-level comparison (which paths changed)
//! - `text_diff`: Myers' line diff and hunk grouping (what changed inside)
//!
//! Tree diffing feeds checkout migration and the merge engine; text diffing
//! only feeds the rendered diff/patch output at the boundary.

pub mod text_diff;
pub mod tree_diff;
