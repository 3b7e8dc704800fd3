//! Checkout planning and execution
//!
//! - `conflict`: conflict categories a checkout can hit
//! - `migration`: plans the tree-diff between two commits as file system
//!   actions, refuses when local changes would be lost, then applies

pub mod conflict;
pub mod migration;
