//! Schema module for pgcrab
//!
//! This module defines the baseline tables and the changelog record format.

pub mod changelog;
pub mod tables;

// Re-export key types
pub use changelog::{ChangelogEntry, PatchFile};
pub use tables::BaselineTable;
