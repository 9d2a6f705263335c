//! Database module for pgcrab
//!
//! This module handles connections, DDL and changelog writes.

pub mod admin;
pub mod baseline;
pub mod connection;

// Re-export key types
pub use admin::Administrator;
pub use baseline::Baseline;
