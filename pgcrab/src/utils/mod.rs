//! Utilities for pgcrab
//!
//! This module provides utility functions used across the library.

pub mod identifiers;
pub mod logging;

// Re-export key utility functions
pub use identifiers::{is_valid_identifier, validate_identifier, MAX_IDENTIFIER_LENGTH};
