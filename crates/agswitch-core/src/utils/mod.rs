//! Utility functions for data paths and atomic file writes.

pub mod fs;
pub mod paths;
