//! Utility modules for common functionality
//!
//! This module contains utility functions and helpers used throughout the application:
//! - `logging`: Logging configuration and setup
//! - `format`: Human-readable sizes, durations and dates for CLI output

pub mod format;
pub mod logging;
