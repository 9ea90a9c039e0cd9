//! Utility modules.

/// Serde helpers for `Duration` as integer milliseconds.
pub mod duration_ms;

/// Log sanitization utilities to prevent sensitive data exposure.
pub mod log_sanitizer;
