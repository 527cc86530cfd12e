//! Infrastructure and cross-cutting concerns
//!
//! This module contains infrastructure components:
//! - Two-tier lyric cache with TTL expiry and atomic file writes

pub mod cache;
