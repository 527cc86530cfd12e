//! External services integration
//!
//! This module contains integrations with the remote lyric service:
//! - LRCLIB API client behind the `LyricsSource` seam
//! - Lyrics resolver with query fallbacks and cache write-back
//! - Catalog helpers for browsing cached entries

pub mod catalog;
pub mod lrclib;
pub mod resolver;
