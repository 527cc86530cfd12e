//! Core functionality modules
//!
//! This module contains all core business logic organized into logical layers:
//! - `track` and `lyrics`: the data model and timed-line handling
//! - `player`: observation of the external music player
//! - `services`: remote lyric retrieval and resolution
//! - `infrastructure`: cross-cutting concerns (cache)

pub mod infrastructure;
pub mod lyrics;
pub mod player;
pub mod services;
pub mod track;
