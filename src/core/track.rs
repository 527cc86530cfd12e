use serde::{Deserialize, Serialize};

/// Metadata for whatever the external player reports as currently playing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Whole seconds; `None` when the player reports no (or a non-positive) length
    pub duration_secs: Option<u64>,
    pub artwork_url: Option<String>,
    pub track_id: Option<String>,
}

impl TrackInfo {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            ..Self::default()
        }
    }

    /// A track without both title and artist means nothing is meaningfully playing.
    pub fn is_valid(&self) -> bool {
        !self.title.is_empty() && !self.artist.is_empty()
    }

    /// Opaque ids win when both sides carry one, otherwise exact (title, artist).
    pub fn is_same_track(&self, other: &TrackInfo) -> bool {
        match (self.track_id.as_deref(), other.track_id.as_deref()) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => a == b,
            _ => self.title == other.title && self.artist == other.artist,
        }
    }
}
