//! Browsing helpers over the cached lyric catalog: ordering for listings and
//! "did you mean" suggestions when a lookup misses.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::cmp::Reverse;

use crate::core::infrastructure::cache::LyricEntry;

pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOrder {
    /// Newest first
    #[default]
    Date,
    Artist,
    Title,
}

pub fn sort_entries(entries: &mut [LyricEntry], order: SortOrder) {
    match order {
        SortOrder::Date => entries.sort_by_key(|e| Reverse(e.created_at)),
        SortOrder::Artist => entries.sort_by_key(|e| e.artist_name.to_lowercase()),
        SortOrder::Title => entries.sort_by_key(|e| e.track_name.to_lowercase()),
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Up to `MAX_SUGGESTIONS` cached songs resembling (artist, title).
///
/// Same-artist entries whose titles overlap win outright. Otherwise every
/// entry is scored with a fuzzy match on both fields and the best-scoring
/// ones are returned.
pub fn find_similar(entries: &[LyricEntry], artist: &str, title: &str) -> Vec<LyricEntry> {
    let artist = artist.to_lowercase();
    let title = title.to_lowercase();

    let same_artist: Vec<LyricEntry> = entries
        .iter()
        .filter(|e| e.artist_name.to_lowercase() == artist)
        .filter(|e| overlaps(&e.track_name.to_lowercase(), &title))
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect();
    if !same_artist.is_empty() {
        return same_artist;
    }

    let matcher = SkimMatcherV2::default();
    let score = |candidate: &str, pattern: &str| -> Option<i64> {
        if overlaps(candidate, pattern) {
            return Some(matcher.fuzzy_match(candidate, pattern).unwrap_or(0) + 100);
        }
        matcher.fuzzy_match(candidate, pattern)
    };

    let mut scored: Vec<(i64, &LyricEntry)> = entries
        .iter()
        .filter_map(|e| {
            let artist_score = score(&e.artist_name.to_lowercase(), &artist)?;
            let title_score = score(&e.track_name.to_lowercase(), &title)?;
            Some((artist_score + title_score * 2, e))
        })
        .collect();

    scored.sort_by_key(|(score, _)| Reverse(*score));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, e)| e.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(artist: &str, title: &str, created_at: i64) -> LyricEntry {
        LyricEntry {
            artist_name: artist.to_string(),
            track_name: title.to_string(),
            created_at,
            ..LyricEntry::default()
        }
    }

    fn names(entries: &[LyricEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.track_name.as_str()).collect()
    }

    #[test]
    fn test_sort_orders() {
        let mut entries = vec![
            entry("beta", "Zulu", 10),
            entry("Alpha", "yankee", 30),
            entry("gamma", "X-ray", 20),
        ];

        sort_entries(&mut entries, SortOrder::Date);
        assert_eq!(names(&entries), vec!["yankee", "X-ray", "Zulu"]);

        sort_entries(&mut entries, SortOrder::Artist);
        assert_eq!(names(&entries), vec!["yankee", "Zulu", "X-ray"]);

        sort_entries(&mut entries, SortOrder::Title);
        assert_eq!(names(&entries), vec!["X-ray", "yankee", "Zulu"]);
    }

    #[test]
    fn test_same_artist_overlap_wins() {
        let entries = vec![
            entry("Radiohead", "Karma Police", 1),
            entry("Radiohead Tribute", "Karma Police", 2),
            entry("Radiohead", "No Surprises", 3),
        ];

        let found = find_similar(&entries, "radiohead", "karma");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].artist_name, "Radiohead");
    }

    #[test]
    fn test_fuzzy_pass_tolerates_typos() {
        let entries = vec![
            entry("Surf Curse", "Freaking Out", 1),
            entry("Mitski", "Nobody", 2),
        ];

        let found = find_similar(&entries, "surf crse", "freakin out");
        assert_eq!(names(&found), vec!["Freaking Out"]);
    }

    #[test]
    fn test_at_most_five_suggestions() {
        let entries: Vec<LyricEntry> = (0..9)
            .map(|i| entry("Band", &format!("Song {}", i), i))
            .collect();

        assert_eq!(find_similar(&entries, "band", "song").len(), MAX_SUGGESTIONS);
        assert!(find_similar(&entries, "nobody", "nothing").is_empty());
        assert!(find_similar(&[], "band", "song").is_empty());
    }
}
