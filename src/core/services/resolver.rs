//! Lyric resolution: cache first, then a ladder of query variants against
//! the remote service.

use regex::Regex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::lrclib::{LrclibResponse, LyricsSource, TrackQuery};
use crate::core::infrastructure::cache::{DiskCache, LyricEntry};
use crate::core::lyrics::{parse_synced, TimedLine};
use crate::error::RetrievalError;

pub const DEFAULT_CANDIDATE_DELAY: Duration = Duration::from_millis(100);

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthesis pattern"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid bracket pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricOrigin {
    Cache,
    Remote,
}

impl LyricOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LyricOrigin::Cache => "CACHE",
            LyricOrigin::Remote => "API",
        }
    }
}

/// Lyric content for one track, as returned to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricData {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration: f64,
    pub instrumental: bool,
    pub plain_lyrics: String,
    pub synced_lyrics: String,
    pub sync_offset: f64,
    pub origin: LyricOrigin,
}

impl LyricData {
    pub fn timed_lines(&self) -> Vec<TimedLine> {
        parse_synced(&self.synced_lyrics)
    }

    pub fn has_synced(&self) -> bool {
        !self.synced_lyrics.trim().is_empty()
    }

    fn from_response(response: LrclibResponse) -> Self {
        Self {
            track_name: response.track_name.unwrap_or_default(),
            artist_name: response.artist_name.unwrap_or_default(),
            album_name: response.album_name.unwrap_or_default(),
            duration: response.duration.unwrap_or(0.0),
            instrumental: response.instrumental,
            plain_lyrics: response.plain_lyrics.unwrap_or_default(),
            synced_lyrics: response.synced_lyrics.unwrap_or_default(),
            sync_offset: 0.0,
            origin: LyricOrigin::Remote,
        }
    }

    fn to_entry(&self) -> LyricEntry {
        LyricEntry {
            track_name: self.track_name.clone(),
            artist_name: self.artist_name.clone(),
            album_name: self.album_name.clone(),
            duration: self.duration,
            instrumental: self.instrumental,
            plain_lyrics: self.plain_lyrics.clone(),
            synced_lyrics: self.synced_lyrics.clone(),
            sync_offset: self.sync_offset,
            ..LyricEntry::default()
        }
    }
}

impl From<LyricEntry> for LyricData {
    fn from(entry: LyricEntry) -> Self {
        Self {
            track_name: entry.track_name,
            artist_name: entry.artist_name,
            album_name: entry.album_name,
            duration: entry.duration,
            instrumental: entry.instrumental,
            plain_lyrics: entry.plain_lyrics,
            synced_lyrics: entry.synced_lyrics,
            sync_offset: entry.sync_offset,
            origin: LyricOrigin::Cache,
        }
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `(...)` and `[...]` qualifiers such as "(Remastered 2011)" or "[Live]".
pub fn strip_qualifiers(text: &str) -> String {
    let without_parens = PARENTHESIZED.replace_all(text, " ");
    let stripped = BRACKETED.replace_all(&without_parens, " ");
    normalize(&stripped)
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// The ordered, de-duplicated list of queries to try for `query`.
/// Variants whose artist or title collapse to nothing are skipped.
pub fn build_candidates(query: &TrackQuery) -> Vec<TrackQuery> {
    let artist = normalize(&query.artist);
    let title = normalize(&query.title);
    let pair = |artist: String, title: String| TrackQuery::new(artist, title);

    let ladder = [
        pair(artist.clone(), title.clone())
            .with_album(query.album.clone())
            .with_duration(query.duration_secs),
        pair(artist.clone(), title.clone()).with_duration(query.duration_secs),
        pair(artist.clone(), title.clone()),
        pair(strip_qualifiers(&query.artist), strip_qualifiers(&query.title)),
        pair(artist.to_uppercase(), title.to_uppercase()),
        pair(artist.to_lowercase(), title.to_lowercase()),
        pair(title_case(&artist), title_case(&title)),
        pair(query.artist.clone(), query.title.clone()),
    ];

    let mut seen = HashSet::new();
    ladder
        .into_iter()
        .filter(|candidate| !candidate.artist.is_empty() && !candidate.title.is_empty())
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

pub struct LyricsResolver {
    source: Arc<dyn LyricsSource>,
    cache: Arc<DiskCache>,
    request_timeout: Duration,
    candidate_delay: Duration,
    read_cache: bool,
}

impl LyricsResolver {
    pub fn new(source: Arc<dyn LyricsSource>, cache: Arc<DiskCache>, request_timeout: Duration) -> Self {
        Self {
            source,
            cache,
            request_timeout,
            candidate_delay: DEFAULT_CANDIDATE_DELAY,
            read_cache: true,
        }
    }

    pub fn with_candidate_delay(mut self, delay: Duration) -> Self {
        self.candidate_delay = delay;
        self
    }

    /// When disabled, lookups always go to the remote service; results are still written back.
    pub fn with_cache_reads(mut self, enabled: bool) -> Self {
        self.read_cache = enabled;
        self
    }

    pub fn cache(&self) -> &Arc<DiskCache> {
        &self.cache
    }

    pub async fn resolve(&self, query: &TrackQuery) -> Result<LyricData, RetrievalError> {
        self.resolve_until(query, std::future::pending()).await
    }

    /// Like `resolve`, but gives up with `RetrievalError::Cancelled` as soon as
    /// `cancelled` completes, aborting both the in-flight request and any
    /// pending delay between candidates.
    pub async fn resolve_until<F>(&self, query: &TrackQuery, cancelled: F) -> Result<LyricData, RetrievalError>
    where
        F: Future<Output = ()>,
    {
        if query.title.is_empty() || query.artist.is_empty() {
            return Err(RetrievalError::Validation("track title or artist is empty".to_string()));
        }
        if normalize(&query.title).is_empty() || normalize(&query.artist).is_empty() {
            return Err(RetrievalError::Validation(
                "track title or artist is empty after normalization".to_string(),
            ));
        }

        if self.read_cache {
            match self.cache.get(&query.artist, &query.title) {
                Ok(entry) => {
                    debug!("Cache hit for {} - {}", query.artist, query.title);
                    return Ok(entry.into());
                }
                Err(e) => debug!("Cache lookup for {} - {}: {}", query.artist, query.title, e),
            }
        }

        tokio::pin!(cancelled);
        let candidates = build_candidates(query);
        let mut last_error: Option<String> = None;

        for (index, candidate) in candidates.iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = &mut cancelled => return Err(RetrievalError::Cancelled),
                    _ = tokio::time::sleep(self.candidate_delay) => {}
                }
            }

            debug!(
                "Trying candidate {}/{}: {} - {} (album: {:?}, duration: {})",
                index + 1,
                candidates.len(),
                candidate.artist,
                candidate.title,
                candidate.album,
                candidate.duration_secs
            );

            let attempt = tokio::time::timeout(self.request_timeout, self.source.fetch(candidate));
            let outcome = tokio::select! {
                _ = &mut cancelled => return Err(RetrievalError::Cancelled),
                outcome = attempt => outcome,
            };

            let response = match outcome {
                Err(_) => {
                    warn!("Lyrics request exceeded {:?}, giving up", self.request_timeout);
                    return Err(RetrievalError::Timeout);
                }
                Ok(Err(e)) if e.is_timeout() => {
                    warn!("Lyrics request timed out, giving up: {}", e);
                    return Err(RetrievalError::Timeout);
                }
                Ok(Err(e)) => {
                    debug!("Candidate {} failed: {}", index + 1, e);
                    last_error = Some(e.to_string());
                    continue;
                }
                Ok(Ok(response)) => response,
            };

            if !response.has_content() {
                last_error = Some("no lyrics in response".to_string());
                continue;
            }

            info!(
                "Found lyrics for {} - {} with candidate {}",
                query.artist,
                query.title,
                index + 1
            );
            let mut data = LyricData::from_response(response);
            if !self.read_cache {
                // keep a previously tuned offset across forced refreshes
                if let Ok(existing) = self.cache.get(&query.artist, &query.title) {
                    data.sync_offset = existing.sync_offset;
                }
            }
            self.store(query, &data);
            return Ok(data);
        }

        Err(RetrievalError::NotFound {
            artist: query.artist.clone(),
            title: query.title.clone(),
            last_error: last_error.unwrap_or_else(|| "tried multiple search variations".to_string()),
        })
    }

    fn store(&self, query: &TrackQuery, data: &LyricData) {
        if let Err(e) = self.cache.set(&query.artist, &query.title, data.to_entry()) {
            warn!("Failed to cache lyrics for {} - {}: {}", query.artist, query.title, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type Script = Box<dyn Fn(usize) -> Result<LrclibResponse, FetchError> + Send + Sync>;

    struct ScriptedSource {
        calls: Mutex<Vec<TrackQuery>>,
        script: Script,
        hang: bool,
    }

    impl ScriptedSource {
        fn new(script: impl Fn(usize) -> Result<LrclibResponse, FetchError> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script: Box::new(script),
                hang: false,
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script: Box::new(|_| Err(FetchError::NotFound)),
                hang: true,
            })
        }

        fn calls(&self) -> Vec<TrackQuery> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LyricsSource for ScriptedSource {
        async fn fetch(&self, query: &TrackQuery) -> Result<LrclibResponse, FetchError> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(query.clone());
                calls.len() - 1
            };
            if self.hang {
                std::future::pending::<()>().await;
            }
            (self.script)(index)
        }
    }

    fn synced_payload() -> LrclibResponse {
        LrclibResponse {
            track_name: Some("Freaking Out".to_string()),
            artist_name: Some("The Band".to_string()),
            synced_lyrics: Some("[00:01.50]Hello\n[00:03.00]World".to_string()),
            ..Default::default()
        }
    }

    fn resolver(source: Arc<ScriptedSource>, cache: Arc<DiskCache>) -> LyricsResolver {
        LyricsResolver::new(source, cache, Duration::from_millis(200))
            .with_candidate_delay(Duration::from_millis(1))
    }

    fn messy_query() -> TrackQuery {
        TrackQuery::new("  the  Band (live) ", "Freaking   Out [Remastered]")
            .with_album("Album")
            .with_duration(200)
    }

    #[test]
    fn test_normalize_and_strip() {
        assert_eq!(normalize("  a   b \t c "), "a b c");
        assert_eq!(strip_qualifiers("Song (Remastered 2011) [Live]"), "Song");
        assert_eq!(strip_qualifiers("(Intro)"), "");
        assert_eq!(title_case("sURF cURSE freaking"), "Surf Curse Freaking");
    }

    #[test]
    fn test_candidate_ladder_order() {
        let candidates = build_candidates(&messy_query());
        assert_eq!(candidates.len(), 8);

        assert_eq!(
            candidates[0],
            TrackQuery::new("the Band (live)", "Freaking Out [Remastered]")
                .with_album("Album")
                .with_duration(200)
        );
        assert_eq!(
            candidates[1],
            TrackQuery::new("the Band (live)", "Freaking Out [Remastered]").with_duration(200)
        );
        assert_eq!(candidates[2], TrackQuery::new("the Band (live)", "Freaking Out [Remastered]"));
        assert_eq!(candidates[3], TrackQuery::new("the Band", "Freaking Out"));
        assert_eq!(candidates[4], TrackQuery::new("THE BAND (LIVE)", "FREAKING OUT [REMASTERED]"));
        assert_eq!(candidates[5], TrackQuery::new("the band (live)", "freaking out [remastered]"));
        assert_eq!(candidates[6], TrackQuery::new("The Band (live)", "Freaking Out [remastered]"));
        assert_eq!(candidates[7], TrackQuery::new("  the  Band (live) ", "Freaking   Out [Remastered]"));
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let candidates = build_candidates(&TrackQuery::new("abc", "def"));
        assert_eq!(
            candidates,
            vec![
                TrackQuery::new("abc", "def"),
                TrackQuery::new("ABC", "DEF"),
                TrackQuery::new("Abc", "Def"),
            ]
        );

        // stripping "(Intro)" leaves an empty title, so that variant is skipped
        let candidates = build_candidates(&TrackQuery::new("abc", "(Intro)"));
        assert!(candidates.iter().all(|c| !c.title.is_empty()));
    }

    #[tokio::test]
    async fn test_last_candidate_wins_and_populates_cache() {
        let source = ScriptedSource::new(|index| {
            if index < 7 {
                Ok(LrclibResponse::default())
            } else {
                Ok(synced_payload())
            }
        });
        let cache = Arc::new(DiskCache::in_memory());
        let query = messy_query();

        let data = resolver(source.clone(), cache.clone()).resolve(&query).await.unwrap();

        assert_eq!(data.origin, LyricOrigin::Remote);
        assert_eq!(data.timed_lines().len(), 2);
        let calls = source.calls();
        assert_eq!(calls.len(), 8);
        assert_eq!(calls[7], TrackQuery::new(query.artist.clone(), query.title.clone()));

        let cached = cache.get(&query.artist, &query.title).unwrap();
        assert_eq!(cached.synced_lyrics, data.synced_lyrics);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let source = ScriptedSource::new(|_| Ok(synced_payload()));
        let cache = Arc::new(DiskCache::in_memory());
        cache
            .set(
                "Band",
                "Song",
                LyricEntry {
                    plain_lyrics: "cached words".to_string(),
                    sync_offset: 0.5,
                    ..LyricEntry::default()
                },
            )
            .unwrap();

        let data = resolver(source.clone(), cache)
            .resolve(&TrackQuery::new("Band", "Song"))
            .await
            .unwrap();

        assert_eq!(data.origin, LyricOrigin::Cache);
        assert_eq!(data.plain_lyrics, "cached words");
        assert_eq!(data.sync_offset, 0.5);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_skipping_cache_reads_still_writes_back() {
        let source = ScriptedSource::new(|_| Ok(synced_payload()));
        let cache = Arc::new(DiskCache::in_memory());
        cache
            .set(
                "Band",
                "Song",
                LyricEntry {
                    plain_lyrics: "stale".to_string(),
                    sync_offset: -1.25,
                    ..LyricEntry::default()
                },
            )
            .unwrap();

        let data = resolver(source.clone(), cache.clone())
            .with_cache_reads(false)
            .resolve(&TrackQuery::new("Band", "Song"))
            .await
            .unwrap();

        assert_eq!(data.origin, LyricOrigin::Remote);
        assert_eq!(source.calls().len(), 1);
        let cached = cache.get("Band", "Song").unwrap();
        assert_eq!(cached.synced_lyrics, data.synced_lyrics);
        assert_eq!(cached.sync_offset, -1.25);
    }

    #[tokio::test]
    async fn test_hanging_service_aborts_after_one_attempt() {
        let source = ScriptedSource::hanging();
        let cache = Arc::new(DiskCache::in_memory());

        let err = LyricsResolver::new(source.clone(), cache, Duration::from_millis(50))
            .resolve(&messy_query())
            .await
            .unwrap_err();

        assert!(matches!(err, RetrievalError::Timeout));
        assert_eq!(err.to_string(), "lyrics server took too long to respond");
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_timeout_aborts_after_one_attempt() {
        let source = ScriptedSource::new(|_| Err(FetchError::Timeout));
        let cache = Arc::new(DiskCache::in_memory());

        let err = resolver(source.clone(), cache).resolve(&messy_query()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Timeout));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let source = ScriptedSource::new(|index| {
            if index == 0 {
                Err(FetchError::Status { status: 500, body: "boom".to_string() })
            } else {
                Err(FetchError::NotFound)
            }
        });
        let cache = Arc::new(DiskCache::in_memory());

        let err = resolver(source.clone(), cache.clone())
            .resolve(&TrackQuery::new("abc", "def"))
            .await
            .unwrap_err();

        assert_eq!(source.calls().len(), 3);
        assert_eq!(
            err.to_string(),
            "no lyrics found for abc - def: status 404: lyrics not found"
        );
        assert!(cache.get("abc", "def").is_err());
    }

    #[tokio::test]
    async fn test_validation_happens_before_io() {
        let source = ScriptedSource::new(|_| Ok(synced_payload()));
        let cache = Arc::new(DiskCache::in_memory());
        let resolver = resolver(source.clone(), cache);

        for query in [TrackQuery::new("", "Song"), TrackQuery::new("Band", ""), TrackQuery::new("   ", "Song")] {
            let err = resolver.resolve(&query).await.unwrap_err();
            assert!(matches!(err, RetrievalError::Validation(_)));
        }
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_candidate_delay() {
        let source = ScriptedSource::new(|_| Err(FetchError::NotFound));
        let cache = Arc::new(DiskCache::in_memory());
        let resolver = LyricsResolver::new(source.clone(), cache, Duration::from_secs(5))
            .with_candidate_delay(Duration::from_secs(10));

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.resolve_until(&messy_query(), tokio::time::sleep(Duration::from_millis(20))),
        )
        .await
        .expect("cancellation should end resolution promptly")
        .unwrap_err();

        assert!(matches!(err, RetrievalError::Cancelled));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_request_in_flight() {
        let source = ScriptedSource::hanging();
        let cache = Arc::new(DiskCache::in_memory());
        let resolver = LyricsResolver::new(source.clone(), cache, Duration::from_secs(30));

        let started = std::time::Instant::now();
        let err = tokio::time::timeout(
            Duration::from_secs(2),
            resolver.resolve_until(&messy_query(), tokio::time::sleep(Duration::from_millis(50))),
        )
        .await
        .expect("cancellation should abort the pending request")
        .unwrap_err();

        assert!(matches!(err, RetrievalError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_cache_write_still_returns_lyrics() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache_dir = dir.path().join("lyrics");
        let cache = Arc::new(DiskCache::open(&cache_dir));
        assert!(cache.path().is_some());

        // the directory disappears under a running cache
        std::fs::remove_dir_all(&cache_dir).unwrap();
        std::fs::write(&cache_dir, b"not a directory").unwrap();
        assert!(cache.set("Other", "Entry", LyricEntry::default()).is_err());

        let source = ScriptedSource::new(|_| Ok(synced_payload()));
        let data = resolver(source.clone(), cache)
            .resolve(&TrackQuery::new("Band", "Song"))
            .await
            .unwrap();

        assert_eq!(data.origin, LyricOrigin::Remote);
        assert_eq!(data.timed_lines().len(), 2);
        assert_eq!(source.calls().len(), 1);
    }
}
