//! The `run` command: follow the player and print each lyric line as it
//! becomes current.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::core::lyrics::{find_current_line_index, TimedLine};
use crate::core::player::{MprisSurface, PlayerEvent, TrackObserver};
use crate::core::services::lrclib::TrackQuery;
use crate::core::services::resolver::{LyricData, LyricsResolver};
use crate::core::track::TrackInfo;
use crate::error::RetrievalError;
use crate::services::SimpleServices;
use crate::signal_handler::SignalHandler;

type Resolution = (TrackInfo, Result<LyricData, RetrievalError>);

/// What the viewer currently shows for one track.
#[derive(Debug, Default)]
struct LyricView {
    track: Option<TrackInfo>,
    lines: Vec<TimedLine>,
    offset: f64,
    current: Option<usize>,
    anchor: Option<(i64, Instant)>,
}

impl LyricView {
    fn set_track(&mut self, track: TrackInfo) {
        *self = Self {
            track: Some(track),
            ..Self::default()
        };
    }

    fn is_showing(&self, track: &TrackInfo) -> bool {
        self.track.as_ref().is_some_and(|t| t.is_same_track(track))
    }

    fn set_lyrics(&mut self, lines: Vec<TimedLine>, offset: f64) {
        self.lines = lines;
        self.offset = offset;
        self.current = None;
    }

    /// Sub-second position estimate from the whole-second player position.
    fn estimate_position(&mut self, position_secs: i64, playing: bool, now: Instant) -> f64 {
        match self.anchor {
            Some((anchored, since)) if anchored == position_secs => {
                let elapsed = if playing {
                    now.saturating_duration_since(since).as_secs_f64().min(0.999)
                } else {
                    0.0
                };
                position_secs as f64 + elapsed
            }
            _ => {
                self.anchor = Some((position_secs, now));
                position_secs as f64
            }
        }
    }

    /// The newly current line, if it changed. Past the final timestamp the
    /// last line stays current.
    fn advance(&mut self, position: f64) -> Option<&TimedLine> {
        let index = find_current_line_index(&self.lines, position + self.offset);
        if index == self.current {
            return None;
        }
        self.current = index;
        index.and_then(|i| self.lines.get(i))
    }
}

struct PendingLookup {
    _cancel: oneshot::Sender<()>,
}

fn spawn_lookup(resolver: Arc<LyricsResolver>, track: TrackInfo, results: mpsc::Sender<Resolution>) -> PendingLookup {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let query = TrackQuery::from(&track);
        // dropping the sender also cancels
        let cancelled = async {
            let _ = cancel_rx.await;
        };
        let outcome = resolver.resolve_until(&query, cancelled).await;
        if matches!(outcome, Err(RetrievalError::Cancelled)) {
            debug!("Lookup for {} - {} superseded", track.artist, track.title);
            return;
        }
        let _ = results.send((track, outcome)).await;
    });

    PendingLookup { _cancel: cancel_tx }
}

fn print_header(track: &TrackInfo) {
    println!("\n♪ {} - {}", track.artist, track.title);
}

pub async fn execute(services: &SimpleServices, shutdown: SignalHandler) -> Result<()> {
    let config = services.config();
    let resolver = Arc::new(services.create_resolver()?);

    let surface = MprisSurface::connect(&config.mpris_service)
        .await
        .context("failed to create player service")?;
    let (observer, mut events) = TrackObserver::new(Arc::new(surface));
    if let Err(e) = observer.start().await {
        eprintln!("warning: could not set up D-Bus signals: {}", e);
    }

    let (results_tx, mut results) = mpsc::channel::<Resolution>(4);
    let mut pending: Option<PendingLookup> = None;
    let mut view = LyricView::default();

    let mut ticker = tokio::time::interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Following {}", config.mpris_service);

    loop {
        tokio::select! {
            _ = shutdown.wait_for_shutdown() => break,

            _ = ticker.tick() => {
                if let Err(e) = observer.poll().await {
                    debug!("Player poll failed: {}", e);
                }
            }

            Some(event) = events.recv() => match event {
                PlayerEvent::TrackChanged { track, .. } => {
                    if !view.is_showing(&track) {
                        print_header(&track);
                        view.set_track(track.clone());
                        pending = Some(spawn_lookup(resolver.clone(), track, results_tx.clone()));
                    }
                }
                PlayerEvent::Seeked { position_secs } => {
                    debug!("Seeked to {}s", position_secs);
                    view.current = None;
                }
                PlayerEvent::PlaybackStateChanged { playing } => {
                    debug!("Playback {}", if playing { "resumed" } else { "paused" });
                }
            },

            Some((track, outcome)) = results.recv() => {
                if !view.is_showing(&track) {
                    continue;
                }
                pending = None;

                match outcome {
                    Ok(data) if data.instrumental => println!("[instrumental]"),
                    Ok(data) if data.has_synced() => {
                        view.set_lyrics(data.timed_lines(), config.sync_offset + data.sync_offset);
                    }
                    Ok(data) if !data.plain_lyrics.is_empty() => {
                        println!("(no synced lyrics)\n{}", data.plain_lyrics);
                    }
                    Ok(_) => println!("(no lyrics available)"),
                    Err(e) => println!("({})", e),
                }
            }
        }

        // the observer is the source of truth; recover from dropped events
        let state = observer.get_state();
        if let Some(track) = state.track.as_ref().filter(|t| t.is_valid()) {
            if !view.is_showing(track) {
                print_header(track);
                view.set_track(track.clone());
                pending = Some(spawn_lookup(resolver.clone(), track.clone(), results_tx.clone()));
            }
        }

        let position = view.estimate_position(state.position_secs, state.playing, Instant::now());
        if let Some(line) = view.advance(position) {
            println!("{}", line.text);
        }
    }

    drop(pending);
    observer.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lyrics::parse_synced;
    use std::time::Duration;

    fn view_with_lyrics(offset: f64) -> LyricView {
        let mut view = LyricView::default();
        view.set_track(TrackInfo::new("Song", "Band"));
        view.set_lyrics(parse_synced("[00:01.50]Hello\n[00:03.00]World"), offset);
        view
    }

    #[test]
    fn test_advance_reports_each_line_once() {
        let mut view = view_with_lyrics(0.0);

        assert!(view.advance(0.5).is_none());
        assert_eq!(view.advance(2.0).map(|l| l.text.as_str()), Some("Hello"));
        assert!(view.advance(2.5).is_none());
        assert_eq!(view.advance(3.0).map(|l| l.text.as_str()), Some("World"));
    }

    #[test]
    fn test_last_line_stays_current_past_the_end() {
        let mut view = view_with_lyrics(0.0);
        view.advance(3.5);

        assert!(view.advance(500.0).is_none());
        assert_eq!(view.current, Some(1));
    }

    #[test]
    fn test_offset_shifts_position_and_seek_back_reprints() {
        let mut view = view_with_lyrics(1.0);
        assert_eq!(view.advance(0.5).map(|l| l.text.as_str()), Some("Hello"));
        assert_eq!(view.advance(2.0).map(|l| l.text.as_str()), Some("World"));

        assert!(view.advance(-5.0).is_none());
        assert_eq!(view.current, None);
        assert_eq!(view.advance(1.0).map(|l| l.text.as_str()), Some("Hello"));
    }

    #[test]
    fn test_new_track_resets_view() {
        let mut view = view_with_lyrics(0.0);
        view.advance(2.0);

        assert!(view.is_showing(&TrackInfo::new("Song", "Band")));
        view.set_track(TrackInfo::new("Other", "Band"));
        assert!(!view.is_showing(&TrackInfo::new("Song", "Band")));
        assert!(view.lines.is_empty());
        assert_eq!(view.current, None);
        assert!(view.advance(10.0).is_none());
    }

    #[test]
    fn test_position_estimate_interpolates_while_playing() {
        let mut view = LyricView::default();
        let t0 = Instant::now();

        assert_eq!(view.estimate_position(10, true, t0), 10.0);
        let later = view.estimate_position(10, true, t0 + Duration::from_millis(400));
        assert!((later - 10.4).abs() < 1e-6);
        assert!(view.estimate_position(10, true, t0 + Duration::from_secs(5)) < 11.0);
        assert_eq!(view.estimate_position(10, false, t0 + Duration::from_millis(400)), 10.0);

        assert_eq!(view.estimate_position(42, true, t0 + Duration::from_secs(6)), 42.0);
    }
}
