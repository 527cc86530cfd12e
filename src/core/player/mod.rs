//! Player observation
//!
//! `TrackObserver` keeps the best-known view of what the external player is
//! doing. It is fed from two directions that may run concurrently:
//! - `poll()`, called by the owner on a fixed interval
//! - a background listener started by `start()` that consumes push
//!   notifications from the control surface
//!
//! Both paths mutate a single `PlayerState` under a read/write lock and turn
//! changes into `PlayerEvent`s on a small bounded queue.

pub mod mpris;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::track::TrackInfo;
use crate::error::PlayerError;

pub use mpris::MprisSurface;

/// Events beyond this many undrained ones are dropped.
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Position jumps larger than this (in seconds) against elapsed wall time count as a seek.
const SEEK_TOLERANCE_SECS: i64 = 3;

const MICROS_PER_SEC: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackStatus {
    pub fn from_mpris(status: &str) -> Self {
        match status {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }

    pub fn is_playing(self) -> bool {
        self == PlaybackStatus::Playing
    }
}

/// Asynchronous notification from the control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PropertiesChanged {
        metadata: Option<TrackInfo>,
        playback_status: Option<PlaybackStatus>,
    },
    Seeked {
        position_micros: i64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TrackChanged { track: TrackInfo, position_secs: i64 },
    Seeked { position_secs: i64 },
    PlaybackStateChanged { playing: bool },
}

/// The external playback-control surface the observer reads from.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Current track; a track without title or artist is a `PlayerError::Property`.
    async fn current_track(&self) -> Result<TrackInfo, PlayerError>;

    /// Current position in whole seconds
    async fn current_position(&self) -> Result<i64, PlayerError>;

    async fn playback_status(&self) -> Result<PlaybackStatus, PlayerError>;

    /// Subscribe to push notifications.
    async fn notifications(&self) -> Result<BoxStream<'static, Notification>, PlayerError>;
}

/// Floor-divide control-surface microseconds into seconds, clamping negatives to zero.
pub fn micros_to_secs(micros: i64) -> i64 {
    if micros <= 0 {
        0
    } else {
        micros / MICROS_PER_SEC
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerState {
    pub track: Option<TrackInfo>,
    pub position_secs: i64,
    pub playing: bool,
    last_position_update: Option<Instant>,
    last_position_secs: i64,
}

impl PlayerState {
    /// Whether `new_position` is inconsistent with normal progression since the
    /// last observed position. Approximate; near the tolerance either answer is fine.
    pub fn detect_seek_at(&self, new_position: i64, now: Instant) -> bool {
        let Some(last_update) = self.last_position_update else {
            return false;
        };

        let elapsed = now.saturating_duration_since(last_update).as_secs() as i64;
        let expected = self.last_position_secs + elapsed;
        (new_position - expected).abs() > SEEK_TOLERANCE_SECS
    }

    fn update_position(&mut self, position: i64, now: Instant) {
        self.position_secs = position;
        self.last_position_secs = position;
        self.last_position_update = Some(now);
    }
}

struct Shared {
    state: RwLock<PlayerState>,
    events: mpsc::Sender<PlayerEvent>,
}

impl Shared {
    fn write_state(&self) -> RwLockWriteGuard<'_, PlayerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_copy(&self) -> PlayerState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Non-blocking send; a full queue drops the event. Consumers can always
    /// re-derive the truth from `get_state()`.
    fn emit(&self, event: PlayerEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.events.try_send(event) {
            debug!("Player event queue full, dropping {:?}", event);
        }
    }

    fn apply_poll(&self, track: TrackInfo, position: i64, status: PlaybackStatus, now: Instant) {
        let mut events = Vec::new();
        {
            let mut state = self.write_state();
            let seek_detected = state.detect_seek_at(position, now);
            state.update_position(position, now);

            let same_track = state
                .track
                .as_ref()
                .is_some_and(|current| current.is_same_track(&track));

            if !same_track {
                state.track = Some(track.clone());
                events.push(PlayerEvent::TrackChanged {
                    track,
                    position_secs: position,
                });
            } else if seek_detected {
                events.push(PlayerEvent::Seeked {
                    position_secs: position,
                });
            }

            let playing = status.is_playing();
            if state.playing != playing {
                state.playing = playing;
                events.push(PlayerEvent::PlaybackStateChanged { playing });
            }
        }

        for event in events {
            self.emit(event);
        }
    }

    fn apply_notification(&self, notification: Notification, now: Instant) {
        let mut events = Vec::new();
        {
            let mut state = self.write_state();
            match notification {
                Notification::PropertiesChanged {
                    metadata,
                    playback_status,
                } => {
                    if let Some(track) = metadata.filter(TrackInfo::is_valid) {
                        let same_track = state
                            .track
                            .as_ref()
                            .is_some_and(|current| current.is_same_track(&track));

                        if same_track {
                            state.track = Some(track);
                        } else {
                            state.track = Some(track.clone());
                            state.update_position(0, now);
                            events.push(PlayerEvent::TrackChanged {
                                track,
                                position_secs: 0,
                            });
                        }
                    }

                    if let Some(status) = playback_status {
                        let playing = status.is_playing();
                        state.last_position_update = Some(now);
                        if state.playing != playing {
                            state.playing = playing;
                            events.push(PlayerEvent::PlaybackStateChanged { playing });
                        }
                    }
                }
                Notification::Seeked { position_micros } => {
                    if position_micros >= 0 {
                        let position = micros_to_secs(position_micros);
                        state.update_position(position, now);
                        events.push(PlayerEvent::Seeked {
                            position_secs: position,
                        });
                    }
                }
            }
        }

        for event in events {
            self.emit(event);
        }
    }
}

pub struct TrackObserver {
    surface: Arc<dyn ControlSurface>,
    shared: Arc<Shared>,
    stop_tx: watch::Sender<bool>,
    stopped: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl TrackObserver {
    /// Create an observer and the receiving end of its event queue.
    pub fn new(surface: Arc<dyn ControlSurface>) -> (Self, mpsc::Receiver<PlayerEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (stop_tx, _) = watch::channel(false);

        let observer = Self {
            surface,
            shared: Arc::new(Shared {
                state: RwLock::new(PlayerState::default()),
                events: events_tx,
            }),
            stop_tx,
            stopped: AtomicBool::new(false),
            listener: Mutex::new(None),
        };

        (observer, events_rx)
    }

    /// Spawn the background listener for push notifications.
    pub async fn start(&self) -> Result<(), PlayerError> {
        if self.stopped.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut stream = self.surface.notifications().await?;
        let shared = Arc::clone(&self.shared);
        let mut stop_rx = self.stop_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    next = stream.next() => match next {
                        Some(notification) => shared.apply_notification(notification, Instant::now()),
                        None => {
                            debug!("Player notification stream ended");
                            break;
                        }
                    },
                }
            }
        });

        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }

        Ok(())
    }

    /// Stop the listener. Only the first call has any effect.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.stop_tx.send(true);
    }

    /// Read track, position and status from the surface and fold them into
    /// the state. Errors leave the state untouched; retry on the next tick.
    pub async fn poll(&self) -> Result<(), PlayerError> {
        let track = self.surface.current_track().await?;
        let position = self.surface.current_position().await?;
        let status = self.surface.playback_status().await?;

        self.shared.apply_poll(track, position, status, Instant::now());
        Ok(())
    }

    pub fn get_state(&self) -> PlayerState {
        self.shared.state_copy()
    }

    pub fn current_track(&self) -> Option<TrackInfo> {
        self.shared.state_copy().track
    }

    pub fn current_position(&self) -> i64 {
        self.shared.state_copy().position_secs
    }
}

impl Drop for TrackObserver {
    fn drop(&mut self) {
        self.stop();
    }
}
