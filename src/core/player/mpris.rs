//! MPRIS control surface over the D-Bus session bus

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;
use tracing::{debug, warn};
use zbus::fdo::{DBusProxy, PropertiesChanged, PropertiesProxy};
use zbus::names::InterfaceName;
use zbus::{Connection, Proxy};
use zvariant::{OwnedValue, Value};

use super::{ControlSurface, Notification, PlaybackStatus, micros_to_secs};
use crate::core::track::TrackInfo;
use crate::error::PlayerError;

pub const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
pub const MPRIS_BUS_PREFIX: &str = "org.mpris.MediaPlayer2.";
const ROOT_INTERFACE: &str = "org.mpris.MediaPlayer2";
const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

type Metadata = HashMap<String, OwnedValue>;

/// A player reachable on the session bus.
#[derive(Debug, Clone)]
pub struct PlayerEntry {
    pub service: String,
    pub identity: Option<String>,
}

pub struct MprisSurface {
    connection: Connection,
    service: String,
    properties: PropertiesProxy<'static>,
}

impl MprisSurface {
    pub async fn connect(service: &str) -> Result<Self, PlayerError> {
        let connection = session_bus().await?;
        Self::with_connection(connection, service).await
    }

    pub async fn with_connection(connection: Connection, service: &str) -> Result<Self, PlayerError> {
        if service.is_empty() {
            return Err(PlayerError::Connection("no MPRIS service name given".to_string()));
        }

        let properties = PropertiesProxy::builder(&connection)
            .destination(service.to_string())?
            .path(MPRIS_PATH)?
            .build()
            .await?;

        debug!("Attached to MPRIS service {}", service);
        Ok(Self {
            connection,
            service: service.to_string(),
            properties,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// The player's human-readable `Identity`, when it publishes one.
    pub async fn identity(&self) -> Result<Option<String>, PlayerError> {
        player_identity(&self.connection, self.service()).await
    }

    async fn player_property(&self, name: &str) -> Result<OwnedValue, PlayerError> {
        let value = self
            .properties
            .get(InterfaceName::from_static_str_unchecked(PLAYER_INTERFACE), name)
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl ControlSurface for MprisSurface {
    async fn current_track(&self) -> Result<TrackInfo, PlayerError> {
        let value = self.player_property("Metadata").await?;
        let metadata = metadata_from_value(&value).ok_or_else(|| PlayerError::Property {
            property: "Metadata".to_string(),
            reason: "not a string-keyed dictionary".to_string(),
        })?;

        let track = track_from_metadata(&metadata);
        if !track.is_valid() {
            return Err(PlayerError::Property {
                property: "Metadata".to_string(),
                reason: "missing title or artist".to_string(),
            });
        }
        Ok(track)
    }

    async fn current_position(&self) -> Result<i64, PlayerError> {
        let value = self.player_property("Position").await?;
        match int_value(&value) {
            Some(micros) => Ok(micros_to_secs(micros)),
            None => Err(PlayerError::Property {
                property: "Position".to_string(),
                reason: format!("unexpected type {}", value.value_signature()),
            }),
        }
    }

    async fn playback_status(&self) -> Result<PlaybackStatus, PlayerError> {
        let value = self.player_property("PlaybackStatus").await?;
        match unwrap_variant(&value) {
            Value::Str(status) => Ok(PlaybackStatus::from_mpris(status.as_str())),
            other => Err(PlayerError::Property {
                property: "PlaybackStatus".to_string(),
                reason: format!("unexpected type {}", other.value_signature()),
            }),
        }
    }

    async fn notifications(&self) -> Result<BoxStream<'static, Notification>, PlayerError> {
        let changes = self
            .properties
            .receive_properties_changed()
            .await?
            .filter_map(|signal| async move { properties_notification(&signal) });

        let player = Proxy::new(
            &self.connection,
            self.service.clone(),
            MPRIS_PATH,
            PLAYER_INTERFACE,
        )
        .await?;
        let seeks = player
            .receive_signal("Seeked")
            .await?
            .filter_map(|message| async move {
                match message.body().deserialize::<i64>() {
                    Ok(position_micros) => Some(Notification::Seeked { position_micros }),
                    Err(e) => {
                        warn!("Ignoring malformed Seeked signal: {}", e);
                        None
                    }
                }
            });

        Ok(futures::stream::select(changes, seeks).boxed())
    }
}

pub async fn session_bus() -> Result<Connection, PlayerError> {
    Connection::session()
        .await
        .map_err(|e| PlayerError::Connection(format!("failed to connect to session bus: {}", e)))
}

/// Every MPRIS player currently on the session bus, with its `Identity` when it has one.
pub async fn list_players(connection: &Connection) -> Result<Vec<PlayerEntry>, PlayerError> {
    let dbus = DBusProxy::new(connection).await?;
    let mut players = Vec::new();

    for name in dbus.list_names().await? {
        let service = name.as_str();
        if !service.starts_with(MPRIS_BUS_PREFIX) {
            continue;
        }

        let identity = match player_identity(connection, service).await {
            Ok(identity) => identity,
            Err(e) => {
                debug!("No identity for {}: {}", service, e);
                None
            }
        };

        players.push(PlayerEntry {
            service: service.to_string(),
            identity,
        });
    }

    players.sort_by(|a, b| a.service.cmp(&b.service));
    Ok(players)
}

async fn player_identity(connection: &Connection, service: &str) -> Result<Option<String>, PlayerError> {
    let properties = PropertiesProxy::builder(connection)
        .destination(service.to_string())?
        .path(MPRIS_PATH)?
        .build()
        .await?;
    let value = properties
        .get(InterfaceName::from_static_str_unchecked(ROOT_INTERFACE), "Identity")
        .await?;
    Ok(string_value(&value))
}

fn properties_notification(signal: &PropertiesChanged) -> Option<Notification> {
    let args = signal.args().ok()?;
    if args.interface_name().as_str() != PLAYER_INTERFACE {
        return None;
    }

    let changed = args.changed_properties();
    let metadata = changed
        .get("Metadata")
        .and_then(|value| value.try_to_owned().ok())
        .and_then(|value| metadata_from_value(&value))
        .map(|metadata| track_from_metadata(&metadata));
    let playback_status = changed.get("PlaybackStatus").and_then(|value| match unwrap_variant(value) {
        Value::Str(status) => Some(PlaybackStatus::from_mpris(status.as_str())),
        _ => None,
    });

    if metadata.is_none() && playback_status.is_none() {
        return None;
    }
    Some(Notification::PropertiesChanged {
        metadata,
        playback_status,
    })
}

fn metadata_from_value(value: &OwnedValue) -> Option<Metadata> {
    let value = value.try_clone().ok()?;
    Metadata::try_from(value).ok()
}

/// Build a track from an `a{sv}` metadata map. Entries of the wrong type are
/// treated as absent.
pub fn track_from_metadata(metadata: &Metadata) -> TrackInfo {
    TrackInfo {
        title: metadata.get("xesam:title").and_then(string_value).unwrap_or_default(),
        artist: metadata.get("xesam:artist").and_then(first_string).unwrap_or_default(),
        album: metadata.get("xesam:album").and_then(string_value),
        duration_secs: metadata
            .get("mpris:length")
            .and_then(|value| int_value(value))
            .filter(|micros| *micros > 0)
            .map(|micros| micros_to_secs(micros) as u64),
        artwork_url: metadata.get("mpris:artUrl").and_then(string_value),
        track_id: metadata.get("mpris:trackid").and_then(string_value),
    }
}

fn unwrap_variant<'a>(value: &'a Value<'a>) -> &'a Value<'a> {
    match value {
        Value::Value(inner) => unwrap_variant(inner),
        other => other,
    }
}

fn string_value(value: &OwnedValue) -> Option<String> {
    let text = match unwrap_variant(value) {
        Value::Str(s) => s.as_str().to_string(),
        Value::ObjectPath(path) => path.as_str().to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// `xesam:artist` is a list; the first entry is the primary artist.
fn first_string(value: &OwnedValue) -> Option<String> {
    match unwrap_variant(value) {
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::Str(s) if !s.as_str().is_empty() => Some(s.as_str().to_string()),
            _ => None,
        }),
        _ => string_value(value),
    }
}

fn int_value(value: &Value<'_>) -> Option<i64> {
    match unwrap_variant(value) {
        Value::I64(n) => Some(*n),
        Value::U64(n) => i64::try_from(*n).ok(),
        Value::I32(n) => Some(i64::from(*n)),
        Value::U32(n) => Some(i64::from(*n)),
        _ => None,
    }
}
