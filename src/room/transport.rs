//! Transport abstraction over the real-time room backend.
//!
//! The gateway never talks to a media backend directly: provisioning,
//! teardown, and participant connections all go through [`RoomTransport`].
//! Connections are capability-checked against the [`RoomGrants`] carried
//! by the presented token, so a subscribe-only attendee token cannot be
//! used to publish.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast, watch};

use crate::error::GatewayError;
use crate::protocol::{AUDIO_TRACK_PREFIX, RoomMessage, RoomMetadata};
use crate::room::token::RoomGrants;

/// Audio sample rate used for all published tracks, in hertz.
pub const SAMPLE_RATE: u32 = 48_000;
/// Samples per PCM frame (10 ms of mono audio at [`SAMPLE_RATE`]).
pub const SAMPLES_PER_FRAME: usize = 480;

/// One frame of mono 16-bit PCM audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// PCM samples, [`SAMPLES_PER_FRAME`] per frame.
    pub samples: Vec<i16>,
}

impl AudioFrame {
    /// A frame of silence.
    #[must_use]
    pub fn silence() -> Self {
        Self {
            samples: vec![0; SAMPLES_PER_FRAME],
        }
    }
}

/// Track lifecycle notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    /// A participant published an audio track.
    Published {
        /// Identity of the publishing participant.
        participant_identity: String,
        /// Published track name.
        track_name: String,
    },
    /// A participant withdrew a previously published track.
    Unpublished {
        /// Identity of the unpublishing participant.
        participant_identity: String,
        /// Withdrawn track name.
        track_name: String,
    },
}

/// Shared in-room channel fabric, one per provisioned room.
#[derive(Debug)]
pub struct RoomChannels {
    data: broadcast::Sender<RoomMessage>,
    tracks: RwLock<HashMap<String, broadcast::Sender<AudioFrame>>>,
    track_events: broadcast::Sender<TrackEvent>,
    source_audio: broadcast::Sender<AudioFrame>,
    source_live: watch::Sender<bool>,
    closed: watch::Sender<bool>,
}

impl RoomChannels {
    /// Creates the fabric with the given data-channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (data, _) = broadcast::channel(capacity);
        let (track_events, _) = broadcast::channel(64);
        let (source_audio, _) = broadcast::channel(256);
        let (source_live, _) = watch::channel(false);
        let (closed, _) = watch::channel(false);
        Self {
            data,
            tracks: RwLock::new(HashMap::new()),
            track_events,
            source_audio,
            source_live,
            closed,
        }
    }

    /// Marks the room closed, waking all participants.
    pub fn close(&self) {
        let _ = self.closed.send(true);
    }

    /// Whether the room has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Writer side of a published audio track.
#[derive(Debug)]
pub struct AudioTrackWriter {
    tx: broadcast::Sender<AudioFrame>,
}

impl AudioTrackWriter {
    /// Pushes one frame to the track. Frames published while no one is
    /// subscribed are dropped, matching live-media semantics.
    pub fn write(&self, frame: AudioFrame) {
        let _ = self.tx.send(frame);
    }
}

/// Reader side of a subscribed audio track.
#[derive(Debug)]
pub struct AudioTrackReader {
    rx: broadcast::Receiver<AudioFrame>,
}

impl AudioTrackReader {
    /// Receives the next frame. Returns `None` once the publisher is gone.
    /// Frames missed under backpressure are skipped, not replayed.
    pub async fn recv(&mut self) -> Option<AudioFrame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// A participant connection with publish capabilities.
#[derive(Debug)]
pub struct PublisherConnection {
    identity: String,
    grants: RoomGrants,
    channels: Arc<RoomChannels>,
    data_rx: broadcast::Receiver<RoomMessage>,
    closed_rx: watch::Receiver<bool>,
}

impl PublisherConnection {
    pub(crate) fn new(grants: RoomGrants, channels: Arc<RoomChannels>) -> Self {
        let data_rx = channels.data.subscribe();
        let closed_rx = channels.closed.subscribe();
        Self {
            identity: grants.identity.clone(),
            grants,
            channels,
            data_rx,
            closed_rx,
        }
    }

    /// Participant identity bound by the token.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Publishes a message on the reliable data channel.
    ///
    /// # Errors
    /// Returns [`GatewayError::Authorization`] when the token lacks the
    /// data-publish capability.
    pub fn publish_data(&self, msg: RoomMessage) -> Result<(), GatewayError> {
        if !self.grants.can_publish_data {
            return Err(GatewayError::Authorization(
                "token does not allow publishing data".to_string(),
            ));
        }
        let _ = self.channels.data.send(msg);
        Ok(())
    }

    /// Receives the next data-channel message, including this
    /// participant's own. Returns `None` when the room is gone.
    pub async fn recv_data(&mut self) -> Option<RoomMessage> {
        loop {
            match self.data_rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Publishes an audio track under `track_name`.
    ///
    /// Tracks not named with the translation prefix count as source audio:
    /// they feed the room's shared source-audio channel and flip the
    /// source-audio-live signal.
    ///
    /// # Errors
    /// Returns [`GatewayError::Authorization`] when the token lacks the
    /// publish capability.
    pub async fn publish_audio_track(
        &self,
        track_name: &str,
    ) -> Result<AudioTrackWriter, GatewayError> {
        if !self.grants.can_publish {
            return Err(GatewayError::Authorization(
                "token does not allow publishing tracks".to_string(),
            ));
        }
        let is_source = !track_name.starts_with(AUDIO_TRACK_PREFIX);
        let tx = {
            let mut tracks = self.channels.tracks.write().await;
            tracks
                .entry(track_name.to_string())
                .or_insert_with(|| {
                    if is_source {
                        self.channels.source_audio.clone()
                    } else {
                        broadcast::channel(256).0
                    }
                })
                .clone()
        };
        if is_source {
            let _ = self.channels.source_live.send(true);
        }
        let _ = self.channels.track_events.send(TrackEvent::Published {
            participant_identity: self.identity.clone(),
            track_name: track_name.to_string(),
        });
        Ok(AudioTrackWriter { tx })
    }

    /// Withdraws a previously published track, notifying subscribers.
    /// Unpublishing a track that was never published is a no-op.
    ///
    /// # Errors
    /// Returns [`GatewayError::Authorization`] when the token lacks the
    /// publish capability.
    pub async fn unpublish_track(&self, track_name: &str) -> Result<(), GatewayError> {
        if !self.grants.can_publish {
            return Err(GatewayError::Authorization(
                "token does not allow publishing tracks".to_string(),
            ));
        }
        let removed = {
            let mut tracks = self.channels.tracks.write().await;
            tracks.remove(track_name).is_some()
        };
        if !removed {
            return Ok(());
        }
        if !track_name.starts_with(AUDIO_TRACK_PREFIX) {
            let _ = self.channels.source_live.send(false);
        }
        let _ = self.channels.track_events.send(TrackEvent::Unpublished {
            participant_identity: self.identity.clone(),
            track_name: track_name.to_string(),
        });
        Ok(())
    }

    /// Pushes one frame of source audio without publishing a named track.
    ///
    /// # Errors
    /// Returns [`GatewayError::Authorization`] when the token lacks the
    /// publish capability.
    pub fn publish_source_audio(&self, frame: AudioFrame) -> Result<(), GatewayError> {
        if !self.grants.can_publish {
            return Err(GatewayError::Authorization(
                "token does not allow publishing tracks".to_string(),
            ));
        }
        if !*self.channels.source_live.borrow() {
            let _ = self.channels.source_live.send(true);
        }
        let _ = self.channels.source_audio.send(frame);
        Ok(())
    }

    /// A reader over the room's source audio, regardless of which
    /// participant publishes it.
    #[must_use]
    pub fn source_audio(&self) -> AudioTrackReader {
        AudioTrackReader {
            rx: self.channels.source_audio.subscribe(),
        }
    }

    /// Waits until some participant has published source audio, up to
    /// `timeout`. Returns whether source audio is live.
    pub async fn wait_for_source_audio(&self, timeout: std::time::Duration) -> bool {
        let mut rx = self.channels.source_live.subscribe();
        if *rx.borrow() {
            return true;
        }
        tokio::time::timeout(timeout, async {
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false)
    }

    /// A watch that flips to `true` when the room closes.
    #[must_use]
    pub fn closed_watch(&self) -> watch::Receiver<bool> {
        self.closed_rx.clone()
    }

    /// Resolves when the room is closed.
    pub async fn closed(&mut self) {
        if *self.closed_rx.borrow() {
            return;
        }
        while self.closed_rx.changed().await.is_ok() {
            if *self.closed_rx.borrow() {
                return;
            }
        }
    }
}

/// Anything a subscriber can observe from the room.
#[derive(Debug, Clone)]
pub enum SubscriberEvent {
    /// A data-channel message.
    Data(RoomMessage),
    /// A track lifecycle notification.
    Track(TrackEvent),
    /// The room closed.
    Closed,
}

/// A subscribe-only participant connection.
#[derive(Debug)]
pub struct SubscriberConnection {
    identity: String,
    channels: Arc<RoomChannels>,
    data_rx: broadcast::Receiver<RoomMessage>,
    track_events_rx: broadcast::Receiver<TrackEvent>,
    closed_rx: watch::Receiver<bool>,
}

impl SubscriberConnection {
    pub(crate) fn new(grants: &RoomGrants, channels: Arc<RoomChannels>) -> Self {
        let data_rx = channels.data.subscribe();
        let track_events_rx = channels.track_events.subscribe();
        let closed_rx = channels.closed.subscribe();
        Self {
            identity: grants.identity.clone(),
            channels,
            data_rx,
            track_events_rx,
            closed_rx,
        }
    }

    /// Participant identity bound by the token.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Receives the next data-channel message. Returns `None` when the
    /// room is gone.
    pub async fn recv_data(&mut self) -> Option<RoomMessage> {
        loop {
            match self.data_rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receives the next observable event of any kind: data message,
    /// track notification, or room closure. Lagged streams skip ahead.
    pub async fn recv_any(&mut self) -> SubscriberEvent {
        loop {
            tokio::select! {
                msg = self.data_rx.recv() => match msg {
                    Ok(msg) => return SubscriberEvent::Data(msg),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return SubscriberEvent::Closed,
                },
                ev = self.track_events_rx.recv() => match ev {
                    Ok(ev) => return SubscriberEvent::Track(ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return SubscriberEvent::Closed,
                },
                changed = self.closed_rx.changed() => {
                    if changed.is_err() || *self.closed_rx.borrow() {
                        return SubscriberEvent::Closed;
                    }
                }
            }
        }
    }

    /// Receives the next track lifecycle event.
    pub async fn recv_track_event(&mut self) -> Option<TrackEvent> {
        loop {
            match self.track_events_rx.recv().await {
                Ok(ev) => return Some(ev),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Subscribes to a published track by name, or `None` if no such
    /// track has been published yet.
    pub async fn subscribe_track(&self, track_name: &str) -> Option<AudioTrackReader> {
        let tracks = self.channels.tracks.read().await;
        tracks
            .get(track_name)
            .map(|tx| AudioTrackReader { rx: tx.subscribe() })
    }

    /// A watch that flips to `true` when the room closes.
    #[must_use]
    pub fn closed_watch(&self) -> watch::Receiver<bool> {
        self.closed_rx.clone()
    }

    /// Resolves when the room is closed.
    pub async fn closed(&mut self) {
        if *self.closed_rx.borrow() {
            return;
        }
        while self.closed_rx.changed().await.is_ok() {
            if *self.closed_rx.borrow() {
                return;
            }
        }
    }
}

/// Provisioning and connection surface of the room backend.
#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// Creates a room carrying the metadata snapshot. Idempotent: calling
    /// it again for an existing room succeeds without resetting state.
    async fn create_room(
        &self,
        room_name: &str,
        metadata: &RoomMetadata,
    ) -> Result<(), GatewayError>;

    /// Tears a room down, disconnecting all participants. Idempotent:
    /// closing an unknown room succeeds.
    async fn close_room(&self, room_name: &str) -> Result<(), GatewayError>;

    /// Opens a publisher connection after verifying `token` against the
    /// room.
    async fn connect_publisher(
        &self,
        room_name: &str,
        token: &str,
    ) -> Result<PublisherConnection, GatewayError>;

    /// Opens a subscriber connection after verifying `token` against the
    /// room.
    async fn connect_subscriber(
        &self,
        room_name: &str,
        token: &str,
    ) -> Result<SubscriberConnection, GatewayError>;

    /// Whether the room currently exists.
    async fn room_exists(&self, room_name: &str) -> bool;

    /// The metadata snapshot attached at provisioning time.
    async fn metadata(&self, room_name: &str) -> Option<RoomMetadata>;
}
