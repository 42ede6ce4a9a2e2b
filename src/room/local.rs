//! In-process room router.
//!
//! Reference [`RoomTransport`] implementation backed by tokio broadcast
//! channels. It enforces the same token and capability rules a remote
//! media backend would, which keeps worker and attendee code identical
//! whichever backend is plugged in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GatewayError;
use crate::protocol::{RoomMetadata, is_worker_identity};
use crate::room::token::{RoomGrants, TokenIssuer};
use crate::room::transport::{
    PublisherConnection, RoomChannels, RoomTransport, SubscriberConnection,
};

#[derive(Debug)]
struct LocalRoom {
    channels: Arc<RoomChannels>,
    metadata: RoomMetadata,
}

/// In-process [`RoomTransport`] keyed by room name.
#[derive(Debug)]
pub struct LocalRoomRouter {
    token_issuer: TokenIssuer,
    channel_capacity: usize,
    rooms: RwLock<HashMap<String, LocalRoom>>,
}

impl LocalRoomRouter {
    /// Creates a router verifying tokens with `token_issuer`.
    #[must_use]
    pub fn new(token_issuer: TokenIssuer, channel_capacity: usize) -> Self {
        Self {
            token_issuer,
            channel_capacity,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    async fn authorize(
        &self,
        room_name: &str,
        token: &str,
    ) -> Result<(RoomGrants, Arc<RoomChannels>), GatewayError> {
        let grants = self.token_issuer.verify(token)?;
        if grants.room != room_name {
            return Err(GatewayError::Authorization(
                "token is not valid for this room".to_string(),
            ));
        }
        let rooms = self.rooms.read().await;
        let room = rooms
            .get(room_name)
            .ok_or_else(|| GatewayError::NotFound(format!("room {room_name} not found")))?;
        Ok((grants, Arc::clone(&room.channels)))
    }
}

#[async_trait]
impl RoomTransport for LocalRoomRouter {
    async fn create_room(
        &self,
        room_name: &str,
        metadata: &RoomMetadata,
    ) -> Result<(), GatewayError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(room_name) {
            return Ok(());
        }
        rooms.insert(
            room_name.to_string(),
            LocalRoom {
                channels: Arc::new(RoomChannels::new(self.channel_capacity)),
                metadata: metadata.clone(),
            },
        );
        tracing::debug!(room = room_name, "room provisioned");
        Ok(())
    }

    async fn close_room(&self, room_name: &str) -> Result<(), GatewayError> {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.remove(room_name) {
            room.channels.close();
            tracing::debug!(room = room_name, "room closed");
        }
        Ok(())
    }

    async fn connect_publisher(
        &self,
        room_name: &str,
        token: &str,
    ) -> Result<PublisherConnection, GatewayError> {
        let (grants, channels) = self.authorize(room_name, token).await?;
        if !grants.can_publish && !grants.can_publish_data {
            return Err(GatewayError::Authorization(
                "token does not allow publishing".to_string(),
            ));
        }
        tracing::debug!(
            room = room_name,
            identity = %grants.identity,
            worker = is_worker_identity(&grants.identity),
            "publisher connected"
        );
        Ok(PublisherConnection::new(grants, channels))
    }

    async fn connect_subscriber(
        &self,
        room_name: &str,
        token: &str,
    ) -> Result<SubscriberConnection, GatewayError> {
        let (grants, channels) = self.authorize(room_name, token).await?;
        if !grants.can_subscribe {
            return Err(GatewayError::Authorization(
                "token does not allow subscribing".to_string(),
            ));
        }
        Ok(SubscriberConnection::new(&grants, channels))
    }

    async fn room_exists(&self, room_name: &str) -> bool {
        self.rooms.read().await.contains_key(room_name)
    }

    async fn metadata(&self, room_name: &str) -> Option<RoomMetadata> {
        self.rooms
            .read()
            .await
            .get(room_name)
            .map(|room| room.metadata.clone())
    }
}
