//! Room metadata snapshot attached at provisioning time.
//!
//! The snapshot is a fallback: components inside the room prefer the live
//! configuration lookup and fall back to this metadata only when the
//! lookup is unavailable, so post-provisioning edits are still observed.

use serde::{Deserialize, Serialize};

use crate::domain::{EventId, ResolvedOutput};

/// Event configuration embedded in the room at provisioning time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMetadata {
    /// Owning event.
    pub event_id: EventId,
    /// Owning organization.
    pub org_id: String,
    /// Language spoken by presenters.
    pub source_language: String,
    /// Target-language outputs at provisioning time.
    pub outputs: Vec<ResolvedOutput>,
}

impl RoomMetadata {
    /// Encodes the snapshot as the room's metadata string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a metadata string produced by [`Self::encode`].
    ///
    /// # Errors
    /// Returns an error if the string is not a valid snapshot.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
