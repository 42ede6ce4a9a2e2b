//! Room access tokens.
//!
//! Tokens are HS256 JWTs carrying a [`RoomGrants`] claim set. The room
//! name and participant identity are bound into the grants, and the
//! publish/subscribe capabilities are enforced by the transport when a
//! connection is opened.

use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

const TOKEN_ISSUER: &str = "babel-room";

/// Capabilities granted to one participant in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomGrants {
    /// Room the token is valid for.
    pub room: String,
    /// Participant identity the token is bound to.
    pub identity: String,
    /// May publish media tracks.
    pub can_publish: bool,
    /// May subscribe to tracks and the data channel.
    pub can_subscribe: bool,
    /// May publish data-channel messages.
    pub can_publish_data: bool,
}

impl RoomGrants {
    /// Full-capability grants for a translation worker.
    #[must_use]
    pub fn worker(room: &str, identity: &str) -> Self {
        Self {
            room: room.to_string(),
            identity: identity.to_string(),
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
        }
    }

    /// Subscribe-only grants for an attendee.
    #[must_use]
    pub fn attendee(room: &str, identity: &str) -> Self {
        Self {
            room: room.to_string(),
            identity: identity.to_string(),
            can_publish: false,
            can_subscribe: true,
            can_publish_data: false,
        }
    }
}

/// Issues and verifies room access tokens with a shared HS256 secret.
#[derive(Clone)]
pub struct TokenIssuer {
    key: HS256Key,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer from the shared secret bytes.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: HS256Key::from_bytes(secret),
        }
    }

    /// Signs a token carrying `grants`, valid for `ttl_secs` seconds.
    ///
    /// # Errors
    /// Returns [`GatewayError::Internal`] if signing fails.
    pub fn issue(&self, grants: RoomGrants, ttl_secs: u64) -> Result<String, GatewayError> {
        let claims = Claims::with_custom_claims(grants, Duration::from_secs(ttl_secs))
            .with_issuer(TOKEN_ISSUER);
        self.key
            .authenticate(claims)
            .map_err(|e| GatewayError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies a token and returns its grants.
    ///
    /// Expiry is checked with zero tolerance: a token past its `exp` is
    /// rejected even one second late.
    ///
    /// # Errors
    /// Returns [`GatewayError::Authorization`] for any invalid, expired,
    /// or wrongly-issued token.
    pub fn verify(&self, token: &str) -> Result<RoomGrants, GatewayError> {
        let options = VerificationOptions {
            allowed_issuers: Some(HashSet::from_strings(&[TOKEN_ISSUER])),
            time_tolerance: Some(Duration::from_secs(0)),
            ..Default::default()
        };
        let claims = self
            .key
            .verify_token::<RoomGrants>(token, Some(options))
            .map_err(|_| GatewayError::Authorization("invalid or expired room token".to_string()))?;
        if let Some(expires_at) = claims.expires_at
            && Clock::now_since_epoch() >= expires_at
        {
            return Err(GatewayError::Authorization(
                "invalid or expired room token".to_string(),
            ));
        }
        Ok(claims.custom)
    }
}
