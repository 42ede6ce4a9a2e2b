//! Real-time room integration: access tokens, the transport trait, and
//! the in-process reference router.

mod local;
mod token;
mod transport;

pub use local::LocalRoomRouter;
pub use token::{RoomGrants, TokenIssuer};
pub use transport::{
    AudioFrame, AudioTrackReader, AudioTrackWriter, PublisherConnection, RoomChannels,
    RoomTransport, SAMPLE_RATE, SAMPLES_PER_FRAME, SubscriberConnection, SubscriberEvent,
    TrackEvent,
};
