//! Data Transfer Objects for REST request/response serialization.

pub mod attendee_dto;
pub mod event_dto;

pub use attendee_dto::*;
pub use event_dto::*;
