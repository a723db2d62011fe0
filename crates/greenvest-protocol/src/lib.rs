//! Wire protocol for Greenvest.
//!
//! This crate defines what clients and the coordinator say to each other:
//!
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) — the named game events
//!   in each direction, plus the views ([`PlayerView`], [`SectorView`],
//!   [`ScoreEntry`]) they carry.
//! - **Envelopes** ([`ClientEnvelope`], [`ServerEnvelope`]) — framing with
//!   request/response correlation (`ack` ids) and server sequencing.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — bytes in, bytes out.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (envelopes) → Room coordinator (state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AckResponse, ClientEnvelope, ClientEvent, Investments, PlayerId, PlayerView, Role, RoomCode,
    ScoreEntry, SectorView, ServerEnvelope, ServerEvent, ServerPayload,
};
