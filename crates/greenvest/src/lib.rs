//! # Greenvest
//!
//! Room coordinator for a classroom green-investing game.
//!
//! A host opens a room and shares its four-digit code, teams join, the host
//! deals secret roles and drives the game, and the server scores everyone at
//! the end. All room state lives in one coordinator task; this crate wires
//! it to WebSocket clients.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use greenvest::prelude::*;
//!
//! # async fn run() -> Result<(), GreenvestError> {
//! let server = GreenvestServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::GreenvestError;
pub use server::{GreenvestServer, GreenvestServerBuilder};

pub mod prelude {
    pub use crate::{GreenvestError, GreenvestServer, GreenvestServerBuilder, ServerConfig};
    pub use greenvest_protocol::{
        AckResponse, ClientEnvelope, ClientEvent, Codec, JsonCodec, PlayerId, PlayerView, Role,
        RoomCode, ScoreEntry, SectorView, ServerEnvelope, ServerEvent, ServerPayload,
    };
    pub use greenvest_room::{CoordinatorHandle, RoomConfig, RoomError, RoomInfo, RoomPhase};
}
