//! Error types for the room layer.

use greenvest_protocol::RoomCode;

/// Errors that can occur during room operations.
///
/// Only [`NotFound`](Self::NotFound), [`RoomFull`](Self::RoomFull) and
/// [`CodeSpaceExhausted`](Self::CodeSpaceExhausted) are ever shown to a
/// client; the rest are logged and the event is dropped. The first two
/// render exactly the `{error}` strings existing client scripts match on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("Room doesn't exist")]
    NotFound(RoomCode),

    /// The room already has its maximum number of players.
    #[error("Max {1} teams")]
    RoomFull(RoomCode, usize),

    /// A host-only event came from someone other than the host.
    #[error("only the host of room {0} can do that")]
    Unauthorized(RoomCode),

    /// The sender is not a player in this room.
    #[error("sender is not a player in room {0}")]
    PlayerNotFound(RoomCode),

    /// Every four-digit code is in use.
    #[error("no free room codes")]
    CodeSpaceExhausted,

    /// The coordinator task has stopped.
    #[error("room coordinator is unavailable")]
    Unavailable,
}
