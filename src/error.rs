//! Error taxonomy for the room runtime, per §7. Every variant surfaces to
//! its originating session as a single `error` message (see
//! `protocol::ServerMessage::Error`); no variant ever tears a room down.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RoomError {
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("game code {0} is already in use")]
    GameCodeConflict(String),

    #[error("no game found for code {0}")]
    GameNotFound(String),

    #[error("team name {0} is already taken")]
    NameConflict(String),

    #[error("color {0} is already taken")]
    ColorConflict(String),

    #[error("submissions are closed")]
    SubmissionClosed,

    #[error("question settings are locked once answers have been submitted")]
    SettingsLocked,

    #[error("internal error (correlation id {correlation_id}): {message}")]
    Internal {
        correlation_id: String,
        message: String,
    },
}

impl RoomError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            correlation_id: ulid::Ulid::new().to_string(),
            message: message.into(),
        }
    }
}
