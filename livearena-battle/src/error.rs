//! Error types for livearena-battle
//!
//! Every rejection carries a structured reason. A rejected call never affects
//! the session for other participants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use livearena_common::events::BattleStatus;
use serde_json::json;
use thiserror::Error;

/// Media acquisition failure reported by the capture collaborator
///
/// Keeps the battle in Waiting; the user may fix the device and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("camera/microphone permission denied for {participant_id}")]
    PermissionDenied { participant_id: String },

    #[error("camera/microphone busy for {participant_id}; close other apps using it and retry")]
    DeviceBusy { participant_id: String },

    #[error("no camera/microphone found for {participant_id}")]
    NotFound { participant_id: String },

    #[error("media acquisition cancelled for {participant_id}")]
    Cancelled { participant_id: String },
}

/// Definitive uniqueness rejection; retrying will not help
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("you already voted in this battle (voter {voter_id})")]
    AlreadyVoted { voter_id: String },

    #[error("battle {0} already exists")]
    BattleExists(String),
}

/// Main error type for livearena-battle
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: unknown gift, non-positive quantity, bad config
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not allowed in the battle's current lifecycle state
    #[error("Invalid state: {0}")]
    State(String),

    /// Uniqueness rejection
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Media capture failure
    #[error("Media unavailable: {0}")]
    Resource(#[from] ResourceError),

    /// Wallet ledger or other collaborator failed
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Unknown battle or duet
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// livearena-common error
    #[error("Common error: {0}")]
    Common(#[from] livearena_common::Error),
}

impl Error {
    /// StateError for a mutation attempted in the wrong lifecycle state
    pub fn invalid_state(operation: &str, status: BattleStatus) -> Self {
        Error::State(format!("cannot {} while battle is {}", operation, status))
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::State(_) => "STATE_ERROR",
            Error::Conflict(ConflictError::AlreadyVoted { .. }) => "ALREADY_VOTED",
            Error::Conflict(ConflictError::BattleExists(_)) => "CONFLICT",
            Error::Resource(_) => "RESOURCE_ERROR",
            Error::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Common(_) => "COMMON_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::State(_) | Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Resource(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::ExternalService(_) => StatusCode::BAD_GATEWAY,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Config(_) | Error::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience Result type using livearena-battle Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_voted_message_is_actionable() {
        let err: Error = ConflictError::AlreadyVoted {
            voter_id: "viewer-7".to_string(),
        }
        .into();
        assert_eq!(err.code(), "ALREADY_VOTED");
        assert!(err.to_string().contains("you already voted in this battle"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_state_message() {
        let err = Error::invalid_state("vote", BattleStatus::Ended);
        assert_eq!(err.to_string(), "Invalid state: cannot vote while battle is ended");
        assert_eq!(err.code(), "STATE_ERROR");
    }

    #[test]
    fn test_resource_error_maps_to_service_unavailable() {
        let err: Error = ResourceError::DeviceBusy {
            participant_id: "host".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "RESOURCE_ERROR");
    }
}
