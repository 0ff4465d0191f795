//! Error types shared by the API layer and the turn engine.

use crate::model::TurnState;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Short text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(err) if err.is_timeout() => "The server did not answer in time".into(),
            ApiError::Transport(_) => "Could not reach the server".into(),
            ApiError::Status { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Status { status, .. } => format!("Request rejected ({status})"),
            ApiError::Decode(_) => "Unexpected response from the server".into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Roll request failed; the dice overlay has already told the player.
    #[error("dice roll failed: {0}")]
    DiceRollFailed(#[source] ApiError),
    /// The server sent a turn state this client does not know. Never recovered from.
    #[error("unknown turn state {0:?}")]
    UnknownTurnState(String),
    #[error("another turn action is already in flight")]
    ActionInFlight,
    #[error("{action} is not available in turn state {state:?}")]
    WrongTurnState {
        action: &'static str,
        state: Option<TurnState>,
    },
    #[error("current player is not loaded")]
    PlayerNotLoaded,
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}

impl ClientError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClientError::UnknownTurnState(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_state_is_fatal() {
        assert!(ClientError::UnknownTurnState("flying".into()).is_fatal());
        assert!(!ClientError::ActionInFlight.is_fatal());
        let api = ClientError::from(ApiError::Status { status: 409, message: String::new() });
        assert!(!api.is_fatal());
    }

    #[test]
    fn status_message_prefers_server_text() {
        let err = ApiError::Status { status: 400, message: "No cards to steal".into() };
        assert_eq!(err.user_message(), "No cards to steal");
        let err = ApiError::Status { status: 502, message: String::new() };
        assert_eq!(err.user_message(), "Request rejected (502)");
    }
}
