use thiserror::Error;

/// Failure of a ticketing API call.
///
/// Non-2xx responses keep their HTTP status so callers can distinguish
/// contention (4xx, e.g. a seat already held) from upstream trouble (5xx).
#[derive(Error, Debug)]
pub enum TicketingError {
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TicketingError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TicketingError::Api { status, .. } => Some(*status),
            TicketingError::Transport(e) => e.status().map(|s| s.as_u16()),
            TicketingError::Decode(_) => None,
        }
    }

    pub fn is_status(&self, code: u16) -> bool {
        self.status_code() == Some(code)
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status_code(), Some(code) if (400..500).contains(&code))
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.status_code(), Some(code) if (500..600).contains(&code))
    }
}
