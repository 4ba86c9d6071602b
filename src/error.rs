use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Failed to open authentication window. Please check your popup blocker settings.")]
    PopupBlocked,
    #[error("A GitHub login is already in progress")]
    LoginInProgress,
    #[error("Authentication window was closed")]
    WindowClosed,
    #[error("Authentication window timed out")]
    TimedOut,
    #[error("{0}")]
    Callback(String),
    #[error("OAuth state mismatch")]
    StateMismatch,
    #[error("No code received in callback")]
    MissingCode,
    #[error("{operation} failed ({status}): {detail}")]
    Remote {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[cfg(feature = "client")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True when the user abandoned the login (popup closed or timed out).
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::WindowClosed | Self::TimedOut)
    }
}
