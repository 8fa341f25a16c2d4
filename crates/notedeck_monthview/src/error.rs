use std::io;

/// Month view related errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// Errors reported by a [`crate::CalendarService`] fetch.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("calendar source unavailable: {0}")]
    Unavailable(String),

    /// The fetch was dropped before it produced a result
    #[error("fetch cancelled")]
    Cancelled,
}

impl Error {
    pub fn invalid_setting(msg: impl Into<String>) -> Self {
        Error::InvalidSetting(msg.into())
    }
}
