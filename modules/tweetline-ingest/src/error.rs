use thiserror::Error;

/// Why a single raw record could not be turned into a canonical entity.
/// Scoped to that record; pagination carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Malformed record: missing or empty {field}")]
    MalformedRecord { field: &'static str },

    #[error("Undecodable record: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for NormalizeError {
    fn from(err: serde_json::Error) -> Self {
        NormalizeError::Decode(err.to_string())
    }
}

/// Failure reported by the injected fetcher. Ends the pagination session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Platform rejected request: {0}")]
    Platform(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Request timed out")]
    Timeout,
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// The failure half of a result entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// One record on a page failed to normalize.
    #[error("item {index} of page {page} (cursor {cursor:?}) failed: {source}")]
    Item {
        page: usize,
        index: usize,
        cursor: String,
        source: NormalizeError,
    },

    /// The fetcher failed; this is always the last entry of its stream.
    #[error("fetching page {page} (cursor {cursor:?}) failed: {source}")]
    Session {
        page: usize,
        cursor: String,
        source: FetchError,
    },
}

impl EntryError {
    pub fn is_session_level(&self) -> bool {
        matches!(self, EntryError::Session { .. })
    }
}
