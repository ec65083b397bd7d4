use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("no configured encoding could decode the upload")]
    DecodeFailure,

    #[error("document contains no valid text")]
    EmptyCorpus,

    #[error("corrupt encoding at bit {position}: {reason}")]
    CorruptEncoding { position: usize, reason: &'static str },

    #[error("invalid code table: {0}")]
    InvalidCodeTable(String),

    /// Absent rows and rows owned by another user both end up here.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),
}

impl AnalyticsError {
    pub fn document(id: u64) -> Self {
        AnalyticsError::NotFound { kind: "document", id }
    }

    pub fn collection(id: u64) -> Self {
        AnalyticsError::NotFound { kind: "collection", id }
    }
}

impl From<sled::Error> for AnalyticsError {
    fn from(err: sled::Error) -> Self {
        AnalyticsError::Store(err.to_string())
    }
}

impl From<bincode::Error> for AnalyticsError {
    fn from(err: bincode::Error) -> Self {
        AnalyticsError::Store(format!("codec: {err}"))
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::Config(err.to_string())
    }
}
