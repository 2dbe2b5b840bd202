use thiserror::Error;

/// Failures talking to one of the remote sources.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status code: {0}")]
    Status(u16),
}

/// A payload arrived but its structure could not be understood.
#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("xml feed parse error: {0}")]
    Xml(#[from] feed_rs::parser::ParseFeedError),
    #[error("description of '{item}' is malformed: {reason}")]
    Html { item: String, reason: String },
    #[error("json payload parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// User-supplied input rejected before anything touches the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("user id '{0}' contains characters that are not allowed")]
    InvalidUserId(String),
    #[error("'{0}' is not a date in YYYY-MM-DD form")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    FeedParse(#[from] FeedParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(NetworkError::Transport(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
