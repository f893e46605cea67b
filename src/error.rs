use thiserror::Error;

/// Library error type for noir-frame operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The search service answered with an `{error: {code, message}}` body.
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },

    /// Non-success HTTP status without a structured error body.
    #[error("unexpected http status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Endpoint or path could not be turned into a request URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Transport-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Fetched bytes could not be decoded as an image.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error for API payloads or persisted state.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
