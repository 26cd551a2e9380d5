use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request to listening-history service failed: {0}")]
    Transport(String),
    #[error("listening-history service answered with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("listening-history service returned error {code}: {message}")]
    ApiError { code: i64, message: String },
    #[error("response body could not be parsed: {0}")]
    ResponseParse(String),
    #[error("malformed track entry #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("staging table invalid: {0}")]
    InvalidStaging(String),
    #[error("config invalid: {0}")]
    InvalidConfig(String),
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),
}
