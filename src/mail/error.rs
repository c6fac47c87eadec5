use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    /// Name resolution, refused connection, timeout. Worth retrying.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("unrecognized date: {0:?}")]
    Date(String),

    #[error("malformed batch response: {0}")]
    Batch(String),

    #[error("interrupted")]
    Interrupted,
}

impl MailError {
    pub fn is_transient(&self) -> bool {
        matches!(self, MailError::Connection(_))
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        MailError::Api {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for MailError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            return MailError::Connection(e.to_string());
        }
        match e.status() {
            Some(status) => MailError::api(status.as_u16(), e.to_string()),
            None if e.is_decode() => MailError::Decode(e.to_string()),
            None => MailError::Connection(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for MailError {
    fn from(e: serde_json::Error) -> Self {
        MailError::Decode(e.to_string())
    }
}

pub type MailResult<T> = Result<T, MailError>;
