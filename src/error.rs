use thiserror::Error;

/// Main error type for blobctl operations
#[derive(Debug, Error)]
pub enum BlobctlError {
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage account name '{name}' is not available: {reason}")]
    NameUnavailable { name: String, reason: String },

    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("Usage error: {0}")]
    UsageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl BlobctlError {
    pub fn missing_dependency<S: Into<String>>(msg: S) -> Self {
        Self::MissingDependency(msg.into())
    }

    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_exists<S: Into<String>>(msg: S) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn name_unavailable<S: Into<String>>(name: S, reason: S) -> Self {
        Self::NameUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn remote<S: Into<String>>(msg: S) -> Self {
        Self::RemoteError(msg.into())
    }

    pub fn usage<S: Into<String>>(msg: S) -> Self {
        Self::UsageError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }
}

/// Result type alias for blobctl operations
pub type Result<T> = std::result::Result<T, BlobctlError>;

/// Convert Azure Core errors to BlobctlError
impl From<azure_core::Error> for BlobctlError {
    fn from(error: azure_core::Error) -> Self {
        Self::RemoteError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BlobctlError::not_found("Local file 'a.txt' does not exist");
        assert_eq!(err.to_string(), "Not found: Local file 'a.txt' does not exist");

        let err = BlobctlError::name_unavailable("taken", "AlreadyExists");
        assert!(err.to_string().contains("'taken'"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: BlobctlError = io.into();
        assert!(matches!(err, BlobctlError::IoError(_)));
    }
}
