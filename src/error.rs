use thiserror::Error;

/// Message shown when the service could not be reached or gave no usable error body.
pub const TRANSPORT_FAILURE_MESSAGE: &str =
    "Translation failed. The server or the translation API ran into a problem.";

/// Message shown when the service returned a JSON error without a usable `detail`.
pub const UNKNOWN_SERVICE_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Error, Debug)]
pub enum SubtransError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, SubtransError>;

/// Rejections raised while taking in a candidate file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("Unsupported format '{0}'. Please select a valid subtitle file (.srt, .vtt, .ass).")]
    UnsupportedFormat(String),
}

/// Preconditions of `submit` that were not met. None of these reach the network.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your translation API key.")]
    MissingCredential,

    #[error("Please select a subtitle file.")]
    MissingFile,

    #[error("A translation is already in progress.")]
    AlreadyInProgress,

    #[error("A translated file is ready. Reset or select a new file before translating again.")]
    ResultPending,
}

impl ValidationError {
    /// Whether this rejection is reported through the session's error slot.
    ///
    /// Only missing inputs are; the lock-out variants leave state alone.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::MissingFile)
    }
}

/// Why a submitted translation did not produce a file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationFailure {
    /// The service was unreachable, timed out, or answered without a JSON error body.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with a JSON error body.
    #[error("service failure (status {status}): {}", detail.as_deref().unwrap_or("<no detail>"))]
    Service { status: u16, detail: Option<String> },
}

impl TranslationFailure {
    /// Text surfaced to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => TRANSPORT_FAILURE_MESSAGE.to_string(),
            Self::Service { detail: Some(detail), .. } if !detail.is_empty() => detail.clone(),
            Self::Service { .. } => UNKNOWN_SERVICE_ERROR_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_detail_is_surfaced_verbatim() {
        let failure = TranslationFailure::Service {
            status: 401,
            detail: Some("invalid key".to_string()),
        };
        assert_eq!(failure.user_message(), "invalid key");
    }

    #[test]
    fn test_missing_or_empty_detail_falls_back() {
        let missing = TranslationFailure::Service { status: 500, detail: None };
        let empty = TranslationFailure::Service { status: 500, detail: Some(String::new()) };
        assert_eq!(missing.user_message(), UNKNOWN_SERVICE_ERROR_MESSAGE);
        assert_eq!(empty.user_message(), UNKNOWN_SERVICE_ERROR_MESSAGE);
    }

    #[test]
    fn test_transport_hides_cause() {
        let failure = TranslationFailure::Transport("connection refused".to_string());
        assert_eq!(failure.user_message(), TRANSPORT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_only_missing_inputs_are_reported() {
        assert!(ValidationError::MissingCredential.is_reported());
        assert!(ValidationError::MissingFile.is_reported());
        assert!(!ValidationError::AlreadyInProgress.is_reported());
        assert!(!ValidationError::ResultPending.is_reported());
    }
}
