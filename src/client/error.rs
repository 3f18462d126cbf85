use pms_core::ErrorKind;
use thiserror::Error;

/// A failed call against the backend. Never partially applied.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl NetworkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Status { status, .. } => match *status {
                404 => ErrorKind::NotFound,
                413 | 415 => ErrorKind::Upload,
                400..=499 => ErrorKind::Validation,
                _ => ErrorKind::Upstream,
            },
            Self::Transport(_) | Self::Decode(_) => ErrorKind::Upstream,
            Self::Upload(_) => ErrorKind::Upload,
            Self::InvalidRequest(_) => ErrorKind::Validation,
        }
    }

    /// The message suitable for a user-facing notice.
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Upload(message) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        let status = |status| NetworkError::Status {
            status,
            message: "x".into(),
        };
        assert_eq!(status(400).kind(), ErrorKind::Validation);
        assert_eq!(status(404).kind(), ErrorKind::NotFound);
        assert_eq!(status(413).kind(), ErrorKind::Upload);
        assert_eq!(status(500).kind(), ErrorKind::Upstream);
        assert_eq!(NetworkError::Upload("too big".into()).kind(), ErrorKind::Upload);
    }

    #[test]
    fn message_is_the_server_text() {
        let err = NetworkError::Status {
            status: 404,
            message: "Project not found".into(),
        };
        assert_eq!(err.message(), "Project not found");
        assert_eq!(err.status(), Some(404));
    }
}
