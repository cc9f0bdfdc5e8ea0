use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NO_ACTIVE_SESSION: no daemon is listening")]
    NoActiveSession,
    #[error("DAEMON_START_TIMEOUT: daemon did not become reachable")]
    DaemonStartTimeout,
    #[error("EMPTY_STORE: list is empty")]
    EmptyStore,
    #[error("INVALID_SELECTOR: {0}")]
    InvalidSelector(String),
    #[error("NOT_FOUND: note with ID {0} not found")]
    NotFound(i64),
    #[error("SESSION_ENDED: {0}")]
    SessionEnded(String),
    #[error("ALREADY_RUNNING: {0}")]
    AlreadyRunning(String),
    #[error("PROTOCOL: {0}")]
    Protocol(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

/// Wire-level tag for an [`AppError`], so the client can rebuild the same
/// variant the daemon produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoActiveSession,
    DaemonStartTimeout,
    EmptyStore,
    InvalidSelector,
    NotFound,
    SessionEnded,
    AlreadyRunning,
    Protocol,
    Io,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoActiveSession => ErrorKind::NoActiveSession,
            Self::DaemonStartTimeout => ErrorKind::DaemonStartTimeout,
            Self::EmptyStore => ErrorKind::EmptyStore,
            Self::InvalidSelector(_) => ErrorKind::InvalidSelector,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SessionEnded(_) => ErrorKind::SessionEnded,
            Self::AlreadyRunning(_) => ErrorKind::AlreadyRunning,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Io(_) => ErrorKind::Io,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Payload carried next to the kind on the wire.
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidSelector(detail)
            | Self::SessionEnded(detail)
            | Self::AlreadyRunning(detail)
            | Self::Protocol(detail)
            | Self::Io(detail)
            | Self::Internal(detail) => detail.clone(),
            Self::NotFound(id) => id.to_string(),
            Self::NoActiveSession | Self::DaemonStartTimeout | Self::EmptyStore => String::new(),
        }
    }

    pub fn from_wire(kind: ErrorKind, detail: String) -> Self {
        match kind {
            ErrorKind::NoActiveSession => Self::NoActiveSession,
            ErrorKind::DaemonStartTimeout => Self::DaemonStartTimeout,
            ErrorKind::EmptyStore => Self::EmptyStore,
            ErrorKind::InvalidSelector => Self::InvalidSelector(detail),
            ErrorKind::NotFound => match detail.parse::<i64>() {
                Ok(id) => Self::NotFound(id),
                Err(_) => Self::Protocol(format!("bad not_found detail: {}", detail)),
            },
            ErrorKind::SessionEnded => Self::SessionEnded(detail),
            ErrorKind::AlreadyRunning => Self::AlreadyRunning(detail),
            ErrorKind::Protocol => Self::Protocol(detail),
            ErrorKind::Io => Self::Io(detail),
            ErrorKind::Internal => Self::Internal(detail),
        }
    }

    /// Selector failures are ordinary outcomes, not faults.
    pub fn is_selector_error(&self) -> bool {
        matches!(self, Self::EmptyStore | Self::InvalidSelector(_) | Self::NotFound(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Protocol(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::{AppError, ErrorKind};

    #[test]
    fn wire_round_trip_keeps_variant() {
        let original = AppError::NotFound(7);
        let rebuilt = AppError::from_wire(original.kind(), original.detail());
        assert!(matches!(rebuilt, AppError::NotFound(7)));

        let rebuilt = AppError::from_wire(ErrorKind::InvalidSelector, "abc".to_string());
        assert!(matches!(rebuilt, AppError::InvalidSelector(ref s) if s == "abc"));
    }

    #[test]
    fn malformed_not_found_detail_is_protocol_error() {
        let rebuilt = AppError::from_wire(ErrorKind::NotFound, "seven".to_string());
        assert!(matches!(rebuilt, AppError::Protocol(_)));
    }

    #[test]
    fn selector_errors_are_classified() {
        assert!(AppError::EmptyStore.is_selector_error());
        assert!(AppError::NotFound(2).is_selector_error());
        assert!(!AppError::NoActiveSession.is_selector_error());
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DaemonStartTimeout).expect("serialize");
        assert_eq!(json, "\"daemon_start_timeout\"");
    }
}
