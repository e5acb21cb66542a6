use bridge_traits::BridgeError;
use thiserror::Error;

use crate::types::DenialReason;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication expired")]
    AuthExpired,

    #[error("Session refresh was rate limited")]
    RefreshRateLimited,

    #[error("Session could not be refreshed")]
    RefreshUnrecoverable,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed with HTTP {status}")]
    Http { status: u16 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// Whether this error is allowed to move the session away from
    /// `Authenticated`.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, AuthError::RefreshUnrecoverable)
    }

    /// Whether retrying the same call later may succeed without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::RefreshRateLimited | AuthError::Network(_) => true,
            AuthError::Http { status } => *status >= 500,
            _ => false,
        }
    }
}

impl From<BridgeError> for AuthError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Storage(message) => AuthError::Storage(message),
            BridgeError::Io(err) => AuthError::Storage(err.to_string()),
            // Body decoding maps to `InvalidResponse` at the call site
            other => AuthError::Network(other.to_string()),
        }
    }
}

impl From<DenialReason> for AuthError {
    /// The request that triggered a denied refresh fails with the error its
    /// caller should see.
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::AlreadyInProgress | DenialReason::Cooldown => AuthError::AuthExpired,
            DenialReason::RateLimited => AuthError::RefreshRateLimited,
            DenialReason::Unrecoverable => AuthError::RefreshUnrecoverable,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unrecoverable_is_fatal() {
        assert!(AuthError::RefreshUnrecoverable.is_session_fatal());
        assert!(!AuthError::RefreshRateLimited.is_session_fatal());
        assert!(!AuthError::AuthExpired.is_session_fatal());
        assert!(!AuthError::Network("down".into()).is_session_fatal());
    }

    #[test]
    fn test_denial_mapping() {
        assert_eq!(
            AuthError::from(DenialReason::AlreadyInProgress),
            AuthError::AuthExpired
        );
        assert_eq!(AuthError::from(DenialReason::Cooldown), AuthError::AuthExpired);
        assert_eq!(
            AuthError::from(DenialReason::RateLimited),
            AuthError::RefreshRateLimited
        );
        assert_eq!(
            AuthError::from(DenialReason::Unrecoverable),
            AuthError::RefreshUnrecoverable
        );
    }

    #[test]
    fn test_bridge_error_mapping() {
        assert!(matches!(
            AuthError::from(BridgeError::Timeout("slow".into())),
            AuthError::Network(_)
        ));
        assert!(matches!(
            AuthError::from(BridgeError::Storage("locked".into())),
            AuthError::Storage(_)
        ));
    }

    #[test]
    fn test_transport_failure_is_transient_network_error() {
        let error = AuthError::from(BridgeError::OperationFailed("stream reset".into()));

        assert!(matches!(error, AuthError::Network(_)));
        assert!(error.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(AuthError::Http { status: 503 }.is_transient());
        assert!(!AuthError::Http { status: 404 }.is_transient());
        assert!(!AuthError::InvalidCredentials.is_transient());
    }
}
