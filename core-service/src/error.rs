use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Service initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),
}

impl From<bridge_traits::BridgeError> for ServiceError {
    fn from(err: bridge_traits::BridgeError) -> Self {
        ServiceError::InitializationFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
