//! Authentication error types.

use thiserror::Error;

use crate::gateway::ApiError;

/// Errors that can occur during login and registration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] autoparts_core::EmailError),

    /// Password left blank.
    #[error("password is required")]
    MissingPassword,

    /// Wrong email or password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The API accepted the login but issued no token.
    #[error("login response did not include a token")]
    MissingToken,

    /// Gateway error other than rejected credentials.
    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for AuthError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => Self::InvalidCredentials,
            other => Self::Api(other),
        }
    }
}
