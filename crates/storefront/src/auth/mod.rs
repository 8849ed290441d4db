//! Authentication against the REST API.
//!
//! The API issues the bearer token; this module only forwards credentials
//! and hands the result to the [`SessionStore`].

mod error;

pub use error::AuthError;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{info, instrument};

use autoparts_core::{Email, Role};

use crate::gateway::Gateway;
use crate::session::{Session, SessionStore};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    #[serde(serialize_with = "expose")]
    password: &'a SecretString,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

/// New account details sent to `POST /api/users/register`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    #[serde(serialize_with = "expose")]
    pub password: SecretString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Login and registration.
#[derive(Clone)]
pub struct AuthClient {
    gateway: Gateway,
    sessions: Arc<SessionStore>,
}

impl AuthClient {
    #[must_use]
    pub const fn new(gateway: Gateway, sessions: Arc<SessionStore>) -> Self {
        Self { gateway, sessions }
    }

    /// Exchange credentials for a token and start a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingPassword`
    /// before any request is made, `AuthError::InvalidCredentials` on 401,
    /// and `AuthError::Api` for any other gateway failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session, AuthError> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::MissingPassword);
        }

        let request = LoginRequest {
            email: email.as_str(),
            password,
        };
        let response: LoginResponse = self.gateway.post_json("/api/users/login", &request).await?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let role = Role::from_lenient(response.role.as_deref());

        self.sessions
            .login(email.as_str(), SecretString::from(token.clone()), role);
        info!(email = %email, role = %role, "Login succeeded");

        Ok(Session::new(email.into_inner(), SecretString::from(token), role))
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingPassword`
    /// before any request is made, otherwise the gateway's error.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError> {
        Email::parse(&request.email)?;
        if request.password.expose_secret().is_empty() {
            return Err(AuthError::MissingPassword);
        }

        self.gateway
            .post_text("/api/users/register", request)
            .await?;
        info!("Account registered");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_exposes_password_only_on_the_wire() {
        let password = SecretString::from("hunter22".to_string());
        let body = serde_json::to_value(LoginRequest {
            email: "a@b.com",
            password: &password,
        })
        .unwrap();
        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["password"], "hunter22");
    }

    #[test]
    fn test_register_request_skips_missing_fields() {
        let request = RegisterRequest {
            email: "a@b.com".to_string(),
            password: SecretString::from("pw".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: None,
            phone: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["firstName"], "Ada");
        assert!(body.get("lastName").is_none());
        assert!(!format!("{request:?}").contains("\"pw\""));
    }

    #[test]
    fn test_unauthorized_maps_to_invalid_credentials() {
        assert!(matches!(
            AuthError::from(crate::gateway::ApiError::Unauthorized),
            AuthError::InvalidCredentials
        ));
    }
}
