//! Gateway implementation over `reqwest`.

use std::path::Path;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ApiError, LOGIN_PATH, SessionEvent, error_message};
use crate::config::ClientConfig;
use crate::storage::SessionStorage;

/// Capacity of the session event channel. Events are rare; lagging
/// receivers only ever miss duplicate `LoginRequired` notifications.
const EVENT_CAPACITY: usize = 16;

/// Client for the REST API.
///
/// Cheap to clone; all clones share one connection pool, one storage handle
/// and one event channel.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: String,
    storage: Arc<dyn SessionStorage>,
    events: broadcast::Sender<SessionEvent>,
}

/// A file to send as the multipart `image` field.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload, inferring the content type from the file extension.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)?;
        Ok(Form::new().part("image", part))
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl Gateway {
    /// Create a gateway for `config.api_url` sharing `storage` with the session store.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: config.api_base().to_string(),
                storage,
                events,
            }),
        })
    }

    /// API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// The storage this gateway reads credentials from and clears on 401.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.inner.storage
    }

    /// Subscribe to session events (e.g. forced logout).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Absolute URL for an API path such as `/api/products/7`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if the result does not parse.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{path}", self.inner.base_url))?)
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// `GET` a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a classified `ApiError` on transport failure, non-success
    /// status, or a body that does not decode as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let body = self.execute(Method::GET, url, |r| r).await?;
        decode(&body)
    }

    /// `POST` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`Gateway::get_json`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let body = self.execute(Method::POST, url, |r| r.json(body)).await?;
        decode(&body)
    }

    /// `POST` a JSON body and return the raw response text.
    ///
    /// For endpoints that may answer with a plain-text confirmation.
    ///
    /// # Errors
    ///
    /// Returns a classified `ApiError` on transport failure or non-success status.
    pub async fn post_text<B>(&self, path: &str, body: &B) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.endpoint(path)?;
        self.execute(Method::POST, url, |r| r.json(body)).await
    }

    /// `PUT` a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`Gateway::get_json`].
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let body = self.execute(Method::PUT, url, |r| r.json(body)).await?;
        decode(&body)
    }

    /// `DELETE` a resource, ignoring any response body.
    ///
    /// # Errors
    ///
    /// Returns a classified `ApiError` on transport failure or non-success status.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        self.execute(Method::DELETE, url, |r| r).await.map(drop)
    }

    /// `POST` an empty JSON object with query parameters, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns a classified `ApiError` on transport failure or non-success status.
    pub async fn post_empty(&self, path: &str, query: &[(&str, String)]) -> Result<(), ApiError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        let empty = serde_json::Map::new();
        self.execute(Method::POST, url, |r| r.json(&empty))
            .await
            .map(drop)
    }

    /// `POST` a file as multipart form field `image`, ignoring the response body.
    ///
    /// # Errors
    ///
    /// Returns a classified `ApiError` on transport failure or non-success status.
    pub async fn post_multipart(&self, path: &str, upload: ImageUpload) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        let form = upload.into_form()?;
        self.execute(Method::POST, url, |r| r.multipart(form))
            .await
            .map(drop)
    }

    // =========================================================================
    // Execution and failure classification
    // =========================================================================

    /// Send a request with credentials attached and classify the outcome.
    ///
    /// Returns the response body text on success.
    #[instrument(skip(self, build), fields(method = %method, path = %url.path()))]
    async fn execute(
        &self,
        method: Method,
        url: Url,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<String, ApiError> {
        let mut request = build(self.inner.client.request(method, url));
        if let Some(token) = self.inner.storage.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.classify_transport(e))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session();
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &body);
            debug!(status = %status, message = %message, "API returned non-success status");
            return Err(ApiError::Status { status, message });
        }

        Ok(body)
    }

    fn classify_transport(&self, error: reqwest::Error) -> ApiError {
        if error.is_connect() {
            debug!(
                base_url = %self.inner.base_url,
                error = %error,
                "Backend server is not running or not accessible"
            );
            ApiError::Connectivity {
                base_url: self.inner.base_url.clone(),
                source: error,
            }
        } else {
            ApiError::Http(error)
        }
    }

    /// Clear persisted credentials and tell subscribers to show the login page.
    fn expire_session(&self) {
        warn!("API rejected credentials; clearing session");
        self.inner.storage.clear_session();
        // No subscribers is fine: storage is already cleared.
        let _ = self.inner.events.send(SessionEvent::LoginRequired {
            login_path: LOGIN_PATH,
        });
    }
}

/// Decode a success body; an empty body reads as JSON `null`.
fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = body.trim();
    let body = if body.is_empty() { "null" } else { body };
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageKey};

    fn gateway(base: &str) -> Gateway {
        let config = ClientConfig::new(Url::parse(base).unwrap());
        Gateway::new(&config, Arc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let gw = gateway("http://localhost:8080/");
        assert_eq!(
            gw.endpoint("/api/products/7").unwrap().as_str(),
            "http://localhost:8080/api/products/7"
        );

        let gw = gateway("https://parts.example.com/shop");
        assert_eq!(
            gw.endpoint("api/cart").unwrap().as_str(),
            "https://parts.example.com/shop/api/cart"
        );
    }

    #[test]
    fn test_content_type_inference() {
        assert_eq!(ImageUpload::new("pad.JPG", vec![]).content_type, "image/jpeg");
        assert_eq!(ImageUpload::new("pad.png", vec![]).content_type, "image/png");
        assert_eq!(
            ImageUpload::new("pad", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_decode_empty_body_as_null() {
        let value: Option<serde_json::Value> = decode("  ").unwrap();
        assert!(value.is_none());
        let list: Vec<i32> = decode("[1,2]").unwrap();
        assert_eq!(list, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_expire_session_clears_storage_and_notifies() {
        let gw = gateway("http://localhost:8080");
        gw.storage().store(StorageKey::Token, "T1");
        gw.storage().store(StorageKey::Email, "a@b.com");
        gw.storage().store(StorageKey::Role, "ADMIN");
        let mut events = gw.subscribe();

        gw.expire_session();

        for key in StorageKey::ALL {
            assert_eq!(gw.storage().load(key), None);
        }
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoginRequired { login_path: "/login" }
        );
    }
}
