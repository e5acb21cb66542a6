//! # Remote API Access
//!
//! [`ApiClient`] builds requests against the configured API root and sends
//! them through the [`RequestInterceptor`], so every call made with it gets
//! refresh-and-replay handling. [`SessionApi`] is the narrow contract the
//! controller needs from the server; [`HttpSessionApi`] implements it over
//! the wire format below.
//!
//! ## Wire format
//!
//! | Operation    | Call                     | Success                                   |
//! |--------------|--------------------------|-------------------------------------------|
//! | authenticate | `POST token/`            | `{"success": true, "user": {...}}`         |
//! | refresh      | `POST token/refresh/`    | `{"success": true}`                       |
//! | whoami       | `GET authenticated/`     | any 2xx                                   |
//! | terminate    | `POST logout/`           | `{"success": true}`                       |
//! | register     | `POST register/`         | the created user, otherwise field errors  |

use crate::error::{AuthError, Result};
use crate::interceptor::{PendingRequest, RequestInterceptor};
use crate::types::{Credentials, RegistrationRequest, UserProfile};
use async_trait::async_trait;
use bridge_traits::{HttpMethod, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Endpoint paths, relative to the API root.
pub mod paths {
    pub const AUTHENTICATE: &str = "token/";
    pub const REFRESH: &str = "token/refresh/";
    pub const WHOAMI: &str = "authenticated/";
    pub const TERMINATE: &str = "logout/";
    pub const REGISTER: &str = "register/";
}

/// Resolve `path` against the API root.
pub fn endpoint_url(base_url: &Url, path: &str) -> Result<String> {
    base_url
        .join(path.trim_start_matches('/'))
        .map(String::from)
        .map_err(|e| AuthError::InvalidResponse(format!("Invalid endpoint '{}': {}", path, e)))
}

/// Request builder and sender bound to one API root.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    interceptor: Arc<RequestInterceptor>,
    timeout: Option<Duration>,
}

impl ApiClient {
    pub fn new(base_url: Url, interceptor: Arc<RequestInterceptor>) -> Self {
        Self {
            base_url,
            interceptor,
            timeout: None,
        }
    }

    /// Apply a per-request timeout to every request built by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<String> {
        endpoint_url(&self.base_url, path)
    }

    /// A request for `path` with the client's defaults applied.
    pub fn request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest> {
        let mut request =
            HttpRequest::new(method, self.endpoint(path)?).header("Accept", "application/json");
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        Ok(request)
    }

    /// Send through the interceptor with refresh-and-replay.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.interceptor.send(PendingRequest::new(request)).await
    }

    /// Send through the interceptor without ever triggering a refresh.
    pub async fn send_without_refresh(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.interceptor
            .send(PendingRequest::new(request).mark_retried())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(HttpMethod::Get, path)?).await?;
        decode(&response)
    }

    #[instrument(skip(self, body))]
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(HttpMethod::Post, path)?.json(body)?;
        let response = self.send(request).await?;
        decode(&response)
    }

    #[instrument(skip(self, body))]
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(HttpMethod::Patch, path)?.json(body)?;
        let response = self.send(request).await?;
        decode(&response)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.send(self.request(HttpMethod::Delete, path)?).await?;
        ensure_success(&response)
    }
}

fn ensure_success(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(AuthError::Http {
            status: response.status,
        })
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    ensure_success(response)?;
    response
        .json()
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))
}

/// Server operations the auth controller depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Exchange credentials for a session cookie and the user's profile.
    ///
    /// Fails with `AuthError::InvalidCredentials` when the server rejects
    /// the credentials.
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserProfile>;

    /// Check the current session. A profile is returned when the server
    /// includes one.
    async fn whoami(&self) -> Result<Option<UserProfile>>;

    /// Invalidate the server-side session.
    async fn terminate(&self) -> Result<()>;

    /// Create an account. The confirmation field is never sent.
    async fn register(&self, request: &RegistrationRequest) -> Result<UserProfile>;
}

#[derive(Deserialize)]
struct LoginReply {
    #[serde(default)]
    success: bool,
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct WhoamiReply {
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct LogoutReply {
    #[serde(default = "default_true")]
    success: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct RegistrationBody<'a> {
    username: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    password: &'a str,
}

/// [`SessionApi`] over HTTP.
pub struct HttpSessionApi {
    client: ApiClient,
}

impl HttpSessionApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<UserProfile> {
        let request = self
            .client
            .request(HttpMethod::Post, paths::AUTHENTICATE)?
            .json(credentials)?;

        let response = match self.client.send_without_refresh(request).await {
            Err(AuthError::AuthExpired) => return Err(AuthError::InvalidCredentials),
            other => other?,
        };

        if response.is_client_error() {
            return Err(AuthError::InvalidCredentials);
        }
        let reply: LoginReply = decode(&response)?;

        match reply {
            LoginReply {
                success: true,
                user: Some(user),
            } => Ok(user),
            LoginReply { success: true, .. } => Err(AuthError::InvalidResponse(
                "login reply is missing the user".to_string(),
            )),
            LoginReply { success: false, .. } => Err(AuthError::InvalidCredentials),
        }
    }

    #[instrument(skip(self))]
    async fn whoami(&self) -> Result<Option<UserProfile>> {
        let request = self.client.request(HttpMethod::Get, paths::WHOAMI)?;
        let response = self.client.send(request).await?;
        ensure_success(&response)?;

        // The whoami body is informational only
        let profile = response
            .json::<WhoamiReply>()
            .ok()
            .and_then(|reply| reply.user);
        debug!(has_profile = profile.is_some(), "Session check succeeded");
        Ok(profile)
    }

    #[instrument(skip(self))]
    async fn terminate(&self) -> Result<()> {
        let request = self
            .client
            .request(HttpMethod::Post, paths::TERMINATE)?
            .json(&serde_json::json!({}))?;

        let response = self.client.send_without_refresh(request).await?;
        ensure_success(&response)?;

        match response.json::<LogoutReply>() {
            Ok(LogoutReply { success: false }) => Err(AuthError::InvalidResponse(
                "server reported logout failure".to_string(),
            )),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn register(&self, request: &RegistrationRequest) -> Result<UserProfile> {
        let body = RegistrationBody {
            username: &request.username,
            email: &request.email,
            first_name: &request.first_name,
            last_name: &request.last_name,
            password: &request.password,
        };
        let http_request = self
            .client
            .request(HttpMethod::Post, paths::REGISTER)?
            .json(&body)?;

        let response = self.client.send_without_refresh(http_request).await?;
        let value: serde_json::Value = match response.json() {
            Ok(value) => value,
            Err(_) => {
                ensure_success(&response)?;
                return Err(AuthError::InvalidResponse(
                    "registration reply is not JSON".to_string(),
                ));
            }
        };

        // The server answers 200 with field errors when validation fails
        if response.is_success() && value.get("username").is_some_and(|v| v.is_string()) {
            return serde_json::from_value(value)
                .map_err(|e| AuthError::InvalidResponse(e.to_string()));
        }

        match field_errors(&value) {
            Some(message) => {
                warn!("Registration rejected by server");
                Err(AuthError::Validation(message))
            }
            None => {
                ensure_success(&response)?;
                Err(AuthError::InvalidResponse(
                    "registration reply has no user".to_string(),
                ))
            }
        }
    }
}

/// Flatten `{"field": ["message", ...]}` into `"field: message; ..."`.
fn field_errors(value: &serde_json::Value) -> Option<String> {
    let errors: BTreeMap<String, serde_json::Value> =
        serde_json::from_value(value.clone()).ok()?;

    let messages: Vec<String> = errors
        .iter()
        .filter_map(|(field, detail)| {
            let text = match detail {
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
                serde_json::Value::String(text) => text.clone(),
                _ => return None,
            };
            (!text.is_empty()).then(|| format!("{}: {}", field, text))
        })
        .collect();

    (!messages.is_empty()).then(|| messages.join("; "))
}
