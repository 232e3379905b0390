pub mod retry;
pub mod routes;

use std::sync::Arc;

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::{ApiConfig, ClientConfig, RetryConfig};
use crate::error::GatewayError;
use crate::session::SessionManager;

pub use retry::with_wakeup_retry;
pub use routes::{paths, RouteScope};

/// One outgoing call. Carries the single-use guard that keeps a forced
/// logout from firing twice for the same request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, GatewayError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn scope(&self) -> RouteScope {
        RouteScope::classify(&self.path)
    }

    pub fn has_retried(&self) -> bool {
        self.retried
    }
}

/// Successful response, passed through unchanged
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Parse the body as JSON; an empty body reads as `null`
    pub fn json(&self) -> Result<Value, GatewayError> {
        if self.body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Filename from a `Content-Disposition: attachment; filename=...` header
    pub fn attachment_filename(&self) -> Option<String> {
        let header = self.content_disposition.as_deref()?;
        header
            .split(';')
            .map(str::trim)
            .find_map(|part| part.strip_prefix("filename="))
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    }
}

/// Single HTTP client configuration shared by every screen.
///
/// Attaches the stored bearer token, classifies failures, and forces a
/// teardown-and-redirect when an authentication-scoped call returns 401.
#[derive(Debug, Clone)]
pub struct RequestGateway {
    client: reqwest::Client,
    api: ApiConfig,
    retry: RetryConfig,
    session: Arc<SessionManager>,
}

impl RequestGateway {
    pub fn new(config: &ClientConfig, session: Arc<SessionManager>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.api.timeout())
            .build()?;

        Ok(Self {
            client,
            api: config.api.clone(),
            retry: config.retry.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.api
    }

    /// Caller-side policy for a backend that may still be waking up
    pub fn retry_policy(&self) -> &RetryConfig {
        &self.retry
    }

    pub async fn send(&self, request: &mut ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = self.api.endpoint(&request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        // Presence only; usability is checked by the screens, not here
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!("{} {}", request.method, request.path);

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} {} unreachable: {}", request.method, request.path, e);
                return Err(GatewayError::unreachable(e.to_string()));
            }
        };

        let status = response.status();
        let content_type = header_string(&response, CONTENT_TYPE);
        let content_disposition = header_string(&response, CONTENT_DISPOSITION);

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| GatewayError::unreachable(e.to_string()))?;

            return Ok(ApiResponse {
                status: status.as_u16(),
                content_type,
                content_disposition,
                body: body.to_vec(),
            });
        }

        let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        Err(self.classify_failure(request, status, &body))
    }

    fn classify_failure(&self, request: &mut ApiRequest, status: StatusCode, body: &[u8]) -> GatewayError {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();
        let message = parsed.as_ref().and_then(server_message);

        match status.as_u16() {
            401 if request.scope() == RouteScope::Authentication && !request.retried => {
                request.retried = true;
                tracing::warn!("{} rejected the session, logging out", request.path);
                self.session.teardown();
                GatewayError::session_expired(message.unwrap_or_default())
            }
            401 => {
                // Soft: the session stays in place
                tracing::warn!("401 from {} (no forced logout)", request.path);
                GatewayError::unauthorized(message.unwrap_or_else(|| "Unauthorized".to_string()))
            }
            code if status.is_server_error() => {
                let message = message.unwrap_or_else(|| "Internal server error".to_string());
                attach(GatewayError::server(code, message), parsed)
            }
            code => {
                let message = message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
                attach(GatewayError::client(code, message), parsed)
            }
        }
    }

    pub async fn get_json(&self, request: ApiRequest) -> Result<Value, GatewayError> {
        let mut request = request;
        self.send(&mut request).await?.json()
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Value, GatewayError> {
        let mut request = ApiRequest::post(path).json(body)?;
        self.send(&mut request).await?.json()
    }

    pub async fn put_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Value, GatewayError> {
        let mut request = ApiRequest::put(path).json(body)?;
        self.send(&mut request).await?.json()
    }

    pub async fn delete_json(&self, path: &str) -> Result<Value, GatewayError> {
        let mut request = ApiRequest::delete(path);
        self.send(&mut request).await?.json()
    }

    /// Binary download (exports); the raw response is returned
    pub async fn get_blob(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let mut request = request;
        self.send(&mut request).await
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn attach(err: GatewayError, body: Option<Value>) -> GatewayError {
    match body {
        Some(body) => err.with_body(body),
        None => err,
    }
}

/// Human-readable text from an error body: `error`, then `message`, then `msg`
pub fn server_message(body: &Value) -> Option<String> {
    ["error", "message", "msg"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}
