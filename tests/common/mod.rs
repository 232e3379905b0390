#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use spendwise_client::config::ClientConfig;
use spendwise_client::{Services, SessionManager};

/// Canned answer for one path
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
    pub attachment: Option<(String, Vec<u8>)>,
    pub delay: Duration,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body, attachment: None, delay: Duration::ZERO }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Binary body with an optional `Content-Disposition` filename
    pub fn file(filename: Option<&str>, bytes: &[u8]) -> Self {
        Self {
            status: 200,
            body: Value::Null,
            attachment: Some((filename.unwrap_or_default().to_string(), bytes.to_vec())),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Default)]
pub struct MockState {
    replies: Mutex<HashMap<String, Reply>>,
    hits: Mutex<Vec<Hit>>,
}

/// In-process stand-in for the expense backend on a free local port
pub struct MockBackend {
    pub port: u16,
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let state = Arc::new(MockState::default());

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, state })
    }

    pub fn reply(&self, path: &str, reply: Reply) -> &Self {
        self.state.replies.lock().unwrap().insert(path.to_string(), reply);
        self
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, path: &str) -> Vec<Hit> {
        self.hits().into_iter().filter(|h| h.path == path).collect()
    }

    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_base_url(&self.base_url);
        config.api.timeout_ms = 5_000;
        config.retry.wakeup_attempts = 0;
        config.retry.wakeup_delay_ms = 1;
        config
    }

    /// Services over a fresh in-memory session
    pub fn services(&self) -> Result<Services> {
        let session = Arc::new(SessionManager::in_memory());
        Ok(Services::new(&self.config(), session)?)
    }
}

async fn handle(State(state): State<Arc<MockState>>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path().to_string();
    state.hits.lock().unwrap().push(Hit {
        method,
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let reply = state.replies.lock().unwrap().get(&path).cloned();
    let Some(reply) = reply else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response();
    };

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap();
    match reply.attachment {
        Some((filename, bytes)) => {
            let mut response = (status, bytes).into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
            if !filename.is_empty() {
                let disposition = format!("attachment; filename=\"{}\"", filename);
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, HeaderValue::from_str(&disposition).unwrap());
            }
            response
        }
        None => (status, Json(reply.body)).into_response(),
    }
}

/// HS256 token with the given `exp` offset from now; `None` leaves `exp` out
pub fn token_expiring_in(offset_secs: Option<i64>) -> String {
    let mut claims = json!({"sub": "7", "email": "asha@example.com"});
    if let Some(offset) = offset_secs {
        claims["exp"] = json!(chrono::Utc::now().timestamp() + offset);
    }
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
}

pub fn profile_json() -> Value {
    json!({
        "id": 7,
        "email": "asha@example.com",
        "full_name": "Asha Rao",
        "is_active": true,
        "created_at": "2025-01-04T09:30:00"
    })
}
