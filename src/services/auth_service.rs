use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::gateway::{paths, with_wakeup_retry, ApiRequest, RequestGateway};
use crate::session::Profile;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
}

/// Login, registration and session lifecycle against `/api/auth/*`
#[derive(Debug, Clone)]
pub struct AuthService {
    gateway: RequestGateway,
}

impl AuthService {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// Exchange credentials for a token and cache the returned profile
    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, GatewayError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(GatewayError::validation("Email and password are required"));
        }

        let payload = json!({ "email": email, "password": password });
        let body = with_wakeup_retry(self.gateway.retry_policy(), || {
            self.gateway.post_json(paths::AUTH_LOGIN, &payload)
        })
        .await?;

        let response: TokenResponse = serde_json::from_value(body)?;
        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::invalid_response("Login response did not include a token"))?;

        // A missing or odd user object still logs in, with a minimal profile
        let profile = response
            .user
            .and_then(|u| serde_json::from_value::<Profile>(u).ok())
            .unwrap_or_else(|| Profile { email: email.clone(), is_active: true, ..Default::default() });

        self.gateway.session().save(&token, &profile);
        tracing::info!("Logged in as {}", profile.email);
        Ok(profile)
    }

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Profile, GatewayError> {
        let email = email.trim().to_lowercase();
        validate_email(&email)?;
        if password.chars().count() < 6 {
            return Err(GatewayError::validation("Password must be at least 6 characters long"));
        }

        let mut payload = json!({ "email": email, "password": password });
        if let Some(name) = full_name.map(str::trim).filter(|n| !n.is_empty()) {
            payload["full_name"] = json!(name);
        }

        let body = self.gateway.post_json(paths::AUTH_REGISTER, &payload).await?;
        Ok(body
            .get("user")
            .cloned()
            .and_then(|u| serde_json::from_value(u).ok())
            .unwrap_or(Profile { email, ..Default::default() }))
    }

    /// Revoke the token server-side, then clear local state whatever the outcome
    pub async fn logout(&self) -> Result<(), GatewayError> {
        let result = if self.gateway.session().has_token() {
            self.gateway.post_json(paths::AUTH_LOGOUT, &json!({})).await.map(|_| ())
        } else {
            Ok(())
        };

        self.gateway.session().teardown();
        if let Err(e) = &result {
            tracing::debug!("Server-side logout failed: {}", e);
        }
        result
    }

    /// Fetch the current user and refresh the cached profile
    pub async fn whoami(&self) -> Result<Profile, GatewayError> {
        let body = self.gateway.get_json(ApiRequest::get(paths::AUTH_ME)).await?;
        let user = body.get("user").cloned().unwrap_or(body);
        let profile: Profile = serde_json::from_value(user)?;
        self.gateway.session().update_profile(&profile);
        Ok(profile)
    }

    /// Swap the stored token for a fresh one, keeping the profile
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        let body = self.gateway.post_json(paths::AUTH_REFRESH, &json!({})).await?;
        let response: TokenResponse = serde_json::from_value(body)?;
        match response.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                self.gateway.session().replace_token(&token);
                Ok(())
            }
            None => Err(GatewayError::invalid_response("Refresh response did not include a token")),
        }
    }

    /// Refresh only when the stored token is close to expiry. Returns
    /// whether a refresh happened.
    pub async fn refresh_if_expiring(&self) -> Result<bool, GatewayError> {
        if !self.gateway.session().needs_refresh() {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }
}

fn validate_email(email: &str) -> Result<(), GatewayError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .map(|(host, tld)| !host.is_empty() && tld.len() >= 2)
                    .unwrap_or(false)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(GatewayError::validation("Invalid email format"))
    }
}
