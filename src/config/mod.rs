use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory holding `session.json`; `None` means `~/.config/spendwise`
    pub storage_dir: Option<PathBuf>,
    pub expiring_soon_secs: i64,
    pub history_cap: usize,
}

/// Caller-side policy for a backend that may still be waking up.
/// Only unreachable outcomes are retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub wakeup_attempts: u32,
    pub wakeup_delay_ms: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve an API path against the base URL. Falls back to plain
    /// concatenation when the base URL does not parse.
    pub fn endpoint(&self, path: &str) -> String {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };

        match url::Url::parse(&base).and_then(|u| u.join(path.trim_start_matches('/'))) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", base, path.trim_start_matches('/')),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.wakeup_delay_ms)
    }
}

impl SessionConfig {
    pub fn resolve_storage_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.storage_dir {
            return Some(dir.clone());
        }
        let home = env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".config").join("spendwise"))
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("SPENDWISE_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        Self::preset(environment).with_env_overrides()
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    /// Development preset pointed at an explicit backend, used by tests and embedders.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.api.base_url = base_url.into();
        config
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("SPENDWISE_API_URL") {
            if url::Url::parse(&v).is_ok() {
                self.api.base_url = v;
            } else {
                tracing::warn!("Ignoring invalid SPENDWISE_API_URL: {}", v);
            }
        }
        if let Ok(v) = env::var("SPENDWISE_TIMEOUT_MS") {
            self.api.timeout_ms = v.parse().unwrap_or(self.api.timeout_ms);
        }

        if let Ok(v) = env::var("SPENDWISE_CONFIG_DIR") {
            self.session.storage_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("SPENDWISE_EXPIRING_SOON_SECS") {
            self.session.expiring_soon_secs = v.parse().unwrap_or(self.session.expiring_soon_secs);
        }

        if let Ok(v) = env::var("SPENDWISE_WAKEUP_ATTEMPTS") {
            self.retry.wakeup_attempts = v.parse().unwrap_or(self.retry.wakeup_attempts);
        }
        if let Ok(v) = env::var("SPENDWISE_WAKEUP_DELAY_MS") {
            self.retry.wakeup_delay_ms = v.parse().unwrap_or(self.retry.wakeup_delay_ms);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:5000".to_string(),
                timeout_ms: 30_000,
            },
            session: SessionConfig {
                storage_dir: None,
                expiring_soon_secs: 300,
                history_cap: 10,
            },
            retry: RetryConfig {
                wakeup_attempts: 2,
                wakeup_delay_ms: 3000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging-api.spendwise.app".to_string(),
                timeout_ms: 15_000,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://api.spendwise.app".to_string(),
                timeout_ms: 10_000,
            },
            ..Self::development()
        }
    }
}

// Global singleton config - initialized once on first access
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(|| {
    // Load .env if present so SPENDWISE_API_URL etc. are picked up
    let _ = dotenvy::dotenv();
    ClientConfig::from_env()
});

pub fn config() -> &'static ClientConfig {
    &CONFIG
}
