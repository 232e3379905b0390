pub mod history;
pub mod store;
pub mod token;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::models::lenient;

pub use history::{ExportHistory, ExportHistoryEntry, DEFAULT_HISTORY_CAP};
pub use store::{FileStore, MemoryStore, SessionStore};
pub use token::{TokenClaims, TokenShape};

pub const TOKEN_KEY: &str = "token";
pub const PROFILE_KEY: &str = "user";
pub const EXPORT_HISTORY_KEY: &str = "export_history";

pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// Cached user record from the login response. Never re-validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::bool_or_false")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.email,
        }
    }
}

/// Owner of the local session: bearer token, profile snapshot and the
/// export history that depends on them.
///
/// Every query answers with `bool`/`Option`; malformed storage reads as an
/// absent session and is cleared, never reported as an error.
pub struct SessionManager {
    store: Mutex<Box<dyn SessionStore>>,
    history_cap: usize,
    refresh_threshold_secs: i64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("history_cap", &self.history_cap)
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
            history_cap: DEFAULT_HISTORY_CAP,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// File-backed session under the configured directory
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let dir = config.resolve_storage_dir().ok_or(SessionError::NoStorageDir)?;
        let store = FileStore::open(&dir)?;
        Ok(Self::new(store)
            .with_history_cap(config.history_cap)
            .with_refresh_threshold(config.expiring_soon_secs))
    }

    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }

    pub fn with_refresh_threshold(mut self, secs: i64) -> Self {
        self.refresh_threshold_secs = secs;
        self
    }

    fn store(&self) -> MutexGuard<'_, Box<dyn SessionStore>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stored token, if any. No validity check.
    pub fn token(&self) -> Option<String> {
        self.store().get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        let Some(token) = self.token() else {
            return false;
        };

        match token::inspect(&token) {
            TokenShape::Malformed => {
                tracing::debug!("Stored token is not a three-segment token, clearing");
                self.clear_credentials();
                false
            }
            TokenShape::Undecodable => {
                tracing::debug!("Stored token payload could not be decoded, clearing");
                self.clear_credentials();
                false
            }
            TokenShape::Decoded(claims) if claims.is_expired_at(now) => {
                tracing::info!("Session token expired, tearing down");
                self.teardown();
                false
            }
            // No exp claim: trusted until the server says otherwise
            TokenShape::Decoded(_) => true,
        }
    }

    /// Overwrite token and profile together. Empty tokens are ignored.
    pub fn save(&self, token: &str, profile: &Profile) {
        if token.is_empty() {
            tracing::debug!("Refusing to save an empty session token");
            return;
        }

        let profile_json = match serde_json::to_string(profile) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to encode profile: {}", e);
                return;
            }
        };

        // Both values land or neither does
        let result = self.store().set_many(&[(TOKEN_KEY, token), (PROFILE_KEY, profile_json.as_str())]);
        log_store_error("save session", result);
    }

    /// Swap in a refreshed token, keeping the cached profile
    pub fn replace_token(&self, token: &str) {
        if token.is_empty() || !self.has_token() {
            return;
        }
        log_store_error("replace token", self.store().set(TOKEN_KEY, token));
    }

    /// Refresh the cached profile. Ignored when no token is stored.
    pub fn update_profile(&self, profile: &Profile) {
        if !self.has_token() {
            return;
        }
        if let Ok(json) = serde_json::to_string(profile) {
            log_store_error("update profile", self.store().set(PROFILE_KEY, &json));
        }
    }

    /// Remove every piece of local session state. Safe to call repeatedly.
    pub fn teardown(&self) {
        let result = self.store().remove_many(&[TOKEN_KEY, PROFILE_KEY, EXPORT_HISTORY_KEY]);
        log_store_error("teardown", result);
    }

    fn clear_credentials(&self) {
        let result = self.store().remove_many(&[TOKEN_KEY, PROFILE_KEY]);
        log_store_error("clear credentials", result);
    }

    pub fn current_profile(&self) -> Option<Profile> {
        let store = self.store();
        store.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
        let raw = store.get(PROFILE_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn claims(&self) -> Option<TokenClaims> {
        match token::inspect(&self.token()?) {
            TokenShape::Decoded(claims) => Some(claims),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims()?.expires_at()
    }

    /// `expiring_soon` against the configured threshold
    pub fn needs_refresh(&self) -> bool {
        self.expiring_soon(self.refresh_threshold_secs)
    }

    pub fn expiring_soon(&self, threshold_secs: i64) -> bool {
        self.expiring_soon_at(threshold_secs, Utc::now())
    }

    /// True when the token has not expired yet but will within the threshold
    pub fn expiring_soon_at(&self, threshold_secs: i64, now: DateTime<Utc>) -> bool {
        match self.claims().and_then(|c| c.exp) {
            Some(exp) => {
                let remaining = exp - token::epoch_seconds(now);
                remaining > 0.0 && remaining <= threshold_secs as f64
            }
            None => false,
        }
    }

    pub fn export_history(&self) -> Vec<ExportHistoryEntry> {
        let raw = self.store().get(EXPORT_HISTORY_KEY);
        ExportHistory::from_stored(raw.as_deref(), self.history_cap).into_entries()
    }

    pub fn record_export(&self, entry: ExportHistoryEntry) {
        let mut store = self.store();
        let raw = store.get(EXPORT_HISTORY_KEY);
        let mut history = ExportHistory::from_stored(raw.as_deref(), self.history_cap);
        history.push(entry);

        match history.to_stored() {
            Ok(json) => log_store_error("record export", store.set(EXPORT_HISTORY_KEY, &json)),
            Err(e) => tracing::warn!("Failed to encode export history: {}", e),
        }
    }
}

fn log_store_error(action: &str, result: Result<(), SessionError>) {
    if let Err(e) = result {
        tracing::warn!("Session storage failed to {}: {}", action, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn token_with(payload: serde_json::Value) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.signature", URL_SAFE_NO_PAD.encode(payload.to_string()))
    }

    fn profile() -> Profile {
        Profile {
            id: Some(7),
            email: "asha@example.com".into(),
            full_name: Some("Asha Rao".into()),
            is_active: true,
            created_at: Some("2025-10-01T09:00:00".into()),
            updated_at: Some("2025-10-02T09:00:00".into()),
        }
    }

    fn seeded(token: &str) -> SessionManager {
        let session = SessionManager::in_memory();
        session.save(token, &profile());
        session
    }

    #[test]
    fn test_no_token_is_not_usable() {
        assert!(!SessionManager::in_memory().is_usable());
    }

    #[test]
    fn test_two_segments_clears_token() {
        let session = seeded("abc.def");
        assert!(!session.is_usable());
        assert_eq!(session.token(), None);
        assert_eq!(session.current_profile(), None);
    }

    #[test]
    fn test_undecodable_payload_clears_token() {
        let session = seeded("aaa.%%%.ccc");
        assert!(!session.is_usable());
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_no_expiry_is_trusted() {
        let session = seeded(&token_with(serde_json::json!({"sub": "7"})));
        assert!(session.is_usable());
        assert!(session.has_token());
        assert_eq!(session.expires_at(), None);
        assert!(!session.expiring_soon(300));
    }

    #[test]
    fn test_expired_token_tears_down_and_stays_down() {
        let now = Utc::now();
        let token = token_with(serde_json::json!({"exp": now.timestamp() - 1}));
        let session = seeded(&token);
        session.record_export(ExportHistoryEntry::new("csv", "expenses", "all", "a.csv"));

        assert!(!session.is_usable_at(now));
        assert_eq!(session.token(), None);
        assert!(session.export_history().is_empty());

        // Second call takes the no-token path
        assert!(!session.is_usable_at(now));
    }

    #[test]
    fn test_future_expiry_leaves_storage_untouched() {
        let now = Utc::now();
        let token = token_with(serde_json::json!({"exp": now.timestamp() + 3600}));
        let session = seeded(&token);

        assert!(session.is_usable_at(now));
        assert_eq!(session.token().as_deref(), Some(token.as_str()));
        assert_eq!(session.current_profile(), Some(profile()));
    }

    #[test]
    fn test_expiring_soon_window() {
        let now = Utc::now();
        let exp = now + Duration::seconds(120);
        let session = seeded(&token_with(serde_json::json!({"exp": exp.timestamp()})));

        assert!(session.expiring_soon_at(300, now));
        assert!(!session.expiring_soon_at(60, now));
        assert_eq!(session.expires_at().map(|t| t.timestamp()), Some(exp.timestamp()));
    }

    #[test]
    fn test_save_then_profile_round_trips() {
        let session = seeded("a.b.c");
        assert_eq!(session.current_profile(), Some(profile()));
        assert_eq!(session.current_profile().unwrap().display_name(), "Asha Rao");
    }

    #[test]
    fn test_empty_token_does_not_write() {
        let session = SessionManager::in_memory();
        session.save("", &profile());
        assert_eq!(session.token(), None);
        assert_eq!(session.current_profile(), None);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let session = seeded("a.b.c");
        session.teardown();
        session.teardown();
        assert_eq!(session.current_profile(), None);

        SessionManager::in_memory().teardown();
    }

    #[test]
    fn test_unparsable_profile_reads_as_absent() {
        let store = MemoryStore::new().with(TOKEN_KEY, "a.b.c").with(PROFILE_KEY, "{broken");
        let session = SessionManager::new(store);
        assert_eq!(session.current_profile(), None);
        assert!(session.has_token());
    }

    #[test]
    fn test_profile_without_token_is_absent() {
        let store = MemoryStore::new().with(PROFILE_KEY, r#"{"email":"x@y.z"}"#);
        assert_eq!(SessionManager::new(store).current_profile(), None);
    }

    #[test]
    fn test_replace_token_keeps_profile() {
        let session = seeded("a.b.c");
        session.replace_token("d.e.f");
        assert_eq!(session.token().as_deref(), Some("d.e.f"));
        assert_eq!(session.current_profile(), Some(profile()));
    }

    /// Memory store whose writes to the profile key can be made to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_profile_set: Arc<AtomicBool>,
        fail_profile_remove: Arc<AtomicBool>,
    }

    impl SessionStore for FlakyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
            if key == PROFILE_KEY && self.fail_profile_set.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), SessionError> {
            if key == PROFILE_KEY && self.fail_profile_remove.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("read-only").into());
            }
            self.inner.remove(key)
        }
    }

    fn other_profile() -> Profile {
        Profile {
            id: Some(8),
            email: "bob@example.com".into(),
            ..Profile::default()
        }
    }

    #[test]
    fn test_failed_profile_write_keeps_previous_pair() {
        let store = FlakyStore::default();
        let fail = store.fail_profile_set.clone();
        let session = SessionManager::new(store);

        session.save("a.alice.sig", &profile());
        fail.store(true, Ordering::SeqCst);
        session.save("b.bob.sig", &other_profile());

        assert_eq!(session.token().as_deref(), Some("a.alice.sig"));
        assert_eq!(session.current_profile(), Some(profile()));
    }

    #[test]
    fn test_failed_fresh_save_leaves_no_token() {
        let store = FlakyStore::default();
        store.fail_profile_set.store(true, Ordering::SeqCst);
        let session = SessionManager::new(store);

        session.save("b.bob.sig", &other_profile());
        assert_eq!(session.token(), None);
        assert_eq!(session.current_profile(), None);
    }

    #[test]
    fn test_teardown_with_failing_profile_remove_still_signs_out() {
        let store = FlakyStore::default();
        let fail = store.fail_profile_remove.clone();
        let session = SessionManager::new(store);
        session.save("a.alice.sig", &profile());

        fail.store(true, Ordering::SeqCst);
        session.teardown();

        assert_eq!(session.token(), None);
        assert_eq!(session.current_profile(), None);
        assert!(!session.is_usable());
    }

    #[test]
    fn test_profile_tolerates_null_fields() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "id": 3,
            "email": null,
            "full_name": null,
            "is_active": null,
            "created_at": null
        }))
        .unwrap();
        assert_eq!(profile.id, Some(3));
        assert_eq!(profile.email, "");
        assert!(!profile.is_active);

        let stored = MemoryStore::new()
            .with(TOKEN_KEY, "a.b.c")
            .with(PROFILE_KEY, r#"{"email":"x@y.z","is_active":null}"#);
        let session = SessionManager::new(stored);
        assert_eq!(session.current_profile().map(|p| p.email), Some("x@y.z".to_string()));
    }
}
