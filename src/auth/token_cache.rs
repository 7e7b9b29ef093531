use crate::error::IdentityError;
use crate::models::Account;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Access tokens are renewed once they are this close to expiry
const RENEW_BEFORE_MINUTES: i64 = 5;
/// An abandoned interactive sign-in stops blocking new ones after this long
const PENDING_TTL_MINUTES: i64 = 10;

/// Signed-in session for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub account: Account,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub last_used: DateTime<Utc>,
}

impl CachedSession {
    pub fn needs_renewal(&self) -> bool {
        Utc::now() + Duration::minutes(RENEW_BEFORE_MINUTES) >= self.expires_at
    }
}

/// Interactive sign-in that has been dispatched but not yet returned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInteraction {
    pub state: String,
    pub code_verifier: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingInteraction {
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.created_at >= Duration::minutes(PENDING_TTL_MINUTES)
    }
}

/// File-backed store for sessions and the pending interaction.
/// Sessions live in `sessions/<sha256 of home account id>.json`.
pub struct TokenCache {
    cache_dir: PathBuf,
}

impl TokenCache {
    pub fn new() -> Result<Self, IdentityError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| IdentityError::Cache("Could not determine cache directory".to_string()))?
            .join("flashcards")
            .join("auth");
        Self::with_dir(cache_dir)
    }

    pub fn with_dir(cache_dir: PathBuf) -> Result<Self, IdentityError> {
        let sessions = cache_dir.join("sessions");
        if !sessions.exists() {
            fs::create_dir_all(&sessions).map_err(|e| {
                IdentityError::Cache(format!("Failed to create cache directory: {}", e))
            })?;
        }
        Ok(Self { cache_dir })
    }

    fn cache_key(home_account_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(home_account_id.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn session_path(&self, home_account_id: &str) -> PathBuf {
        self.cache_dir
            .join("sessions")
            .join(format!("{}.json", Self::cache_key(home_account_id)))
    }

    fn pending_path(&self) -> PathBuf {
        self.cache_dir.join("pending.json")
    }

    fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, IdentityError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| IdentityError::Cache(format!("Failed to read cache file: {}", e)))?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| IdentityError::Cache(format!("Corrupt cache file {}: {}", path.display(), e)))
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IdentityError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| IdentityError::Cache(format!("Failed to serialize cache entry: {}", e)))?;
        fs::write(path, json)
            .map_err(|e| IdentityError::Cache(format!("Failed to write cache file: {}", e)))
    }

    fn remove(path: &Path) -> Result<(), IdentityError> {
        if path.exists() {
            fs::remove_file(path)
                .map_err(|e| IdentityError::Cache(format!("Failed to remove cache file: {}", e)))?;
        }
        Ok(())
    }

    pub fn get_session(&self, home_account_id: &str) -> Result<Option<CachedSession>, IdentityError> {
        Self::read_json(&self.session_path(home_account_id))
    }

    pub fn save_session(&self, session: &CachedSession) -> Result<(), IdentityError> {
        Self::write_json(&self.session_path(&session.account.home_account_id), session)
    }

    pub fn remove_session(&self, home_account_id: &str) -> Result<(), IdentityError> {
        Self::remove(&self.session_path(home_account_id))
    }

    /// All readable sessions, most recently used first
    pub fn list_sessions(&self) -> Result<Vec<CachedSession>, IdentityError> {
        let dir = self.cache_dir.join("sessions");
        let mut sessions = Vec::new();

        if !dir.exists() {
            return Ok(sessions);
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| IdentityError::Cache(format!("Failed to list cache directory: {}", e)))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read_json::<CachedSession>(&path) {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping cache entry: {}", e),
            }
        }

        sessions.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        Ok(sessions)
    }

    pub fn load_pending(&self) -> Result<Option<PendingInteraction>, IdentityError> {
        Self::read_json(&self.pending_path())
    }

    pub fn save_pending(&self, pending: &PendingInteraction) -> Result<(), IdentityError> {
        Self::write_json(&self.pending_path(), pending)
    }

    pub fn clear_pending(&self) -> Result<(), IdentityError> {
        Self::remove(&self.pending_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(id: &str, last_used_minutes_ago: i64) -> CachedSession {
        CachedSession {
            account: Account {
                home_account_id: format!("{}.tenant", id),
                local_account_id: id.to_string(),
                environment: "login.microsoftonline.com".to_string(),
                tenant_id: "tenant".to_string(),
                username: format!("{}@example.com", id),
                name: None,
            },
            access_token: format!("token-{}", id),
            expires_at: Utc::now() + Duration::hours(1),
            refresh_token: Some("refresh".to_string()),
            scopes: vec!["api://cards/access_as_user".to_string()],
            last_used: Utc::now() - Duration::minutes(last_used_minutes_ago),
        }
    }

    #[test]
    fn test_session_save_get_remove() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::with_dir(dir.path().to_path_buf()).unwrap();

        let anna = session("anna", 0);
        cache.save_session(&anna).unwrap();

        let loaded = cache.get_session("anna.tenant").unwrap().unwrap();
        assert_eq!(loaded.access_token, "token-anna");
        assert_eq!(loaded.account, anna.account);

        cache.remove_session("anna.tenant").unwrap();
        assert!(cache.get_session("anna.tenant").unwrap().is_none());
        // removing twice is fine
        cache.remove_session("anna.tenant").unwrap();
    }

    #[test]
    fn test_list_sessions_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::with_dir(dir.path().to_path_buf()).unwrap();
        cache.save_session(&session("old", 30)).unwrap();
        cache.save_session(&session("new", 1)).unwrap();
        fs::write(dir.path().join("sessions").join("junk.json"), "not json").unwrap();

        let ids: Vec<String> = cache
            .list_sessions()
            .unwrap()
            .into_iter()
            .map(|s| s.account.local_account_id)
            .collect();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    }

    #[test]
    fn test_pending_interaction_roundtrip_and_staleness() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::with_dir(dir.path().to_path_buf()).unwrap();
        assert!(cache.load_pending().unwrap().is_none());

        let pending = PendingInteraction {
            state: "s1".to_string(),
            code_verifier: "v1".to_string(),
            scopes: vec![],
            created_at: Utc::now() - Duration::minutes(11),
        };
        assert!(pending.is_stale());
        cache.save_pending(&pending).unwrap();
        assert_eq!(cache.load_pending().unwrap().unwrap().state, "s1");

        cache.clear_pending().unwrap();
        assert!(cache.load_pending().unwrap().is_none());
    }

    #[test]
    fn test_needs_renewal_near_expiry() {
        let mut s = session("anna", 0);
        assert!(!s.needs_renewal());
        s.expires_at = Utc::now() + Duration::minutes(4);
        assert!(s.needs_renewal());
    }
}
