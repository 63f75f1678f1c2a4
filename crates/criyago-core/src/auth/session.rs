use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::CurrentUser;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Provider access tokens are issued for one hour.
const TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Buffer time before expiry to trigger refresh (5 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    pub user: CurrentUser,
    pub created_at: DateTime<Utc>,
}

fn default_provider() -> String {
    "google".to_string()
}

impl SessionData {
    pub fn new(access_token: impl Into<String>, user: CurrentUser) -> Self {
        Self {
            access_token: access_token.into(),
            provider: default_provider(),
            user,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at =
            self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() > refresh_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES)
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_minutes().max(0)
    }
}

/// Who is signed in, if anyone.
pub trait Identity {
    fn current_user(&self) -> Option<&CurrentUser>;

    fn user_id(&self) -> Option<&str> {
        self.current_user().map(|u| u.id.as_str())
    }

    fn is_signed_in(&self) -> bool {
        self.current_user().is_some()
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns false when absent or expired.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
            debug!(email = %data.user.email, "Stored session has expired");
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Record a completed provider sign-in and persist it
    pub fn sign_in(&mut self, access_token: impl Into<String>, user: CurrentUser) -> Result<()> {
        self.update(SessionData::new(access_token, user));
        self.save()
    }

    /// Clear session data
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// The bearer token if the session is valid
    pub fn token(&self) -> Option<&str> {
        self.valid_data().map(|d| d.access_token.as_str())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.valid_data().is_some()
    }

    fn valid_data(&self) -> Option<&SessionData> {
        self.data.as_ref().filter(|d| !d.is_expired())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl Identity for Session {
    fn current_user(&self) -> Option<&CurrentUser> {
        self.valid_data().map(|d| &d.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user() -> CurrentUser {
        CurrentUser {
            id: "google-oauth2|42".to_string(),
            email: "ana@example.com".to_string(),
            name: "Ana Lima".to_string(),
            avatar_url: None,
        }
    }

    #[test]
    fn test_sign_in_persists_across_loads() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.sign_in("token-abc", user()).unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.token(), Some("token-abc"));
        assert_eq!(reloaded.user_id(), Some("google-oauth2|42"));
    }

    #[test]
    fn test_expired_session_reads_as_signed_out() {
        let dir = TempDir::new().unwrap();
        let mut data = SessionData::new("old", user());
        data.created_at = Utc::now() - Duration::minutes(TOKEN_EXPIRY_MINUTES + 1);

        let mut session = Session::new(dir.path().to_path_buf());
        session.update(data);
        assert!(!session.is_signed_in());
        assert_eq!(session.token(), None);

        session.save().unwrap();
        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(!reloaded.load().unwrap());
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        let mut data = SessionData::new("t", user());
        assert!(!data.needs_refresh());
        data.created_at = Utc::now() - Duration::minutes(TOKEN_EXPIRY_MINUTES - 2);
        assert!(data.needs_refresh());
        assert!(!data.is_expired());
        assert!(data.minutes_until_expiry() <= 2);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.sign_in("t", user()).unwrap();
        session.clear().unwrap();
        assert!(!dir.path().join(SESSION_FILE).exists());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_missing_provider_defaults() {
        let json = r#"{"access_token":"t","user":{"id":"1","email":"a@b.c","name":"A"},"created_at":"2026-10-19T08:00:00Z"}"#;
        let data: SessionData = serde_json::from_str(json).unwrap();
        assert_eq!(data.provider, "google");
    }
}
