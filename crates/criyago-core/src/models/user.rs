//! Identity as seen by the core: who is signed in and their stored profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in identity supplied by the OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl CurrentUser {
    /// First word of the display name, for greetings
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("there")
    }
}

/// Row mirrored into the `users` table on first sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_identity(user: &CurrentUser) -> Self {
        let now = Utc::now();
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_name() {
        let user = CurrentUser {
            id: "u1".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada Lovelace".to_string(),
            avatar_url: None,
        };
        assert_eq!(user.first_name(), "Ada");
    }
}
