use tracing::info;

use crate::models::{CurrentUser, UserProfile};
use crate::store::{self, Filter, Store, StoreError, Table};

/// Return the stored profile for `user`, creating it on first sign-in.
pub async fn ensure_profile(store: &dyn Store, user: &CurrentUser) -> Result<UserProfile, StoreError> {
    let filter = Filter::new().eq("email", user.email.as_str());
    let existing: Vec<UserProfile> = store::select_as(store, Table::Users, &filter).await?;
    if let Some(profile) = existing.into_iter().next() {
        return Ok(profile);
    }

    let profile = store::insert_as(store, Table::Users, &UserProfile::from_identity(user)).await?;
    info!(email = %profile.email, "Created user profile");
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_profile_created_once() {
        let store = MemoryStore::new();
        let user = CurrentUser {
            id: "u1".to_string(),
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            avatar_url: Some("https://example.com/a.png".to_string()),
        };

        let first = ensure_profile(&store, &user).await.unwrap();
        let second = ensure_profile(&store, &user).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(store.row_count(Table::Users), 1);
    }
}
