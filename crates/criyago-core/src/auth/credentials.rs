use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "criyago";

/// Persistence API keys kept in the OS keychain, one per store URL.
pub struct CredentialStore;

impl CredentialStore {
    pub fn store(store_url: &str, api_key: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, store_url).context("Failed to create keyring entry")?;
        entry
            .set_password(api_key)
            .context("Failed to store API key in keychain")?;
        Ok(())
    }

    pub fn get_api_key(store_url: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, store_url).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve API key from keychain")
    }

    pub fn delete(store_url: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, store_url).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete API key from keychain")?;
        Ok(())
    }

    pub fn has_api_key(store_url: &str) -> bool {
        if let Ok(entry) = Entry::new(SERVICE_NAME, store_url) {
            entry.get_password().is_ok()
        } else {
            false
        }
    }
}
