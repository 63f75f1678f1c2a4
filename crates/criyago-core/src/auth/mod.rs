//! Identity for the wellness features.
//!
//! - `Session`: the provider-issued sign-in persisted between runs
//! - `Identity`: read-only "who is signed in" view handed to callers
//! - `CredentialStore`: persistence API key held in the OS keychain
//! - `ensure_profile`: mirrors a new identity into the `users` table
//!
//! Provider access tokens last an hour; an expired session reads as signed out.

pub mod credentials;
pub mod profile;
pub mod session;

pub use credentials::CredentialStore;
pub use profile::ensure_profile;
pub use session::{Identity, Session, SessionData};
