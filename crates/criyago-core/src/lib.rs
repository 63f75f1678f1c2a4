//! Core library for criyago.
//!
//! - `cache`: versioned offline cache manager for the app shell
//! - `wellness`: activity logging, goals, and derived progress
//! - `store`: the persistence collaborator (hosted REST or local)
//! - `auth`: signed-in identity and stored credentials

pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod store;
pub mod utils;
pub mod wellness;

pub use auth::{ensure_profile, CredentialStore, Identity, Session};
pub use cache::{CacheError, CacheManager, CacheOptions, CacheVersion};
pub use config::Config;
pub use store::{MemoryStore, RestStore, Store, StoreError};
pub use wellness::{GoalRequest, WellnessError, WellnessService};
