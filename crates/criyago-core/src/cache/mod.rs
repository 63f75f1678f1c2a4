//! Offline caching layer.
//!
//! `CacheManager` decides for every intercepted request whether to answer
//! from a local partition, from the network, or with the offline page, and
//! keeps only the current version's partitions alive.
//!
//! - `version`: partition naming and version comparison
//! - `request`: request/response snapshots and routing predicates
//! - `storage`: partition backends (memory, JSON on disk)
//! - `fetch`: the network seam
//! - `runtime`: host signals and the effects returned to the host

pub mod entry;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod request;
pub mod runtime;
pub mod storage;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use entry::CachedData;
pub use error::CacheError;
pub use fetch::{Fetcher, HttpFetcher};
pub use manager::{
    ActivationReport, CacheManager, CacheOptions, FetchOutcome, InstallReport, PartitionState,
    PartitionSummary,
};
pub use request::{Destination, Request, RequestKey, RequestMode, Response};
pub use runtime::{Notification, RuntimeAction, Signal};
pub use storage::{CacheStorage, CachedResponse, DiskStorage, MemoryStorage};
pub use version::{CacheVersion, PartitionAge, PartitionKind};
