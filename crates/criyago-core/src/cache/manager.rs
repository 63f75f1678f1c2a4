//! The cache manager: install, activate, per-request routing, and signals.
//!
//! The host runtime calls into a `CacheManager` for each lifecycle event
//! and each intercepted request. Routing precedence for `handle`:
//!
//! 1. non-GET or browser-internal scheme: pass through, no cache access
//! 2. navigation: network-first into the dynamic partition, offline page fallback
//! 3. image/script/style or icon path: cache-first into the static partition
//! 4. everything else: network-first into the dynamic partition, no offline page
//!
//! Writes after a successful fetch run as detached tasks so the caller is
//! never blocked on them. Their failures are logged and otherwise ignored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use futures::future::{join_all, try_join_all};
use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::runtime::{Notification, RuntimeAction, Signal, BACKGROUND_SYNC_TAG, DEFAULT_PUSH_BODY, EXPLORE_ACTION};
use super::storage::{CacheStorage, CachedResponse};
use super::version::{CacheVersion, PartitionAge, PartitionKind};
use super::{CacheError, CachedData, Fetcher, Request, RequestKey, Response};

/// Path fragment marking icon assets, which are always served cache-first.
pub const DEFAULT_ICON_MARKER: &str = "/icon-";

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub version: CacheVersion,
    /// Base URL that relative manifest paths and the root window resolve against
    pub origin: Url,
    pub offline_page: String,
    pub icon: String,
    pub icon_marker: String,
    pub notification_title: String,
}

impl CacheOptions {
    pub fn new(version: CacheVersion, origin: Url) -> Self {
        Self {
            version,
            origin,
            offline_page: "/offline.html".to_string(),
            icon: "/icon-192.jpg".to_string(),
            icon_marker: DEFAULT_ICON_MARKER.to_string(),
            notification_title: "Criyago".to_string(),
        }
    }
}

/// Lifecycle of a partition as seen by this manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    Absent,
    Installing,
    Active,
    /// Deleted by activation of a newer version
    Superseded,
}

/// What `handle` decided for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself
    Passthrough,
    Network(Response),
    Cache(CachedResponse),
    /// The designated offline page stood in for an unreachable navigation
    Offline(CachedResponse),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Network(response) => Some(response),
            FetchOutcome::Cache(cached) | FetchOutcome::Offline(cached) => Some(&cached.data),
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            FetchOutcome::Passthrough => "passthrough",
            FetchOutcome::Network(_) => "network",
            FetchOutcome::Cache(_) => "cache",
            FetchOutcome::Offline(_) => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstallReport {
    pub partition: String,
    pub cached: usize,
    pub actions: Vec<RuntimeAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub actions: Vec<RuntimeAction>,
}

#[derive(Debug, Clone)]
pub struct PartitionSummary {
    pub name: String,
    pub age: PartitionAge,
    pub state: PartitionState,
    pub entries: usize,
    /// Age of the most recently captured entry
    pub last_updated: Option<String>,
}

pub struct CacheManager {
    options: CacheOptions,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    states: RwLock<HashMap<String, PartitionState>>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl CacheManager {
    pub fn new(options: CacheOptions, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            options,
            storage,
            fetcher,
            states: RwLock::new(HashMap::new()),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn version(&self) -> &CacheVersion {
        &self.options.version
    }

    pub fn resolve(&self, path: &str) -> Result<Url, CacheError> {
        self.options.origin.join(path).map_err(|e| CacheError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn set_state(&self, partition: &str, state: PartitionState) {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        if state == PartitionState::Absent {
            states.remove(partition);
        } else {
            states.insert(partition.to_string(), state);
        }
    }

    pub fn partition_state(&self, partition: &str) -> PartitionState {
        let tracked = self
            .states
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(partition)
            .copied();
        match tracked {
            Some(state) => state,
            // Partitions left over from an earlier run count as populated
            None => match self.storage.has(partition) {
                Ok(true) => PartitionState::Active,
                _ => PartitionState::Absent,
            },
        }
    }

    // ===== Install =====

    /// Populate the current static partition with every manifest URL.
    ///
    /// All URLs are fetched before anything is written; a single failure
    /// aborts the install and leaves no partially filled partition behind.
    pub async fn install(&self, manifest: &[String]) -> Result<InstallReport, CacheError> {
        let partition = self.options.version.static_partition();
        info!(partition = %partition, urls = manifest.len(), "Installing cache version");

        self.set_state(&partition, PartitionState::Installing);
        let created = self.storage.open(&partition)?;

        let written = match self.fetch_manifest(&partition, manifest).await {
            Ok(entries) => self.write_entries(&partition, entries),
            Err(e) => Err(e),
        };

        match written {
            Ok(cached) => {
                self.set_state(&partition, PartitionState::Active);
                info!(partition = %partition, cached = cached, "Static assets cached");
                Ok(InstallReport {
                    partition,
                    cached,
                    actions: vec![RuntimeAction::SkipWaiting],
                })
            }
            Err(e) => {
                error!(partition = %partition, error = %e, "Failed to cache static assets");
                if created {
                    if let Err(cleanup) = self.storage.delete(&partition) {
                        warn!(partition = %partition, error = %cleanup, "Failed to remove incomplete partition");
                    }
                    self.set_state(&partition, PartitionState::Absent);
                } else {
                    // An earlier successful install of this version is still intact
                    self.set_state(&partition, PartitionState::Active);
                }
                Err(e)
            }
        }
    }

    fn write_entries(
        &self,
        partition: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> Result<usize, CacheError> {
        let cached = entries.len();
        for (key, response) in entries {
            self.storage.put(partition, &key, CachedData::new(response))?;
        }
        Ok(cached)
    }

    async fn fetch_manifest(
        &self,
        partition: &str,
        manifest: &[String],
    ) -> Result<Vec<(RequestKey, Response)>, CacheError> {
        let requests = manifest
            .iter()
            .map(|path| self.resolve(path).map(Request::get))
            .collect::<Result<Vec<_>, _>>()?;

        let fetches = requests.iter().map(|request| async move {
            let install_error = |reason: String| CacheError::Install {
                partition: partition.to_string(),
                url: request.url.to_string(),
                reason,
            };
            let response = self
                .fetcher
                .fetch(request)
                .await
                .map_err(|e| install_error(e.to_string()))?;
            if !response.is_cacheable() {
                return Err(install_error(format!("status {}", response.status)));
            }
            Ok((request.key(), response))
        });

        try_join_all(fetches).await
    }

    // ===== Activate =====

    /// Delete every partition that is not this version's static or dynamic
    /// partition, then ask the host to claim open pages.
    pub async fn activate(&self) -> Result<ActivationReport, CacheError> {
        let version = &self.options.version;
        let static_partition = version.static_partition();
        if !self.storage.has(&static_partition)?
            || self.partition_state(&static_partition) == PartitionState::Installing
        {
            return Err(CacheError::NotInstalled(version.to_string()));
        }

        info!(version = %version, "Activating cache version");
        let stale: Vec<String> = self
            .storage
            .keys()?
            .into_iter()
            .filter(|name| !version.is_current(name))
            .collect();

        let deletions = stale.iter().map(|name| {
            match version.classify(name) {
                PartitionAge::Newer => warn!(partition = %name, "Deleting partition from a newer version"),
                age => info!(partition = %name, ?age, "Deleting old cache"),
            }
            let storage = Arc::clone(&self.storage);
            let name = name.clone();
            tokio::task::spawn_blocking(move || storage.delete(&name))
        });

        // Every deletion must finish before the new version serves traffic
        let mut failures = Vec::new();
        for (name, result) in stale.iter().zip(join_all(deletions).await) {
            match result {
                Ok(Ok(_)) => self.set_state(name, PartitionState::Superseded),
                Ok(Err(e)) => failures.push(format!("{}: {}", name, e)),
                Err(e) => failures.push(format!("{}: {}", name, e)),
            }
        }
        if !failures.is_empty() {
            return Err(CacheError::Storage(format!(
                "Failed to delete stale partitions: {}",
                failures.join("; ")
            )));
        }

        self.set_state(&static_partition, PartitionState::Active);
        info!(deleted = stale.len(), "Cache version activated");
        Ok(ActivationReport {
            deleted: stale,
            actions: vec![RuntimeAction::ClaimClients],
        })
    }

    // ===== Fetch routing =====

    pub async fn handle(&self, request: &Request) -> Result<FetchOutcome, CacheError> {
        if !request.is_interceptable() {
            return Ok(FetchOutcome::Passthrough);
        }

        if request.is_navigation() {
            return self.network_first(request, true).await;
        }

        if request.is_static_asset(&self.options.icon_marker) {
            return self.cache_first(request).await;
        }

        self.network_first(request, false).await
    }

    async fn network_first(&self, request: &Request, offline_fallback: bool) -> Result<FetchOutcome, CacheError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_detached(PartitionKind::Dynamic, request.key(), response.clone());
                }
                Ok(FetchOutcome::Network(response))
            }
            Err(e) => {
                debug!(url = %request.url, error = %e, "Network unavailable, falling back to cache");
                if let Some(hit) = self.lookup(&request.key()) {
                    return Ok(FetchOutcome::Cache(hit));
                }
                if offline_fallback {
                    let offline = Request::get(self.resolve(&self.options.offline_page)?);
                    if let Some(page) = self.lookup(&offline.key()) {
                        return Ok(FetchOutcome::Offline(page));
                    }
                }
                Err(CacheError::CacheMiss(request.url.to_string()))
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, CacheError> {
        if let Some(hit) = self.lookup(&request.key()) {
            return Ok(FetchOutcome::Cache(hit));
        }

        let response = self.fetcher.fetch(request).await.map_err(|e| {
            debug!(url = %request.url, error = %e, "Failed to fetch asset");
            e
        })?;
        if response.is_cacheable() {
            self.store_detached(PartitionKind::Static, request.key(), response.clone());
        }
        Ok(FetchOutcome::Network(response))
    }

    /// Lookup across all partitions; a storage failure reads as a miss
    fn lookup(&self, key: &RequestKey) -> Option<CachedResponse> {
        match self.storage.lookup_any(key) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    fn store_detached(&self, kind: PartitionKind, key: RequestKey, response: Response) {
        let partition = self.options.version.partition_name(kind);
        let storage = Arc::clone(&self.storage);

        let handle = tokio::task::spawn_blocking(move || {
            if let Err(e) = storage.put(&partition, &key, CachedData::new(response)) {
                warn!(partition = %partition, key = %key, error = %e, "Background cache write failed");
            }
        });

        let mut pending = self.pending_writes.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every detached cache write started so far
    pub async fn settle(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending_writes.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(error = %e, "Background cache write task failed");
            }
        }
    }

    // ===== Signals =====

    pub fn notify(&self, signal: Signal) -> Vec<RuntimeAction> {
        match signal {
            Signal::Sync { tag } => {
                // Nothing is queued for deferred retry yet
                debug!(tag = %tag, recognized = tag == BACKGROUND_SYNC_TAG, "Background sync triggered");
                Vec::new()
            }
            Signal::Push { payload } => {
                debug!(has_payload = payload.is_some(), "Push notification received");
                let body = payload.unwrap_or_else(|| DEFAULT_PUSH_BODY.to_string());
                vec![RuntimeAction::ShowNotification {
                    title: self.options.notification_title.clone(),
                    notification: Notification::new(body, &self.options.icon),
                }]
            }
            Signal::NotificationClick { action } => {
                debug!(action = ?action, "Notification clicked");
                let mut actions = vec![RuntimeAction::CloseNotification];
                if action.as_deref() == Some(EXPLORE_ACTION) {
                    actions.push(RuntimeAction::OpenWindow {
                        url: self.options.origin.join("/").map(|u| u.to_string()).unwrap_or_else(|_| "/".to_string()),
                    });
                }
                actions
            }
        }
    }

    // ===== Status =====

    pub fn partitions(&self) -> Result<Vec<PartitionSummary>, CacheError> {
        self.storage
            .keys()?
            .into_iter()
            .map(|name| {
                let entries = self.storage.entries(&name)?;
                let last_updated = entries
                    .iter()
                    .max_by_key(|(_, cached)| cached.cached_at)
                    .map(|(_, cached)| cached.age_display());
                Ok(PartitionSummary {
                    age: self.options.version.classify(&name),
                    state: self.partition_state(&name),
                    entries: entries.len(),
                    last_updated,
                    name,
                })
            })
            .collect()
    }
}
