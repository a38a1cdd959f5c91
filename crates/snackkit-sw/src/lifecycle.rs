//! Install/activate lifecycle.
//!
//! Install stages a complete cache generation and commits it only when every
//! manifest asset fetched successfully, so a broken or partial cache is
//! never current. Activate purges every other generation and claims the
//! open pages.

use snackkit_common::WorkerConfig;
use snackkit_net::{Fetch, Request};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheEntry, CacheStorage};
use crate::clients::Clients;
use crate::ServiceWorkerError;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Install event in progress.
    Installing,
    /// Installed, holding until open pages close.
    Waiting,
    /// Activate event in progress.
    Activating,
    /// Controlling pages. Terminal.
    Active,
    /// Install failed; this version never takes effect.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the worker's lifecycle transitions.
#[derive(Debug)]
pub struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
}

impl Lifecycle {
    /// A freshly registered worker starts installing.
    pub fn new(skip_waiting: bool) -> Self {
        Self {
            state: WorkerState::Installing,
            skip_waiting,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Request immediate takeover: a successful install will not hold in
    /// the waiting state.
    pub fn skip_waiting(&mut self) {
        self.skip_waiting = true;
        if self.state == WorkerState::Waiting {
            self.state = WorkerState::Activating;
        }
    }

    /// Install completed with every asset cached.
    pub fn install_succeeded(&mut self) -> WorkerState {
        self.state = if self.skip_waiting {
            WorkerState::Activating
        } else {
            WorkerState::Waiting
        };
        self.state
    }

    /// Install failed; the worker becomes redundant and the previous
    /// version, if any, stays active.
    pub fn install_failed(&mut self) {
        self.state = WorkerState::Redundant;
    }

    /// Activation completed.
    pub fn activated(&mut self) {
        self.state = WorkerState::Active;
    }

    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Active
    }

    pub fn is_redundant(&self) -> bool {
        self.state == WorkerState::Redundant
    }
}

/// Populate the current generation from the asset manifest.
///
/// All-or-nothing: every asset is fetched into a staged cache and the
/// generation is committed in one step at the end. Any fetch failure or
/// non-2xx status aborts the install and commits nothing.
pub async fn install(
    config: &WorkerConfig,
    fetcher: &dyn Fetch,
    storage: &RwLock<CacheStorage>,
) -> Result<(), ServiceWorkerError> {
    let mut staged = Cache::new(&config.cache_name);

    for asset in &config.asset_manifest {
        let url = config.resolve(asset)?;
        let request = Request::get(url);

        let response = fetcher.fetch(request.clone()).await.map_err(|e| {
            warn!(asset = %asset, error = %e, "manifest asset fetch failed");
            ServiceWorkerError::InstallFailed(format!("{asset}: {e}"))
        })?;

        if !response.ok() {
            warn!(asset = %asset, status = %response.status, "manifest asset returned error status");
            return Err(ServiceWorkerError::InstallFailed(format!(
                "{asset}: status {}",
                response.status
            )));
        }

        staged.put(CacheEntry::capture(&request, &response));
        debug!(asset = %asset, "asset staged");
    }

    let assets = staged.len();
    storage.write().await.insert(staged);
    info!(cache = %config.cache_name, assets, "install complete");
    Ok(())
}

/// Purge every generation other than the current one, then claim all open
/// pages so in-flight pages are served by this version without a reload.
pub async fn activate(
    config: &WorkerConfig,
    storage: &RwLock<CacheStorage>,
    clients: &RwLock<Clients>,
) -> Result<(), ServiceWorkerError> {
    {
        let mut storage = storage.write().await;
        for name in storage.generations() {
            if name != config.cache_name {
                storage.delete(&name);
                debug!(generation = %name, "stale generation purged");
            }
        }
    }

    let claimed = clients.write().await.claim();
    info!(cache = %config.cache_name, claimed, "activate complete");
    Ok(())
}
