//! Event dispatch for the worker runtime.
//!
//! The host delivers one event at a time but independent events may be in
//! flight concurrently; handlers take `&self` and share the cache store
//! behind an async lock. A handler's returned future is the Rust rendition
//! of `waitUntil`: the host awaits it to completion before it may terminate
//! the worker. The only deliberately detached work is the action-routed
//! check-in send, tracked so [`ServiceWorkerRuntime::settle`] can extend
//! the worker's lifetime over it.

use std::future::Future;
use std::sync::{Arc, Mutex};

use snackkit_common::WorkerConfig;
use snackkit_net::{ApiClient, Fetch, NetError, Request};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::cache::CacheStorage;
use crate::clients::Clients;
use crate::fetch::{self, InterceptedResponse};
use crate::lifecycle::{self, Lifecycle, WorkerState};
use crate::push::{CheckinAction, Notification, NotificationSink, PushPayload};
use crate::ServiceWorkerError;

/// An event delivered by the host platform.
#[derive(Debug)]
pub enum WorkerEvent {
    /// New worker version: populate the cache.
    Install,
    /// Take over: purge stale generations, claim pages.
    Activate,
    /// A controlled page issued a request.
    Fetch(Request),
    /// A push message arrived, with its raw payload if any.
    Push(Option<Vec<u8>>),
    /// The user interacted with a rendered notification; `None` is a plain
    /// click on the notification body.
    NotificationClick(Option<CheckinAction>),
}

/// The service worker runtime: configuration plus the shared resources the
/// event handlers operate on.
pub struct ServiceWorkerRuntime {
    config: WorkerConfig,
    lifecycle: RwLock<Lifecycle>,
    storage: Arc<RwLock<CacheStorage>>,
    clients: Arc<RwLock<Clients>>,
    fetcher: Arc<dyn Fetch>,
    notifications: Arc<dyn NotificationSink>,
    api: ApiClient,
    detached: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceWorkerRuntime {
    pub fn new(
        config: WorkerConfig,
        fetcher: Arc<dyn Fetch>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        let api = ApiClient::new(config.base_url.clone(), Arc::clone(&fetcher))
            .with_checkin_path(config.checkin_path.clone());
        Self {
            lifecycle: RwLock::new(Lifecycle::new(config.skip_waiting)),
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            clients: Arc::new(RwLock::new(Clients::new())),
            fetcher,
            notifications,
            api,
            detached: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn storage(&self) -> Arc<RwLock<CacheStorage>> {
        Arc::clone(&self.storage)
    }

    pub fn clients(&self) -> Arc<RwLock<Clients>> {
        Arc::clone(&self.clients)
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state()
    }

    /// Dispatch one host event to its handler. Fetch events produce a
    /// response; the others complete with side effects only.
    pub async fn handle_event(
        &self,
        event: WorkerEvent,
    ) -> Result<Option<InterceptedResponse>, ServiceWorkerError> {
        match event {
            WorkerEvent::Install => self.install().await.map(|_| None),
            WorkerEvent::Activate => self.activate().await.map(|_| None),
            WorkerEvent::Fetch(request) => self.fetch(request).await.map(Some),
            WorkerEvent::Push(data) => self.push(data.as_deref()).await.map(|_| None),
            WorkerEvent::NotificationClick(action) => {
                self.notification_click(action).await.map(|_| None)
            }
        }
    }

    /// Install: populate the cache, all-or-nothing. On failure the worker
    /// goes redundant and the previous version (if any) stays active.
    pub async fn install(&self) -> Result<(), ServiceWorkerError> {
        match lifecycle::install(&self.config, self.fetcher.as_ref(), &self.storage).await {
            Ok(()) => {
                let state = self.lifecycle.write().await.install_succeeded();
                debug!(state = %state, "install succeeded");
                Ok(())
            }
            Err(err) => {
                self.lifecycle.write().await.install_failed();
                Err(err)
            }
        }
    }

    /// Activate: purge stale generations and claim the open pages.
    pub async fn activate(&self) -> Result<(), ServiceWorkerError> {
        lifecycle::activate(&self.config, &self.storage, &self.clients).await?;
        self.lifecycle.write().await.activated();
        Ok(())
    }

    /// Resolve an intercepted request.
    pub async fn fetch(
        &self,
        request: Request,
    ) -> Result<InterceptedResponse, ServiceWorkerError> {
        fetch::handle_fetch(&self.config, self.fetcher.as_ref(), &self.storage, request).await
    }

    /// Render the reminder notification for a push message. Decoding
    /// degrades instead of failing; a failed render is logged and final,
    /// since push messages are not redelivered.
    pub async fn push(&self, data: Option<&[u8]>) -> Result<(), ServiceWorkerError> {
        let payload = PushPayload::decode(&self.config.notification, data);
        let notification = Notification::reminder(&self.config.notification, payload);
        if let Err(err) = self.notifications.show(notification) {
            error!(error = %err, "notification render failed");
        }
        Ok(())
    }

    /// Route a notification interaction: close the notification, send the
    /// check-in the action selects (detached, best-effort), then open or
    /// focus the app page.
    pub async fn notification_click(
        &self,
        action: Option<CheckinAction>,
    ) -> Result<(), ServiceWorkerError> {
        // Close first so the notification cannot resurface.
        self.notifications.close(&self.config.notification.tag);

        if let Some(action) = action {
            let api = self.api.clone();
            self.detach("checkin", async move {
                api.checkin(action.passed()).await.map(|_| ())
            });
        }

        let app_url = self.config.resolve(&self.config.app_path)?;
        self.clients.write().await.open_window(app_url);
        Ok(())
    }

    /// Spawn a best-effort request. Its result is never surfaced and it is
    /// never retried; failure is observable only in the log.
    fn detach<F>(&self, task: &'static str, fut: F)
    where
        F: Future<Output = Result<(), NetError>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(err) = fut.await {
                warn!(task, error = %err, "detached request failed");
            }
        });
        self.detached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }

    /// Await all outstanding detached work. This is the stay-alive
    /// contract: the host calls it before terminating the worker so
    /// background sends run to completion or failure.
    pub async fn settle(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self
                .detached
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for handle in handles {
            let _ = handle.await;
        }
    }
}
