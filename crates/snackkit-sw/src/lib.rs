//! # SnackKit Service Worker
//!
//! The offline runtime for the SnackStopper habit tracker: caching,
//! fetch interception, push reminders and check-in routing.
//!
//! ## Features
//!
//! - **Lifecycle**: install, activate, skip-waiting, client claiming
//! - **Cache API**: versioned cache generations, atomic install commits
//! - **Fetch Interception**: network-first for the API, cache-first for
//!   static assets
//! - **Push**: payload decoding with graceful fallbacks, reminder
//!   notifications with check-in actions
//! - **Clients API**: open-or-focus routing back to the app page
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerRuntime
//!     ├── Lifecycle (installing → waiting → activating → active)
//!     ├── CacheStorage
//!     │       └── Cache ("snackstopper-v1")
//!     │               └── Request → CacheEntry
//!     ├── Clients (controlled pages)
//!     ├── dyn Fetch (network transport)
//!     └── dyn NotificationSink (platform notifications)
//! ```

use snackkit_common::ConfigError;
use snackkit_net::NetError;
use thiserror::Error;

pub mod cache;
pub mod clients;
pub mod fetch;
pub mod lifecycle;
pub mod push;
pub mod runtime;

pub use cache::{Cache, CacheEntry, CacheStorage};
pub use clients::{Client, Clients};
pub use fetch::InterceptedResponse;
pub use lifecycle::{Lifecycle, WorkerState};
pub use push::{
    CheckinAction, Notification, NotificationAction, NotificationCenter, NotificationSink,
    PushPayload,
};
pub use runtime::{ServiceWorkerRuntime, WorkerEvent};

/// Errors that can occur in service worker operations.
#[derive(Error, Debug)]
pub enum ServiceWorkerError {
    /// Precaching could not complete; nothing was committed.
    #[error("install failed: {0}")]
    InstallFailed(String),

    /// A network request failed and no fallback applied.
    #[error("network error: {0}")]
    Network(#[from] NetError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation was attempted in the wrong lifecycle state.
    #[error("state error: {0}")]
    State(String),

    /// The platform refused to render a notification.
    #[error("notification error: {0}")]
    Notification(String),
}

#[cfg(test)]
pub(crate) mod testutil {
    //! A scripted in-memory transport for exercising handlers without a
    //! server. Routes are keyed by method and path (query included), and
    //! every call is recorded for assertions.

    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use futures::future::BoxFuture;
    use hashbrown::HashMap;
    use http::{HeaderMap, StatusCode};
    use snackkit_net::{Fetch, NetError, Request, Response};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CallRecord {
        pub method: String,
        pub path: String,
        pub body: Option<Vec<u8>>,
    }

    /// Shared view of the calls a [`ScriptedFetch`] has served, usable
    /// after the fetcher itself has moved behind a trait object.
    #[derive(Clone)]
    pub struct CallLog(Arc<Mutex<Vec<CallRecord>>>);

    impl CallLog {
        pub fn calls(&self) -> Vec<CallRecord> {
            self.0
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        }

        pub fn count(&self) -> usize {
            self.0
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .len()
        }
    }

    pub struct ScriptedFetch {
        routes: HashMap<String, (u16, Vec<u8>)>,
        offline: bool,
        log: CallLog,
    }

    impl ScriptedFetch {
        pub fn new() -> Self {
            Self {
                routes: HashMap::new(),
                offline: false,
                log: CallLog(Arc::new(Mutex::new(Vec::new()))),
            }
        }

        /// A transport where every request fails before reaching a server.
        pub fn offline() -> Self {
            let mut fetch = Self::new();
            fetch.offline = true;
            fetch
        }

        pub fn route(mut self, method: &str, path: &str, status: u16, body: &[u8]) -> Self {
            self.routes
                .insert(format!("{method} {path}"), (status, body.to_vec()));
            self
        }

        pub fn log(&self) -> CallLog {
            self.log.clone()
        }

        pub fn call_count(&self) -> usize {
            self.log.count()
        }

        fn key(request: &Request) -> (String, String) {
            let mut path = request.url.path().to_string();
            if let Some(query) = request.url.query() {
                path.push('?');
                path.push_str(query);
            }
            let method = request.method.to_string();
            (method, path)
        }
    }

    impl Fetch for ScriptedFetch {
        fn fetch(&self, request: Request) -> BoxFuture<'_, Result<Response, NetError>> {
            let (method, path) = Self::key(&request);
            self.log
                .0
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(CallRecord {
                    method: method.clone(),
                    path: path.clone(),
                    body: request.body.as_ref().map(|b| b.to_vec()),
                });

            if self.offline {
                return Box::pin(async { Err(NetError::RequestFailed("offline".into())) });
            }

            let scripted = self.routes.get(&format!("{method} {path}")).cloned();
            let url = request.url.clone();
            Box::pin(async move {
                match scripted {
                    Some((status, body)) => Ok(Response {
                        url,
                        status: StatusCode::from_u16(status).unwrap(),
                        headers: HeaderMap::new(),
                        body: Bytes::from(body),
                    }),
                    None => Err(NetError::RequestFailed(format!(
                        "no route for {method} {path}"
                    ))),
                }
            })
        }
    }
}
