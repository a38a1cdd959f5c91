//! Registry of pages the worker controls.

use hashbrown::HashMap;
use tracing::debug;
use url::Url;

/// A window client (an open page).
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Page URL.
    pub url: Url,

    /// Whether the page currently has focus.
    pub focused: bool,

    /// Whether this worker serves the page's requests.
    pub controlled: bool,
}

/// All known window clients.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
    next_id: u64,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("client-{}", self.next_id)
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Register a page opened outside the worker. It stays uncontrolled
    /// until this worker claims it.
    pub fn add(&mut self, url: Url) -> String {
        let id = self.next_id();
        self.clients.insert(
            id.clone(),
            Client {
                id: id.clone(),
                url,
                focused: false,
                controlled: false,
            },
        );
        id
    }

    /// Remove a client (page closed).
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    /// Take control of every known client, without waiting for a reload.
    /// Returns how many clients were newly claimed.
    pub fn claim(&mut self) -> usize {
        let mut claimed = 0;
        for client in self.clients.values_mut() {
            if !client.controlled {
                client.controlled = true;
                claimed += 1;
            }
        }
        debug!(claimed, total = self.clients.len(), "clients claimed");
        claimed
    }

    /// Focus an existing window showing `url`, or open a new one. A window
    /// opened by the worker is controlled from the start. Returns the
    /// client ID.
    pub fn open_window(&mut self, url: Url) -> String {
        for client in self.clients.values_mut() {
            client.focused = false;
        }

        let existing = self
            .clients
            .values()
            .find(|c| c.url == url)
            .map(|c| c.id.clone());

        match existing {
            Some(id) => {
                if let Some(client) = self.clients.get_mut(&id) {
                    client.focused = true;
                }
                debug!(client = %id, %url, "focused existing window");
                id
            }
            None => {
                let id = self.next_id();
                self.clients.insert(
                    id.clone(),
                    Client {
                        id: id.clone(),
                        url: url.clone(),
                        focused: true,
                        controlled: true,
                    },
                );
                debug!(client = %id, %url, "opened window");
                id
            }
        }
    }

    /// The currently focused client, if any.
    pub fn focused(&self) -> Option<&Client> {
        self.clients.values().find(|c| c.focused)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
