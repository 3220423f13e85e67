//! Client records and client-name resolution.
//!
//! Alerts name the client. The name comes from, in order:
//!
//! 1. the client document embedded in the task (`clientId.name`)
//! 2. the client list fetched alongside the tasks ([`ClientIndex`])
//! 3. a per-id lookup through a [`ClientDirectory`]
//! 4. [`UNKNOWN_CLIENT`]

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use visadesk_core::types::ClientId;

use crate::error::Result;
use crate::task::ClientRef;

/// Name shown when no source knows the client.
pub const UNKNOWN_CLIENT: &str = "Unknown Client";

/// A client record as returned by the clients endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "_id", alias = "id")]
    pub id: ClientId,
    #[serde(default)]
    pub name: String,
}

/// Client names by id.
#[derive(Debug, Clone, Default)]
pub struct ClientIndex {
    names: HashMap<ClientId, String>,
}

impl ClientIndex {
    /// Build an index from a client list. Clients without a name are skipped.
    pub fn new(clients: impl IntoIterator<Item = Client>) -> Self {
        let names = clients
            .into_iter()
            .filter(|c| !c.name.trim().is_empty())
            .map(|c| (c.id, c.name))
            .collect();
        Self { names }
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Per-id client lookup, backed by the REST API in production.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Look up one client's display name. `Ok(None)` means no such client.
    async fn client_name(&self, id: &str) -> Result<Option<String>>;
}

/// Resolves client names for one derivation run, caching directory lookups.
pub struct ClientNameResolver<'a> {
    index: &'a ClientIndex,
    directory: Option<&'a dyn ClientDirectory>,
    cache: HashMap<ClientId, Option<String>>,
}

impl<'a> ClientNameResolver<'a> {
    pub fn new(index: &'a ClientIndex, directory: Option<&'a dyn ClientDirectory>) -> Self {
        Self {
            index,
            directory,
            cache: HashMap::new(),
        }
    }

    /// Resolve the display name for a task's client. Never fails.
    pub async fn resolve(&mut self, client: &ClientRef) -> String {
        if let Some(name) = client.embedded_name().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        let Some(id) = client.id() else {
            return UNKNOWN_CLIENT.to_string();
        };

        if let Some(name) = self.index.name(id) {
            return name.to_string();
        }

        if let Some(cached) = self.cache.get(id) {
            return cached.clone().unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
        }

        let looked_up = match self.directory {
            Some(directory) => match directory.client_name(id).await {
                Ok(name) => name.filter(|n| !n.trim().is_empty()),
                Err(e) => {
                    warn!("Client name lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        debug!(client_id = %id, found = looked_up.is_some(), "resolved client via directory");
        self.cache.insert(id.to_string(), looked_up.clone());
        looked_up.unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    /// Number of directory lookups made so far.
    pub fn lookups(&self) -> usize {
        self.cache.len()
    }
}
