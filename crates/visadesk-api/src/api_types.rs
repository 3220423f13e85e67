//! Wire types for the agency REST endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use visadesk_alerts::Client;

/// `GET /api/tasks/all`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TasksResponse {
    #[serde(default)]
    pub success: bool,
    /// Collections keyed by name, or a list of single-collection objects
    #[serde(default)]
    pub all_data: Value,
}

/// `GET /api/clients`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub clients: Vec<Client>,
}

/// `GET /api/clients/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientResponse {
    /// Absent or null when the backend does not know the id
    #[serde(default)]
    pub client: Option<ClientName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientName {
    #[serde(default)]
    pub name: Option<String>,
}
