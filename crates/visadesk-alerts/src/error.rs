//! Error types for the alert pipeline.

use thiserror::Error;

/// Alert pipeline errors.
///
/// None of these abort a derivation run: malformed records are skipped and
/// failed lookups fall back to the next name source.
#[derive(Debug, Error)]
pub enum AlertError {
    /// A raw task record could not be turned into a [`crate::Task`]
    #[error("Malformed {collection} record: {message}")]
    MalformedRecord { collection: String, message: String },

    /// The client directory failed to answer a name lookup
    #[error("Client lookup failed for {client_id}: {message}")]
    ClientLookup { client_id: String, message: String },
}

impl AlertError {
    /// Create a MalformedRecord error
    pub fn malformed(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create a ClientLookup error
    pub fn lookup(client_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClientLookup {
            client_id: client_id.into(),
            message: message.into(),
        }
    }
}

/// Result type for alert pipeline operations.
pub type Result<T> = std::result::Result<T, AlertError>;
