//! Flattening of the backend's task collections.
//!
//! The tasks endpoint answers with an `allData` value keyed by collection
//! name. Some deployments split it into an array of partial objects, so both
//! shapes are accepted and merged collection by collection.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::task::{Task, TaskKind};

/// Flatten `allData` into one task list.
///
/// Tasks come out grouped by collection in [`TaskKind::ALL`] order, records
/// in source order. Missing or non-array collections count as empty and a
/// malformed record is skipped without affecting its neighbours.
pub fn aggregate(all_data: &Value) -> Vec<Task> {
    let parts: Vec<&Map<String, Value>> = match all_data {
        Value::Object(map) => vec![map],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Null => Vec::new(),
        other => {
            warn!(kind = value_kind(other), "unexpected allData shape, treating as empty");
            Vec::new()
        }
    };

    for part in &parts {
        for key in part.keys() {
            if TaskKind::from_collection_key(key).is_none() {
                debug!(collection = %key, "ignoring unknown collection");
            }
        }
    }

    let mut tasks = Vec::new();
    let mut skipped = 0usize;

    for kind in TaskKind::ALL {
        for part in &parts {
            let records = match part.get(kind.collection_key()) {
                Some(Value::Array(records)) => records,
                Some(Value::Null) | None => continue,
                Some(other) => {
                    warn!(
                        collection = kind.collection_key(),
                        kind = value_kind(other),
                        "collection is not an array, treating as empty"
                    );
                    continue;
                }
            };

            for record in records {
                match Task::from_record(kind, record) {
                    Ok(task) => tasks.push(task),
                    Err(e) => {
                        skipped += 1;
                        warn!("Skipping task record: {}", e);
                    }
                }
            }
        }
    }

    debug!(tasks = tasks.len(), skipped, "aggregated task collections");
    tasks
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
