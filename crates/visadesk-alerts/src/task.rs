//! Task records from the agency backend.
//!
//! The backend keeps six task collections whose records share most fields but
//! name their progress field differently. [`TaskVariant`] carries each
//! collection's status so completion is decided by one exhaustive match. The
//! status is read from the collection's own field, falling back to the other
//! collections' field names when that one is absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::debug;
use visadesk_core::types::{ClientId, TaskId};

use crate::error::{AlertError, Result};

/// Status value that marks a task as finished.
pub const STATUS_COMPLETED: &str = "Completed";

/// Status value that marks a task as called off.
pub const STATUS_CANCELLED: &str = "Cancelled";

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Every progress field name the backend uses, across all collections.
const STATUS_FIELDS: [&str; 5] = [
    "visaStatus",
    "applicationStatus",
    "translationStatus",
    "status",
    "jobStatus",
];

/// The backend collection a task came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Application,
    EPassport,
    Translation,
    JapanVisit,
    OtherService,
    GraphicDesign,
}

impl TaskKind {
    /// All kinds, in the order the aggregator emits them.
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Application,
        TaskKind::EPassport,
        TaskKind::Translation,
        TaskKind::JapanVisit,
        TaskKind::OtherService,
        TaskKind::GraphicDesign,
    ];

    /// Key of this collection in the backend's `allData` object.
    pub fn collection_key(&self) -> &'static str {
        match self {
            TaskKind::Application => "application",
            TaskKind::EPassport => "epassports",
            TaskKind::Translation => "documentTranslation",
            TaskKind::JapanVisit => "japanVisit",
            TaskKind::OtherService => "otherServices",
            TaskKind::GraphicDesign => "graphicDesigns",
        }
    }

    /// Look up a kind by its collection key.
    pub fn from_collection_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection_key() == key)
    }

    /// Default task model label, used when a record has no `applicationType`.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Application => "Application",
            TaskKind::EPassport => "ePassport",
            TaskKind::Translation => "Document Translation",
            TaskKind::JapanVisit => "Japan Visit",
            TaskKind::OtherService => "Other Service",
            TaskKind::GraphicDesign => "Graphic Design",
        }
    }

    /// Name of the JSON field holding this collection's progress status.
    pub fn status_field(&self) -> &'static str {
        match self {
            TaskKind::Application => "visaStatus",
            TaskKind::EPassport => "applicationStatus",
            TaskKind::Translation => "translationStatus",
            TaskKind::JapanVisit => "status",
            TaskKind::OtherService => "jobStatus",
            TaskKind::GraphicDesign => "status",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-collection payload: each variant owns its status field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskVariant {
    Application { visa_status: Option<String> },
    EPassport { application_status: Option<String> },
    Translation { translation_status: Option<String> },
    JapanVisit { status: Option<String> },
    OtherService { job_status: Option<String> },
    GraphicDesign { status: Option<String> },
}

impl TaskVariant {
    fn from_status(kind: TaskKind, status: Option<String>) -> Self {
        match kind {
            TaskKind::Application => TaskVariant::Application {
                visa_status: status,
            },
            TaskKind::EPassport => TaskVariant::EPassport {
                application_status: status,
            },
            TaskKind::Translation => TaskVariant::Translation {
                translation_status: status,
            },
            TaskKind::JapanVisit => TaskVariant::JapanVisit { status },
            TaskKind::OtherService => TaskVariant::OtherService { job_status: status },
            TaskKind::GraphicDesign => TaskVariant::GraphicDesign { status },
        }
    }

    /// The collection this variant belongs to.
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskVariant::Application { .. } => TaskKind::Application,
            TaskVariant::EPassport { .. } => TaskKind::EPassport,
            TaskVariant::Translation { .. } => TaskKind::Translation,
            TaskVariant::JapanVisit { .. } => TaskKind::JapanVisit,
            TaskVariant::OtherService { .. } => TaskKind::OtherService,
            TaskVariant::GraphicDesign { .. } => TaskKind::GraphicDesign,
        }
    }

    /// The progress status, whatever the collection calls it.
    pub fn status(&self) -> Option<&str> {
        match self {
            TaskVariant::Application { visa_status } => visa_status.as_deref(),
            TaskVariant::EPassport { application_status } => application_status.as_deref(),
            TaskVariant::Translation { translation_status } => translation_status.as_deref(),
            TaskVariant::JapanVisit { status } => status.as_deref(),
            TaskVariant::OtherService { job_status } => job_status.as_deref(),
            TaskVariant::GraphicDesign { status } => status.as_deref(),
        }
    }
}

/// Reference from a task to its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRef {
    /// Populated client document (`clientId: { _id, name }`)
    Embedded {
        id: Option<ClientId>,
        name: Option<String>,
    },
    /// Bare client id
    Id(ClientId),
    /// No client recorded
    Missing,
}

impl ClientRef {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => ClientRef::Embedded {
                id: id_field(map, "_id").or_else(|| id_field(map, "id")),
                name: str_field(map, "name"),
            },
            Some(Value::String(id)) if !id.is_empty() => ClientRef::Id(id.clone()),
            Some(Value::Number(n)) => ClientRef::Id(n.to_string()),
            _ => ClientRef::Missing,
        }
    }

    /// Display name carried on the task itself, if any.
    pub fn embedded_name(&self) -> Option<&str> {
        match self {
            ClientRef::Embedded { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    /// Client id to look up when no name is embedded.
    pub fn id(&self) -> Option<&str> {
        match self {
            ClientRef::Embedded { id, .. } => id.as_deref(),
            ClientRef::Id(id) => Some(id),
            ClientRef::Missing => None,
        }
    }
}

/// Payment state of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Due,
    /// Any other value the backend stored, kept verbatim
    Other(String),
}

impl PaymentStatus {
    fn parse(raw: &str) -> Self {
        match raw {
            "Paid" => PaymentStatus::Paid,
            "Due" => PaymentStatus::Due,
            other => PaymentStatus::Other(other.to_string()),
        }
    }
}

/// A normalized task from any of the six collections.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    /// `applicationType` when present, else the collection label
    pub task_model: String,
    pub client: ClientRef,
    pub deadline: Option<DateTime<Utc>>,
    pub handled_by: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub due_amount: f64,
    pub variant: TaskVariant,
}

impl Task {
    /// Parse one raw record from the given collection.
    ///
    /// Only a non-object record or a missing id is an error; every other
    /// field is optional and defaults instead of failing.
    pub fn from_record(kind: TaskKind, value: &Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            AlertError::malformed(kind.collection_key(), "record is not a JSON object")
        })?;

        let id = id_field(map, "_id")
            .or_else(|| id_field(map, "id"))
            .ok_or_else(|| AlertError::malformed(kind.collection_key(), "record has no id"))?;

        let task_model = str_field(map, "applicationType")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| kind.label().to_string());

        let deadline = map.get("deadline").and_then(parse_deadline);
        if deadline.is_none() && map.get("deadline").is_some_and(|v| !v.is_null()) {
            debug!(task_id = %id, "ignoring unparseable deadline");
        }

        Ok(Self {
            id,
            task_model,
            client: ClientRef::from_value(map.get("clientId")),
            deadline,
            handled_by: str_field(map, "handledBy"),
            payment_status: str_field(map, "paymentStatus").map(|s| PaymentStatus::parse(&s)),
            due_amount: map.get("dueAmount").map(parse_amount).unwrap_or(0.0),
            variant: TaskVariant::from_status(kind, status_field(map, kind)),
        })
    }

    /// The collection this task came from.
    pub fn kind(&self) -> TaskKind {
        self.variant.kind()
    }

    /// True when the task's status reads `Completed`.
    pub fn is_completed(&self) -> bool {
        self.variant.status() == Some(STATUS_COMPLETED)
    }

    /// True when the task's status reads `Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.variant.status() == Some(STATUS_CANCELLED)
    }

    /// True when the payment status is `Paid`.
    pub fn is_paid(&self) -> bool {
        self.payment_status == Some(PaymentStatus::Paid)
    }

    /// True when the payment status is `Due`.
    pub fn is_payment_due(&self) -> bool {
        self.payment_status == Some(PaymentStatus::Due)
    }

    /// Whole days until the deadline, rounded up; `None` without a deadline.
    ///
    /// A deadline later today counts as 1 day remaining, one that passed
    /// earlier today rounds up to 0.
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        let deadline = self.deadline?;
        let millis = (deadline - now).num_milliseconds() as f64;
        Some((millis / MILLIS_PER_DAY).ceil() as i64)
    }
}

/// The collection's own status field, else the first other status field set.
///
/// Some records carry their progress under another collection's field name.
fn status_field(map: &Map<String, Value>, kind: TaskKind) -> Option<String> {
    let own = kind.status_field();
    str_field(map, own).or_else(|| {
        STATUS_FIELDS
            .iter()
            .filter(|field| **field != own)
            .find_map(|field| str_field(map, field))
    })
}

fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn id_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        // Extended JSON object ids: { "$oid": "..." }
        Some(Value::Object(inner)) => str_field(inner, "$oid"),
        _ => None,
    }
}

fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Accepts RFC 3339 timestamps, naive timestamps (taken as UTC), plain
/// `YYYY-MM-DD` dates (midnight UTC) and epoch milliseconds.
fn parse_deadline(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_collection_keys_round_trip() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskKind::from_collection_key(kind.collection_key()), Some(kind));
        }
        assert_eq!(TaskKind::from_collection_key("appointments"), None);
    }

    #[test]
    fn test_from_record_full() {
        let record = json!({
            "_id": "t-1",
            "clientId": { "_id": "c-1", "name": "Hanako Yamada" },
            "deadline": "2026-03-12T09:00:00.000Z",
            "handledBy": "Alice",
            "paymentStatus": "Due",
            "dueAmount": 5000,
            "visaStatus": "Processing"
        });

        let task = Task::from_record(TaskKind::Application, &record).unwrap();
        assert_eq!(task.id, "t-1");
        assert_eq!(task.task_model, "Application");
        assert_eq!(task.client.embedded_name(), Some("Hanako Yamada"));
        assert_eq!(task.client.id(), Some("c-1"));
        assert_eq!(task.handled_by.as_deref(), Some("Alice"));
        assert!(task.is_payment_due());
        assert_eq!(task.due_amount, 5000.0);
        assert_eq!(task.days_remaining(now()), Some(2));
        assert!(!task.is_completed());
    }

    #[test]
    fn test_application_type_overrides_label() {
        let record = json!({ "_id": "t-2", "applicationType": "Student Visa" });
        let task = Task::from_record(TaskKind::Application, &record).unwrap();
        assert_eq!(task.task_model, "Student Visa");

        let blank = json!({ "_id": "t-3", "applicationType": "  " });
        let task = Task::from_record(TaskKind::EPassport, &blank).unwrap();
        assert_eq!(task.task_model, "ePassport");
    }

    #[test]
    fn test_completion_uses_each_collections_own_field() {
        let record = json!({ "_id": "t", "jobStatus": "Completed", "status": "Processing" });

        let other = Task::from_record(TaskKind::OtherService, &record).unwrap();
        assert!(other.is_completed());

        let visit = Task::from_record(TaskKind::JapanVisit, &record).unwrap();
        assert!(!visit.is_completed());

        let translation = Task::from_record(
            TaskKind::Translation,
            &json!({ "_id": "t", "translationStatus": "Cancelled" }),
        )
        .unwrap();
        assert!(translation.is_cancelled());
        assert!(!translation.is_completed());
    }

    #[test]
    fn test_completion_falls_back_to_other_status_fields() {
        let task = Task::from_record(
            TaskKind::Application,
            &json!({ "_id": "t", "status": "Completed", "paymentStatus": "Paid" }),
        )
        .unwrap();
        assert!(task.is_completed());
        assert_eq!(task.variant.status(), Some(STATUS_COMPLETED));

        let cancelled = Task::from_record(
            TaskKind::GraphicDesign,
            &json!({ "_id": "t", "jobStatus": "Cancelled" }),
        )
        .unwrap();
        assert!(cancelled.is_cancelled());
    }

    #[test]
    fn test_missing_fields_default() {
        let task = Task::from_record(TaskKind::GraphicDesign, &json!({ "id": 42 })).unwrap();
        assert_eq!(task.id, "42");
        assert_eq!(task.client, ClientRef::Missing);
        assert_eq!(task.deadline, None);
        assert_eq!(task.days_remaining(now()), None);
        assert_eq!(task.payment_status, None);
        assert_eq!(task.due_amount, 0.0);
    }

    #[test]
    fn test_rejects_non_object_and_missing_id() {
        assert!(Task::from_record(TaskKind::Application, &json!("t-1")).is_err());
        let err = Task::from_record(TaskKind::Application, &json!({ "handledBy": "Alice" }))
            .unwrap_err();
        assert!(err.to_string().contains("no id"));
    }

    #[test]
    fn test_deadline_formats() {
        let date_only = Task::from_record(
            TaskKind::JapanVisit,
            &json!({ "_id": "a", "deadline": "2026-03-13" }),
        )
        .unwrap();
        assert_eq!(
            date_only.deadline,
            Some(Utc.with_ymd_and_hms(2026, 3, 13, 0, 0, 0).unwrap())
        );

        let millis = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap().timestamp_millis();
        let epoch = Task::from_record(
            TaskKind::JapanVisit,
            &json!({ "_id": "b", "deadline": millis }),
        )
        .unwrap();
        assert!(epoch.deadline.is_some());

        let garbage = Task::from_record(
            TaskKind::JapanVisit,
            &json!({ "_id": "c", "deadline": "next tuesday" }),
        )
        .unwrap();
        assert_eq!(garbage.deadline, None);
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        let mut task = Task::from_record(TaskKind::Application, &json!({ "_id": "x" })).unwrap();

        task.deadline = Some(now() + Duration::hours(30));
        assert_eq!(task.days_remaining(now()), Some(2));

        task.deadline = Some(now() + Duration::hours(3));
        assert_eq!(task.days_remaining(now()), Some(1));

        task.deadline = Some(now() - Duration::hours(3));
        assert_eq!(task.days_remaining(now()), Some(0));

        task.deadline = Some(now() - Duration::hours(30));
        assert_eq!(task.days_remaining(now()), Some(-1));
    }

    #[test]
    fn test_client_ref_variants() {
        let bare = Task::from_record(
            TaskKind::Application,
            &json!({ "_id": "a", "clientId": "c-9" }),
        )
        .unwrap();
        assert_eq!(bare.client, ClientRef::Id("c-9".into()));
        assert_eq!(bare.client.embedded_name(), None);

        let oid = Task::from_record(
            TaskKind::Application,
            &json!({ "_id": { "$oid": "abc" }, "clientId": { "_id": { "$oid": "c-1" } } }),
        )
        .unwrap();
        assert_eq!(oid.id, "abc");
        assert_eq!(oid.client.id(), Some("c-1"));
    }

    #[test]
    fn test_payment_status_other_kept_verbatim() {
        let task = Task::from_record(
            TaskKind::Application,
            &json!({ "_id": "a", "paymentStatus": "Partial", "dueAmount": "1200.5" }),
        )
        .unwrap();
        assert_eq!(task.payment_status, Some(PaymentStatus::Other("Partial".into())));
        assert!(!task.is_paid());
        assert!(!task.is_payment_due());
        assert_eq!(task.due_amount, 1200.5);
    }
}
