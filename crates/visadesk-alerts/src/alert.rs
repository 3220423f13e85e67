//! Alerts derived from tasks.
//!
//! An [`Alert`] is recomputed on every fetch cycle and never persisted. Its
//! identity is [`Alert::key`], `"{task_id}-{alert_type}"`.

use std::fmt;

use serde::Serialize;
use visadesk_core::types::TaskId;

/// Kind of follow-up an alert asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    /// Deadline approaching or passed
    Deadline,
    /// Payment and progress disagree
    Payment,
}

impl AlertType {
    /// Wire/key spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Deadline => "deadline",
            AlertType::Payment => "payment",
        }
    }

    /// Human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            AlertType::Deadline => "Deadline",
            AlertType::Payment => "Payment Follow-up",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a deadline alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    /// Deadline within the upcoming window
    High,
    /// Deadline already passed
    Urgent,
}

impl AlertPriority {
    /// Get the icon for this priority.
    pub fn icon(&self) -> &'static str {
        match self {
            AlertPriority::High => "⚠",
            AlertPriority::Urgent => "✖",
        }
    }
}

/// A single derived alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub task_id: TaskId,
    pub task_model: String,
    pub client_name: String,
    pub handled_by: Option<String>,
    pub due_amount: f64,
    pub message: String,
    pub alert_type: AlertType,
    /// Set on deadline alerts only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<AlertPriority>,
}

impl Alert {
    /// Dedup key: `"{task_id}-{alert_type}"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.task_id, self.alert_type)
    }

    /// True for deadline alerts with `urgent` priority.
    pub fn is_urgent(&self) -> bool {
        self.priority == Some(AlertPriority::Urgent)
    }

    /// Icon for list and toast display.
    pub fn icon(&self) -> &'static str {
        match self.priority {
            Some(priority) => priority.icon(),
            None => "¥",
        }
    }

    /// Format for display in one line.
    pub fn format_compact(&self) -> String {
        format!(
            "{} [{}] {} - {}",
            self.icon(),
            self.alert_type.title(),
            self.client_name,
            self.task_model
        )
    }

    /// Format for detailed display.
    pub fn format_detail(&self) -> String {
        format!("{}\n  {}", self.format_compact(), self.message)
    }
}

/// Format an amount without trailing `.00` for whole numbers.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(alert_type: AlertType, priority: Option<AlertPriority>) -> Alert {
        Alert {
            task_id: "t-1".into(),
            task_model: "Application".into(),
            client_name: "Hanako Yamada".into(),
            handled_by: Some("Alice".into()),
            due_amount: 0.0,
            message: "message".into(),
            alert_type,
            priority,
        }
    }

    #[test]
    fn test_key_includes_type() {
        assert_eq!(alert(AlertType::Deadline, None).key(), "t-1-deadline");
        assert_eq!(alert(AlertType::Payment, None).key(), "t-1-payment");
    }

    #[test]
    fn test_priority_ordering() {
        assert!(AlertPriority::Urgent > AlertPriority::High);
    }

    #[test]
    fn test_format_compact() {
        let compact = alert(AlertType::Deadline, Some(AlertPriority::Urgent)).format_compact();
        assert!(compact.contains("✖"));
        assert!(compact.contains("Hanako Yamada"));
        assert!(compact.contains("Deadline"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(alert(AlertType::Payment, None)).unwrap();
        assert_eq!(json["taskId"], "t-1");
        assert_eq!(json["alertType"], "payment");
        assert!(json.get("priority").is_none());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(5000.0), "5000");
        assert_eq!(format_amount(1200.5), "1200.50");
    }
}
