//! Deadline and payment alert rules.
//!
//! Each task is judged on its own:
//!
//! | condition | alert |
//! |-----------|-------|
//! | `0 <= days <= window` | deadline, `high` |
//! | `days < 0`, not (completed and paid) | deadline, `urgent` |
//! | `days < 0`, completed and paid | none (finished work stays quiet) |
//! | completed, payment `Due` | payment follow-up |
//! | paid, not completed, not cancelled | payment follow-up |
//!
//! A task can raise one deadline alert and one payment alert, never two of
//! the same type. Rule evaluation ([`assess`]) is separate from message
//! building so it needs no client names.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::alert::{Alert, AlertPriority, AlertType, format_amount};
use crate::client::ClientNameResolver;
use crate::dedup::AlertSet;
use crate::task::Task;

/// Default number of days ahead that counts as "upcoming".
pub const DEFAULT_UPCOMING_WINDOW_DAYS: i64 = 2;

/// Deadline verdict for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineAssessment {
    /// Deadline within the window, `days` still remaining
    Upcoming { days: i64 },
    /// Deadline passed `days` ago
    Overdue { days: i64 },
}

/// Payment verdict for one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaymentAssessment {
    /// Work is done but money is still owed
    DueAfterCompletion { amount: f64 },
    /// Money received for work that is not done
    PaidButIncomplete,
}

/// Everything the rules say about one task.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Assessment {
    pub deadline: Option<DeadlineAssessment>,
    pub payment: Option<PaymentAssessment>,
}

impl Assessment {
    pub fn is_empty(&self) -> bool {
        self.deadline.is_none() && self.payment.is_none()
    }
}

/// Apply the alert rules to one task.
pub fn assess(task: &Task, now: DateTime<Utc>, upcoming_window_days: i64) -> Assessment {
    let completed = task.is_completed();
    let paid = task.is_paid();

    let deadline = match task.days_remaining(now) {
        Some(days) if (0..=upcoming_window_days).contains(&days) => {
            Some(DeadlineAssessment::Upcoming { days })
        }
        Some(days) if days < 0 && !(completed && paid) => {
            Some(DeadlineAssessment::Overdue { days: -days })
        }
        _ => None,
    };

    let payment = if completed && task.is_payment_due() {
        Some(PaymentAssessment::DueAfterCompletion {
            amount: task.due_amount,
        })
    } else if paid && !completed && !task.is_cancelled() {
        Some(PaymentAssessment::PaidButIncomplete)
    } else {
        None
    };

    Assessment { deadline, payment }
}

/// Output of one derivation run, already filtered to the viewer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedAlerts {
    pub deadline: Vec<Alert>,
    pub payment: Vec<Alert>,
}

impl DerivedAlerts {
    /// Deadline alerts followed by payment alerts.
    pub fn combined(&self) -> impl Iterator<Item = &Alert> {
        self.deadline.iter().chain(self.payment.iter())
    }

    pub fn len(&self) -> usize {
        self.deadline.len() + self.payment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadline.is_empty() && self.payment.is_empty()
    }
}

/// Keep only alerts handled by `viewer` (exact, case-sensitive match).
pub fn filter_owned(alerts: Vec<Alert>, viewer: &str) -> Vec<Alert> {
    alerts
        .into_iter()
        .filter(|a| a.handled_by.as_deref() == Some(viewer))
        .collect()
}

/// Turns tasks into alerts for one viewer.
#[derive(Debug, Clone)]
pub struct AlertDeriver {
    upcoming_window_days: i64,
}

impl Default for AlertDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_UPCOMING_WINDOW_DAYS)
    }
}

impl AlertDeriver {
    pub fn new(upcoming_window_days: i64) -> Self {
        Self {
            upcoming_window_days,
        }
    }

    /// Derive, deduplicate and ownership-filter alerts for `viewer`.
    pub async fn derive(
        &self,
        tasks: &[Task],
        now: DateTime<Utc>,
        viewer: &str,
        resolver: &mut ClientNameResolver<'_>,
    ) -> DerivedAlerts {
        let mut deadline = AlertSet::new();
        let mut payment = AlertSet::new();

        for task in tasks {
            let assessment = assess(task, now, self.upcoming_window_days);
            if assessment.is_empty() {
                continue;
            }

            let client_name = resolver.resolve(&task.client).await;

            if let Some(verdict) = assessment.deadline {
                let (priority, message) = deadline_message(&client_name, task, verdict);
                let alert = build_alert(
                    task,
                    &client_name,
                    AlertType::Deadline,
                    Some(priority),
                    message,
                );
                if !deadline.insert(alert) {
                    debug!(task_id = %task.id, "duplicate deadline alert dropped");
                }
            }

            if let Some(verdict) = assessment.payment {
                let message = payment_message(&client_name, task, verdict);
                let alert = build_alert(task, &client_name, AlertType::Payment, None, message);
                if !payment.insert(alert) {
                    debug!(task_id = %task.id, "duplicate payment alert dropped");
                }
            }
        }

        let derived = DerivedAlerts {
            deadline: filter_owned(deadline.into_vec(), viewer),
            payment: filter_owned(payment.into_vec(), viewer),
        };

        debug!(
            tasks = tasks.len(),
            deadline = derived.deadline.len(),
            payment = derived.payment.len(),
            "derived alerts"
        );
        derived
    }
}

fn build_alert(
    task: &Task,
    client_name: &str,
    alert_type: AlertType,
    priority: Option<AlertPriority>,
    message: String,
) -> Alert {
    Alert {
        task_id: task.id.clone(),
        task_model: task.task_model.clone(),
        client_name: client_name.to_string(),
        handled_by: task.handled_by.clone(),
        due_amount: task.due_amount,
        message,
        alert_type,
        priority,
    }
}

fn deadline_message(
    client: &str,
    task: &Task,
    verdict: DeadlineAssessment,
) -> (AlertPriority, String) {
    match verdict {
        DeadlineAssessment::Upcoming { days } => (
            AlertPriority::High,
            format!(
                "{}'s {} has {} day(s) remaining. Prioritize now!",
                client, task.task_model, days
            ),
        ),
        DeadlineAssessment::Overdue { days } => (
            AlertPriority::Urgent,
            format!(
                "{}'s {} deadline has passed by {} day(s). Immediate action required!",
                client, task.task_model, days
            ),
        ),
    }
}

fn payment_message(client: &str, task: &Task, verdict: PaymentAssessment) -> String {
    match verdict {
        PaymentAssessment::DueAfterCompletion { amount } => format!(
            "{}'s {} is completed but {} is still due. Please follow up on payment.",
            client,
            task.task_model,
            format_amount(amount)
        ),
        PaymentAssessment::PaidButIncomplete => format!(
            "{}'s {} has been paid but is not completed yet. Please review its progress.",
            client, task.task_model
        ),
    }
}
