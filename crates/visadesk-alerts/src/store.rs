//! The alert store: one source of truth for derived alerts.
//!
//! Every fetch cycle publishes a fresh [`DerivedAlerts`] into the store. The
//! bell panel and the toast sequencer both read from it; subscribers get each
//! new [`AlertSnapshot`] through a `tokio::sync::watch` channel.
//!
//! Alerts the viewer dismissed stay dismissed for the rest of the session,
//! even when the next fetch derives them again.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use crate::alert::{Alert, AlertPriority, AlertType};
use crate::deriver::DerivedAlerts;

/// Immutable view of the store at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertSnapshot {
    pub alerts: DerivedAlerts,
    /// When the alerts were derived; `None` before the first publish
    pub generated_at: Option<DateTime<Utc>>,
}

impl AlertSnapshot {
    /// Deadline alerts followed by payment alerts.
    pub fn combined(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.combined()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.combined().any(|a| a.key() == key)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Counts for the bell icon.
    pub fn badge(&self) -> AlertBadge {
        AlertBadge {
            deadline: self.alerts.deadline.len(),
            payment: self.alerts.payment.len(),
            urgent: self.alerts.deadline.iter().filter(|a| a.is_urgent()).count(),
            total: self.len(),
        }
    }

    /// Bell panel listing: urgent, then high, then payment follow-ups.
    ///
    /// Order within each group is the derivation order.
    pub fn panel_lines(&self) -> Vec<String> {
        let rank = |a: &Alert| match (a.alert_type, a.priority) {
            (AlertType::Deadline, Some(AlertPriority::Urgent)) => 0,
            (AlertType::Deadline, _) => 1,
            (AlertType::Payment, _) => 2,
        };

        let mut alerts: Vec<&Alert> = self.combined().collect();
        alerts.sort_by_key(|a| rank(a));
        alerts.into_iter().map(Alert::format_detail).collect()
    }
}

/// Summary badge for the bell icon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertBadge {
    pub deadline: usize,
    pub payment: usize,
    /// Overdue deadline alerts
    pub urgent: usize,
    pub total: usize,
}

impl AlertBadge {
    /// Check if the badge should be displayed.
    pub fn should_display(&self) -> bool {
        self.total > 0
    }

    /// Format for display in a header line.
    pub fn format_header(&self) -> String {
        if self.total == 0 {
            return "No alerts".to_string();
        }
        let mut header = format!(
            "🔔 {} alert{} | {} deadline | {} payment",
            self.total,
            if self.total == 1 { "" } else { "s" },
            self.deadline,
            self.payment
        );
        if self.urgent > 0 {
            header.push_str(&format!(" | {} overdue", self.urgent));
        }
        header
    }
}

/// Owner of the current alert list.
#[derive(Debug)]
pub struct AlertStore {
    tx: watch::Sender<AlertSnapshot>,
    dismissed: HashSet<String>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AlertSnapshot::default());
        Self {
            tx,
            dismissed: HashSet::new(),
        }
    }

    /// Receive every future snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AlertSnapshot> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> AlertSnapshot {
        self.tx.borrow().clone()
    }

    /// Replace the alert list with a fresh derivation.
    ///
    /// Dismissed keys are dropped. Returns the alerts whose key was not in
    /// the previous snapshot, in combined order: the ones worth a toast.
    pub fn publish(&mut self, mut derived: DerivedAlerts, at: DateTime<Utc>) -> Vec<Alert> {
        derived.deadline.retain(|a| !self.dismissed.contains(&a.key()));
        derived.payment.retain(|a| !self.dismissed.contains(&a.key()));

        let previous: HashSet<String> = self.tx.borrow().combined().map(Alert::key).collect();
        let raised: Vec<Alert> = derived
            .combined()
            .filter(|a| !previous.contains(&a.key()))
            .cloned()
            .collect();

        debug!(
            total = derived.len(),
            raised = raised.len(),
            dismissed = self.dismissed.len(),
            "publishing alerts"
        );

        self.tx.send_replace(AlertSnapshot {
            alerts: derived,
            generated_at: Some(at),
        });
        raised
    }

    /// Remove an alert and keep it out of later publications.
    ///
    /// Returns true if the alert was present.
    pub fn dismiss(&mut self, key: &str) -> bool {
        self.dismissed.insert(key.to_string());

        let mut removed = false;
        self.tx.send_if_modified(|snapshot| {
            let before = snapshot.len();
            snapshot.alerts.deadline.retain(|a| a.key() != key);
            snapshot.alerts.payment.retain(|a| a.key() != key);
            removed = snapshot.len() != before;
            removed
        });
        removed
    }

    /// Empty the store, e.g. after a failed fetch. Dismissals are kept.
    pub fn clear(&mut self, at: DateTime<Utc>) {
        self.tx.send_replace(AlertSnapshot {
            alerts: DerivedAlerts::default(),
            generated_at: Some(at),
        });
    }
}
