//! Insertion-ordered alert set keyed by [`Alert::key`].

use std::collections::HashSet;

use crate::alert::Alert;

/// Alerts in insertion order, at most one per key. First write wins.
#[derive(Debug, Clone, Default)]
pub struct AlertSet {
    alerts: Vec<Alert>,
    keys: HashSet<String>,
}

impl AlertSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an alert unless its key is already present.
    ///
    /// Returns false (and drops `alert`) for a duplicate key.
    pub fn insert(&mut self, alert: Alert) -> bool {
        if !self.keys.insert(alert.key()) {
            return false;
        }
        self.alerts.push(alert);
        true
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn into_vec(self) -> Vec<Alert> {
        self.alerts
    }
}

impl Extend<Alert> for AlertSet {
    fn extend<I: IntoIterator<Item = Alert>>(&mut self, iter: I) {
        for alert in iter {
            self.insert(alert);
        }
    }
}

impl FromIterator<Alert> for AlertSet {
    fn from_iter<I: IntoIterator<Item = Alert>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
