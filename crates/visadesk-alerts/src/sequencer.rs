//! One-at-a-time toast sequencing.
//!
//! The sequencer is a small state machine:
//!
//! ```text
//! Idle --offer(non-empty)--> Showing { current, queue }
//! Showing --expiry | dismiss--> Showing { queue head, rest }   (queue non-empty)
//! Showing --expiry | dismiss--> Idle                           (queue empty)
//! Showing --retain(current dropped)--> Showing | Idle
//! ```
//!
//! Alerts are shown strictly first-in first-out, in the order they were
//! offered. Each toast gets the full display duration from the moment it
//! appears. Time comes from an injected [`Clock`]; a driver calls
//! [`NotificationSequencer::tick`] at [`NotificationSequencer::next_deadline`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::alert::Alert;
use crate::clock::Clock;

/// Default time a toast stays visible.
pub const DEFAULT_DISPLAY_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
enum SequencerState {
    /// Nothing shown, nothing queued
    Idle,
    /// One toast on screen, more waiting
    Showing {
        current: Alert,
        queue: VecDeque<Alert>,
        shown_at: DateTime<Utc>,
    },
}

/// Result of moving past the current toast.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    /// The toast that left the screen
    pub finished: Alert,
    /// The toast that replaced it, if any
    pub next: Option<Alert>,
}

/// Presents alerts one at a time for a fixed duration each.
pub struct NotificationSequencer {
    state: SequencerState,
    display: Duration,
    clock: Arc<dyn Clock>,
}

impl NotificationSequencer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_display_duration(clock, DEFAULT_DISPLAY_DURATION)
    }

    pub fn with_display_duration(clock: Arc<dyn Clock>, display: Duration) -> Self {
        Self {
            state: SequencerState::Idle,
            display,
            clock,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SequencerState::Idle)
    }

    /// The toast on screen.
    pub fn current(&self) -> Option<&Alert> {
        match &self.state {
            SequencerState::Showing { current, .. } => Some(current),
            SequencerState::Idle => None,
        }
    }

    /// Number of toasts waiting behind the current one.
    pub fn queued(&self) -> usize {
        match &self.state {
            SequencerState::Showing { queue, .. } => queue.len(),
            SequencerState::Idle => 0,
        }
    }

    /// When the current toast expires.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            SequencerState::Showing { shown_at, .. } => Some(*shown_at + self.display_delta()),
            SequencerState::Idle => None,
        }
    }

    /// Time left on the current toast, zero once it is due.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let deadline = self.next_deadline()?;
        Some((deadline - self.clock.now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Offer alerts for display.
    ///
    /// While idle, the first alert is shown and the rest queued. While
    /// showing, alerts not already current or queued join the back of the
    /// queue. Returns the alert that became visible, if one did.
    pub fn offer(&mut self, alerts: impl IntoIterator<Item = Alert>) -> Option<Alert> {
        let mut incoming = alerts.into_iter();

        if let SequencerState::Showing { current, queue, .. } = &mut self.state {
            for alert in incoming {
                enqueue_unique(current, queue, alert);
            }
            return None;
        }

        let current = incoming.next()?;
        let mut queue = VecDeque::new();
        for alert in incoming {
            enqueue_unique(&current, &mut queue, alert);
        }
        debug!(key = %current.key(), queued = queue.len(), "showing toast");
        self.state = SequencerState::Showing {
            current: current.clone(),
            queue,
            shown_at: self.clock.now(),
        };
        Some(current)
    }

    /// Advance if the current toast has been up for the display duration.
    pub fn tick(&mut self) -> Option<Advance> {
        let deadline = self.next_deadline()?;
        if self.clock.now() < deadline {
            return None;
        }
        let advance = self.advance();
        if let Some(a) = &advance {
            debug!(key = %a.finished.key(), "toast expired");
        }
        advance
    }

    /// Close the current toast early. The caller should also drop the alert
    /// from its store so a later refresh does not bring it back.
    pub fn dismiss(&mut self) -> Option<Advance> {
        let advance = self.advance();
        if let Some(a) = &advance {
            debug!(key = %a.finished.key(), "toast dismissed");
        }
        advance
    }

    /// Keep only toasts for which `keep` holds.
    ///
    /// Queued alerts that fail are dropped in place. If the current one fails,
    /// the first kept queued alert takes its place with a fresh display
    /// period, or the sequencer goes idle. Returns the alert that became
    /// visible, if the current one changed.
    pub fn retain(&mut self, keep: impl Fn(&Alert) -> bool) -> Option<Alert> {
        let SequencerState::Showing { current, queue, .. } = &mut self.state else {
            return None;
        };

        let before = queue.len();
        queue.retain(|alert| keep(alert));
        let dropped = before - queue.len();
        if dropped > 0 {
            debug!(dropped, "dropped queued toasts");
        }

        if keep(current) {
            return None;
        }

        debug!(key = %current.key(), "current toast withdrawn");
        self.advance().and_then(|advance| advance.next)
    }

    /// Drop everything, e.g. on shutdown.
    pub fn reset(&mut self) {
        self.state = SequencerState::Idle;
    }

    fn advance(&mut self) -> Option<Advance> {
        let state = std::mem::replace(&mut self.state, SequencerState::Idle);
        let SequencerState::Showing {
            current,
            mut queue,
            ..
        } = state
        else {
            return None;
        };

        let next = queue.pop_front();
        if let Some(next) = &next {
            self.state = SequencerState::Showing {
                current: next.clone(),
                queue,
                shown_at: self.clock.now(),
            };
        }

        Some(Advance {
            finished: current,
            next,
        })
    }

    fn display_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.display).unwrap_or(chrono::Duration::MAX)
    }
}

fn enqueue_unique(current: &Alert, queue: &mut VecDeque<Alert>, alert: Alert) {
    let key = alert.key();
    if key != current.key() && !queue.iter().any(|q| q.key() == key) {
        queue.push_back(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertType;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn alert(task_id: &str) -> Alert {
        Alert {
            task_id: task_id.into(),
            task_model: "Application".into(),
            client_name: "Client".into(),
            handled_by: Some("Alice".into()),
            due_amount: 0.0,
            message: format!("alert {task_id}"),
            alert_type: AlertType::Payment,
            priority: None,
        }
    }

    fn setup() -> (Arc<ManualClock>, NotificationSequencer) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap(),
        ));
        let sequencer = NotificationSequencer::new(clock.clone());
        (clock, sequencer)
    }

    fn current_id(s: &NotificationSequencer) -> Option<String> {
        s.current().map(|a| a.task_id.clone())
    }

    #[test]
    fn test_starts_idle_and_ignores_empty_offer() {
        let (_, mut seq) = setup();
        assert!(seq.is_idle());
        assert_eq!(seq.offer(Vec::new()), None);
        assert!(seq.is_idle());
        assert_eq!(seq.tick(), None);
        assert_eq!(seq.dismiss(), None);
    }

    #[test]
    fn test_fifo_with_auto_expiry() {
        let (clock, mut seq) = setup();
        let shown = seq.offer(vec![alert("A"), alert("B"), alert("C")]);
        assert_eq!(shown.map(|a| a.task_id), Some("A".to_string()));
        assert_eq!(seq.queued(), 2);

        let mut order = vec![current_id(&seq).unwrap()];
        while !seq.is_idle() {
            // Not yet expired
            clock.advance(Duration::from_millis(4_999));
            assert_eq!(seq.tick(), None);

            clock.advance(Duration::from_millis(1));
            let advance = seq.tick().expect("toast should expire");
            if let Some(next) = advance.next {
                order.push(next.task_id);
            }
        }

        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_each_toast_gets_full_duration_after_late_tick() {
        let (clock, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("B")]);

        // Driver woke up very late; only one step is taken.
        clock.advance(Duration::from_secs(60));
        let advance = seq.tick().unwrap();
        assert_eq!(advance.finished.task_id, "A");
        assert_eq!(current_id(&seq).as_deref(), Some("B"));
        assert_eq!(seq.time_until_expiry(), Some(DEFAULT_DISPLAY_DURATION));
        assert_eq!(seq.tick(), None);
    }

    #[test]
    fn test_dismiss_advances_immediately() {
        let (_, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("B")]);

        let advance = seq.dismiss().unwrap();
        assert_eq!(advance.finished.task_id, "A");
        assert_eq!(advance.next.map(|a| a.task_id), Some("B".to_string()));

        let advance = seq.dismiss().unwrap();
        assert_eq!(advance.finished.task_id, "B");
        assert_eq!(advance.next, None);
        assert!(seq.is_idle());
    }

    #[test]
    fn test_offer_while_showing_appends_new_keys_only() {
        let (_, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("B")]);

        assert_eq!(seq.offer(vec![alert("A"), alert("B"), alert("C")]), None);
        assert_eq!(current_id(&seq).as_deref(), Some("A"));
        assert_eq!(seq.queued(), 2);

        seq.dismiss();
        seq.dismiss();
        assert_eq!(current_id(&seq).as_deref(), Some("C"));
    }

    #[test]
    fn test_duplicate_keys_in_one_offer_collapse() {
        let (_, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("A"), alert("B"), alert("B")]);
        assert_eq!(seq.queued(), 1);
    }

    #[test]
    fn test_custom_duration_and_deadline() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap(),
        ));
        let mut seq =
            NotificationSequencer::with_display_duration(clock.clone(), Duration::from_secs(2));
        seq.offer(vec![alert("A")]);

        assert_eq!(
            seq.next_deadline(),
            Some(clock.now() + chrono::Duration::seconds(2))
        );
        clock.advance(Duration::from_secs(2));
        assert!(seq.tick().is_some());
        assert!(seq.is_idle());
        assert_eq!(seq.next_deadline(), None);
    }

    #[test]
    fn test_retain_drops_withdrawn_queued_alerts() {
        let (_, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("B"), alert("C")]);

        assert_eq!(seq.retain(|a| a.task_id != "B"), None);
        assert_eq!(current_id(&seq).as_deref(), Some("A"));
        assert_eq!(seq.queued(), 1);

        seq.dismiss();
        assert_eq!(current_id(&seq).as_deref(), Some("C"));
    }

    #[test]
    fn test_retain_replaces_withdrawn_current_with_fresh_duration() {
        let (clock, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("B"), alert("C")]);
        clock.advance(Duration::from_secs(3));

        let shown = seq.retain(|a| a.task_id == "C");
        assert_eq!(shown.map(|a| a.task_id), Some("C".to_string()));
        assert_eq!(seq.queued(), 0);
        assert_eq!(seq.time_until_expiry(), Some(DEFAULT_DISPLAY_DURATION));
    }

    #[test]
    fn test_retain_nothing_after_failed_fetch_goes_idle() {
        let (clock, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("B"), alert("C")]);

        assert_eq!(seq.retain(|_| false), None);
        assert!(seq.is_idle());

        // Expiry no longer surfaces the withdrawn toasts.
        clock.advance(Duration::from_secs(60));
        assert_eq!(seq.tick(), None);
        assert_eq!(seq.retain(|_| true), None);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let (_, mut seq) = setup();
        seq.offer(vec![alert("A"), alert("B")]);
        seq.reset();
        assert!(seq.is_idle());
        assert_eq!(seq.queued(), 0);
    }
}
