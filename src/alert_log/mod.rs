//! AlertLog - Bounded Alert History (Ring Buffer)
//!
//! ## Responsibilities
//!
//! - Keep the most recent alerts, newest first
//! - Evict by insertion order once at capacity
//! - Assign monotonic alert ids
//!
//! Eviction never looks at timestamps: a delayed result stamped earlier
//! than the newest entry still counts as the most recent insert.

use crate::models::Alert;
use std::collections::VecDeque;

/// Number of alerts retained
pub const ALERT_LOG_CAPACITY: usize = 10;

/// Ring buffer of alerts
#[derive(Debug)]
pub struct AlertLog {
    /// Oldest at the front, newest at the back
    alerts: VecDeque<Alert>,
    capacity: usize,
    next_id: u64,
}

impl AlertLog {
    /// Create log with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(ALERT_LOG_CAPACITY)
    }

    /// Create log with custom capacity (at least 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append an alert, evicting the oldest if full. Returns the assigned id.
    pub fn append(&mut self, mut alert: Alert) -> u64 {
        alert.id = self.next_id;
        self.next_id += 1;

        if self.alerts.len() >= self.capacity {
            if let Some(evicted) = self.alerts.pop_front() {
                tracing::debug!(alert_id = evicted.id, "Alert evicted from log");
            }
        }
        self.alerts.push_back(alert);
        self.next_id - 1
    }

    /// Retained alerts, newest first
    pub fn recent(&self) -> Vec<Alert> {
        self.alerts.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}
