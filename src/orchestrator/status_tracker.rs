//! Per-child status bookkeeping.
//!
//! One record per child name, created on the first lifecycle event and kept
//! after the session is gone. Transitions are validated against
//! [`ChildState::can_transition_to`]; readers only ever receive copies.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::status::{ChildState, ChildStatus};

/// Thread-safe table of child status records.
#[derive(Debug, Default)]
pub struct StatusTracker {
    records: RwLock<HashMap<String, ChildStatus>>,
}

impl StatusTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one child's status; `NotStarted` when never touched.
    pub async fn get(&self, name: &str) -> ChildStatus {
        self.records
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshots for `names`, in the order given.
    pub async fn snapshot<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<(String, ChildStatus)> {
        let records = self.records.read().await;
        names
            .into_iter()
            .map(|name| {
                (
                    name.to_owned(),
                    records.get(name).cloned().unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Enter `Starting`, clearing the previous error and start time.
    pub async fn mark_starting(&self, name: &str) -> bool {
        self.transition(name, ChildState::Starting, |record| {
            record.error = None;
            record.started_at = None;
        })
        .await
    }

    /// Enter `Running`, stamping the start time.
    pub async fn mark_running(&self, name: &str) -> bool {
        self.transition(name, ChildState::Running, |record| {
            record.error = None;
            record.started_at = Some(Utc::now());
        })
        .await
    }

    /// Enter `FailedStart` with the stringified cause.
    pub async fn mark_failed(&self, name: &str, error: String) -> bool {
        self.transition(name, ChildState::FailedStart, |record| {
            record.error = Some(error);
        })
        .await
    }

    /// Enter `Stopped`; always accepted.
    pub async fn mark_stopped(&self, name: &str) -> bool {
        self.transition(name, ChildState::Stopped, |_| {}).await
    }

    async fn transition(
        &self,
        name: &str,
        next: ChildState,
        apply: impl FnOnce(&mut ChildStatus),
    ) -> bool {
        let mut records = self.records.write().await;
        let record = records.entry(name.to_owned()).or_default();

        if !record.status.can_transition_to(next) {
            warn!(
                child = name,
                from = %record.status,
                to = %next,
                "rejected status transition"
            );
            return false;
        }

        debug!(child = name, from = %record.status, to = %next, "status transition");
        record.status = next;
        apply(record);
        true
    }
}
