//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the mediator counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub commands_sent: u64,
    pub queries_sent: u64,
    pub events_published: u64,
    pub handler_invocations: u64,
    pub handler_failures: u64,
    pub failed_publishes: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchStats {
    commands_sent: AtomicU64,
    queries_sent: AtomicU64,
    events_published: AtomicU64,
    handler_invocations: AtomicU64,
    handler_failures: AtomicU64,
    failed_publishes: AtomicU64,
}

impl DispatchStats {
    pub(crate) fn command_sent(&self) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn query_sent(&self) {
        self.queries_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn handler_finished(&self, failed: bool) {
        self.handler_invocations.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.handler_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn publish_failed(&self) {
        self.failed_publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            queries_sent: self.queries_sent.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            handler_invocations: self.handler_invocations.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            failed_publishes: self.failed_publishes.load(Ordering::Relaxed),
        }
    }
}
