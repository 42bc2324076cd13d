/*!
 * Loop Statistics
 * Per-thread counters for loop activity
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the loop driver. Plain relaxed atomics: the numbers
/// are observational, never used for control flow.
#[derive(Default)]
pub(crate) struct LoopStats {
    iterations: AtomicU64,
    timers_fired: AtomicU64,
    signals_dispatched: AtomicU64,
    wake_requests: AtomicU64,
    notifier_activations: AtomicU64,
}

impl LoopStats {
    pub(crate) fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timers_fired(&self, count: u64) {
        self.timers_fired.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_signal_dispatched(&self) {
        self.signals_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wake_request(&self) {
        self.wake_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_notifier_activation(&self) {
        self.notifier_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LoopStatsSnapshot {
        LoopStatsSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            timers_fired: self.timers_fired.load(Ordering::Relaxed),
            signals_dispatched: self.signals_dispatched.load(Ordering::Relaxed),
            wake_requests: self.wake_requests.load(Ordering::Relaxed),
            notifier_activations: self.notifier_activations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of one thread's loop counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoopStatsSnapshot {
    pub iterations: u64,
    pub timers_fired: u64,
    pub signals_dispatched: u64,
    pub wake_requests: u64,
    pub notifier_activations: u64,
}
