//! Port and runtime dependency bundles for the notification dispatcher.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::Notify;

use crate::domain::ports::{AllocationMetrics, AllotmentNotifier, NotificationOutbox};

use super::BackoffJitter;

/// Port bundle required by the dispatcher.
pub struct NotificationDispatcherPorts {
    /// Outbox the allocation transaction writes into.
    pub outbox: Arc<dyn NotificationOutbox>,
    /// Outbound mailer adapter.
    pub notifier: Arc<dyn AllotmentNotifier>,
    /// Delivery outcome metrics.
    pub metrics: Arc<dyn AllocationMetrics>,
}

impl NotificationDispatcherPorts {
    /// Build a strongly-typed dispatcher port bundle.
    pub fn new(
        outbox: Arc<dyn NotificationOutbox>,
        notifier: Arc<dyn AllotmentNotifier>,
        metrics: Arc<dyn AllocationMetrics>,
    ) -> Self {
        Self {
            outbox,
            notifier,
            metrics,
        }
    }
}

/// Wake-up handle shared between the allocation service and the dispatcher.
///
/// A wake issued while the dispatcher is busy is remembered, so the next wait
/// returns immediately.
#[derive(Debug, Clone, Default)]
pub struct DispatchSignal(Arc<Notify>);

impl DispatchSignal {
    /// Create an unsignalled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the dispatcher to look at the outbox now.
    pub fn wake(&self) {
        self.0.notify_one();
    }

    /// Wait until [`DispatchSignal::wake`] is called.
    pub async fn woken(&self) {
        self.0.notified().await;
    }
}

/// Jitter strategy spreading retries by up to a quarter of the base delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl BackoffJitter for RandomJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let extra = rand::thread_rng().gen_range(0..=max_extra);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}
