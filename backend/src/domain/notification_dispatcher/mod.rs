//! Outbox worker delivering allotment notifications.
//!
//! The allocation transaction writes a pending outbox row next to every
//! allocation. This worker claims due rows, hands them to the mailer and
//! settles each row as sent, rescheduled (jittered exponential backoff) or
//! failed. Delivery is at-least-once: a crash between the mailer accepting a
//! message and the row being marked sent causes a resend once the claim
//! lease lapses. A message whose lease ran out while earlier ones in the
//! batch were being delivered is skipped, and a settle that finds its lease
//! taken over is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    AllocationMetrics, AllotmentNotification, AllotmentNotifier, AllotmentNotifierError,
    NotificationOutbox, NotificationOutboxError, NotificationOutcome, OutboxMessage,
};

mod runtime;

pub use runtime::{DispatchSignal, NotificationDispatcherPorts, RandomJitter};

/// Dispatcher configuration controlling batching, retries and polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDispatcherConfig {
    /// Maximum rows claimed per pass.
    pub batch_size: u32,
    /// Maximum delivery attempts per message (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on the retry delay before jitter.
    pub max_backoff: Duration,
    /// How long a claimed row stays invisible to other claimers.
    pub claim_lease: Duration,
    /// Upper bound on a single mailer call.
    pub send_timeout: Duration,
    /// Idle wait between passes when nobody wakes the worker.
    pub poll_interval: Duration,
}

impl Default for NotificationDispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
            claim_lease: Duration::from_secs(60),
            send_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(10),
        }
    }
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
    /// Claims that lapsed before the message could be settled.
    pub lapsed: usize,
}

impl DispatchReport {
    fn record(&mut self, outcome: NotificationOutcome) {
        match outcome {
            NotificationOutcome::Sent => self.sent += 1,
            NotificationOutcome::Retried => self.retried += 1,
            NotificationOutcome::Failed => self.failed += 1,
        }
    }
}

/// How one claimed message was settled.
enum Settlement {
    Settled(NotificationOutcome),
    Lapsed,
}

/// Domain-owned outbox dispatcher.
pub struct NotificationDispatcher {
    outbox: Arc<dyn NotificationOutbox>,
    notifier: Arc<dyn AllotmentNotifier>,
    metrics: Arc<dyn AllocationMetrics>,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn BackoffJitter>,
    signal: DispatchSignal,
    config: NotificationDispatcherConfig,
}

impl NotificationDispatcher {
    /// Build a dispatcher with random retry jitter.
    pub fn new(
        ports: NotificationDispatcherPorts,
        clock: Arc<dyn Clock>,
        signal: DispatchSignal,
        config: NotificationDispatcherConfig,
    ) -> Self {
        Self::with_jitter(ports, clock, Arc::new(RandomJitter), signal, config)
    }

    /// Build a dispatcher with an injected jitter strategy.
    pub fn with_jitter(
        ports: NotificationDispatcherPorts,
        clock: Arc<dyn Clock>,
        jitter: Arc<dyn BackoffJitter>,
        signal: DispatchSignal,
        config: NotificationDispatcherConfig,
    ) -> Self {
        Self {
            outbox: ports.outbox,
            notifier: ports.notifier,
            metrics: ports.metrics,
            clock,
            jitter,
            signal,
            config,
        }
    }

    /// Claim one batch of due notifications and attempt each once.
    ///
    /// Mailer failures are settled on the row and never returned; only
    /// outbox failures surface as errors.
    pub async fn dispatch_due(&self) -> Result<DispatchReport, NotificationOutboxError> {
        let messages = self
            .outbox
            .claim_due(
                self.clock.utc(),
                self.config.batch_size.max(1),
                self.config.claim_lease,
            )
            .await?;

        let mut report = DispatchReport {
            claimed: messages.len(),
            ..DispatchReport::default()
        };
        for message in &messages {
            let outcome = match self.deliver(message).await? {
                Settlement::Settled(outcome) => outcome,
                Settlement::Lapsed => {
                    report.lapsed += 1;
                    continue;
                }
            };
            report.record(outcome);
            if let Err(error) = self.metrics.record_notification(outcome).await {
                debug!(error = %error, "notification metric write failed");
            }
        }
        Ok(report)
    }

    /// Dispatch until `shutdown` resolves.
    ///
    /// Between passes the worker waits for a wake-up from the allocation
    /// service or the poll interval. A full batch triggers another pass
    /// straight away.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms = u64::try_from(self.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "notification dispatcher started"
        );
        loop {
            let idle_wait = match self.dispatch_due().await {
                Ok(report) => {
                    if report.claimed > 0 {
                        debug!(
                            claimed = report.claimed,
                            sent = report.sent,
                            retried = report.retried,
                            failed = report.failed,
                            "notification dispatch pass finished"
                        );
                    }
                    if u32::try_from(report.claimed).unwrap_or(u32::MAX) >= self.config.batch_size.max(1) {
                        Duration::ZERO
                    } else {
                        self.config.poll_interval
                    }
                }
                Err(error) => {
                    warn!(error = %error, "notification outbox unavailable");
                    self.config.poll_interval
                }
            };

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = self.signal.woken() => {}
                () = tokio::time::sleep(idle_wait) => {}
            }
        }
        info!("notification dispatcher stopped");
    }

    async fn deliver(&self, message: &OutboxMessage) -> Result<Settlement, NotificationOutboxError> {
        if self.clock.utc() >= message.leased_until {
            warn!(
                member_id = %message.member_id,
                reference_no = %message.reference_no,
                "claim lapsed before delivery; leaving the row for the next pass"
            );
            return Ok(Settlement::Lapsed);
        }
        let claim = message.claim();
        let attempt = message.attempts.saturating_add(1);
        let notification = AllotmentNotification {
            member_id: message.member_id.clone(),
            allocation_id: message.allocation_id,
            reference_no: message.reference_no.clone(),
        };

        let result = tokio::time::timeout(
            self.config.send_timeout,
            self.notifier.notify(&notification),
        )
        .await
        .unwrap_or_else(|_| {
            Err(AllotmentNotifierError::timeout(format!(
                "no response within {} ms",
                self.config.send_timeout.as_millis()
            )))
        });

        let (outcome, held) = match result {
            Ok(()) => {
                let held = self
                    .outbox
                    .mark_sent(claim, attempt, self.clock.utc())
                    .await?;
                info!(
                    member_id = %message.member_id,
                    reference_no = %message.reference_no,
                    attempt,
                    "allotment notification sent"
                );
                (NotificationOutcome::Sent, held)
            }
            Err(error) if error.is_retryable() && attempt < self.config.max_attempts => {
                let now = self.clock.utc();
                let delay = self
                    .jitter
                    .jittered_delay(self.retry_base_delay(attempt), attempt, now);
                let next_attempt_at = TimeDelta::from_std(delay)
                    .ok()
                    .and_then(|delta| now.checked_add_signed(delta))
                    .unwrap_or(now);
                warn!(
                    member_id = %message.member_id,
                    reference_no = %message.reference_no,
                    attempt,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "allotment notification failed; retry scheduled"
                );
                let held = self
                    .outbox
                    .reschedule(claim, attempt, next_attempt_at, &error.to_string())
                    .await?;
                (NotificationOutcome::Retried, held)
            }
            Err(error) => {
                warn!(
                    member_id = %message.member_id,
                    reference_no = %message.reference_no,
                    attempt,
                    error = %error,
                    "allotment notification failed permanently"
                );
                let held = self
                    .outbox
                    .mark_failed(claim, attempt, &error.to_string())
                    .await?;
                (NotificationOutcome::Failed, held)
            }
        };

        if held {
            Ok(Settlement::Settled(outcome))
        } else {
            warn!(
                member_id = %message.member_id,
                reference_no = %message.reference_no,
                attempt,
                "claim was taken over before settling; outcome dropped"
            );
            Ok(Settlement::Lapsed)
        }
    }

    fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}
