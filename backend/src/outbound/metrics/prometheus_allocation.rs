//! Prometheus adapter for allocation and notification outcomes.
//!
//! Counters are registered on the registry shared with the HTTP metrics
//! middleware so everything is exposed from one `/metrics` endpoint.

use async_trait::async_trait;
use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::ports::{
    AllocationMetrics, AllocationMetricsError, AllocationOutcome, NotificationOutcome,
};

/// Prometheus-backed allotment metrics recorder.
///
/// - `allotment_allocations_total{outcome}`
/// - `allotment_notifications_total{outcome}`
pub struct PrometheusAllocationMetrics {
    allocations_total: IntCounterVec,
    notifications_total: IntCounterVec,
}

impl PrometheusAllocationMetrics {
    /// Create and register both counters with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error when a counter with the same name is already
    /// registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let allocations_total = IntCounterVec::new(
            Opts::new(
                "allotment_allocations_total",
                "Land allocation attempts by outcome",
            ),
            &["outcome"],
        )?;
        let notifications_total = IntCounterVec::new(
            Opts::new(
                "allotment_notifications_total",
                "Allotment notification delivery attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(allocations_total.clone()))?;
        registry.register(Box::new(notifications_total.clone()))?;
        Ok(Self {
            allocations_total,
            notifications_total,
        })
    }
}

#[async_trait]
impl AllocationMetrics for PrometheusAllocationMetrics {
    async fn record_allocation(
        &self,
        outcome: AllocationOutcome,
    ) -> Result<(), AllocationMetricsError> {
        self.allocations_total
            .get_metric_with_label_values(&[outcome.as_label()])
            .map_err(|err| AllocationMetricsError::export(err.to_string()))?
            .inc();
        Ok(())
    }

    async fn record_notification(
        &self,
        outcome: NotificationOutcome,
    ) -> Result<(), AllocationMetricsError> {
        self.notifications_total
            .get_metric_with_label_values(&[outcome.as_label()])
            .map_err(|err| AllocationMetricsError::export(err.to_string()))?
            .inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_both_counters() {
        let registry = Registry::new();
        let metrics = PrometheusAllocationMetrics::new(&registry).expect("register counters");
        metrics
            .allocations_total
            .with_label_values(&["allocated"])
            .inc();
        metrics.notifications_total.with_label_values(&["sent"]).inc();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.name().to_owned())
            .collect();
        assert!(names.contains(&"allotment_allocations_total".to_owned()));
        assert!(names.contains(&"allotment_notifications_total".to_owned()));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = Registry::new();
        let _first = PrometheusAllocationMetrics::new(&registry).expect("first registration");
        assert!(PrometheusAllocationMetrics::new(&registry).is_err());
    }

    #[tokio::test]
    async fn outcomes_increment_labelled_counters() {
        let registry = Registry::new();
        let metrics = PrometheusAllocationMetrics::new(&registry).expect("register counters");

        metrics
            .record_allocation(AllocationOutcome::NoUnitsAvailable)
            .await
            .expect("record allocation");
        metrics
            .record_allocation(AllocationOutcome::NoUnitsAvailable)
            .await
            .expect("record allocation");
        metrics
            .record_notification(NotificationOutcome::Retried)
            .await
            .expect("record notification");

        assert_eq!(
            metrics
                .allocations_total
                .with_label_values(&["no_units_available"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .notifications_total
                .with_label_values(&["retried"])
                .get(),
            1
        );
    }
}
