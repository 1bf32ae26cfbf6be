//! HTTP server configuration object.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use allotment::domain::DispatchSignal;
use allotment::domain::land::ParcelId;
use allotment::domain::ports::{AllocationMetrics, NoOpAllocationMetrics};
use allotment::inbound::http::session_config::SessionSettings;
use allotment::outbound::persistence::DbPool;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

/// Everything the allocation service needs from the process.
#[derive(Clone)]
pub struct AllocationWiring {
    pub(crate) pool: DbPool,
    pub(crate) parcel_id: ParcelId,
    pub(crate) transaction_timeout: Duration,
    pub(crate) dispatch: DispatchSignal,
    pub(crate) metrics: Arc<dyn AllocationMetrics>,
}

impl AllocationWiring {
    #[must_use]
    pub fn new(
        pool: DbPool,
        parcel_id: ParcelId,
        transaction_timeout: Duration,
        dispatch: DispatchSignal,
    ) -> Self {
        Self {
            pool,
            parcel_id,
            transaction_timeout,
            dispatch,
            metrics: Arc::new(NoOpAllocationMetrics),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn AllocationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) allocation: AllocationWiring,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(
        session: SessionSettings,
        bind_addr: SocketAddr,
        allocation: AllocationWiring,
    ) -> Self {
        Self {
            session,
            bind_addr,
            allocation,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Record allocation outcomes through `metrics`.
    #[must_use]
    pub fn with_allocation_metrics(mut self, metrics: Arc<dyn AllocationMetrics>) -> Self {
        self.allocation = self.allocation.with_metrics(metrics);
        self
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
