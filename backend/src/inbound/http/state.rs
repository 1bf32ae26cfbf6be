//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{LandAllocationCommand, LandAllocationQuery};

/// Parameter object bundling the port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub allocations: Arc<dyn LandAllocationCommand>,
    pub allocations_query: Arc<dyn LandAllocationQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub allocations: Arc<dyn LandAllocationCommand>,
    pub allocations_query: Arc<dyn LandAllocationQuery>,
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use allotment::domain::ports::{FixtureLandAllocationCommand, FixtureLandAllocationQuery};
    /// use allotment::inbound::http::state::{HttpState, HttpStatePorts};
    ///
    /// let state = HttpState::new(HttpStatePorts {
    ///     allocations: Arc::new(FixtureLandAllocationCommand),
    ///     allocations_query: Arc::new(FixtureLandAllocationQuery),
    /// });
    /// let _allocations = state.allocations.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            allocations,
            allocations_query,
        } = ports;
        Self {
            allocations,
            allocations_query,
        }
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
