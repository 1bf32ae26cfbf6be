//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories and the notification outbox
//!   using Diesel ORM
//! - **mailer**: HTTP delivery of allotment notifications
//! - **metrics**: Prometheus exporters (feature-gated)
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no business logic.

pub mod mailer;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod persistence;
