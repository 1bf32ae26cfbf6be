//! Driven port for telling a member that land was allotted to them.
//!
//! The mailer is an external collaborator. A failed notification never
//! affects the allocation it describes; the dispatcher decides whether to
//! retry from [`AllotmentNotifierError::is_retryable`].

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::land::{AllocationId, MemberId, ReferenceNumber};

use super::define_port_error;

/// Notification payload handed to the mailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllotmentNotification {
    pub member_id: MemberId,
    pub allocation_id: AllocationId,
    pub reference_no: ReferenceNumber,
}

define_port_error! {
    /// Errors surfaced while notifying a member.
    pub enum AllotmentNotifierError {
        /// The mailer refused the request; retrying will not help.
        Rejected { status: u16, message: String } =>
            "mailer rejected allotment notification ({status}): {message}",
        /// The mailer could not be reached or failed internally.
        Unavailable { message: String } =>
            "mailer unavailable: {message}",
        /// The mailer did not answer within the request budget.
        Timeout { message: String } =>
            "mailer timed out: {message}",
    }
}

impl AllotmentNotifierError {
    /// Return whether retrying this error is expected to help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Port for delivering allotment notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AllotmentNotifier: Send + Sync {
    /// Deliver one notification.
    async fn notify(
        &self,
        notification: &AllotmentNotification,
    ) -> Result<(), AllotmentNotifierError>;
}
