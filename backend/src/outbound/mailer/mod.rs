//! Outbound adapters delivering allotment notifications to members.

mod http_mailer;

pub use http_mailer::{DEFAULT_MAILER_TIMEOUT, HttpAllotmentMailer};
