//! Reqwest-backed allotment mailer adapter.
//!
//! Posts the notification as camelCase JSON to one configured endpoint. The
//! adapter owns transport concerns only; retry policy belongs to the
//! notification dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::domain::ports::{AllotmentNotification, AllotmentNotifier, AllotmentNotifierError};

/// Default per-request timeout for the mailer.
pub const DEFAULT_MAILER_TIMEOUT: Duration = Duration::from_secs(5);

const USER_AGENT: &str = concat!("allotment/", env!("CARGO_PKG_VERSION"));
const PREVIEW_CHAR_LIMIT: usize = 160;

/// Mailer adapter that POSTs notifications to an HTTP endpoint.
pub struct HttpAllotmentMailer {
    client: Client,
    endpoint: Url,
}

impl HttpAllotmentMailer {
    /// Build an adapter whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl AllotmentNotifier for HttpAllotmentMailer {
    async fn notify(
        &self,
        notification: &AllotmentNotification,
    ) -> Result<(), AllotmentNotifierError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(notification)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> AllotmentNotifierError {
    if error.is_timeout() {
        AllotmentNotifierError::timeout(error.to_string())
    } else {
        AllotmentNotifierError::unavailable(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> AllotmentNotifierError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AllotmentNotifierError::timeout(message)
        }
        StatusCode::TOO_MANY_REQUESTS => AllotmentNotifierError::unavailable(message),
        _ if status.is_client_error() => AllotmentNotifierError::rejected(status.as_u16(), message),
        _ => AllotmentNotifierError::unavailable(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Non-network coverage for status mapping plus one refused connection.

    use rstest::rstest;
    use uuid::Uuid;

    use super::*;
    use crate::domain::land::{AllocationId, MemberId, ReferenceNumber};

    #[rstest]
    #[case(StatusCode::BAD_REQUEST, false)]
    #[case(StatusCode::UNPROCESSABLE_ENTITY, false)]
    #[case(StatusCode::TOO_MANY_REQUESTS, true)]
    #[case(StatusCode::GATEWAY_TIMEOUT, true)]
    #[case(StatusCode::INTERNAL_SERVER_ERROR, true)]
    #[case(StatusCode::BAD_GATEWAY, true)]
    fn statuses_map_to_retryability(#[case] status: StatusCode, #[case] retryable: bool) {
        let error = map_status_error(status, b"");
        assert_eq!(error.is_retryable(), retryable, "status {status}");
    }

    #[rstest]
    fn client_errors_keep_status_and_body() {
        let error = map_status_error(StatusCode::BAD_REQUEST, b"{\"error\": \"unknown member\"}");
        match error {
            AllotmentNotifierError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "status 400: {\"error\": \"unknown member\"}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[rstest]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(PREVIEW_CHAR_LIMIT + 40);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.chars().count(), PREVIEW_CHAR_LIMIT + 3);
        assert!(preview.ends_with("..."));
    }

    #[tokio::test]
    async fn refused_connection_is_retryable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let endpoint = Url::parse(&format!("http://{addr}/notify")).expect("endpoint url");
        let mailer =
            HttpAllotmentMailer::new(endpoint, Duration::from_secs(2)).expect("client builds");
        let notification = AllotmentNotification {
            member_id: MemberId::new("member-1").expect("member id"),
            allocation_id: AllocationId::from_uuid(Uuid::nil()),
            reference_no: ReferenceNumber::from_uuid(Uuid::nil()),
        };

        let error = mailer
            .notify(&notification)
            .await
            .expect_err("nothing listens on the port");
        assert!(error.is_retryable(), "unexpected error: {error}");
    }
}
