//! Request correlation: a trace identifier and, once the session has been
//! read, the member the request acts for.
//!
//! Both live in task-local storage for the lifetime of one request, so
//! errors and log lines can be tied back to the request and the member
//! without threading either through every call. Task locals are not
//! inherited by spawned tasks; wrap spawned work in [`TraceId::scope`].

use std::cell::OnceCell;
use std::future::Future;

use tokio::task_local;
use tracing::Span;
use uuid::Uuid;

use crate::domain::land::MemberId;

/// Header used to echo the trace identifier back to clients.
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Span field the member id is recorded into.
const MEMBER_ID_FIELD: &str = "member_id";

struct Correlation {
    trace_id: TraceId,
    member_id: OnceCell<MemberId>,
}

task_local! {
    static CORRELATION: Correlation;
}

/// Per-request trace identifier exposed via task-local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generate a new random trace identifier.
    #[must_use]
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Trace identifier of the request in scope.
    #[must_use]
    pub fn current() -> Option<Self> {
        CORRELATION.try_with(|correlation| correlation.trace_id).ok()
    }

    /// Member recorded for the request in scope.
    #[must_use]
    pub fn current_member() -> Option<MemberId> {
        CORRELATION
            .try_with(|correlation| correlation.member_id.get().cloned())
            .ok()
            .flatten()
    }

    /// Tie the request in scope to `member_id` and stamp it on the current
    /// span's `member_id` field.
    ///
    /// The first member recorded for a request sticks. Returns `false` when
    /// no request is in scope or a different member was already recorded.
    pub fn record_member(member_id: &MemberId) -> bool {
        let recorded = CORRELATION.try_with(|correlation| {
            let held = correlation.member_id.get_or_init(|| member_id.clone());
            held == member_id
        });
        match recorded {
            Ok(true) => {
                Span::current().record(MEMBER_ID_FIELD, tracing::field::display(member_id));
                true
            }
            Ok(false) | Err(_) => false,
        }
    }

    /// Run `fut` as one request correlated by `trace_id`.
    ///
    /// # Examples
    /// ```
    /// use allotment::TraceId;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let trace_id: TraceId = "00000000-0000-0000-0000-000000000000"
    ///     .parse()
    ///     .expect("valid UUID");
    /// let observed = TraceId::scope(trace_id, async move { TraceId::current() }).await;
    /// assert_eq!(observed, Some(trace_id));
    /// # });
    /// ```
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        let correlation = Correlation {
            trace_id,
            member_id: OnceCell::new(),
        };
        CORRELATION.scope(correlation, fut).await
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
