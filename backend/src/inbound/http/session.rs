//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Members authenticate elsewhere; the identity provider seals the member id
//! into the shared cookie session under [`MEMBER_ID_KEY`]. Handlers only see
//! a validated [`MemberId`] or a `401 Unauthorized` error.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::domain::land::MemberId;
use crate::domain::{Error, TraceId};

/// Session key holding the authenticated member id.
pub const MEMBER_ID_KEY: &str = "member_id";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Store a member id in the session cookie.
    pub fn persist_member(&self, member_id: &MemberId) -> Result<(), Error> {
        self.0
            .insert(MEMBER_ID_KEY, member_id.as_ref())
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the member id from the session, if present and well formed.
    pub fn member_id(&self) -> Result<Option<MemberId>, Error> {
        let raw = self
            .0
            .get::<String>(MEMBER_ID_KEY)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))?;
        Ok(raw.and_then(|raw| match MemberId::new(raw) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%error, "invalid member id in session cookie");
                None
            }
        }))
    }

    /// Require an authenticated member id or return `401 Unauthorized`.
    ///
    /// The member is recorded against the request for log correlation.
    pub fn require_member_id(&self) -> Result<MemberId, Error> {
        let member_id = self
            .member_id()?
            .ok_or_else(|| Error::unauthorized("member session required"))?;
        TraceId::record_member(&member_id);
        Ok(member_id)
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}
