//! Session helpers keeping HTTP handlers free of framework-specific logic.
//!
//! Thin wrapper around actix cookie sessions so handlers only deal with
//! domain-friendly operations: persisting the authenticated user, reading
//! it back, and purging on logout. The cookie stores the provider-issued
//! user id and email; profile data always comes from the store.

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use crate::domain::{EmailAddress, Error, SessionUser, UserId};

pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const EMAIL_KEY: &str = "email";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist the authenticated user in the session cookie.
    pub fn persist_user(&self, user: &SessionUser) -> Result<(), Error> {
        self.0
            .insert(USER_ID_KEY, user.id.as_uuid().to_string())
            .and_then(|()| self.0.insert(EMAIL_KEY, user.email.as_str()))
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Fetch the current session user, if a valid one is present.
    pub fn current_user(&self) -> Result<Option<SessionUser>, Error> {
        let read = |key: &str| {
            self.0
                .get::<String>(key)
                .map_err(|error| Error::internal(format!("failed to read session: {error}")))
        };
        let (Some(raw_id), Some(raw_email)) = (read(USER_ID_KEY)?, read(EMAIL_KEY)?) else {
            return Ok(None);
        };
        let id = match Uuid::parse_str(&raw_id) {
            Ok(id) => UserId::new(id),
            Err(error) => {
                tracing::warn!("invalid user id in session cookie: {error}");
                return Ok(None);
            }
        };
        let email = match EmailAddress::new(&raw_email) {
            Ok(email) => email,
            Err(error) => {
                tracing::warn!("invalid email in session cookie: {error}");
                return Ok(None);
            }
        };
        Ok(Some(SessionUser { id, email }))
    }

    /// Require an authenticated user or return `401 Unauthorized`.
    pub fn require_user(&self) -> Result<SessionUser, Error> {
        self.current_user()?
            .ok_or_else(|| Error::auth_required("A valid session is required"))
    }

    /// Drop the session entirely (logout).
    pub fn purge(&self) {
        self.0.purge();
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
