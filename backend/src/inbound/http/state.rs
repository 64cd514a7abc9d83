//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{HouseholdOperations, IdentityOperations, SessionOperations};
use crate::domain::rate_limit::RateLimiter;
use crate::domain::{Error, Profile};
use crate::inbound::http::session::SessionContext;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub identity: Arc<dyn IdentityOperations>,
    pub households: Arc<dyn HouseholdOperations>,
    pub sessions: Arc<dyn SessionOperations>,
    pub limiter: Arc<RateLimiter>,
}

impl HttpState {
    /// Bundle the driving ports and the request rate limiter.
    pub fn new(
        identity: Arc<dyn IdentityOperations>,
        households: Arc<dyn HouseholdOperations>,
        sessions: Arc<dyn SessionOperations>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            identity,
            households,
            sessions,
            limiter,
        }
    }

    /// Resolve the session into the acting profile, creating it lazily.
    pub async fn require_actor(&self, session: &SessionContext) -> Result<Profile, Error> {
        let user = session.require_user()?;
        self.identity.resolve_profile(&user).await
    }
}
