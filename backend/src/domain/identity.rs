//! Identity resolution for authenticated sessions.
//!
//! Every authenticated request is backed by a profile row. The resolver
//! upserts the row lazily (defaults apply only on first sight) so no
//! separate signup step is needed.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::Error;
use super::ports::{IdentityOperations, ProfileStore, ProfileStoreError};
use super::profile::{Profile, ProfileSeed, SessionUser};

/// Identity service implementing [`IdentityOperations`].
#[derive(Clone)]
pub struct IdentityService<P> {
    profiles: Arc<P>,
}

impl<P> IdentityService<P> {
    /// Create a new resolver over the profile store.
    pub fn new(profiles: Arc<P>) -> Self {
        Self { profiles }
    }
}

fn map_profile_error(error: ProfileStoreError) -> Error {
    Error::internal(format!("profile store failure: {error}"))
}

#[async_trait]
impl<P> IdentityOperations for IdentityService<P>
where
    P: ProfileStore,
{
    async fn resolve_profile(&self, session_user: &SessionUser) -> Result<Profile, Error> {
        self.profiles
            .upsert_profile(ProfileSeed::with_defaults(
                session_user.id,
                session_user.email.clone(),
            ))
            .await
            .map_err(map_profile_error)?;
        self.profiles
            .find_profile(session_user.id)
            .await
            .map_err(map_profile_error)?
            .ok_or_else(|| Error::internal("profile row missing after upsert"))
    }
}
