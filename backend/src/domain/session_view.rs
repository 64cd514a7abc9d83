//! Session projection and magic-link sign-in orchestration.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::error::{Error, ErrorCode};
use super::ports::{
    HouseholdStore, HouseholdStoreError, MagicLinkDelivery, MagicLinkError, MagicLinkRequest,
    MagicLinkSender, SessionHouseholdSummary, SessionOperations, SessionView,
};
use super::profile::{EmailAddress, Profile};

/// Session service implementing [`SessionOperations`].
#[derive(Clone)]
pub struct SessionService<S, N> {
    store: Arc<S>,
    magic_link: Arc<N>,
}

impl<S, N> SessionService<S, N> {
    /// Create a new service over the membership store and link sink.
    pub fn new(store: Arc<S>, magic_link: Arc<N>) -> Self {
        Self { store, magic_link }
    }
}

impl<S, N> SessionService<S, N>
where
    S: HouseholdStore,
    N: MagicLinkSender,
{
    fn map_store_error(error: HouseholdStoreError) -> Error {
        Error::internal(format!("household store failure: {error}"))
    }

    async fn send_link(&self, email: &EmailAddress, create_if_missing: bool) -> Result<(), Error> {
        let outcome = self
            .magic_link
            .send(MagicLinkRequest {
                email: email.clone(),
                create_if_missing,
            })
            .await;
        match outcome {
            Ok(MagicLinkDelivery::Sent) => Ok(()),
            // Unknown addresses must be indistinguishable from success on
            // login, otherwise the endpoint leaks account existence.
            Ok(MagicLinkDelivery::UserMissing) => Ok(()),
            Err(MagicLinkError::Throttled) => Err(Error::new(
                ErrorCode::RateLimited,
                "Too many magic link requests",
            )),
            Err(MagicLinkError::Delivery { message }) => {
                warn!(error = %message, "magic link delivery failed");
                Err(Error::internal("Unable to send magic link"))
            }
        }
    }
}

#[async_trait]
impl<S, N> SessionOperations for SessionService<S, N>
where
    S: HouseholdStore,
    N: MagicLinkSender,
{
    async fn login(&self, email: &EmailAddress) -> Result<(), Error> {
        self.send_link(email, false).await
    }

    async fn signup(&self, email: &EmailAddress) -> Result<(), Error> {
        self.send_link(email, true).await
    }

    async fn project(&self, actor: &Profile) -> Result<SessionView, Error> {
        let memberships = self
            .store
            .list_active_memberships(actor.id)
            .await
            .map_err(Self::map_store_error)?;
        let household_ids: Vec<_> = memberships.iter().map(|row| row.household_id).collect();
        let counts = if household_ids.is_empty() {
            std::collections::HashMap::new()
        } else {
            self.store
                .count_active_members(&household_ids)
                .await
                .map_err(Self::map_store_error)?
        };

        let households = memberships
            .into_iter()
            .map(|row| SessionHouseholdSummary {
                member_count: counts.get(&row.household_id).copied().unwrap_or(0),
                id: row.household_id,
                name: row.household_name,
                role: row.role,
            })
            .collect();

        Ok(SessionView {
            user: actor.clone(),
            households,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockMagicLinkSender;
    use crate::domain::profile::{CurrencyCode, UserId};
    use crate::outbound::magic_link::LoggingMagicLink;
    use crate::outbound::memory::MemoryStore;
    use crate::test_support::seed_household;
    use chrono::Utc;
    use rstest::rstest;

    fn actor(id: UserId) -> Profile {
        Profile {
            id,
            email: EmailAddress::new("owner@example.com").expect("email"),
            display_name: None,
            base_currency: CurrencyCode::default_sek(),
            locale: "en".to_owned(),
            onboarding_completed: false,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[actix_rt::test]
    async fn projection_lists_only_active_memberships_with_counts() {
        let store = Arc::new(MemoryStore::new());
        let owner = UserId::random();
        let first = seed_household(&store, "Ek Household", owner).await;
        // A second member joins the first household; a third stays invited.
        seed_member(&store, first, crate::domain::member::MemberStatus::Active).await;
        seed_member(&store, first, crate::domain::member::MemberStatus::Invited).await;
        // The owner was removed from another household entirely.
        let other = seed_household(&store, "Old Circle", UserId::random()).await;
        let removed = store
            .insert_member(crate::domain::member::NewMember {
                household_id: other,
                user_id: owner,
                role: crate::domain::member::HouseholdRole::Member,
                status: crate::domain::member::MemberStatus::Removed,
                invited_email: None,
                invited_at: None,
                joined_at: None,
            })
            .await
            .expect("seed removed membership");
        assert_eq!(removed.status, crate::domain::member::MemberStatus::Removed);

        let service = SessionService::new(store, Arc::new(LoggingMagicLink::default()));
        let view = service.project(&actor(owner)).await.expect("project");

        assert_eq!(view.households.len(), 1);
        let summary = &view.households[0];
        assert_eq!(summary.id, first);
        assert_eq!(summary.name.as_str(), "Ek Household");
        assert_eq!(summary.role, crate::domain::member::HouseholdRole::Owner);
        // Owner plus the one active member; the invited row is excluded.
        assert_eq!(summary.member_count, 2);
    }

    #[rstest]
    #[actix_rt::test]
    async fn login_swallows_unknown_addresses() {
        let mut sender = MockMagicLinkSender::new();
        sender
            .expect_send()
            .withf(|request| !request.create_if_missing)
            .times(1)
            .return_once(|_| Ok(MagicLinkDelivery::UserMissing));
        let service = SessionService::new(Arc::new(MemoryStore::new()), Arc::new(sender));

        let email = EmailAddress::new("stranger@example.com").expect("email");
        service.login(&email).await.expect("login must not leak");
    }

    #[rstest]
    #[actix_rt::test]
    async fn provider_throttle_maps_to_rate_limited() {
        let mut sender = MockMagicLinkSender::new();
        sender
            .expect_send()
            .times(1)
            .return_once(|_| Err(MagicLinkError::Throttled));
        let service = SessionService::new(Arc::new(MemoryStore::new()), Arc::new(sender));

        let email = EmailAddress::new("busy@example.com").expect("email");
        let error = service.login(&email).await.expect_err("throttled");
        assert_eq!(error.code(), ErrorCode::RateLimited);
    }

    #[rstest]
    #[actix_rt::test]
    async fn provider_failure_maps_to_internal() {
        let mut sender = MockMagicLinkSender::new();
        sender
            .expect_send()
            .times(1)
            .return_once(|_| Err(MagicLinkError::delivery("smtp down")));
        let service = SessionService::new(Arc::new(MemoryStore::new()), Arc::new(sender));

        let email = EmailAddress::new("new@example.com").expect("email");
        let error = service.signup(&email).await.expect_err("failure");
        assert_eq!(error.code(), ErrorCode::InternalError);
    }

    async fn seed_member(
        store: &Arc<MemoryStore>,
        household_id: crate::domain::household::HouseholdId,
        status: crate::domain::member::MemberStatus,
    ) {
        let joined = matches!(status, crate::domain::member::MemberStatus::Active);
        store
            .insert_member(crate::domain::member::NewMember {
                household_id,
                user_id: UserId::random(),
                role: crate::domain::member::HouseholdRole::Member,
                status,
                invited_email: None,
                invited_at: None,
                joined_at: joined.then(Utc::now),
            })
            .await
            .expect("seed member");
    }
}
