//! Household membership state machine.
//!
//! This service owns the access-control and invariant rules around
//! household membership: creation with an initial owner, member
//! invitation, role changes, removals, and the owner-safety rule that
//! keeps every household with at least one active owner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::warn;

use super::error::Error;
use super::household::{CreateHousehold, Household, HouseholdId, HouseholdType, NewHousehold};
use super::member::{
    HouseholdMember, HouseholdRole, MemberId, MemberRowPatch, MemberStatus, MemberUpdate,
    NewMember,
};
use super::ports::{
    AccountProvisioner, HouseholdMemberView, HouseholdOperations, HouseholdStore,
    HouseholdStoreError, HouseholdView, Invitation, InviteMember, MagicLinkDelivery,
    MagicLinkError, MagicLinkRequest, MagicLinkSender, ProfileStore, ProfileStoreError,
};
use super::profile::{Profile, ProfileSeed, UserId};

/// Household service implementing [`HouseholdOperations`].
#[derive(Clone)]
pub struct HouseholdService<S, P, N, A> {
    store: Arc<S>,
    profiles: Arc<P>,
    magic_link: Arc<N>,
    accounts: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<S, P, N, A> HouseholdService<S, P, N, A> {
    /// Create a new service over the given ports.
    pub fn new(
        store: Arc<S>,
        profiles: Arc<P>,
        magic_link: Arc<N>,
        accounts: Arc<A>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            profiles,
            magic_link,
            accounts,
            clock,
        }
    }
}

impl<S, P, N, A> HouseholdService<S, P, N, A>
where
    S: HouseholdStore,
    P: ProfileStore,
    N: MagicLinkSender,
    A: AccountProvisioner,
{
    fn map_store_error(error: HouseholdStoreError) -> Error {
        match error {
            HouseholdStoreError::UniqueViolation { .. } => {
                Error::validation("A record with the same unique value already exists")
            }
            other => Error::internal(format!("household store failure: {other}")),
        }
    }

    fn map_profile_error(error: ProfileStoreError) -> Error {
        Error::internal(format!("profile store failure: {error}"))
    }

    /// The actor's membership, required to be active.
    async fn require_active_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<HouseholdMember, Error> {
        let membership = self
            .store
            .find_membership(household_id, user_id)
            .await
            .map_err(Self::map_store_error)?;
        match membership {
            Some(member) if member.is_active() => Ok(member),
            _ => Err(Error::forbidden("You are not a member of this household")),
        }
    }

    /// The actor's membership, required to be an active owner or admin.
    async fn require_manager_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<HouseholdMember, Error> {
        let membership = self.require_active_membership(household_id, user_id).await?;
        if !membership.role.is_manager() {
            return Err(Error::forbidden(
                "You are not allowed to manage household members",
            ));
        }
        Ok(membership)
    }

    /// Owner-safety check: re-queries the committed active-owner count.
    async fn assert_owner_can_change(&self, household_id: HouseholdId) -> Result<(), Error> {
        let owners = self
            .store
            .count_active_owners(household_id)
            .await
            .map_err(Self::map_store_error)?;
        if owners <= 1 {
            return Err(Error::validation(
                "At least one active owner must remain in the household",
            ));
        }
        Ok(())
    }

    async fn member_views(
        &self,
        members: Vec<HouseholdMember>,
    ) -> Result<Vec<HouseholdMemberView>, Error> {
        let mut user_ids: Vec<UserId> = members.iter().map(|member| member.user_id).collect();
        user_ids.dedup();
        let profiles = self
            .profiles
            .load_profiles(&user_ids)
            .await
            .map_err(Self::map_profile_error)?;
        let by_id: HashMap<UserId, Profile> = profiles
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();
        Ok(members
            .into_iter()
            .map(|member| {
                let profile = by_id.get(&member.user_id);
                member_view(member, profile)
            })
            .collect())
    }

    fn household_view(
        household: Household,
        members: Vec<HouseholdMemberView>,
    ) -> HouseholdView {
        HouseholdView {
            id: household.id,
            name: household.name,
            household_type: household.household_type,
            base_currency: household.base_currency,
            created_at: household.created_at,
            members,
        }
    }

    /// Resolve the invited email to a user id, provisioning an account and
    /// a default profile when none exists yet.
    async fn resolve_invited_user(&self, input: &InviteMember) -> Result<UserId, Error> {
        let existing = self
            .profiles
            .find_profile_by_email(&input.email)
            .await
            .map_err(Self::map_profile_error)?;
        if let Some(profile) = existing {
            return Ok(profile.id);
        }

        let user_id = self
            .accounts
            .create_account(&input.email)
            .await
            .map_err(|_| Error::internal("Failed to create invited user account"))?;
        self.profiles
            .upsert_profile(ProfileSeed::with_defaults(user_id, input.email.clone()))
            .await
            .map_err(Self::map_profile_error)?;
        Ok(user_id)
    }

    /// Write the invited membership row: overwrite a non-active row in
    /// place, insert a fresh one otherwise.
    async fn upsert_invited_membership(
        &self,
        household_id: HouseholdId,
        invited_user_id: UserId,
        input: &InviteMember,
    ) -> Result<HouseholdMember, Error> {
        let existing = self
            .store
            .find_membership(household_id, invited_user_id)
            .await
            .map_err(Self::map_store_error)?;
        let now = self.clock.utc();

        match existing {
            Some(member) if member.is_active() => Err(Error::validation(
                "This user is already an active member of the household",
            )),
            Some(member) => self
                .store
                .update_member(
                    member.id,
                    MemberRowPatch::reinvite(input.role, input.email.clone(), now),
                )
                .await
                .map_err(Self::map_store_error),
            None => self
                .store
                .insert_member(NewMember::invited(
                    household_id,
                    invited_user_id,
                    input.role,
                    input.email.clone(),
                    now,
                ))
                .await
                .map_err(Self::map_store_error),
        }
    }

    /// Deliver the invitation link. The membership row already committed
    /// and is deliberately not rolled back on delivery failure.
    async fn send_invitation_link(&self, input: &InviteMember) -> Result<(), Error> {
        let outcome = self
            .magic_link
            .send(MagicLinkRequest {
                email: input.email.clone(),
                create_if_missing: false,
            })
            .await;
        match outcome {
            Ok(MagicLinkDelivery::Sent) => Ok(()),
            Ok(MagicLinkDelivery::UserMissing) => {
                // The account was provisioned moments ago; the provider
                // disagreeing is a delivery failure, not a client error.
                warn!(email = %input.email, "provider reported missing user for fresh invite");
                Err(Error::internal("Failed to send invitation magic link"))
            }
            Err(MagicLinkError::Throttled) => Err(Error::new(
                super::error::ErrorCode::RateLimited,
                "Too many invitation attempts",
            )),
            Err(MagicLinkError::Delivery { message }) => {
                warn!(error = %message, "invitation magic link delivery failed");
                Err(Error::internal("Failed to send invitation magic link"))
            }
        }
    }
}

fn member_view(member: HouseholdMember, profile: Option<&Profile>) -> HouseholdMemberView {
    HouseholdMemberView {
        id: member.id,
        user_id: member.user_id,
        role: member.role,
        status: member.status,
        display_name: profile.and_then(|p| p.display_name.clone()),
        email: profile
            .map(|p| p.email.clone())
            .or_else(|| member.invited_email.clone()),
        invited_email: member.invited_email,
        joined_at: member.joined_at,
    }
}

#[async_trait]
impl<S, P, N, A> HouseholdOperations for HouseholdService<S, P, N, A>
where
    S: HouseholdStore,
    P: ProfileStore,
    N: MagicLinkSender,
    A: AccountProvisioner,
{
    async fn create(
        &self,
        actor: &Profile,
        input: CreateHousehold,
    ) -> Result<HouseholdView, Error> {
        let now = self.clock.utc();
        let (household, owner) = self
            .store
            .create_household_with_owner(
                NewHousehold {
                    name: input.name,
                    household_type: HouseholdType::Household,
                    base_currency: input.base_currency,
                    created_by: actor.id,
                },
                now,
            )
            .await
            .map_err(Self::map_store_error)?;
        let members = vec![member_view(owner, Some(actor))];
        Ok(Self::household_view(household, members))
    }

    async fn get_by_id(
        &self,
        actor: &Profile,
        household_id: HouseholdId,
    ) -> Result<HouseholdView, Error> {
        self.require_active_membership(household_id, actor.id).await?;
        let household = self
            .store
            .find_household(household_id)
            .await
            .map_err(Self::map_store_error)?
            .ok_or_else(|| Error::not_found("Household was not found"))?;
        let members = self
            .store
            .list_members(household_id)
            .await
            .map_err(Self::map_store_error)?;
        let members = self.member_views(members).await?;
        Ok(Self::household_view(household, members))
    }

    async fn invite_member(
        &self,
        actor: &Profile,
        household_id: HouseholdId,
        input: InviteMember,
    ) -> Result<Invitation, Error> {
        self.require_manager_membership(household_id, actor.id).await?;
        if actor.email == input.email {
            return Err(Error::validation(
                "You cannot invite your own email address",
            ));
        }

        let invited_user_id = self.resolve_invited_user(&input).await?;
        let member = self
            .upsert_invited_membership(household_id, invited_user_id, &input)
            .await?;
        self.send_invitation_link(&input).await?;

        Ok(Invitation {
            invitation_id: member.id,
            email: input.email,
            status: MemberStatus::Invited,
        })
    }

    async fn update_member(
        &self,
        actor: &Profile,
        household_id: HouseholdId,
        member_id: MemberId,
        patch: MemberUpdate,
    ) -> Result<HouseholdMemberView, Error> {
        let requester = self.require_manager_membership(household_id, actor.id).await?;
        let target = self
            .store
            .find_member(household_id, member_id)
            .await
            .map_err(Self::map_store_error)?
            .ok_or_else(|| Error::not_found("Household member was not found"))?;

        if requester.role != HouseholdRole::Owner && target.role == HouseholdRole::Owner {
            return Err(Error::forbidden("Only owners can manage owner memberships"));
        }

        let mut row_patch = MemberRowPatch::default();
        match patch {
            MemberUpdate::Role(role) => {
                if target.status != MemberStatus::Active {
                    return Err(Error::validation(
                        "Only active members can have their role updated",
                    ));
                }
                if target.role == HouseholdRole::Owner {
                    self.assert_owner_can_change(household_id).await?;
                }
                let desired = HouseholdRole::from(role);
                if target.role != desired {
                    row_patch.role = Some(desired);
                }
            }
            MemberUpdate::Remove => {
                if target.user_id == actor.id {
                    return Err(Error::validation("You cannot remove your own membership"));
                }
                if target.status != MemberStatus::Removed {
                    if target.role == HouseholdRole::Owner {
                        self.assert_owner_can_change(household_id).await?;
                    }
                    row_patch.status = Some(MemberStatus::Removed);
                }
            }
        }

        let latest = if row_patch.is_empty() {
            target
        } else {
            self.store
                .update_member(member_id, row_patch)
                .await
                .map_err(Self::map_store_error)?
        };

        let mut views = self.member_views(vec![latest]).await?;
        views
            .pop()
            .ok_or_else(|| Error::internal("member view vanished after update"))
    }
}
