//! In-memory store adapter.
//!
//! Backs the household and profile ports with mutex-guarded vectors. Used
//! as the default store for local runs and as the fake in service and
//! HTTP tests. Rows keep insertion order, so `list_members` ordering
//! falls out of the vector.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::household::{Household, HouseholdId, NewHousehold};
use crate::domain::member::{HouseholdMember, MemberId, MemberRowPatch, MemberStatus, NewMember};
use crate::domain::ports::{
    AccountProvisioner, ActiveMembershipRow, HouseholdStore, HouseholdStoreError, ProfileStore,
    ProfileStoreError, ProvisioningError,
};
use crate::domain::profile::{EmailAddress, Profile, ProfileSeed, UserId};

#[derive(Debug, Default)]
struct Inner {
    households: Vec<Household>,
    members: Vec<HouseholdMember>,
    profiles: Vec<Profile>,
}

/// Mutex-guarded in-memory implementation of the persistence ports.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, HouseholdStoreError> {
        self.inner
            .lock()
            .map_err(|_| HouseholdStoreError::connection("memory store mutex poisoned"))
    }

    fn lock_profiles(&self) -> Result<MutexGuard<'_, Inner>, ProfileStoreError> {
        self.inner
            .lock()
            .map_err(|_| ProfileStoreError::connection("memory store mutex poisoned"))
    }

    fn member_row(
        household_id: HouseholdId,
        member: NewMember,
        now: DateTime<Utc>,
    ) -> HouseholdMember {
        HouseholdMember {
            id: MemberId::random(),
            household_id,
            user_id: member.user_id,
            role: member.role,
            status: member.status,
            invited_email: member.invited_email,
            invited_at: member.invited_at,
            joined_at: member.joined_at,
            created_at: now,
        }
    }

    /// Overwrite profile fields a user may choose themselves. Test seam
    /// for exercising the upsert-preserves-choices rule.
    #[cfg(test)]
    pub fn set_profile_preferences(
        &self,
        id: UserId,
        display_name: Option<String>,
        base_currency: crate::domain::profile::CurrencyCode,
    ) -> Result<(), ProfileStoreError> {
        let mut inner = self.lock_profiles()?;
        let profile = inner
            .profiles
            .iter_mut()
            .find(|profile| profile.id == id)
            .ok_or_else(|| ProfileStoreError::query("no such profile"))?;
        profile.display_name = display_name;
        profile.base_currency = base_currency;
        Ok(())
    }
}

fn apply_patch(row: &mut HouseholdMember, patch: MemberRowPatch) {
    if let Some(role) = patch.role {
        row.role = role;
    }
    if let Some(status) = patch.status {
        row.status = status;
    }
    if let Some(invited_email) = patch.invited_email {
        row.invited_email = invited_email;
    }
    if let Some(invited_at) = patch.invited_at {
        row.invited_at = invited_at;
    }
    if let Some(joined_at) = patch.joined_at {
        row.joined_at = joined_at;
    }
}

#[async_trait]
impl HouseholdStore for MemoryStore {
    async fn create_household_with_owner(
        &self,
        household: NewHousehold,
        now: DateTime<Utc>,
    ) -> Result<(Household, HouseholdMember), HouseholdStoreError> {
        let mut inner = self.lock()?;
        let row = Household {
            id: HouseholdId::random(),
            name: household.name,
            household_type: household.household_type,
            base_currency: household.base_currency,
            created_by: household.created_by,
            created_at: now,
        };
        let owner = Self::member_row(
            row.id,
            NewMember::active_owner(row.id, household.created_by, now),
            now,
        );
        inner.households.push(row.clone());
        inner.members.push(owner.clone());
        Ok((row, owner))
    }

    async fn find_household(
        &self,
        id: HouseholdId,
    ) -> Result<Option<Household>, HouseholdStoreError> {
        let inner = self.lock()?;
        Ok(inner
            .households
            .iter()
            .find(|household| household.id == id)
            .cloned())
    }

    async fn find_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<Option<HouseholdMember>, HouseholdStoreError> {
        let inner = self.lock()?;
        Ok(inner
            .members
            .iter()
            .find(|member| member.household_id == household_id && member.user_id == user_id)
            .cloned())
    }

    async fn find_member(
        &self,
        household_id: HouseholdId,
        member_id: MemberId,
    ) -> Result<Option<HouseholdMember>, HouseholdStoreError> {
        let inner = self.lock()?;
        Ok(inner
            .members
            .iter()
            .find(|member| member.household_id == household_id && member.id == member_id)
            .cloned())
    }

    async fn list_members(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<HouseholdMember>, HouseholdStoreError> {
        let inner = self.lock()?;
        // Insertion order is creation order.
        Ok(inner
            .members
            .iter()
            .filter(|member| member.household_id == household_id)
            .cloned()
            .collect())
    }

    async fn insert_member(
        &self,
        member: NewMember,
    ) -> Result<HouseholdMember, HouseholdStoreError> {
        let mut inner = self.lock()?;
        let duplicate = inner.members.iter().any(|existing| {
            existing.household_id == member.household_id && existing.user_id == member.user_id
        });
        if duplicate {
            return Err(HouseholdStoreError::unique_violation(
                "membership already exists for this household and user",
            ));
        }
        let row = Self::member_row(member.household_id, member, Utc::now());
        inner.members.push(row.clone());
        Ok(row)
    }

    async fn update_member(
        &self,
        member_id: MemberId,
        patch: MemberRowPatch,
    ) -> Result<HouseholdMember, HouseholdStoreError> {
        let mut inner = self.lock()?;
        let row = inner
            .members
            .iter_mut()
            .find(|member| member.id == member_id)
            .ok_or_else(|| HouseholdStoreError::query("no such membership row"))?;
        apply_patch(row, patch);
        Ok(row.clone())
    }

    async fn count_active_owners(
        &self,
        household_id: HouseholdId,
    ) -> Result<u64, HouseholdStoreError> {
        let inner = self.lock()?;
        let count = inner
            .members
            .iter()
            .filter(|member| {
                member.household_id == household_id
                    && member.role == crate::domain::member::HouseholdRole::Owner
                    && member.status == MemberStatus::Active
            })
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn list_active_memberships(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActiveMembershipRow>, HouseholdStoreError> {
        let inner = self.lock()?;
        let mut rows = Vec::new();
        for member in inner
            .members
            .iter()
            .filter(|member| member.user_id == user_id && member.status == MemberStatus::Active)
        {
            let household = inner
                .households
                .iter()
                .find(|household| household.id == member.household_id)
                .ok_or_else(|| HouseholdStoreError::query("membership without household"))?;
            rows.push(ActiveMembershipRow {
                household_id: household.id,
                household_name: household.name.clone(),
                role: member.role,
            });
        }
        Ok(rows)
    }

    async fn count_active_members(
        &self,
        household_ids: &[HouseholdId],
    ) -> Result<HashMap<HouseholdId, u64>, HouseholdStoreError> {
        let inner = self.lock()?;
        let mut counts: HashMap<HouseholdId, u64> = HashMap::new();
        for member in inner
            .members
            .iter()
            .filter(|member| member.status == MemberStatus::Active)
        {
            if household_ids.contains(&member.household_id) {
                *counts.entry(member.household_id).or_default() += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn upsert_profile(&self, seed: ProfileSeed) -> Result<(), ProfileStoreError> {
        let mut inner = self.lock_profiles()?;
        if let Some(profile) = inner.profiles.iter_mut().find(|profile| profile.id == seed.id) {
            // The row exists; only the provider-owned email may move.
            profile.email = seed.email;
            return Ok(());
        }
        inner.profiles.push(Profile {
            id: seed.id,
            email: seed.email,
            display_name: None,
            base_currency: seed.base_currency,
            locale: seed.locale,
            onboarding_completed: false,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn find_profile(&self, id: UserId) -> Result<Option<Profile>, ProfileStoreError> {
        let inner = self.lock_profiles()?;
        Ok(inner.profiles.iter().find(|profile| profile.id == id).cloned())
    }

    async fn find_profile_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Profile>, ProfileStoreError> {
        let inner = self.lock_profiles()?;
        Ok(inner
            .profiles
            .iter()
            .find(|profile| profile.email == *email)
            .cloned())
    }

    async fn load_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>, ProfileStoreError> {
        let inner = self.lock_profiles()?;
        Ok(inner
            .profiles
            .iter()
            .filter(|profile| ids.contains(&profile.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccountProvisioner for MemoryStore {
    async fn create_account(&self, _email: &EmailAddress) -> Result<UserId, ProvisioningError> {
        Ok(UserId::random())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::household::{HouseholdName, HouseholdType};
    use crate::domain::member::{AssignableRole, HouseholdRole};
    use crate::domain::profile::CurrencyCode;
    use rstest::rstest;

    fn new_household(created_by: UserId) -> NewHousehold {
        NewHousehold {
            name: HouseholdName::new("Ek Household").expect("name"),
            household_type: HouseholdType::Household,
            base_currency: CurrencyCode::default_sek(),
            created_by,
        }
    }

    #[rstest]
    #[actix_rt::test]
    async fn creation_inserts_household_and_active_owner_together() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let now = Utc::now();

        let (household, member) = store
            .create_household_with_owner(new_household(owner), now)
            .await
            .expect("create");

        assert_eq!(household.created_by, owner);
        assert_eq!(member.household_id, household.id);
        assert_eq!(member.role, HouseholdRole::Owner);
        assert_eq!(member.status, MemberStatus::Active);
        assert_eq!(member.joined_at, Some(now));
        assert_eq!(
            store.count_active_owners(household.id).await.expect("count"),
            1
        );
    }

    #[rstest]
    #[actix_rt::test]
    async fn duplicate_membership_is_a_unique_violation() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let (household, _) = store
            .create_household_with_owner(new_household(owner), Utc::now())
            .await
            .expect("create");

        let error = store
            .insert_member(NewMember::invited(
                household.id,
                owner,
                AssignableRole::Member,
                EmailAddress::new("owner@example.com").expect("email"),
                Utc::now(),
            ))
            .await
            .expect_err("duplicate rejected");
        assert!(matches!(error, HouseholdStoreError::UniqueViolation { .. }));
    }

    #[rstest]
    #[actix_rt::test]
    async fn list_members_preserves_creation_order() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let (household, _) = store
            .create_household_with_owner(new_household(owner), Utc::now())
            .await
            .expect("create");

        let first = UserId::random();
        let second = UserId::random();
        for user in [first, second] {
            store
                .insert_member(NewMember::invited(
                    household.id,
                    user,
                    AssignableRole::Member,
                    EmailAddress::new(format!("{user}@example.com")).expect("email"),
                    Utc::now(),
                ))
                .await
                .expect("insert");
        }

        let members = store.list_members(household.id).await.expect("list");
        let order: Vec<UserId> = members.iter().map(|member| member.user_id).collect();
        assert_eq!(order, vec![owner, first, second]);
    }

    #[rstest]
    #[actix_rt::test]
    async fn upsert_refreshes_email_but_keeps_chosen_values() {
        let store = MemoryStore::new();
        let id = UserId::random();
        store
            .upsert_profile(ProfileSeed::with_defaults(
                id,
                EmailAddress::new("old@example.com").expect("email"),
            ))
            .await
            .expect("create");
        store
            .set_profile_preferences(
                id,
                Some("Anna".to_owned()),
                CurrencyCode::new("EUR").expect("currency"),
            )
            .expect("adjust");

        store
            .upsert_profile(ProfileSeed::with_defaults(
                id,
                EmailAddress::new("new@example.com").expect("email"),
            ))
            .await
            .expect("upsert");

        let profile = store
            .find_profile(id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(profile.email.as_str(), "new@example.com");
        assert_eq!(profile.display_name.as_deref(), Some("Anna"));
        assert_eq!(profile.base_currency.as_str(), "EUR");
    }

    #[rstest]
    #[actix_rt::test]
    async fn patch_writes_explicit_nulls() {
        let store = MemoryStore::new();
        let (household, _) = store
            .create_household_with_owner(new_household(UserId::random()), Utc::now())
            .await
            .expect("create");
        let invited = store
            .insert_member(NewMember::invited(
                household.id,
                UserId::random(),
                AssignableRole::Member,
                EmailAddress::new("friend@example.com").expect("email"),
                Utc::now(),
            ))
            .await
            .expect("insert");

        let patch = MemberRowPatch {
            status: Some(MemberStatus::Active),
            invited_email: Some(None),
            invited_at: Some(None),
            joined_at: Some(Some(Utc::now())),
            ..MemberRowPatch::default()
        };
        let updated = store.update_member(invited.id, patch).await.expect("patch");
        assert_eq!(updated.status, MemberStatus::Active);
        assert!(updated.invited_email.is_none());
        assert!(updated.invited_at.is_none());
        assert!(updated.joined_at.is_some());
    }
}
