//! Household membership: the join entity and its state machine vocabulary.
//!
//! A membership binds a user to a household with a role and a status. Role
//! is authoritative only while the status is `active`; invited and removed
//! rows carry it as a pending or historical value.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::household::HouseholdId;
use super::profile::{EmailAddress, UserId};

/// Validation errors raised when parsing membership vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberValidationError {
    UnknownRole,
    OwnerNotAssignable,
    UnknownStatus,
}

impl fmt::Display for MemberValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRole => write!(f, "role must be owner, admin, member, or viewer"),
            Self::OwnerNotAssignable => {
                write!(f, "the owner role cannot be assigned, only inherited")
            }
            Self::UnknownStatus => write!(f, "status must be active, invited, or removed"),
        }
    }
}

impl std::error::Error for MemberValidationError {}

/// Membership identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct MemberId(Uuid);

impl MemberId {
    /// Wrap an existing UUID.
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role carried by a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl HouseholdRole {
    /// Managers (owners and admins) may invite and mutate memberships.
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }

    /// Stable wire name for the variant.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

impl std::str::FromStr for HouseholdRole {
    type Err = MemberValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            _ => Err(MemberValidationError::UnknownRole),
        }
    }
}

/// Roles that can be granted through invitations and role updates.
///
/// Ownership is never assignable; it exists only through household creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignableRole {
    Admin,
    #[default]
    Member,
    Viewer,
}

impl AssignableRole {
    /// Stable wire name for the variant.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }
}

impl From<AssignableRole> for HouseholdRole {
    fn from(value: AssignableRole) -> Self {
        match value {
            AssignableRole::Admin => Self::Admin,
            AssignableRole::Member => Self::Member,
            AssignableRole::Viewer => Self::Viewer,
        }
    }
}

impl std::str::FromStr for AssignableRole {
    type Err = MemberValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            "owner" => Err(MemberValidationError::OwnerNotAssignable),
            _ => Err(MemberValidationError::UnknownRole),
        }
    }
}

/// Lifecycle status of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Invited,
    Removed,
}

impl MemberStatus {
    /// Stable wire name for the variant.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Invited => "invited",
            Self::Removed => "removed",
        }
    }
}

impl std::str::FromStr for MemberStatus {
    type Err = MemberValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "invited" => Ok(Self::Invited),
            "removed" => Ok(Self::Removed),
            _ => Err(MemberValidationError::UnknownStatus),
        }
    }
}

/// Membership row.
///
/// ## Invariants (enforced by the household service and the store)
/// - at most one row per (household, user) pair;
/// - `Invited` rows carry `invited_email`/`invited_at` and no `joined_at`;
/// - `Active` rows carry `joined_at`;
/// - a household never drops to zero active owners.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdMember {
    pub id: MemberId,
    pub household_id: HouseholdId,
    pub user_id: UserId,
    pub role: HouseholdRole,
    pub status: MemberStatus,
    pub invited_email: Option<EmailAddress>,
    pub invited_at: Option<DateTime<Utc>>,
    pub joined_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl HouseholdMember {
    /// Whether this membership currently authorises its role.
    pub const fn is_active(&self) -> bool {
        matches!(self.status, MemberStatus::Active)
    }
}

/// Insert payload for a membership row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub household_id: HouseholdId,
    pub user_id: UserId,
    pub role: HouseholdRole,
    pub status: MemberStatus,
    pub invited_email: Option<EmailAddress>,
    pub invited_at: Option<DateTime<Utc>>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl NewMember {
    /// The owner membership created together with a household.
    pub fn active_owner(household_id: HouseholdId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            household_id,
            user_id,
            role: HouseholdRole::Owner,
            status: MemberStatus::Active,
            invited_email: None,
            invited_at: None,
            joined_at: Some(now),
        }
    }

    /// A pending invitation row.
    pub fn invited(
        household_id: HouseholdId,
        user_id: UserId,
        role: AssignableRole,
        email: EmailAddress,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            household_id,
            user_id,
            role: role.into(),
            status: MemberStatus::Invited,
            invited_email: Some(email),
            invited_at: Some(now),
            joined_at: None,
        }
    }
}

/// Column-level patch applied to an existing membership row.
///
/// `Option` fields are left untouched when `None`; the nested options write
/// explicit NULLs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemberRowPatch {
    pub role: Option<HouseholdRole>,
    pub status: Option<MemberStatus>,
    pub invited_email: Option<Option<EmailAddress>>,
    pub invited_at: Option<Option<DateTime<Utc>>>,
    pub joined_at: Option<Option<DateTime<Utc>>>,
}

impl MemberRowPatch {
    /// Whether applying this patch would change anything at all.
    pub const fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.status.is_none()
            && self.invited_email.is_none()
            && self.invited_at.is_none()
            && self.joined_at.is_none()
    }

    /// The overwrite applied when re-inviting a previously invited or
    /// removed member.
    pub fn reinvite(role: AssignableRole, email: EmailAddress, now: DateTime<Utc>) -> Self {
        Self {
            role: Some(role.into()),
            status: Some(MemberStatus::Invited),
            invited_email: Some(Some(email)),
            invited_at: Some(Some(now)),
            joined_at: Some(None),
        }
    }
}

/// Mutation requested against a membership, parsed at the boundary.
///
/// Modelled as a tagged variant so the impossible "role and status at
/// once" payload is unrepresentable past the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberUpdate {
    /// Change the member's role to an assignable role.
    Role(AssignableRole),
    /// Remove the member (terminal logical deletion).
    Remove,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HouseholdRole::Owner, true)]
    #[case(HouseholdRole::Admin, true)]
    #[case(HouseholdRole::Member, false)]
    #[case(HouseholdRole::Viewer, false)]
    fn managers_are_owner_and_admin(#[case] role: HouseholdRole, #[case] expected: bool) {
        assert_eq!(role.is_manager(), expected);
    }

    #[rstest]
    fn owner_is_not_assignable() {
        assert_eq!(
            "owner".parse::<AssignableRole>(),
            Err(MemberValidationError::OwnerNotAssignable)
        );
    }

    #[rstest]
    #[case("admin", AssignableRole::Admin)]
    #[case("member", AssignableRole::Member)]
    #[case("viewer", AssignableRole::Viewer)]
    fn assignable_roles_parse(#[case] raw: &str, #[case] expected: AssignableRole) {
        assert_eq!(raw.parse::<AssignableRole>(), Ok(expected));
    }

    #[rstest]
    fn reinvite_patch_clears_joined_at_and_refreshes_invite_fields() {
        let email = EmailAddress::new("friend@example.com").expect("email");
        let now = chrono::Utc::now();
        let patch = MemberRowPatch::reinvite(AssignableRole::Viewer, email.clone(), now);
        assert_eq!(patch.role, Some(HouseholdRole::Viewer));
        assert_eq!(patch.status, Some(MemberStatus::Invited));
        assert_eq!(patch.invited_email, Some(Some(email)));
        assert_eq!(patch.invited_at, Some(Some(now)));
        assert_eq!(patch.joined_at, Some(None));
        assert!(!patch.is_empty());
    }
}
