//! Domain ports defining the edges of the hexagon.
//!
//! Driven ports describe how the domain reaches adapters (the membership
//! row store, the profile store, the magic-link sink, the account
//! provisioner). Driving ports are the use-case surface consumed by the
//! inbound HTTP adapter. Each trait exposes strongly typed errors so
//! adapters map their failures into predictable variants.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error as ThisError;

use super::error::Error;
use super::household::{CreateHousehold, Household, HouseholdId, HouseholdName, NewHousehold};
use super::member::{
    AssignableRole, HouseholdMember, HouseholdRole, MemberId, MemberRowPatch, MemberStatus,
    MemberUpdate, NewMember,
};
use super::profile::{CurrencyCode, EmailAddress, Profile, ProfileSeed, SessionUser, UserId};

/// Failures surfaced by the membership row store.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum HouseholdStoreError {
    /// Store connectivity or transaction failures.
    #[error("household store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("household store query failed: {message}")]
    Query { message: String },
    /// A uniqueness constraint rejected the write.
    #[error("household store unique constraint violated: {message}")]
    UniqueViolation { message: String },
}

impl HouseholdStoreError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Helper for unique constraint violations.
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::UniqueViolation {
            message: message.into(),
        }
    }
}

/// Failures surfaced by the profile store.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ProfileStoreError {
    /// Store connectivity failures.
    #[error("profile store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("profile store query failed: {message}")]
    Query { message: String },
}

impl ProfileStoreError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Failures reported by the magic-link notification sink.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum MagicLinkError {
    /// The provider throttled the send.
    #[error("magic link provider throttled the request")]
    Throttled,
    /// Any other delivery failure.
    #[error("magic link delivery failed: {message}")]
    Delivery { message: String },
}

impl MagicLinkError {
    /// Helper for non-throttle delivery failures.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }
}

/// Failures reported by the account provisioning side channel.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ProvisioningError {
    /// The provider could not create the account.
    #[error("account provisioning failed: {message}")]
    Failed { message: String },
}

impl ProvisioningError {
    /// Helper for provider failures.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// One active membership joined with its household, as one typed row.
///
/// The join shape is decided here once; use-sites never branch on it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveMembershipRow {
    pub household_id: HouseholdId,
    pub household_name: HouseholdName,
    pub role: HouseholdRole,
}

/// Persistence port for households and membership rows.
///
/// Implementations back the row-level reads and writes of the household
/// service. `create_household_with_owner` must be atomic: either both the
/// household and its owner membership exist afterwards, or neither does.
/// The owner-safety check re-queries `count_active_owners` at mutation
/// time; relational adapters should pair it with a transaction or a
/// store-level constraint to close the read-then-write window.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HouseholdStore: Send + Sync {
    /// Create a household together with its active owner membership.
    async fn create_household_with_owner(
        &self,
        household: NewHousehold,
        now: DateTime<Utc>,
    ) -> Result<(Household, HouseholdMember), HouseholdStoreError>;

    /// Fetch a household row by id.
    async fn find_household(
        &self,
        id: HouseholdId,
    ) -> Result<Option<Household>, HouseholdStoreError>;

    /// Fetch the membership row for a (household, user) pair.
    async fn find_membership(
        &self,
        household_id: HouseholdId,
        user_id: UserId,
    ) -> Result<Option<HouseholdMember>, HouseholdStoreError>;

    /// Fetch a membership row by id within a household.
    async fn find_member(
        &self,
        household_id: HouseholdId,
        member_id: MemberId,
    ) -> Result<Option<HouseholdMember>, HouseholdStoreError>;

    /// List every membership row of a household, any status, ordered by
    /// creation (ascending, stable).
    async fn list_members(
        &self,
        household_id: HouseholdId,
    ) -> Result<Vec<HouseholdMember>, HouseholdStoreError>;

    /// Insert a membership row, enforcing (household, user) uniqueness.
    async fn insert_member(
        &self,
        member: NewMember,
    ) -> Result<HouseholdMember, HouseholdStoreError>;

    /// Apply a column patch to an existing membership row.
    async fn update_member(
        &self,
        member_id: MemberId,
        patch: MemberRowPatch,
    ) -> Result<HouseholdMember, HouseholdStoreError>;

    /// Count memberships with role owner and status active, from current
    /// committed state.
    async fn count_active_owners(
        &self,
        household_id: HouseholdId,
    ) -> Result<u64, HouseholdStoreError>;

    /// List a user's active memberships joined with household names.
    async fn list_active_memberships(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActiveMembershipRow>, HouseholdStoreError>;

    /// Count active members per household for the given households.
    async fn count_active_members(
        &self,
        household_ids: &[HouseholdId],
    ) -> Result<HashMap<HouseholdId, u64>, HouseholdStoreError>;
}

/// Persistence port for profile rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert the seed when no row exists; otherwise refresh the email
    /// only. Defaults never overwrite user-chosen values.
    async fn upsert_profile(&self, seed: ProfileSeed) -> Result<(), ProfileStoreError>;

    /// Fetch a profile by user id.
    async fn find_profile(&self, id: UserId) -> Result<Option<Profile>, ProfileStoreError>;

    /// Fetch a profile by (normalised) email.
    async fn find_profile_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Profile>, ProfileStoreError>;

    /// Fetch the profiles for the given user ids (missing ids are skipped).
    async fn load_profiles(&self, ids: &[UserId]) -> Result<Vec<Profile>, ProfileStoreError>;
}

/// A magic-link send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLinkRequest {
    pub email: EmailAddress,
    /// Whether the provider may create an account for an unknown email.
    pub create_if_missing: bool,
}

/// Outcome of a magic-link send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicLinkDelivery {
    /// The provider accepted the send.
    Sent,
    /// The provider knows no such user and account creation was disallowed.
    UserMissing,
}

/// Notification port delivering passwordless sign-in links.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MagicLinkSender: Send + Sync {
    /// Ask the provider to deliver a magic link.
    async fn send(&self, request: MagicLinkRequest) -> Result<MagicLinkDelivery, MagicLinkError>;
}

/// Provisioning port creating identity-provider accounts for invited
/// emails that have no profile yet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Create an account for the email and return its stable user id.
    async fn create_account(&self, email: &EmailAddress) -> Result<UserId, ProvisioningError>;
}

/// Membership annotated with resolved profile display fields.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdMemberView {
    pub id: MemberId,
    pub user_id: UserId,
    pub role: HouseholdRole,
    pub status: MemberStatus,
    pub display_name: Option<String>,
    pub email: Option<EmailAddress>,
    pub invited_email: Option<EmailAddress>,
    pub joined_at: Option<DateTime<Utc>>,
}

/// A household with all of its members.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdView {
    pub id: HouseholdId,
    pub name: HouseholdName,
    pub household_type: super::household::HouseholdType,
    pub base_currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
    pub members: Vec<HouseholdMemberView>,
}

/// Result of a member invitation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    /// The membership row doubling as the invitation record.
    pub invitation_id: MemberId,
    pub email: EmailAddress,
    pub status: MemberStatus,
}

/// Validated input for a member invitation.
#[derive(Debug, Clone, PartialEq)]
pub struct InviteMember {
    pub email: EmailAddress,
    pub role: AssignableRole,
}

/// One household in a session summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHouseholdSummary {
    pub id: HouseholdId,
    pub name: HouseholdName,
    pub role: HouseholdRole,
    pub member_count: u64,
}

/// A user's session view: profile fields plus household summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub user: Profile,
    pub households: Vec<SessionHouseholdSummary>,
}

/// Driving port: household lifecycle and membership mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HouseholdOperations: Send + Sync {
    /// Create a household owned by the actor.
    async fn create(&self, actor: &Profile, input: CreateHousehold)
    -> Result<HouseholdView, Error>;

    /// Fetch a household with all members; actor must be an active member.
    async fn get_by_id(
        &self,
        actor: &Profile,
        household_id: HouseholdId,
    ) -> Result<HouseholdView, Error>;

    /// Invite an email into the household; actor must be a manager.
    async fn invite_member(
        &self,
        actor: &Profile,
        household_id: HouseholdId,
        input: InviteMember,
    ) -> Result<Invitation, Error>;

    /// Change a member's role or remove them; actor must be a manager.
    async fn update_member(
        &self,
        actor: &Profile,
        household_id: HouseholdId,
        member_id: MemberId,
        patch: MemberUpdate,
    ) -> Result<HouseholdMemberView, Error>;
}

/// Driving port: lazy profile resolution for authenticated sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityOperations: Send + Sync {
    /// Upsert-then-fetch the profile backing a session user.
    async fn resolve_profile(&self, session_user: &SessionUser) -> Result<Profile, Error>;
}

/// Driving port: magic-link sign-in and session projection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionOperations: Send + Sync {
    /// Send a sign-in link to an existing account. Unknown addresses are
    /// deliberately indistinguishable from successful sends.
    async fn login(&self, email: &EmailAddress) -> Result<(), Error>;

    /// Send a sign-up link, creating the account if necessary.
    async fn signup(&self, email: &EmailAddress) -> Result<(), Error>;

    /// Assemble the actor's session view.
    async fn project(&self, actor: &Profile) -> Result<SessionView, Error>;
}
