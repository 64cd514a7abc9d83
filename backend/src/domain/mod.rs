//! Domain core: entities, ports, and services.
//!
//! Nothing in here knows about HTTP, sessions, or any concrete store.
//! Adapters plug into the ports defined in [`ports`].

pub mod error;
pub mod household;
pub mod household_service;
pub mod identity;
pub mod member;
pub mod ports;
pub mod profile;
pub mod rate_limit;
pub mod session_view;

pub use error::{Error, ErrorCode};
pub use household::{CreateHousehold, Household, HouseholdId, HouseholdName, HouseholdType};
pub use household_service::HouseholdService;
pub use identity::IdentityService;
pub use member::{
    AssignableRole, HouseholdMember, HouseholdRole, MemberId, MemberStatus, MemberUpdate,
};
pub use profile::{CurrencyCode, EmailAddress, Profile, SessionUser, UserId};
pub use rate_limit::{RateBucket, RateLimiter, RateLimiterConfig};
pub use session_view::SessionService;
