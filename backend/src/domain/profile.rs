//! Profile identity model.
//!
//! Profiles back every authenticated caller. They are created lazily on the
//! first authenticated request and never hard-deleted within this core.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Validation errors raised by the profile value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    EmptyEmail,
    EmailTooLong { max: usize },
    InvalidEmail,
    InvalidCurrency,
}

impl fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmailTooLong { max } => write!(f, "email must be at most {max} characters"),
            Self::InvalidEmail => write!(f, "email must be a valid address"),
            Self::InvalidCurrency => {
                write!(f, "currency must be a three-letter ISO 4217 code")
            }
        }
    }
}

impl std::error::Error for ProfileValidationError {}

/// Stable user identifier issued by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Wrap an identity-provider UUID.
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier (provisioning and tests).
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Lowercased, trimmed email address.
///
/// ## Invariants
/// - at most 320 characters;
/// - one `@` separating non-empty local and domain parts;
/// - the domain part contains a dot and no whitespace anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

/// Maximum accepted email length (RFC 3696 practical limit).
pub const EMAIL_MAX: usize = 320;

impl EmailAddress {
    /// Normalise and validate a raw email string.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ProfileValidationError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ProfileValidationError::EmptyEmail);
        }
        if normalized.chars().count() > EMAIL_MAX {
            return Err(ProfileValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        let mut parts = normalized.split('@');
        let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(domain), None) => (local, domain),
            _ => return Err(ProfileValidationError::InvalidEmail),
        };
        if local.is_empty()
            || domain.is_empty()
            || !domain.contains('.')
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(ProfileValidationError::InvalidEmail);
        }
        Ok(Self(normalized))
    }

    /// Borrow the normalised address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = ProfileValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Uppercased three-letter ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Normalise (trim, uppercase) and validate a currency code.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ProfileValidationError> {
        let normalized = raw.as_ref().trim().to_uppercase();
        if normalized.len() != 3 || !normalized.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ProfileValidationError::InvalidCurrency);
        }
        Ok(Self(normalized))
    }

    /// Default base currency applied to new profiles and households.
    pub fn default_sek() -> Self {
        Self("SEK".to_owned())
    }

    /// Borrow the normalised code.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ProfileValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identity record backing an authenticated caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: UserId,
    pub email: EmailAddress,
    pub display_name: Option<String>,
    pub base_currency: CurrencyCode,
    pub locale: String,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Seed values for the lazy profile upsert performed on every
/// authenticated request. Defaults apply only when the row is created.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSeed {
    pub id: UserId,
    pub email: EmailAddress,
    pub base_currency: CurrencyCode,
    pub locale: String,
}

impl ProfileSeed {
    /// Seed with the stock defaults (SEK, English locale).
    pub fn with_defaults(id: UserId, email: EmailAddress) -> Self {
        Self {
            id,
            email,
            base_currency: CurrencyCode::default_sek(),
            locale: "en".to_owned(),
        }
    }
}

/// The authenticated caller as supplied by the session layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: UserId,
    pub email: EmailAddress,
}
