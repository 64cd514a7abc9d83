//! Household aggregate root.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::profile::{CurrencyCode, UserId};

/// Validation errors raised by the household value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HouseholdValidationError {
    EmptyName,
    NameTooLong { max: usize },
    UnknownType,
}

impl fmt::Display for HouseholdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "household name must not be empty"),
            Self::NameTooLong { max } => {
                write!(f, "household name must be at most {max} characters")
            }
            Self::UnknownType => {
                write!(
                    f,
                    "household type must be household, extended_family, or circle"
                )
            }
        }
    }
}

impl std::error::Error for HouseholdValidationError {}

/// Household identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct HouseholdId(Uuid);

impl HouseholdId {
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

impl fmt::Display for HouseholdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trimmed household display name, 1 to 120 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HouseholdName(String);

/// Maximum allowed length for a household name.
pub const HOUSEHOLD_NAME_MAX: usize = 120;

impl HouseholdName {
    /// Trim and validate a raw name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, HouseholdValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(HouseholdValidationError::EmptyName);
        }
        if trimmed.chars().count() > HOUSEHOLD_NAME_MAX {
            return Err(HouseholdValidationError::NameTooLong {
                max: HOUSEHOLD_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the validated name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HouseholdName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HouseholdName> for String {
    fn from(value: HouseholdName) -> Self {
        value.0
    }
}

impl TryFrom<String> for HouseholdName {
    type Error = HouseholdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Kind of shared financial unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdType {
    #[default]
    Household,
    ExtendedFamily,
    Circle,
}

impl HouseholdType {
    /// Stable wire name for the variant.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Household => "household",
            Self::ExtendedFamily => "extended_family",
            Self::Circle => "circle",
        }
    }
}

impl std::str::FromStr for HouseholdType {
    type Err = HouseholdValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "household" => Ok(Self::Household),
            "extended_family" => Ok(Self::ExtendedFamily),
            "circle" => Ok(Self::Circle),
            _ => Err(HouseholdValidationError::UnknownType),
        }
    }
}

/// Household row. Immutable after creation within this core.
#[derive(Debug, Clone, PartialEq)]
pub struct Household {
    pub id: HouseholdId,
    pub name: HouseholdName,
    pub household_type: HouseholdType,
    pub base_currency: CurrencyCode,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Validated input for household creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateHousehold {
    pub name: HouseholdName,
    pub base_currency: CurrencyCode,
}

/// Insert payload for a household row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHousehold {
    pub name: HouseholdName,
    pub household_type: HouseholdType,
    pub base_currency: CurrencyCode,
    pub created_by: UserId,
}
