//! Shared validation helpers for inbound HTTP payloads.
//!
//! Boundary parsing produces `Validation` errors with itemised `details`
//! so clients can map failures back onto form fields.

use std::str::FromStr;

use serde_json::json;
use uuid::Uuid;

use crate::domain::household::HouseholdName;
use crate::domain::member::{AssignableRole, MemberUpdate, MemberValidationError};
use crate::domain::profile::{CurrencyCode, EmailAddress};
use crate::domain::Error;

fn field_error(field: &'static str, message: impl Into<String>, code: &'static str) -> Error {
    Error::validation(message).with_details(json!({
        "field": field,
        "code": code,
    }))
}

pub(crate) fn missing_field_error(field: &'static str) -> Error {
    field_error(field, format!("missing required field: {field}"), "missing_field")
}

/// Parse a required email field.
pub(crate) fn parse_email(raw: Option<String>, field: &'static str) -> Result<EmailAddress, Error> {
    let raw = raw.ok_or_else(|| missing_field_error(field))?;
    EmailAddress::new(raw).map_err(|error| field_error(field, error.to_string(), "invalid_email"))
}

/// Parse an optional currency field, defaulting to SEK.
pub(crate) fn parse_currency(
    raw: Option<String>,
    field: &'static str,
) -> Result<CurrencyCode, Error> {
    match raw {
        None => Ok(CurrencyCode::default_sek()),
        Some(raw) => CurrencyCode::new(raw)
            .map_err(|error| field_error(field, error.to_string(), "invalid_currency")),
    }
}

/// Parse a required household name field.
pub(crate) fn parse_household_name(
    raw: Option<String>,
    field: &'static str,
) -> Result<HouseholdName, Error> {
    let raw = raw.ok_or_else(|| missing_field_error(field))?;
    HouseholdName::new(raw).map_err(|error| field_error(field, error.to_string(), "invalid_name"))
}

/// Parse an optional assignable role field, defaulting to member.
pub(crate) fn parse_assignable_role(
    raw: Option<String>,
    field: &'static str,
) -> Result<AssignableRole, Error> {
    match raw {
        None => Ok(AssignableRole::default()),
        Some(raw) => AssignableRole::from_str(&raw).map_err(|error| {
            let code = match error {
                MemberValidationError::OwnerNotAssignable => "owner_not_assignable",
                _ => "invalid_role",
            };
            field_error(field, error.to_string(), code)
        }),
    }
}

/// Parse a member mutation payload.
///
/// Exactly one of `role` and `status` must be present, and `status` only
/// accepts `"removed"`; combined or empty payloads never reach the domain.
pub(crate) fn parse_member_update(
    role: Option<String>,
    status: Option<String>,
) -> Result<MemberUpdate, Error> {
    match (role, status) {
        (Some(role), None) => Ok(MemberUpdate::Role(parse_assignable_role(
            Some(role),
            "role",
        )?)),
        (None, Some(status)) if status == "removed" => Ok(MemberUpdate::Remove),
        (None, Some(_)) => Err(field_error(
            "status",
            "status only accepts \"removed\"",
            "invalid_status",
        )),
        (Some(_), Some(_)) => Err(Error::validation(
            "set exactly one of role and status, not both",
        )
        .with_details(json!({ "fields": ["role", "status"], "code": "conflicting_fields" }))),
        (None, None) => Err(Error::validation("set exactly one of role and status")
            .with_details(json!({ "fields": ["role", "status"], "code": "missing_field" }))),
    }
}

/// Parse a path segment as a UUID.
pub(crate) fn parse_path_uuid(raw: &str, field: &'static str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| {
        Error::validation(format!("{field} must be a valid UUID")).with_details(json!({
            "field": field,
            "value": raw,
            "code": "invalid_uuid",
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn missing_email_is_itemised() {
        let error = parse_email(None, "email").expect_err("missing");
        let details = error.details().expect("details");
        assert_eq!(details["field"], "email");
        assert_eq!(details["code"], "missing_field");
    }

    #[rstest]
    fn currency_defaults_to_sek() {
        let currency = parse_currency(None, "baseCurrency").expect("default");
        assert_eq!(currency.as_str(), "SEK");
    }

    #[rstest]
    fn lowercase_currency_is_normalised() {
        let currency = parse_currency(Some("sek".to_owned()), "baseCurrency").expect("parse");
        assert_eq!(currency.as_str(), "SEK");
    }

    #[rstest]
    fn role_defaults_to_member() {
        let role = parse_assignable_role(None, "role").expect("default");
        assert_eq!(role, AssignableRole::Member);
    }

    #[rstest]
    fn owner_role_is_called_out() {
        let error = parse_assignable_role(Some("owner".to_owned()), "role").expect_err("owner");
        let details = error.details().expect("details");
        assert_eq!(details["code"], "owner_not_assignable");
    }

    #[rstest]
    #[case(Some("admin".to_owned()), None, Ok(MemberUpdate::Role(AssignableRole::Admin)))]
    #[case(None, Some("removed".to_owned()), Ok(MemberUpdate::Remove))]
    fn member_update_accepts_exactly_one_field(
        #[case] role: Option<String>,
        #[case] status: Option<String>,
        #[case] expected: Result<MemberUpdate, Error>,
    ) {
        assert_eq!(parse_member_update(role, status).ok(), expected.ok());
    }

    #[rstest]
    #[case(Some("admin".to_owned()), Some("removed".to_owned()))]
    #[case(None, None)]
    #[case(None, Some("active".to_owned()))]
    fn member_update_rejects_other_shapes(
        #[case] role: Option<String>,
        #[case] status: Option<String>,
    ) {
        assert!(parse_member_update(role, status).is_err());
    }

    #[rstest]
    fn path_uuid_rejects_garbage() {
        let error = parse_path_uuid("not-a-uuid", "householdId").expect_err("garbage");
        assert_eq!(error.details().expect("details")["code"], "invalid_uuid");
    }
}
