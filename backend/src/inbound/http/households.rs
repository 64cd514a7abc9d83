//! Household HTTP handlers.
//!
//! ```text
//! POST  /api/households                         Create a household
//! GET   /api/households/{id}                    Fetch a household with members
//! POST  /api/households/{id}/invite             Invite an email address
//! PATCH /api/households/{id}/members/{memberId} Change role or remove
//! ```

use actix_web::{HttpRequest, HttpResponse, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::household::{CreateHousehold, HouseholdId, HouseholdType};
use crate::domain::member::{HouseholdRole, MemberId, MemberStatus};
use crate::domain::ports::{HouseholdMemberView, HouseholdView, Invitation, InviteMember};
use crate::domain::rate_limit::RateBucket;
use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::limits::enforce;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    parse_assignable_role, parse_currency, parse_email, parse_household_name, parse_member_update,
    parse_path_uuid,
};

/// Request payload for household creation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHouseholdRequest {
    pub name: Option<String>,
    pub base_currency: Option<String>,
}

/// Request payload for a member invitation.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberRequest {
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Request payload for a member mutation: set exactly one field.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub role: Option<String>,
    pub status: Option<String>,
}

/// One membership row annotated with profile display fields.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: HouseholdRole,
    pub status: MemberStatus,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub invited_email: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
}

impl From<HouseholdMemberView> for MemberResponse {
    fn from(value: HouseholdMemberView) -> Self {
        Self {
            id: *value.id.as_uuid(),
            user_id: *value.user_id.as_uuid(),
            role: value.role,
            status: value.status,
            display_name: value.display_name,
            email: value.email.map(Into::into),
            invited_email: value.invited_email.map(Into::into),
            joined_at: value.joined_at,
        }
    }
}

/// A household with its full member list.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub household_type: HouseholdType,
    pub base_currency: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<MemberResponse>,
}

impl From<HouseholdView> for HouseholdResponse {
    fn from(value: HouseholdView) -> Self {
        Self {
            id: *value.id.as_uuid(),
            name: value.name.into(),
            household_type: value.household_type,
            base_currency: value.base_currency.into(),
            created_at: value.created_at,
            members: value.members.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a member invitation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitationResponse {
    pub invitation_id: Uuid,
    pub email: String,
    pub status: MemberStatus,
}

impl From<Invitation> for InvitationResponse {
    fn from(value: Invitation) -> Self {
        Self {
            invitation_id: *value.invitation_id.as_uuid(),
            email: value.email.into(),
            status: value.status,
        }
    }
}

fn household_path_id(raw: &str) -> Result<HouseholdId, Error> {
    parse_path_uuid(raw, "householdId").map(HouseholdId::new)
}

/// Create a household owned by the caller.
#[utoipa::path(
    post,
    path = "/api/households",
    request_body = CreateHouseholdRequest,
    responses(
        (status = 201, description = "Household created", body = HouseholdResponse),
        (status = 401, description = "No valid session", body = Error),
        (status = 422, description = "Invalid payload", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["households"],
    operation_id = "createHousehold"
)]
#[post("/households")]
pub async fn create_household(
    state: web::Data<HttpState>,
    request: HttpRequest,
    session: SessionContext,
    payload: web::Json<CreateHouseholdRequest>,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Write, &request)?;
    let actor = state.require_actor(&session).await?;
    let payload = payload.into_inner();
    let input = CreateHousehold {
        name: parse_household_name(payload.name, "name")?,
        base_currency: parse_currency(payload.base_currency, "baseCurrency")?,
    };
    let view = state.households.create(&actor, input).await?;
    Ok(HttpResponse::Created().json(json!({ "data": HouseholdResponse::from(view) })))
}

/// Fetch a household with every membership row.
#[utoipa::path(
    get,
    path = "/api/households/{id}",
    params(("id" = String, Path, description = "Household id")),
    responses(
        (status = 200, description = "Household with members", body = HouseholdResponse),
        (status = 401, description = "No valid session", body = Error),
        (status = 403, description = "Not a member", body = Error),
        (status = 404, description = "Unknown household", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["households"],
    operation_id = "getHousehold"
)]
#[get("/households/{id}")]
pub async fn get_household(
    state: web::Data<HttpState>,
    request: HttpRequest,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Read, &request)?;
    let actor = state.require_actor(&session).await?;
    let household_id = household_path_id(&path.into_inner())?;
    let view = state.households.get_by_id(&actor, household_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": HouseholdResponse::from(view) })))
}

/// Invite an email address into the household.
#[utoipa::path(
    post,
    path = "/api/households/{id}/invite",
    params(("id" = String, Path, description = "Household id")),
    request_body = InviteMemberRequest,
    responses(
        (status = 201, description = "Invitation recorded and link sent", body = InvitationResponse),
        (status = 401, description = "No valid session", body = Error),
        (status = 403, description = "Not a manager", body = Error),
        (status = 422, description = "Invalid payload or already active", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["households"],
    operation_id = "inviteMember"
)]
#[post("/households/{id}/invite")]
pub async fn invite_member(
    state: web::Data<HttpState>,
    request: HttpRequest,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<InviteMemberRequest>,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Write, &request)?;
    let actor = state.require_actor(&session).await?;
    let household_id = household_path_id(&path.into_inner())?;
    let payload = payload.into_inner();
    let input = InviteMember {
        email: parse_email(payload.email, "email")?,
        role: parse_assignable_role(payload.role, "role")?,
    };
    let invitation = state
        .households
        .invite_member(&actor, household_id, input)
        .await?;
    Ok(HttpResponse::Created().json(json!({ "data": InvitationResponse::from(invitation) })))
}

/// Change a member's role or remove them from the household.
#[utoipa::path(
    patch,
    path = "/api/households/{id}/members/{memberId}",
    params(
        ("id" = String, Path, description = "Household id"),
        ("memberId" = String, Path, description = "Membership id")
    ),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Updated membership", body = MemberResponse),
        (status = 401, description = "No valid session", body = Error),
        (status = 403, description = "Not allowed", body = Error),
        (status = 404, description = "Unknown member", body = Error),
        (status = 422, description = "Invalid payload or invariant violated", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["households"],
    operation_id = "updateMember"
)]
#[patch("/households/{id}/members/{member_id}")]
pub async fn update_member(
    state: web::Data<HttpState>,
    request: HttpRequest,
    session: SessionContext,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdateMemberRequest>,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Write, &request)?;
    let actor = state.require_actor(&session).await?;
    let (household_raw, member_raw) = path.into_inner();
    let household_id = household_path_id(&household_raw)?;
    let member_id = parse_path_uuid(&member_raw, "memberId").map(MemberId::new)?;
    let payload = payload.into_inner();
    let patch = parse_member_update(payload.role, payload.status)?;
    let view = state
        .households
        .update_member(&actor, household_id, member_id, patch)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "data": MemberResponse::from(view) })))
}
