//! Magic-link authentication HTTP handlers.
//!
//! ```text
//! POST /api/auth/signup   Send a sign-up magic link
//! POST /api/auth/login    Send a sign-in magic link
//! POST /api/auth/logout   Purge the cookie session
//! GET  /api/auth/session  Resolve the session into profile + households
//! ```
//!
//! Link verification happens at the identity provider; this adapter only
//! requests deliveries and trusts the session cookie once established.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::member::HouseholdRole;
use crate::domain::ports::SessionView;
use crate::domain::rate_limit::RateBucket;
use crate::domain::{Error, Profile};
use crate::inbound::http::ApiResult;
use crate::inbound::http::limits::enforce;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_email;

/// Request payload carrying the address to send a magic link to.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct MagicLinkRequestBody {
    pub email: Option<String>,
}

/// The authenticated user's profile as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub base_currency: String,
    pub locale: String,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(value: Profile) -> Self {
        Self {
            id: *value.id.as_uuid(),
            email: value.email.into(),
            display_name: value.display_name,
            base_currency: value.base_currency.into(),
            locale: value.locale,
            onboarding_completed: value.onboarding_completed,
            created_at: value.created_at,
        }
    }
}

/// One household summary inside the session payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionHouseholdResponse {
    pub id: Uuid,
    pub name: String,
    pub role: HouseholdRole,
    pub member_count: u64,
}

/// Session payload: the user plus their active household memberships.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: ProfileResponse,
    pub households: Vec<SessionHouseholdResponse>,
}

impl From<SessionView> for SessionResponse {
    fn from(value: SessionView) -> Self {
        Self {
            user: value.user.into(),
            households: value
                .households
                .into_iter()
                .map(|summary| SessionHouseholdResponse {
                    id: *summary.id.as_uuid(),
                    name: summary.name.into(),
                    role: summary.role,
                    member_count: summary.member_count,
                })
                .collect(),
        }
    }
}

fn message_response(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "data": { "message": message } }))
}

/// Send a sign-up magic link, creating the account if necessary.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = MagicLinkRequestBody,
    responses(
        (status = 200, description = "Magic link sent"),
        (status = 422, description = "Invalid email", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["auth"],
    operation_id = "signup"
)]
#[post("/auth/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    request: HttpRequest,
    payload: web::Json<MagicLinkRequestBody>,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Auth, &request)?;
    let email = parse_email(payload.into_inner().email, "email")?;
    state.sessions.signup(&email).await?;
    // Signup confirms the address back; login stays generic on purpose.
    Ok(message_response(&format!("Magic link sent to {email}")))
}

/// Send a sign-in magic link to an existing account.
///
/// Unknown addresses receive the same response as known ones so the
/// endpoint cannot be used to enumerate accounts.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = MagicLinkRequestBody,
    responses(
        (status = 200, description = "Magic link sent"),
        (status = 422, description = "Invalid email", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login"
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    request: HttpRequest,
    payload: web::Json<MagicLinkRequestBody>,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Auth, &request)?;
    let email = parse_email(payload.into_inner().email, "email")?;
    state.sessions.login(&email).await?;
    Ok(message_response("Magic link sent"))
}

/// Drop the cookie session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out"),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(
    state: web::Data<HttpState>,
    request: HttpRequest,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Auth, &request)?;
    session.purge();
    Ok(message_response("Signed out"))
}

/// Resolve the current session into the profile and household summaries.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session view", body = SessionResponse),
        (status = 401, description = "No valid session", body = Error),
        (status = 429, description = "Rate limited", body = Error)
    ),
    tags = ["auth"],
    operation_id = "getSession"
)]
#[get("/auth/session")]
pub async fn get_session(
    state: web::Data<HttpState>,
    request: HttpRequest,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    enforce(&state.limiter, RateBucket::Read, &request)?;
    let actor = state.require_actor(&session).await?;
    let view = state.sessions.project(&actor).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": SessionResponse::from(view) })))
}
