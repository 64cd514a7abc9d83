//! OpenAPI documentation configuration.
//!
//! Defines the [`ApiDoc`] struct generating the OpenAPI specification for
//! the REST API: every HTTP endpoint of the inbound layer, the request and
//! response schemas, and the session cookie security scheme. The generated
//! document backs Swagger UI in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode};
use crate::inbound::http::auth::{
    MagicLinkRequestBody, ProfileResponse, SessionHouseholdResponse, SessionResponse,
};
use crate::inbound::http::households::{
    CreateHouseholdRequest, HouseholdResponse, InvitationResponse, InviteMemberRequest,
    MemberResponse, UpdateMemberRequest,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie established after magic-link verification.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Household backend API",
        description = "Magic-link authentication, household membership, and session projection."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::signup,
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::get_session,
        crate::inbound::http::households::create_household,
        crate::inbound::http::households::get_household,
        crate::inbound::http::households::invite_member,
        crate::inbound::http::households::update_member,
    ),
    components(schemas(
        Error,
        ErrorCode,
        MagicLinkRequestBody,
        ProfileResponse,
        SessionHouseholdResponse,
        SessionResponse,
        CreateHouseholdRequest,
        InviteMemberRequest,
        UpdateMemberRequest,
        HouseholdResponse,
        MemberResponse,
        InvitationResponse,
    )),
    tags(
        (name = "auth", description = "Magic-link sign-in and session access"),
        (name = "households", description = "Household and membership management")
    )
)]
pub struct ApiDoc;
