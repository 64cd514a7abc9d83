//! Server construction and middleware wiring.

use std::env;
use std::sync::Arc;

use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use mockable::DefaultClock;
use tracing::{info, warn};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use crate::domain::ports::MagicLinkSender;
use crate::domain::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::domain::{HouseholdService, IdentityService, SessionService};
use crate::inbound::http::auth::{get_session, login, logout, signup};
use crate::inbound::http::households::{
    create_household, get_household, invite_member, update_member,
};
use crate::inbound::http::state::HttpState;
use crate::outbound::magic_link::{GoTrueMagicLink, LoggingMagicLink};
use crate::outbound::memory::MemoryStore;

/// Assemble the HTTP state around a concrete magic-link sink.
fn assemble_state<N>(magic_link: Arc<N>) -> HttpState
where
    N: MagicLinkSender + 'static,
{
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(DefaultClock);

    let identity = Arc::new(IdentityService::new(store.clone()));
    let households = Arc::new(HouseholdService::new(
        store.clone(),
        store.clone(),
        magic_link.clone(),
        store.clone(),
        clock.clone(),
    ));
    let sessions = Arc::new(SessionService::new(store, magic_link));
    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig::from_env(), clock));

    HttpState::new(identity, households, sessions, limiter)
}

/// Assemble the HTTP state: memory-backed store, services, rate limiter.
///
/// `MAGIC_LINK_BASE_URL` + `MAGIC_LINK_API_KEY` select the GoTrue magic-link
/// adapter; without them links are only logged (local development).
pub fn build_state() -> HttpState {
    match (env::var("MAGIC_LINK_BASE_URL"), env::var("MAGIC_LINK_API_KEY")) {
        (Ok(base_url), Ok(api_key)) => {
            info!(base_url = %base_url, "using GoTrue magic-link provider");
            assemble_state(Arc::new(GoTrueMagicLink::new(
                reqwest::Client::new(),
                base_url,
                api_key,
                env::var("MAGIC_LINK_REDIRECT_URL").ok(),
            )))
        }
        _ => {
            warn!("no magic-link provider configured; links are logged only");
            assemble_state(Arc::new(LoggingMagicLink))
        }
    }
}

/// Load the session signing key, falling back to an ephemeral key only in
/// debug builds or when `SESSION_ALLOW_EPHEMERAL=1`.
pub fn load_session_key() -> std::io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(error) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %error, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {error}"
                )))
            }
        }
    }
}

/// Build the application with session middleware and every API route.
pub fn build_app(
    state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    let api = web::scope("/api")
        .wrap(session)
        .service(signup)
        .service(login)
        .service(logout)
        .service(get_session)
        .service(create_household)
        .service(get_household)
        .service(invite_member)
        .service(update_member);

    let app = App::new().app_data(state).service(api);

    #[cfg(debug_assertions)]
    let app = app.service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-docs/openapi.json", crate::doc::ApiDoc::openapi()),
    );

    app
}
