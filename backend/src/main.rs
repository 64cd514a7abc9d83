//! Backend entry-point: wires REST endpoints, sessions, and OpenAPI docs.

use std::env;

use actix_web::{web, HttpServer};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use backend::server::{build_app, build_state, load_session_key};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let key = load_session_key()?;
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|value| value != "0")
        .unwrap_or(true);

    let state = web::Data::new(build_state());
    HttpServer::new(move || build_app(state.clone(), key.clone(), cookie_secure))
        .bind(("0.0.0.0", 8080))?
        .run()
        .await
}
