//! Magic-link delivery adapters.
//!
//! [`GoTrueMagicLink`] talks to a GoTrue-compatible identity provider over
//! its one-time-password endpoint. [`LoggingMagicLink`] is a local sink
//! that only logs, used in development and tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::ports::{MagicLinkDelivery, MagicLinkError, MagicLinkRequest, MagicLinkSender};

#[derive(Debug, Serialize)]
struct OtpPayload<'a> {
    email: &'a str,
    create_user: bool,
}

/// Magic-link sender backed by a GoTrue-compatible `/auth/v1/otp` endpoint.
#[derive(Debug, Clone)]
pub struct GoTrueMagicLink {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    redirect_url: Option<String>,
}

impl GoTrueMagicLink {
    /// Create a sender against the given provider base URL.
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        redirect_url: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            redirect_url,
        }
    }
}

#[async_trait]
impl MagicLinkSender for GoTrueMagicLink {
    async fn send(&self, request: MagicLinkRequest) -> Result<MagicLinkDelivery, MagicLinkError> {
        let url = format!("{}/auth/v1/otp", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&OtpPayload {
                email: request.email.as_str(),
                create_user: request.create_if_missing,
            });
        if let Some(redirect) = &self.redirect_url {
            builder = builder.query(&[("redirect_to", redirect.as_str())]);
        }

        let response = builder
            .send()
            .await
            .map_err(|error| MagicLinkError::delivery(error.to_string()))?;
        let status = response.status();

        if status.is_success() {
            debug!(email = %request.email, "magic link accepted by provider");
            return Ok(MagicLinkDelivery::Sent);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MagicLinkError::Throttled);
        }
        // With account creation disabled the provider rejects unknown
        // addresses with a client error; that outcome is a domain signal,
        // not a failure.
        if !request.create_if_missing
            && matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
            )
        {
            return Ok(MagicLinkDelivery::UserMissing);
        }

        let body = response.text().await.unwrap_or_default();
        Err(MagicLinkError::delivery(format!(
            "provider returned {status}: {body}"
        )))
    }
}

/// Development sink that logs instead of delivering.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMagicLink;

#[async_trait]
impl MagicLinkSender for LoggingMagicLink {
    async fn send(&self, request: MagicLinkRequest) -> Result<MagicLinkDelivery, MagicLinkError> {
        info!(
            email = %request.email,
            create_if_missing = request.create_if_missing,
            "magic link requested (logging sink, nothing delivered)"
        );
        Ok(MagicLinkDelivery::Sent)
    }
}
