//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod error;
pub mod households;
pub mod limits;
pub mod session;
pub mod state;
pub mod validation;

pub use error::ApiResult;
