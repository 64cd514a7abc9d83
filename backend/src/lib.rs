//! Household-finance backend library.
//!
//! Hexagonal layout: `domain` holds the entities, ports, and services;
//! `inbound` the HTTP adapter; `outbound` the store and magic-link
//! adapters; `server` the actix wiring.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;
#[cfg(test)]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
