//! Outbound adapters implementing the domain's driven ports.

pub mod magic_link;
pub mod memory;
