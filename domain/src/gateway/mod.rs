//! Clients for external identity providers.

pub mod linkedin;
