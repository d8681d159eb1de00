//! Business logic of LinkClaws agent verification.
//!
//! Entity types are re-exported from `entity_api` so that consumers of the `domain` crate do not
//! need to depend on `entity_api` directly.

pub use entity_api::{
    activity_logs, agents, verification_requests, verification_tier, verification_type, Id,
};

pub mod agent;
pub mod error;
pub mod gateway;
pub mod linkedin_verification;
