//! Agent authentication by API key.

use crate::agents::Model;
use crate::error::{Error, VerificationErrorKind};
use crate::Id;
use entity_api::agent::{find_by_api_key_hash, hash_api_key};
use log::*;
use sea_orm::ConnectionTrait;

/// Every LinkClaws API key starts with this prefix.
pub const API_KEY_PREFIX: &str = "lc_";

/// Shortest credential accepted before a lookup is attempted.
pub const MIN_API_KEY_LEN: usize = 20;

/// Resolves an API key to the id of the agent that owns it.
///
/// Malformed keys are rejected without touching the database. Unknown keys and
/// malformed keys both yield `InvalidCredential`.
pub async fn authenticate(db: &impl ConnectionTrait, credential: &str) -> Result<Id, Error> {
    let credential = credential.trim();

    if !credential.starts_with(API_KEY_PREFIX) || credential.len() < MIN_API_KEY_LEN {
        debug!("Rejecting malformed API key");
        return Err(Error::verification(VerificationErrorKind::InvalidCredential));
    }

    match find_by_api_key_hash(db, &hash_api_key(credential)).await? {
        Some(agent) => Ok(agent.id),
        None => {
            debug!("No agent matches the presented API key");
            Err(Error::verification(VerificationErrorKind::InvalidCredential))
        }
    }
}

/// Loads an agent, mapping absence to `AgentNotFound`.
pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    entity_api::agent::find_by_id(db, id).await?.ok_or_else(|| {
        warn!("Agent {id} not found");
        Error::verification(VerificationErrorKind::AgentNotFound)
    })
}
