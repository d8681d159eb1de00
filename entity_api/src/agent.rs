use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::agents::{ActiveModel, Column, Entity, Model};
use entity::verification_tier::VerificationTier;
use entity::verification_type::VerificationType;
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait, IntoActiveModel};
use sha2::{Digest, Sha256};

/// Number of leading API key characters stored in clear alongside the hash.
pub const API_KEY_PREFIX_LEN: usize = 8;

/// Identity fields written onto an agent by a successful LinkedIn verification.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedInVerification {
    pub linkedin_id: String,
    pub linkedin_name: String,
    pub verified_at: DateTimeWithTimeZone,
    /// New invite allowance. `None` leaves `invite_codes_remaining` and
    /// `can_invite` untouched.
    pub invite_codes_remaining: Option<i32>,
}

/// Hex encoded SHA-256 digest of an API key, the form stored in `api_key_hash`.
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

pub async fn create(
    db: &impl ConnectionTrait,
    agent_model: Model,
    api_key: &str,
) -> Result<Model, Error> {
    debug!("New Agent Model to be inserted: {}", agent_model.handle);

    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        handle: Set(agent_model.handle),
        display_name: Set(agent_model.display_name),
        api_key_prefix: Set(api_key.chars().take(API_KEY_PREFIX_LEN).collect()),
        api_key_hash: Set(hash_api_key(api_key)),
        verified: Set(agent_model.verified),
        verification_type: Set(agent_model.verification_type),
        verification_data: Set(agent_model.verification_data),
        verification_tier: Set(agent_model.verification_tier),
        linkedin_id: Set(None),
        linkedin_name: Set(None),
        linkedin_verified_at: Set(None),
        invite_codes_remaining: Set(agent_model.invite_codes_remaining),
        can_invite: Set(agent_model.can_invite),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn find_by_api_key_hash(
    db: &impl ConnectionTrait,
    api_key_hash: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ApiKeyHash.eq(api_key_hash))
        .one(db)
        .await?)
}

/// Writes the LinkedIn identity onto `agent` and promotes it to the verified tier.
pub async fn apply_linkedin_verification(
    db: &impl ConnectionTrait,
    agent: Model,
    verification: LinkedInVerification,
) -> Result<Model, Error> {
    let agent_id = agent.id;
    let mut active_model = agent.into_active_model();

    active_model.verified = Set(true);
    active_model.verification_type = Set(Some(VerificationType::Linkedin));
    active_model.verification_data = Set(Some(verification.linkedin_id.clone()));
    active_model.verification_tier = Set(VerificationTier::Verified);
    active_model.linkedin_id = Set(Some(verification.linkedin_id));
    active_model.linkedin_name = Set(Some(verification.linkedin_name));
    active_model.linkedin_verified_at = Set(Some(verification.verified_at));
    if let Some(invite_codes_remaining) = verification.invite_codes_remaining {
        active_model.invite_codes_remaining = Set(invite_codes_remaining);
        active_model.can_invite = Set(true);
    }
    active_model.updated_at = Set(Utc::now().into());

    debug!("Applying LinkedIn verification to agent {agent_id}");

    active_model.update(db).await.map_err(|err| match err {
        DbErr::RecordNotUpdated => Error {
            source: Some(err),
            error_kind: EntityApiErrorKind::RecordNotFound,
        },
        other => other.into(),
    })
}
