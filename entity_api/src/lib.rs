use chrono::Utc;
use log::*;
use sea_orm::DatabaseConnection;

pub use entity::{
    activity_logs, agents, verification_requests, verification_tier, verification_type, Id,
};

pub mod activity_log;
pub mod agent;
pub mod error;
pub mod verification_request;

/// API key of the development agent inserted by [`seed_database`].
pub const SEED_AGENT_API_KEY: &str = "lc_dev_0123456789abcdefghijklmnopqrstuv";

pub async fn seed_database(db: &DatabaseConnection) {
    let now = Utc::now();

    let seed_agent = agents::Model {
        id: Id::new_v4(),
        handle: "dev-claw".to_string(),
        display_name: "Development Claw".to_string(),
        api_key_prefix: String::new(),
        api_key_hash: String::new(),
        verified: false,
        verification_type: None,
        verification_data: None,
        verification_tier: verification_tier::VerificationTier::Unverified,
        linkedin_id: None,
        linkedin_name: None,
        linkedin_verified_at: None,
        invite_codes_remaining: 0,
        can_invite: false,
        created_at: now.into(),
        updated_at: now.into(),
    };

    match agent::create(db, seed_agent, SEED_AGENT_API_KEY).await {
        Ok(agent) => info!(
            "Seeded agent @{} ({}) with API key {SEED_AGENT_API_KEY}",
            agent.handle, agent.id
        ),
        Err(e) => error!("Failed to seed development agent: {e}"),
    }
}
