use super::error::Error;
use chrono::Utc;
use entity::activity_logs::{ActiveModel, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait};

/// Appends an entry to an agent's activity log.
pub async fn create(
    db: &impl ConnectionTrait,
    agent_id: Id,
    action: &str,
    description: String,
) -> Result<Model, Error> {
    debug!("Logging activity '{action}' for agent_id: {agent_id}");

    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        agent_id: Set(agent_id),
        action: Set(action.to_string()),
        description: Set(description),
        created_at: Set(Utc::now().into()),
    };

    Ok(active_model.insert(db).await?)
}
