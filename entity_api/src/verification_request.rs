use super::error::Error;
use entity::verification_requests::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*, sea_query::Expr, ActiveValue::Set, ConnectionTrait, QueryOrder,
    QuerySelect,
};

/// Inserts a new pending verification request for `agent_id`.
pub async fn create(
    db: &impl ConnectionTrait,
    agent_id: Id,
    state: String,
    created_at: DateTimeWithTimeZone,
    expires_at: DateTimeWithTimeZone,
) -> Result<Model, Error> {
    debug!("Creating verification request for agent_id: {agent_id}, expires_at: {expires_at}");

    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        agent_id: Set(agent_id),
        state: Set(state),
        created_at: Set(created_at),
        expires_at: Set(expires_at),
        completed_at: Set(None),
        error: Set(None),
    };

    Ok(active_model.insert(db).await?)
}

/// Deletes every uncompleted request belonging to `agent_id`, expired or not.
///
/// Returns the number of rows removed.
pub async fn delete_pending_by_agent(
    db: &impl ConnectionTrait,
    agent_id: Id,
) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(Column::AgentId.eq(agent_id))
        .filter(Column::CompletedAt.is_null())
        .exec(db)
        .await?;

    debug!(
        "Deleted {} pending verification request(s) for agent_id: {agent_id}",
        result.rows_affected
    );

    Ok(result.rows_affected)
}

/// Finds a request by its exact state token.
pub async fn find_by_state(
    db: &impl ConnectionTrait,
    state: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::State.eq(state))
        .one(db)
        .await?)
}

/// Same as [`find_by_state`] but takes a row lock (`FOR UPDATE`), so it must be
/// called inside a transaction.
pub async fn find_by_state_for_update(
    db: &impl ConnectionTrait,
    state: &str,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::State.eq(state))
        .lock_exclusive()
        .one(db)
        .await?)
}

/// Finds the most recently created request for `agent_id` that is neither
/// completed nor expired as of `now`.
pub async fn find_latest_pending_by_agent(
    db: &impl ConnectionTrait,
    agent_id: Id,
    now: DateTimeWithTimeZone,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::AgentId.eq(agent_id))
        .filter(Column::CompletedAt.is_null())
        .filter(Column::ExpiresAt.gt(now))
        .order_by_desc(Column::CreatedAt)
        .one(db)
        .await?)
}

/// Sets `completed_at` on a request that has not been completed yet.
///
/// Returns `false` when no row was updated, i.e. another caller consumed the
/// state first.
pub async fn mark_completed(
    db: &impl ConnectionTrait,
    id: Id,
    completed_at: DateTimeWithTimeZone,
) -> Result<bool, Error> {
    let result = Entity::update_many()
        .col_expr(Column::CompletedAt, Expr::value(completed_at))
        .filter(Column::Id.eq(id))
        .filter(Column::CompletedAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Records a diagnostic message on a request that ended on a failure path.
pub async fn record_error(db: &impl ConnectionTrait, id: Id, message: &str) -> Result<(), Error> {
    debug!("Recording error on verification request {id}: {message}");

    Entity::update_many()
        .col_expr(Column::Error, Expr::value(message.to_string()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;

    Ok(())
}
