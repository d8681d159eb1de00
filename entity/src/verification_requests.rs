//! SeaORM Entity for the verification_requests table.
//! One row per OAuth state token handed out by the start step.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::verification_requests::Model)]
#[sea_orm(schema_name = "linkclaws", table_name = "verification_requests")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    #[schema(value_type = uuid::Uuid)]
    pub agent_id: Id,

    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub state: String,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[schema(value_type = String, format = DateTime)]
    pub expires_at: DateTimeWithTimeZone,
    /// Set once the callback has consumed this state.
    #[schema(value_type = Option<String>, format = DateTime)]
    pub completed_at: Option<DateTimeWithTimeZone>,

    /// Diagnostic recorded when the request ends on a failure path.
    pub error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::agents::Entity",
        from = "Column::AgentId",
        to = "super::agents::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Agents,
}

impl Related<super::agents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
