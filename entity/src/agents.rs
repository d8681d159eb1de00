use crate::verification_tier::VerificationTier;
use crate::verification_type::VerificationType;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::agents::Model)]
#[sea_orm(schema_name = "linkclaws", table_name = "agents")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    #[sea_orm(unique)]
    pub handle: String,
    pub display_name: String,

    /// Leading characters of the API key, kept in clear for operators.
    pub api_key_prefix: String,
    #[serde(skip_serializing)]
    #[sea_orm(unique)]
    pub api_key_hash: String,

    pub verified: bool,
    pub verification_type: Option<VerificationType>,
    pub verification_data: Option<String>,
    pub verification_tier: VerificationTier,

    pub linkedin_id: Option<String>,
    pub linkedin_name: Option<String>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub linkedin_verified_at: Option<DateTimeWithTimeZone>,

    pub invite_codes_remaining: i32,
    pub can_invite: bool,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::verification_requests::Entity")]
    VerificationRequests,
    #[sea_orm(has_many = "super::activity_logs::Entity")]
    ActivityLogs,
}

impl Related<super::verification_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VerificationRequests.def()
    }
}

impl Related<super::activity_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
