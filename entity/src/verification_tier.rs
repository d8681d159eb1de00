use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Feature-access level of an agent. The LinkedIn flow only ever moves an
/// agent to `Verified`; the lower tiers are owned by other flows.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    EnumIter,
    Deserialize,
    Serialize,
    DeriveActiveEnum,
    Default,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "verification_tier")]
pub enum VerificationTier {
    #[sea_orm(string_value = "unverified")]
    #[default]
    Unverified,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "verified")]
    Verified,
}

impl std::fmt::Display for VerificationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::Email => write!(f, "email"),
            Self::Verified => write!(f, "verified"),
        }
    }
}
