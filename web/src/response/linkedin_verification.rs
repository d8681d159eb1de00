//! Response bodies of the LinkedIn verification endpoints.

use domain::linkedin_verification::{CompletedVerification, StartedVerification, VerificationStatus};
use domain::verification_type::VerificationType;
use domain::Id;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub(crate) const START_MESSAGE: &str =
    "Open authorization_url in a browser and sign in with LinkedIn to verify this agent";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartVerificationResponse {
    /// LinkedIn consent URL to open in a browser
    pub authorization_url: String,
    /// Seconds until the embedded state token expires
    pub expires_in: i64,
    pub message: String,
}

impl From<StartedVerification> for StartVerificationResponse {
    fn from(started: StartedVerification) -> Self {
        Self {
            authorization_url: started.authorization_url,
            expires_in: started.expires_in,
            message: START_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationCompletedResponse {
    #[schema(value_type = String, format = Uuid)]
    pub agent_id: Id,
    pub handle: String,
    /// Name reported by LinkedIn
    pub display_name: String,
}

impl From<CompletedVerification> for VerificationCompletedResponse {
    fn from(completed: CompletedVerification) -> Self {
        Self {
            agent_id: completed.agent_id,
            handle: completed.handle,
            display_name: completed.display_name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationStatusResponse {
    /// A started flow is waiting for its callback
    pub pending: bool,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_type: Option<VerificationType>,
    /// Provider identifier of the verified identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub verified_at: Option<DateTimeWithTimeZone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub pending_expires_at: Option<DateTimeWithTimeZone>,
}

impl From<VerificationStatus> for VerificationStatusResponse {
    fn from(status: VerificationStatus) -> Self {
        Self {
            pending: status.pending,
            verified: status.verified,
            verification_type: status.verification_type,
            external_id: status.external_id,
            display_name: status.display_name,
            verified_at: status.verified_at,
            pending_expires_at: status.pending_expires_at,
        }
    }
}
