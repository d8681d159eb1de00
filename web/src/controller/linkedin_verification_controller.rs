//! Controller for LinkedIn agent verification.
//!
//! `start` and `status` authenticate with the agent's API key. The callback is
//! reached through LinkedIn's browser redirect and is correlated by `state`.

use crate::error::WebErrorKind;
use crate::extractors::agent_credential::AgentCredential;
use crate::response::linkedin_verification::{
    StartVerificationResponse, VerificationCompletedResponse, VerificationStatusResponse,
};
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use domain::linkedin_verification as LinkedInVerificationApi;
use domain::linkedin_verification::OsRngStateTokens;
use log::*;
use serde::Deserialize;
use utoipa::IntoParams;

/// Query parameters LinkedIn appends to the redirect URI
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// State token issued by the start step
    pub state: Option<String>,
    /// One-time authorization code
    pub code: Option<String>,
    /// Set instead of `code` when the member declined or LinkedIn failed
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// POST start a LinkedIn verification for the calling agent
#[utoipa::path(
    post,
    path = "/verification/linkedin/start",
    responses(
        (status = 200, description = "Verification started", body = StartVerificationResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Agent not found"),
        (status = 409, description = "Agent is already verified with LinkedIn"),
        (status = 503, description = "LinkedIn verification is not configured"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn start(
    State(app_state): State<AppState>,
    AgentCredential(credential): AgentCredential,
) -> Result<impl IntoResponse, Error> {
    debug!("POST start LinkedIn verification");

    let started = LinkedInVerificationApi::start_verification(
        app_state.db_conn_ref(),
        &app_state.config,
        &OsRngStateTokens,
        &credential,
    )
    .await?;

    Ok(Json(StartVerificationResponse::from(started)))
}

/// GET LinkedIn OAuth redirect target
#[utoipa::path(
    get,
    path = "/verification/linkedin/callback",
    params(CallbackParams),
    responses(
        (status = 200, description = "Agent verified", body = VerificationCompletedResponse),
        (status = 400, description = "Missing parameters, denied consent, unknown or expired state"),
        (status = 404, description = "Agent not found"),
        (status = 409, description = "State was already used"),
        (status = 502, description = "LinkedIn token exchange or profile fetch failed"),
        (status = 503, description = "LinkedIn verification is not configured"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, Error> {
    if let Some(error) = params.error {
        let reason = params.error_description.unwrap_or(error);
        info!("LinkedIn authorization was not granted: {reason}");
        return Err(Error::Web(WebErrorKind::BadRequest(format!(
            "LinkedIn authorization failed: {reason}"
        ))));
    }

    let (Some(state), Some(code)) = (params.state, params.code) else {
        return Err(Error::Web(WebErrorKind::BadRequest(
            "Missing state or code".to_string(),
        )));
    };

    let completed = LinkedInVerificationApi::complete_linkedin_callback(
        app_state.db_conn_ref(),
        &app_state.config,
        &state,
        &code,
    )
    .await?;

    Ok(Json(VerificationCompletedResponse::from(completed)))
}

/// GET verification status of the calling agent
#[utoipa::path(
    get,
    path = "/verification/linkedin/status",
    responses(
        (status = 200, description = "Current verification status", body = VerificationStatusResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Agent not found"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn status(
    State(app_state): State<AppState>,
    AgentCredential(credential): AgentCredential,
) -> Result<impl IntoResponse, Error> {
    let status =
        LinkedInVerificationApi::verification_status(app_state.db_conn_ref(), &credential).await?;

    Ok(Json(VerificationStatusResponse::from(status)))
}
