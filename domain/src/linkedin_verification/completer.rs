//! The transactional write that consumes a state token and verifies its agent.

use super::validator::check_request;
use super::{VERIFIED_ACTIVITY, VERIFIED_INVITE_CODES};
use crate::agents::Model as Agent;
use crate::error::{Error, VerificationErrorKind};
use crate::verification_tier::VerificationTier;
use crate::Id;
use chrono::Utc;
use entity_api::agent::LinkedInVerification;
use entity_api::{activity_log, agent, verification_request};
use log::*;
use sea_orm::{DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait};
use serde::Serialize;

/// Outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedVerification {
    pub agent_id: Id,
    pub handle: String,
    /// Name as reported by LinkedIn.
    pub display_name: String,
}

/// New invite allowance for `agent`, or `None` to leave it untouched.
///
/// Only the first transition into the verified tier grants invites, and an
/// existing higher balance is never lowered.
pub fn invite_allowance(agent: &Agent) -> Option<i32> {
    (agent.verification_tier != VerificationTier::Verified)
        .then(|| agent.invite_codes_remaining.max(VERIFIED_INVITE_CODES))
}

/// Consumes `state` and writes the LinkedIn identity onto the bound agent.
///
/// Everything runs in one SERIALIZABLE transaction with the request row locked.
/// Expiry and a missing agent are recorded on the request row before the
/// error is returned. A request that was already completed is left untouched,
/// including when a concurrent callback completes it first and Postgres aborts
/// this transaction.
pub async fn complete_verification(
    db: &DatabaseConnection,
    state: &str,
    external_id: &str,
    display_name: &str,
) -> Result<CompletedVerification, Error> {
    match complete_in_transaction(db, state, external_id, display_name).await {
        Err(err) if err.is_serialization_conflict() => resolve_conflict(db, state, err).await,
        result => result,
    }
}

/// Re-reads the request after losing a serialization conflict and reports
/// the outcome the winning transaction left behind.
async fn resolve_conflict(
    db: &DatabaseConnection,
    state: &str,
    err: Error,
) -> Result<CompletedVerification, Error> {
    match verification_request::find_by_state(db, state).await? {
        Some(request) if request.completed_at.is_some() => {
            info!(
                "Verification request {} was completed by a concurrent callback",
                request.id
            );
            Err(Error::verification(VerificationErrorKind::AlreadyCompleted))
        }
        Some(_) => Err(err),
        None => Err(Error::verification(
            VerificationErrorKind::InvalidOrExpiredState,
        )),
    }
}

async fn complete_in_transaction(
    db: &DatabaseConnection,
    state: &str,
    external_id: &str,
    display_name: &str,
) -> Result<CompletedVerification, Error> {
    let txn = db
        .begin_with_config(Some(IsolationLevel::Serializable), None)
        .await?;

    let request = match verification_request::find_by_state_for_update(&txn, state).await? {
        Some(request) => request,
        None => {
            txn.rollback().await?;
            return Err(Error::verification(
                VerificationErrorKind::InvalidOrExpiredState,
            ));
        }
    };

    let now = Utc::now();

    if let Err(kind) = check_request(&request, now) {
        if kind == VerificationErrorKind::Expired {
            return fail_recorded(txn, request.id, "expired before completion", kind).await;
        }
        info!(
            "Verification request {} was already completed, ignoring",
            request.id
        );
        txn.rollback().await?;
        return Err(Error::verification(kind));
    }

    let agent = match agent::find_by_id(&txn, request.agent_id).await? {
        Some(agent) => agent,
        None => {
            warn!(
                "Agent {} vanished before verification request {} completed",
                request.agent_id, request.id
            );
            return fail_recorded(
                txn,
                request.id,
                "agent not found",
                VerificationErrorKind::AgentNotFound,
            )
            .await;
        }
    };

    if !verification_request::mark_completed(&txn, request.id, now.into()).await? {
        info!("Verification request {} was completed concurrently", request.id);
        txn.rollback().await?;
        return Err(Error::verification(
            VerificationErrorKind::AlreadyCompleted,
        ));
    }

    let agent_id = agent.id;
    let invite_codes_remaining = invite_allowance(&agent);

    let agent = agent::apply_linkedin_verification(
        &txn,
        agent,
        LinkedInVerification {
            linkedin_id: external_id.to_string(),
            linkedin_name: display_name.to_string(),
            verified_at: now.into(),
            invite_codes_remaining,
        },
    )
    .await?;

    activity_log::create(
        &txn,
        agent_id,
        VERIFIED_ACTIVITY,
        format!("Verified LinkedIn identity as {display_name}"),
    )
    .await?;

    txn.commit().await?;

    info!(
        "Agent @{} ({agent_id}) verified with LinkedIn member {external_id}",
        agent.handle
    );

    Ok(CompletedVerification {
        agent_id,
        handle: agent.handle,
        display_name: display_name.to_string(),
    })
}

async fn fail_recorded(
    txn: DatabaseTransaction,
    request_id: Id,
    message: &str,
    kind: VerificationErrorKind,
) -> Result<CompletedVerification, Error> {
    verification_request::record_error(&txn, request_id, message).await?;
    txn.commit().await?;
    Err(Error::verification(kind))
}
