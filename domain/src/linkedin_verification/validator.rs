//! Read-only checks on a presented state token, run before any call to LinkedIn.

use crate::error::{Error, VerificationErrorKind};
use crate::verification_requests::Model;
use crate::Id;
use chrono::{DateTime, Utc};
use entity_api::{agent, verification_request};
use log::*;
use sea_orm::ConnectionTrait;

/// A state token that may proceed to the code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidState {
    pub request_id: Id,
    pub agent_id: Id,
}

/// Checks a stored request against the clock. Expiry takes precedence over
/// completion.
pub fn check_request(request: &Model, now: DateTime<Utc>) -> Result<(), VerificationErrorKind> {
    if now > request.expires_at {
        return Err(VerificationErrorKind::Expired);
    }
    if request.completed_at.is_some() {
        return Err(VerificationErrorKind::AlreadyCompleted);
    }
    Ok(())
}

/// Decides whether `state` can still be completed. Performs reads only.
///
/// First failing check wins: unknown state, expired, already completed,
/// bound agent missing.
pub async fn validate_state(db: &impl ConnectionTrait, state: &str) -> Result<ValidState, Error> {
    let request = verification_request::find_by_state(db, state)
        .await?
        .ok_or_else(|| {
            info!("Unknown verification state presented");
            Error::verification(VerificationErrorKind::InvalidOrExpiredState)
        })?;

    check_request(&request, Utc::now()).map_err(|kind| {
        info!(
            "Verification request {} cannot be completed: {kind}",
            request.id
        );
        Error::verification(kind)
    })?;

    if agent::find_by_id(db, request.agent_id).await?.is_none() {
        warn!(
            "Verification request {} references missing agent {}",
            request.id, request.agent_id
        );
        return Err(Error::verification(VerificationErrorKind::AgentNotFound));
    }

    Ok(ValidState {
        request_id: request.id,
        agent_id: request.agent_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(expires_in: Duration, completed: bool) -> Model {
        let now = Utc::now();
        Model {
            id: Id::new_v4(),
            agent_id: Id::new_v4(),
            state: "Zq4mR8vT2xLp9sNc6bWd3hKf7jYg1aUe".to_string(),
            created_at: now.into(),
            expires_at: (now + expires_in).into(),
            completed_at: completed.then(|| now.into()),
            error: None,
        }
    }

    #[test]
    fn live_request_passes() {
        assert_eq!(
            check_request(&request(Duration::minutes(15), false), Utc::now()),
            Ok(())
        );
    }

    #[test]
    fn expiry_wins_over_completion() {
        assert_eq!(
            check_request(&request(Duration::minutes(-1), true), Utc::now()),
            Err(VerificationErrorKind::Expired)
        );
    }

    #[test]
    fn completed_request_is_rejected() {
        assert_eq!(
            check_request(&request(Duration::minutes(10), true), Utc::now()),
            Err(VerificationErrorKind::AlreadyCompleted)
        );
    }
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod mock_tests {
    use super::*;
    use crate::linkedin_verification::test_support::{agent, request};
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn unknown_state_is_invalid_or_expired() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let err = validate_state(&db, "never-issued").await.unwrap_err();
        assert_eq!(
            err.verification_kind(),
            Some(&VerificationErrorKind::InvalidOrExpiredState)
        );
    }

    #[tokio::test]
    async fn expired_state_is_rejected_without_writes() {
        let agent = agent(false);
        let request = request(agent.id, Duration::minutes(-5));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![request.clone()]])
            .into_connection();

        let err = validate_state(&db, &request.state).await.unwrap_err();
        assert_eq!(err.verification_kind(), Some(&VerificationErrorKind::Expired));
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn missing_agent_is_reported() {
        let request = request(Id::new_v4(), Duration::minutes(10));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![request.clone()]])
            .append_query_results(vec![Vec::<crate::agents::Model>::new()])
            .into_connection();

        let err = validate_state(&db, &request.state).await.unwrap_err();
        assert_eq!(
            err.verification_kind(),
            Some(&VerificationErrorKind::AgentNotFound)
        );
    }

    #[tokio::test]
    async fn live_state_yields_bound_agent() {
        let agent = agent(false);
        let request = request(agent.id, Duration::minutes(10));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![request.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .into_connection();

        let valid = validate_state(&db, &request.state).await.unwrap();
        assert_eq!(
            valid,
            ValidState {
                request_id: request.id,
                agent_id: agent.id,
            }
        );
    }
}
