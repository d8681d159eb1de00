//! LinkedIn identity verification for agents.
//!
//! An agent starts a flow and receives a LinkedIn consent URL carrying a
//! single-use state token. LinkedIn redirects back with that state and an
//! authorization code; the callback validates the state, exchanges the code for
//! the member's profile and, in one transaction, consumes the state and marks
//! the agent verified.

use crate::agent;
use crate::error::{DomainErrorKind, Error, ExternalErrorKind, VerificationErrorKind};
use crate::gateway::linkedin::{IdentityProvider, LinkedInClient, LinkedInSettings};
use crate::verification_type::VerificationType;
use crate::Id;
use chrono::{Duration, Utc};
use entity_api::verification_request;
use log::*;
use sea_orm::{prelude::DateTimeWithTimeZone, DatabaseConnection, IsolationLevel, TransactionTrait};
use serde::Serialize;
use service::config::Config;

pub mod completer;
pub mod state_token;
pub mod validator;

pub use completer::{complete_verification, invite_allowance, CompletedVerification};
pub use state_token::{OsRngStateTokens, StateTokenSource, STATE_TOKEN_LEN};
pub use validator::{check_request, validate_state, ValidState};

/// Lifetime of a state token.
pub const STATE_TTL_MINUTES: i64 = 15;

/// Invite codes a newly verified agent is raised to.
pub const VERIFIED_INVITE_CODES: i32 = 3;

/// `action` of the activity log entry written on success.
pub const VERIFIED_ACTIVITY: &str = "linkedin_verified";

/// Attempts at storing a new request before a serialization conflict with a
/// concurrent start is given up on.
const START_ATTEMPTS: u32 = 3;

/// A started flow: where to send the member, and for how long the state lives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedVerification {
    pub authorization_url: String,
    pub expires_in: i64,
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationStatus {
    pub pending: bool,
    pub verified: bool,
    pub verification_type: Option<VerificationType>,
    pub external_id: Option<String>,
    pub display_name: Option<String>,
    pub verified_at: Option<DateTimeWithTimeZone>,
    pub pending_expires_at: Option<DateTimeWithTimeZone>,
}

/// Starts a LinkedIn verification for the agent owning `credential`.
///
/// Any earlier uncompleted request of the agent is deleted before the new one
/// is stored, so at most one state token is live per agent.
pub async fn start_verification(
    db: &DatabaseConnection,
    config: &Config,
    tokens: &impl StateTokenSource,
    credential: &str,
) -> Result<StartedVerification, Error> {
    let agent_id = agent::authenticate(db, credential).await?;
    let agent = agent::find_by_id(db, agent_id).await?;

    if agent.verified && agent.verification_type == Some(VerificationType::Linkedin) {
        info!("Agent @{} is already verified with LinkedIn", agent.handle);
        return Err(Error::verification(VerificationErrorKind::AlreadyVerified));
    }

    let settings = LinkedInSettings::from_config(config)?;

    let state = tokens.generate();
    let now = Utc::now();
    let expires_at = now + Duration::minutes(STATE_TTL_MINUTES);

    let mut attempt = 1;
    let superseded = loop {
        match replace_pending_request(db, agent_id, &state, now.into(), expires_at.into()).await {
            Ok(superseded) => break superseded,
            Err(err) if err.is_serialization_conflict() && attempt < START_ATTEMPTS => {
                warn!(
                    "Concurrent start for agent @{} (attempt {attempt}), retrying",
                    agent.handle
                );
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    };

    info!(
        "Started LinkedIn verification for agent @{} (superseded {superseded} pending)",
        agent.handle
    );

    Ok(StartedVerification {
        authorization_url: settings.authorization_url(&state),
        expires_in: STATE_TTL_MINUTES * 60,
        expires_at: expires_at.into(),
    })
}

/// Deletes the agent's uncompleted requests and stores the new one in a single
/// SERIALIZABLE transaction. Returns how many requests were superseded.
async fn replace_pending_request(
    db: &DatabaseConnection,
    agent_id: Id,
    state: &str,
    created_at: DateTimeWithTimeZone,
    expires_at: DateTimeWithTimeZone,
) -> Result<u64, Error> {
    let txn = db
        .begin_with_config(Some(IsolationLevel::Serializable), None)
        .await?;
    let superseded = verification_request::delete_pending_by_agent(&txn, agent_id).await?;
    verification_request::create(&txn, agent_id, state.to_string(), created_at, expires_at)
        .await?;
    txn.commit().await?;
    Ok(superseded)
}

/// Runs a LinkedIn callback: validate the state, exchange the code with
/// `provider`, then complete. Stops at the first failure.
///
/// Provider failures of any kind come back as `ProviderExchangeFailed`.
pub async fn complete_oauth_callback(
    db: &DatabaseConnection,
    provider: &impl IdentityProvider,
    state: &str,
    code: &str,
) -> Result<CompletedVerification, Error> {
    let valid = validate_state(db, state).await?;
    debug!(
        "State for verification request {} is valid, exchanging code",
        valid.request_id
    );

    let profile = provider
        .exchange_and_fetch_profile(code)
        .await
        .map_err(provider_exchange_failed)?;

    complete_verification(db, state, &profile.subject, &profile.display_name).await
}

/// [`complete_oauth_callback`] against LinkedIn as configured in `config`.
pub async fn complete_linkedin_callback(
    db: &DatabaseConnection,
    config: &Config,
    state: &str,
    code: &str,
) -> Result<CompletedVerification, Error> {
    let client = LinkedInClient::new(LinkedInSettings::from_config(config)?)?;
    complete_oauth_callback(db, &client, state, code).await
}

/// Verification status of the agent owning `credential`.
///
/// A verified agent reports its verification, with the LinkedIn identity only
/// when LinkedIn was the method; otherwise the latest live request, if any, is
/// reported as pending.
pub async fn verification_status(
    db: &DatabaseConnection,
    credential: &str,
) -> Result<VerificationStatus, Error> {
    let agent_id = agent::authenticate(db, credential).await?;
    let agent = agent::find_by_id(db, agent_id).await?;

    if agent.verified {
        // The identity fields describe a LinkedIn verification only.
        let linkedin = agent.verification_type == Some(VerificationType::Linkedin);
        return Ok(VerificationStatus {
            verified: true,
            verification_type: agent.verification_type,
            external_id: linkedin
                .then(|| agent.linkedin_id.or(agent.verification_data))
                .flatten(),
            display_name: linkedin.then_some(agent.linkedin_name).flatten(),
            verified_at: linkedin.then_some(agent.linkedin_verified_at).flatten(),
            ..Default::default()
        });
    }

    let pending =
        verification_request::find_latest_pending_by_agent(db, agent_id, Utc::now().into())
            .await?;

    Ok(VerificationStatus {
        pending: pending.is_some(),
        pending_expires_at: pending.map(|request| request.expires_at),
        ..Default::default()
    })
}

fn provider_exchange_failed(err: Error) -> Error {
    let message = match &err.error_kind {
        DomainErrorKind::External(ExternalErrorKind::Provider { status, .. }) => {
            format!("LinkedIn rejected the verification request (HTTP {status})")
        }
        DomainErrorKind::External(ExternalErrorKind::Network) => {
            "Could not reach LinkedIn, please try again".to_string()
        }
        _ => "Failed to retrieve the LinkedIn profile".to_string(),
    };
    warn!("LinkedIn exchange failed: {err}");

    Error {
        source: Some(Box::new(err)),
        error_kind: DomainErrorKind::Verification(VerificationErrorKind::ProviderExchangeFailed(
            message,
        )),
    }
}

#[cfg(test)]
#[cfg(feature = "mock")]
pub(crate) mod test_support {
    use crate::agents;
    use crate::verification_requests;
    use crate::verification_tier::VerificationTier;
    use crate::verification_type::VerificationType;
    use crate::Id;
    use chrono::{Duration, Utc};
    use entity_api::agent::hash_api_key;

    pub const API_KEY: &str = "lc_test_0123456789abcdefghijklmnop";
    pub const STATE: &str = "Zq4mR8vT2xLp9sNc6bWd3hKf7jYg1aUe";

    /// An agent owning [`API_KEY`]. `email_verified` agents sit in the
    /// verified tier through another method with five invites left.
    pub fn agent(email_verified: bool) -> agents::Model {
        let now = Utc::now();
        agents::Model {
            id: Id::new_v4(),
            handle: "clawdia".to_string(),
            display_name: "Clawdia".to_string(),
            api_key_prefix: API_KEY[..8].to_string(),
            api_key_hash: hash_api_key(API_KEY),
            verified: email_verified,
            verification_type: email_verified.then_some(VerificationType::Email),
            verification_data: email_verified.then(|| "clawdia@example.com".to_string()),
            verification_tier: if email_verified {
                VerificationTier::Verified
            } else {
                VerificationTier::Unverified
            },
            linkedin_id: None,
            linkedin_name: None,
            linkedin_verified_at: None,
            invite_codes_remaining: if email_verified { 5 } else { 0 },
            can_invite: email_verified,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    /// `agent` after LinkedIn verification as Jane Doe.
    pub fn verified(agent: &agents::Model, invite_codes_remaining: i32) -> agents::Model {
        agents::Model {
            verified: true,
            verification_type: Some(VerificationType::Linkedin),
            verification_data: Some("abc123".to_string()),
            verification_tier: VerificationTier::Verified,
            linkedin_id: Some("abc123".to_string()),
            linkedin_name: Some("Jane Doe".to_string()),
            linkedin_verified_at: Some(Utc::now().into()),
            invite_codes_remaining,
            can_invite: true,
            ..agent.clone()
        }
    }

    /// A request for `agent_id` carrying [`STATE`], created now.
    pub fn request(agent_id: Id, expires_in: Duration) -> verification_requests::Model {
        let now = Utc::now();
        verification_requests::Model {
            id: Id::new_v4(),
            agent_id,
            state: STATE.to_string(),
            created_at: now.into(),
            expires_at: (now + expires_in).into(),
            completed_at: None,
            error: None,
        }
    }
}


#[cfg(test)]
#[cfg(feature = "mock")]
mod mock_tests {
    use super::test_support::{agent, request, verified, API_KEY, STATE};
    use super::*;
    use crate::activity_logs;
    use crate::gateway::linkedin::Profile;
    use crate::Id;
    use async_trait::async_trait;
    use clap::Parser;
    use entity_api::error::mock::serialization_failure;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedTokens;

    impl StateTokenSource for FixedTokens {
        fn generate(&self) -> String {
            STATE.to_string()
        }
    }

    /// Answers with `profile`, or a 401 rejection when `None`, and counts calls.
    struct FakeProvider {
        profile: Option<Profile>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn returning(profile: Option<Profile>) -> Self {
            Self {
                profile,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn exchange_and_fetch_profile(&self, _code: &str) -> Result<Profile, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.profile.clone().ok_or(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provider {
                    status: 401,
                    body: "invalid_client".to_string(),
                }),
            })
        }
    }

    fn jane_doe() -> Profile {
        Profile {
            subject: "abc123".to_string(),
            display_name: "Jane Doe".to_string(),
            email: None,
            picture: None,
        }
    }

    fn configured() -> Config {
        Config::parse_from(["linkclaws"]).set_linkedin_client(
            Some("client-123".to_string()),
            Some("secret-456".to_string()),
            Some("https://linkclaws.test/verification/linkedin/callback".to_string()),
        )
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn executed_sql(log: Vec<Transaction>) -> String {
        format!("{log:?}").replace('\\', "")
    }

    fn log_entry(agent_id: Id) -> activity_logs::Model {
        activity_logs::Model {
            id: Id::new_v4(),
            agent_id,
            action: VERIFIED_ACTIVITY.to_string(),
            description: "Verified LinkedIn identity as Jane Doe".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn start_replaces_pending_requests_and_returns_consent_url() {
        let agent = agent(false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .append_exec_results(vec![exec(1)])
            .append_query_results(vec![vec![request(agent.id, Duration::minutes(15))]])
            .into_connection();

        let started = start_verification(&db, &configured(), &FixedTokens, API_KEY)
            .await
            .unwrap();

        assert_eq!(started.expires_in, 900);
        assert!(started
            .authorization_url
            .starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
        assert!(started.authorization_url.contains(&format!("state={STATE}")));
        assert!(started.authorization_url.contains("client_id=client-123"));

        let sql = executed_sql(db.into_transaction_log());
        let delete = sql
            .find(r#"DELETE FROM "linkclaws"."verification_requests""#)
            .unwrap();
        let insert = sql
            .find(r#"INSERT INTO "linkclaws"."verification_requests""#)
            .unwrap();
        assert!(delete < insert);
    }

    #[tokio::test]
    async fn start_retries_after_losing_to_a_concurrent_start() {
        let agent = agent(false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .append_exec_errors(vec![serialization_failure()])
            .append_exec_results(vec![exec(1)])
            .append_query_results(vec![vec![request(agent.id, Duration::minutes(15))]])
            .into_connection();

        let started = start_verification(&db, &configured(), &FixedTokens, API_KEY)
            .await
            .unwrap();
        assert!(started.authorization_url.contains(&format!("state={STATE}")));

        let sql = executed_sql(db.into_transaction_log());
        assert_eq!(
            sql.matches(r#"DELETE FROM "linkclaws"."verification_requests""#)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn start_gives_up_after_repeated_conflicts() {
        let agent = agent(false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .append_exec_errors(vec![
                serialization_failure(),
                serialization_failure(),
                serialization_failure(),
            ])
            .into_connection();

        let err = start_verification(&db, &configured(), &FixedTokens, API_KEY)
            .await
            .unwrap_err();

        assert!(err.is_serialization_conflict());
        assert!(!executed_sql(db.into_transaction_log()).contains("INSERT"));
    }

    #[tokio::test]
    async fn start_rejects_agents_already_verified_with_linkedin() {
        let agent = verified(&agent(false), 3);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .into_connection();

        let err = start_verification(&db, &configured(), &FixedTokens, API_KEY)
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(&VerificationErrorKind::AlreadyVerified)
        );
    }

    #[tokio::test]
    async fn start_fails_closed_without_client_settings_and_writes_nothing() {
        let agent = agent(false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .into_connection();
        let config = Config::parse_from(["linkclaws"]).set_linkedin_client(
            Some("client-123".to_string()),
            Some("secret-456".to_string()),
            None,
        );

        let err = start_verification(&db, &config, &FixedTokens, API_KEY)
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(&VerificationErrorKind::ProviderNotConfigured)
        );
        assert!(!executed_sql(db.into_transaction_log()).contains("DELETE"));
    }

    #[tokio::test]
    async fn callback_with_unknown_state_never_reaches_provider() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<crate::verification_requests::Model>::new()])
            .into_connection();
        let provider = FakeProvider::returning(Some(jane_doe()));

        let err = complete_oauth_callback(&db, &provider, "never-issued", "code")
            .await
            .unwrap_err();

        assert_eq!(
            err.verification_kind(),
            Some(&VerificationErrorKind::InvalidOrExpiredState)
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn provider_failure_stops_before_completion() {
        let agent = agent(false);
        // Only the validator's reads are queued; any completion query would
        // surface as a database error instead.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![request(agent.id, Duration::minutes(10))]])
            .append_query_results(vec![vec![agent.clone()]])
            .into_connection();
        let provider = FakeProvider::returning(None);

        let err = complete_oauth_callback(&db, &provider, STATE, "code")
            .await
            .unwrap_err();

        assert!(matches!(
            err.verification_kind(),
            Some(VerificationErrorKind::ProviderExchangeFailed(_))
        ));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn callback_verifies_once_and_rejects_the_duplicate() {
        let agent = agent(false);
        let live = request(agent.id, Duration::minutes(10));
        let consumed = crate::verification_requests::Model {
            completed_at: Some(Utc::now().into()),
            ..live.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // first callback: validate
            .append_query_results(vec![vec![live.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            // first callback: complete
            .append_query_results(vec![vec![live.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .append_exec_results(vec![exec(1)])
            .append_query_results(vec![vec![verified(&agent, 3)]])
            .append_query_results(vec![vec![log_entry(agent.id)]])
            // duplicate callback: validate
            .append_query_results(vec![vec![consumed]])
            .into_connection();
        let provider = FakeProvider::returning(Some(jane_doe()));

        let completed = complete_oauth_callback(&db, &provider, STATE, "code")
            .await
            .unwrap();
        assert_eq!(completed.agent_id, agent.id);
        assert_eq!(completed.handle, "clawdia");
        assert_eq!(completed.display_name, "Jane Doe");

        let err = complete_oauth_callback(&db, &provider, STATE, "code")
            .await
            .unwrap_err();
        assert_eq!(
            err.verification_kind(),
            Some(&VerificationErrorKind::AlreadyCompleted)
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn status_reports_linkedin_identity_of_verified_agents() {
        let agent = verified(&agent(false), 3);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .into_connection();

        let status = verification_status(&db, API_KEY).await.unwrap();

        assert!(status.verified);
        assert!(!status.pending);
        assert_eq!(status.verification_type, Some(VerificationType::Linkedin));
        assert_eq!(status.external_id.as_deref(), Some("abc123"));
        assert_eq!(status.display_name.as_deref(), Some("Jane Doe"));
        assert!(status.verified_at.is_some());
    }

    #[tokio::test]
    async fn status_of_email_verified_agent_carries_no_identity_fields() {
        let agent = agent(true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .into_connection();

        let status = verification_status(&db, API_KEY).await.unwrap();

        assert_eq!(
            status,
            VerificationStatus {
                verified: true,
                verification_type: Some(VerificationType::Email),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn status_falls_back_to_latest_pending_request() {
        let agent = agent(false);
        let pending = request(agent.id, Duration::minutes(12));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![agent.clone()]])
            .append_query_results(vec![vec![pending.clone()]])
            .into_connection();

        let status = verification_status(&db, API_KEY).await.unwrap();

        assert_eq!(
            status,
            VerificationStatus {
                pending: true,
                pending_expires_at: Some(pending.expires_at),
                ..Default::default()
            }
        );
    }
}
