//! Error types for the `domain` layer.
use entity_api::error::{is_serialization_failure, EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field holds the original error that caused the
/// domain error, so errors can be translated between layers while keeping the
/// layer boundaries: `web` depends on `domain`, never directly on `entity_api`.
/// Ultimately the various `error_kind`s are used by `web` to return appropriate
/// HTTP status codes and messages to the client.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
    /// Caller-correctable outcomes of the LinkedIn verification flow.
    Verification(VerificationErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Other(String),
}

/// Entity errors bubbled up from `entity_api`, reduced to the kinds the
/// `domain` layer cares about.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    DbTransaction,
    /// Postgres aborted the transaction in favour of a concurrent one.
    SerializationConflict,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    /// The provider answered with a non-success HTTP status.
    Provider {
        status: u16,
        body: String,
    },
    Other(String),
}

#[derive(Debug, PartialEq)]
pub enum VerificationErrorKind {
    InvalidCredential,
    AgentNotFound,
    AlreadyVerified,
    ProviderNotConfigured,
    InvalidOrExpiredState,
    Expired,
    AlreadyCompleted,
    /// Human readable summary; the upstream error is kept as `source`.
    ProviderExchangeFailed(String),
}

impl fmt::Display for VerificationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidCredential => write!(f, "Invalid API key"),
            Self::AgentNotFound => write!(f, "Agent not found"),
            Self::AlreadyVerified => write!(f, "Agent is already verified with LinkedIn"),
            Self::ProviderNotConfigured => write!(f, "LinkedIn verification is not configured"),
            Self::InvalidOrExpiredState => write!(f, "Invalid or expired verification state"),
            Self::Expired => write!(f, "Verification request has expired, please start again"),
            Self::AlreadyCompleted => write!(f, "Verification request was already completed"),
            Self::ProviderExchangeFailed(message) => write!(f, "{message}"),
        }
    }
}

impl Error {
    /// Builds a verification outcome error with no underlying source.
    pub fn verification(kind: VerificationErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Verification(kind),
        }
    }

    /// Whether a concurrent transaction won and the work may be retried.
    pub fn is_serialization_conflict(&self) -> bool {
        self.error_kind
            == DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::SerializationConflict,
            ))
    }

    /// Returns the verification kind if this error is a verification outcome.
    pub fn verification_kind(&self) -> Option<&VerificationErrorKind> {
        match &self.error_kind {
            DomainErrorKind::Verification(kind) => Some(kind),
            _ => None,
        }
    }
}

impl From<VerificationErrorKind> for Error {
    fn from(kind: VerificationErrorKind) -> Self {
        Error::verification(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::RecordNotUpdated => {
                EntityErrorKind::Other("RecordNotUpdated".to_string())
            }
            EntityApiErrorKind::SerializationFailure => EntityErrorKind::SerializationConflict,
            EntityApiErrorKind::SystemError => EntityErrorKind::Other("SystemError".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        let entity_error_kind = if is_serialization_failure(&err) {
            EntityErrorKind::SerializationConflict
        } else {
            EntityErrorKind::DbTransaction
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_not_found_translates_to_internal_entity_not_found() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
        .into();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
        );
    }

    #[test]
    fn verification_kind_is_exposed_only_for_verification_errors() {
        let err = Error::verification(VerificationErrorKind::Expired);
        assert_eq!(err.verification_kind(), Some(&VerificationErrorKind::Expired));

        let err = Error {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
        };
        assert_eq!(err.verification_kind(), None);
    }

    #[test]
    fn provider_exchange_failed_displays_its_message() {
        let kind =
            VerificationErrorKind::ProviderExchangeFailed("LinkedIn returned 401".to_string());
        assert_eq!(kind.to_string(), "LinkedIn returned 401");
    }

}
