use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    VerificationErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Domain(DomainError),
    Web(WebErrorKind),
}

/// Errors raised by the `web` layer itself, before any domain call.
#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// No usable credential on the request.
    Auth,
    BadRequest(String),
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl Error {
    /// Status code and client facing message for this error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Error::Web(WebErrorKind::Auth) => {
                (StatusCode::UNAUTHORIZED, "Missing API key".to_string())
            }
            Error::Web(WebErrorKind::BadRequest(message)) => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            Error::Domain(domain_error) => match &domain_error.error_kind {
                DomainErrorKind::Verification(kind) => (verification_status(kind), kind.to_string()),
                DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound)) => {
                    (StatusCode::NOT_FOUND, "Not found".to_string())
                }
                DomainErrorKind::Internal(InternalErrorKind::Entity(
                    EntityErrorKind::SerializationConflict,
                )) => (
                    StatusCode::CONFLICT,
                    "Conflicting concurrent request, please try again".to_string(),
                ),
                DomainErrorKind::Internal(_) => internal_server_error(),
                DomainErrorKind::External(ExternalErrorKind::Network) => (
                    StatusCode::BAD_GATEWAY,
                    "Upstream service unavailable".to_string(),
                ),
                DomainErrorKind::External(ExternalErrorKind::Provider { .. }) => (
                    StatusCode::BAD_GATEWAY,
                    "Upstream service rejected the request".to_string(),
                ),
                DomainErrorKind::External(ExternalErrorKind::Other(_)) => internal_server_error(),
            },
        }
    }
}

fn verification_status(kind: &VerificationErrorKind) -> StatusCode {
    match kind {
        VerificationErrorKind::InvalidCredential => StatusCode::UNAUTHORIZED,
        VerificationErrorKind::AgentNotFound => StatusCode::NOT_FOUND,
        VerificationErrorKind::AlreadyVerified | VerificationErrorKind::AlreadyCompleted => {
            StatusCode::CONFLICT
        }
        VerificationErrorKind::ProviderNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        VerificationErrorKind::InvalidOrExpiredState | VerificationErrorKind::Expired => {
            StatusCode::BAD_REQUEST
        }
        VerificationErrorKind::ProviderExchangeFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn internal_server_error() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            error!("{status}: {self}");
        } else {
            debug!("{status}: {message}");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self::Domain(err.into())
    }
}
