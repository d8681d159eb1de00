use crate::error::{Error, WebErrorKind};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use log::*;

/// The raw API key presented as `Authorization: Bearer <key>`.
///
/// Only presence is checked here; the key is resolved to an agent by the
/// domain layer.
pub(crate) struct AgentCredential(pub String);

impl<S> FromRequestParts<S> for AgentCredential
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                value
                    .strip_prefix("Bearer ")
                    .or_else(|| value.strip_prefix("bearer "))
            })
            .map(str::trim)
            .filter(|token| !token.is_empty());

        match token {
            Some(token) => Ok(AgentCredential(token.to_string())),
            None => {
                trace!("Request without a bearer API key");
                Err(Error::Web(WebErrorKind::Auth))
            }
        }
    }
}
