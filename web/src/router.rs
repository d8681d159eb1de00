use crate::controller::{health_check_controller, linkedin_verification_controller};
use crate::response::linkedin_verification::{
    StartVerificationResponse, VerificationCompletedResponse, VerificationStatusResponse,
};
use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "LinkClaws API"
        ),
        paths(
            health_check_controller::health_check,
            linkedin_verification_controller::start,
            linkedin_verification_controller::callback,
            linkedin_verification_controller::status,
        ),
        components(
            schemas(
                domain::verification_type::VerificationType,
                StartVerificationResponse,
                VerificationCompletedResponse,
                VerificationStatusResponse,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "linkclaws", description = "LinkClaws agent verification API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Agents authenticate with their API key sent as a bearer token.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(linkedin_verification_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

/// Routes for LinkedIn verification. The callback carries no API key; it is
/// reached through LinkedIn's redirect and correlated by its state token.
fn linkedin_verification_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/verification/linkedin/start",
            post(linkedin_verification_controller::start),
        )
        .route(
            "/verification/linkedin/callback",
            get(linkedin_verification_controller::callback),
        )
        .route(
            "/verification/linkedin/status",
            get(linkedin_verification_controller::status),
        )
        .with_state(app_state)
}
