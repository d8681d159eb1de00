use log::*;
use tokio::net::TcpListener;

pub use error::{Error, Result, WebErrorKind};
pub use service::AppState;

mod controller;
pub mod error;
mod extractors;
mod response;
pub mod router;

/// Binds `interface:port` from the config and serves the API until shutdown.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{interface}:{}", app_state.config.port);

    info!("Server starting... listening for connections on http://{server_url}");

    let listener = TcpListener::bind(&server_url).await?;
    axum::serve(listener, router::define_routes(app_state)).await
}
