use config::Config;
use log::info;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use tokio::time::Duration;

pub mod config;
pub mod logging;

/// PostgreSQL schema holding every LinkClaws table.
pub const DB_SCHEMA: &str = "linkclaws";

/// Pool settings for `config`, with the search path pinned to [`DB_SCHEMA`].
pub fn connect_options(config: &Config) -> ConnectOptions {
    let mut opt = ConnectOptions::new(config.database_url());
    opt.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime_secs))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug)
        .set_schema_search_path(DB_SCHEMA);
    opt
}

pub async fn init_database(config: &Config) -> Result<DatabaseConnection, DbErr> {
    info!(
        "Connecting to PostgreSQL (schema {DB_SCHEMA}): max_connections={}, min_connections={}, \
         connect_timeout={}s, acquire_timeout={}s",
        config.db_max_connections,
        config.db_min_connections,
        config.db_connect_timeout_secs,
        config.db_acquire_timeout_secs,
    );

    Database::connect(connect_options(config)).await
}

/// Shared state handed to every request handler: the connection pool and
/// the loaded configuration.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, db: &Arc<DatabaseConnection>) -> Self {
        Self {
            database_connection: Arc::clone(db),
            config: app_config,
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn connect_options_follow_pool_settings() {
        let config = Config::parse_from([
            "linkclaws",
            "--database-url",
            "postgres://claw:secret@db:5432/linkclaws",
            "--db-max-connections",
            "7",
            "--db-min-connections",
            "1",
            "--db-connect-timeout-secs",
            "3",
        ]);

        let opt = connect_options(&config);

        assert_eq!(opt.get_url(), "postgres://claw:secret@db:5432/linkclaws");
        assert_eq!(opt.get_max_connections(), Some(7));
        assert_eq!(opt.get_min_connections(), Some(1));
        assert_eq!(opt.get_connect_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn app_state_shares_the_connection() {
        let db = Arc::new(DatabaseConnection::Disconnected);
        let state = AppState::new(Config::parse_from(["linkclaws"]), &db);

        assert_eq!(Arc::strong_count(&db), 2);
        assert!(matches!(state.db_conn_ref(), DatabaseConnection::Disconnected));
    }
}
