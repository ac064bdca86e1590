//! Shared configuration logic
//!
//! Handles loading of the environment variables common to every service
//! (API, dispatcher, server). Per-service configuration lives alongside
//! that service.

use anyhow::{Context, Result};
use std::env;

/// Configuration shared by every service that touches the store or the bus.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Database connection URL (`database.connectionString`)
    pub database_url: String,

    /// Database name; `DATABASE_NAME` overrides `database.databaseName`
    pub database_name: String,

    /// `database.userCollectionName`
    pub user_table_name: String,

    /// `database.outboxCollectionName`
    pub outbox_table_name: String,

    /// Maximum pool connections
    pub db_max_connections: u32,

    /// `database.initialRetryDelaySeconds`: delay stamped on newly enqueued outbox rows
    pub initial_retry_delay_secs: i64,

    /// `database.listUserDefaultLimit`
    pub list_user_default_limit: i64,

    /// `database.listUserMaxLimit`
    pub list_user_max_limit: i64,

    /// `kafka.topics.userAdded`
    pub topic_user_added: String,

    /// `kafka.topics.userRemoved`
    pub topic_user_removed: String,

    /// Kafka bootstrap servers for the bus producer
    pub kafka_bootstrap_servers: String,

    /// `kafka.outbox.sleepIntervalSeconds`
    pub outbox_sleep_interval_secs: u64,

    /// `kafka.outbox.baseRetryTimeSeconds`
    pub outbox_base_retry_secs: i64,

    /// `kafka.outbox.maxRetryTimeSeconds`
    pub outbox_max_retry_secs: i64,
}

impl CoreConfig {
    /// Load common configuration from environment variables.
    ///
    /// This will also initialize dotenv if it hasn't been done yet.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_name = env::var("DATABASE_NAME")
            .or_else(|_| env::var("DATABASE_DATABASE_NAME"))
            .unwrap_or_else(|_| "userdir".to_string());

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_name,
            user_table_name: env::var("DATABASE_USER_COLLECTION_NAME")
                .unwrap_or_else(|_| "users".to_string()),
            outbox_table_name: env::var("DATABASE_OUTBOX_COLLECTION_NAME")
                .unwrap_or_else(|_| "outbox".to_string()),
            db_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid integer")?,
            initial_retry_delay_secs: env::var("DATABASE_INITIAL_RETRY_DELAY_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("DATABASE_INITIAL_RETRY_DELAY_SECONDS must be a valid integer")?,
            list_user_default_limit: env::var("DATABASE_LIST_USER_DEFAULT_LIMIT")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("DATABASE_LIST_USER_DEFAULT_LIMIT must be a valid integer")?,
            list_user_max_limit: env::var("DATABASE_LIST_USER_MAX_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("DATABASE_LIST_USER_MAX_LIMIT must be a valid integer")?,
            topic_user_added: env::var("KAFKA_TOPICS_USER_ADDED")
                .unwrap_or_else(|_| "user-added".to_string()),
            topic_user_removed: env::var("KAFKA_TOPICS_USER_REMOVED")
                .unwrap_or_else(|_| "user-removed".to_string()),
            kafka_bootstrap_servers: env::var("KAFKA_BOOTSTRAP_SERVERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            outbox_sleep_interval_secs: env::var("KAFKA_OUTBOX_SLEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("KAFKA_OUTBOX_SLEEP_INTERVAL_SECONDS must be a valid integer")?,
            outbox_base_retry_secs: env::var("KAFKA_OUTBOX_BASE_RETRY_TIME_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("KAFKA_OUTBOX_BASE_RETRY_TIME_SECONDS must be a valid integer")?,
            outbox_max_retry_secs: env::var("KAFKA_OUTBOX_MAX_RETRY_TIME_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("KAFKA_OUTBOX_MAX_RETRY_TIME_SECONDS must be a valid integer")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let cfg = CoreConfig {
            database_url: "postgres://localhost".into(),
            database_name: "userdir".into(),
            user_table_name: "users".into(),
            outbox_table_name: "outbox".into(),
            db_max_connections: 20,
            initial_retry_delay_secs: 5,
            list_user_default_limit: 20,
            list_user_max_limit: 100,
            topic_user_added: "user-added".into(),
            topic_user_removed: "user-removed".into(),
            kafka_bootstrap_servers: "localhost:9092".into(),
            outbox_sleep_interval_secs: 5,
            outbox_base_retry_secs: 5,
            outbox_max_retry_secs: 300,
        };

        assert_eq!(cfg.list_user_default_limit, 20);
        assert_eq!(cfg.list_user_max_limit, 100);
    }
}
