//! Dispatcher-specific configuration, layered on top of [`CoreConfig`]

use userdir_core::config::CoreConfig;

/// Settings the dispatcher loop needs beyond what it shares with every
/// other service. Kept a separate struct (rather than reading
/// `CoreConfig` fields directly everywhere) so `server`'s `UnifiedConfig`
/// can assemble it independently of the API's config.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub sleep_interval_secs: u64,
    pub base_retry_secs: i64,
    pub max_retry_secs: i64,
}

impl DispatcherConfig {
    pub fn from_core(core: &CoreConfig) -> Self {
        Self {
            sleep_interval_secs: core.outbox_sleep_interval_secs,
            base_retry_secs: core.outbox_base_retry_secs,
            max_retry_secs: core.outbox_max_retry_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_config() -> CoreConfig {
        CoreConfig {
            database_url: "postgres://localhost".into(),
            database_name: "userdir".into(),
            user_table_name: "users".into(),
            outbox_table_name: "outbox".into(),
            db_max_connections: 5,
            initial_retry_delay_secs: 5,
            list_user_default_limit: 20,
            list_user_max_limit: 100,
            topic_user_added: "user-added".into(),
            topic_user_removed: "user-removed".into(),
            kafka_bootstrap_servers: "localhost:9092".into(),
            outbox_sleep_interval_secs: 7,
            outbox_base_retry_secs: 5,
            outbox_max_retry_secs: 300,
        }
    }

    #[test]
    fn from_core_copies_outbox_fields() {
        let config = DispatcherConfig::from_core(&core_config());
        assert_eq!(config.sleep_interval_secs, 7);
        assert_eq!(config.base_retry_secs, 5);
        assert_eq!(config.max_retry_secs, 300);
    }
}
