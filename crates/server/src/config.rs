use anyhow::Result;
use std::env;
use userdir_core::config::CoreConfig;
use userdir_dispatcher::config::DispatcherConfig;

#[derive(Debug, Clone)]
pub struct UnifiedConfig {
    pub core: CoreConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origin: String,
}

impl UnifiedConfig {
    pub fn from_env() -> Result<Self> {
        let core = CoreConfig::from_env()?;

        Ok(Self {
            core,
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
                port: env::var("API_PORT")
                    .unwrap_or_else(|_| "3000".into())
                    .parse()?,
                cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                    .unwrap_or_else(|_| "*".into()),
            },
        })
    }

    pub fn to_api_config(&self) -> userdir_api::config::Config {
        userdir_api::config::Config::new(
            self.api.host.clone(),
            self.api.port,
            self.api.cors_allowed_origin.clone(),
        )
    }

    pub fn to_dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::from_core(&self.core)
    }
}
