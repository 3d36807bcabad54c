//! Application configuration.
//!
//! Loads `.env`, then reads server and Athena settings from the environment
//! under the active `ANALYTICS_PROFILE`.

use analytics_athena::config::{active_profile, load_dotenv, profiled_env_or, profiled_env_parse};
use analytics_athena::AthenaConfig;
use tracing::{info, warn};

use crate::sql_policy::CustomQueryPolicy;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub custom_query_policy: CustomQueryPolicy,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        let policy_raw = profiled_env_or(p, "CUSTOM_QUERY_POLICY", "read-only");
        let custom_query_policy = policy_raw.parse().unwrap_or_else(|e| {
            warn!("{}; falling back to read-only", e);
            CustomQueryPolicy::ReadOnly
        });

        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 5000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
            custom_query_policy,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub athena: AthenaConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let profile = active_profile();
        Self {
            server: ServerConfig::from_env_profiled(&profile),
            athena: AthenaConfig::from_env_profiled(&profile),
            profile,
        }
    }

    fn profile_label(&self) -> &str {
        if self.profile.is_empty() {
            "default"
        } else {
            &self.profile
        }
    }

    pub fn log_summary(&self) {
        info!("Config loaded (profile: {}):", self.profile_label());
        info!(
            "  server:  {} (cors={}, custom queries={})",
            self.server.bind_addr(),
            self.server.cors_origin,
            self.server.custom_query_policy
        );
        self.athena.log_summary();
        if !self.athena.output_location_is_valid() {
            warn!(
                "ATHENA_OUTPUT_LOCATION '{}' is not an s3:// URI; queries will fail",
                self.athena.output_location
            );
        }
    }
}

/// Load configuration from `.env` and environment variables.
pub fn load_config() -> Config {
    load_dotenv();
    Config::from_env()
}
