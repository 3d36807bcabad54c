use std::env;

use serde::{Deserialize, Serialize};

use crate::executor::PollPolicy;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_DATABASE: &str = "ecommerce_analytics_db";
const DEFAULT_OUTPUT_LOCATION: &str = "s3://analytics-proy-parcial/results/";
const DEFAULT_WORKGROUP: &str = "primary";
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Athena returns at most 1000 rows per `GetQueryResults` page.
pub const MAX_RESULT_PAGE_SIZE: i32 = 1000;

// ── Env helpers ──────────────────────────────────────────────────

/// Load `.env` into the process environment, if present.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

pub fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse a profiled env var, falling back to `default` when unset or unparsable.
pub fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

/// Active profile from `ANALYTICS_PROFILE`, upper-cased; empty when unset.
pub fn active_profile() -> String {
    env_opt("ANALYTICS_PROFILE")
        .map(|s| s.to_uppercase())
        .unwrap_or_default()
}

// ── AthenaConfig ─────────────────────────────────────────────────

/// Connection and polling settings for the Athena backend.
///
/// Reads from environment variables with optional profile prefix.
/// When `ANALYTICS_PROFILE=PROD`, checks `PROD_ATHENA_DATABASE` before `ATHENA_DATABASE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// AWS region for Athena queries.
    pub region: String,
    /// Database that unqualified table names resolve against.
    pub database: String,
    /// Athena workgroup.
    pub workgroup: String,
    /// S3 prefix Athena writes query output to.
    pub output_location: String,
    /// Endpoint override, e.g. for a local emulator.
    pub endpoint_url: Option<String>,
    /// Status checks per query before giving up.
    pub max_poll_attempts: u32,
    /// Wait between status checks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Rows requested per `GetQueryResults` page (1..=1000).
    pub result_page_size: i32,
    /// Probe credentials with a cheap call at startup.
    pub verify_on_startup: bool,
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            workgroup: DEFAULT_WORKGROUP.to_string(),
            output_location: DEFAULT_OUTPUT_LOCATION.to_string(),
            endpoint_url: None,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            result_page_size: MAX_RESULT_PAGE_SIZE,
            verify_on_startup: true,
        }
    }
}

impl AthenaConfig {
    /// Build config from environment variables using the active profile.
    ///
    /// `ATHENA_REGION` falls back to `AWS_REGION` before using the default.
    pub fn from_env() -> Self {
        Self::from_env_profiled(&active_profile())
    }

    /// Build config for a specific named profile.
    pub fn from_env_profiled(profile: &str) -> Self {
        let defaults = Self::default();

        let region = profiled_env_opt(profile, "ATHENA_REGION")
            .or_else(|| profiled_env_opt(profile, "AWS_REGION"))
            .unwrap_or(defaults.region);

        Self {
            region,
            database: profiled_env_or(profile, "ATHENA_DATABASE", DEFAULT_DATABASE),
            workgroup: profiled_env_or(profile, "ATHENA_WORKGROUP", DEFAULT_WORKGROUP),
            output_location: profiled_env_or(
                profile,
                "ATHENA_OUTPUT_LOCATION",
                DEFAULT_OUTPUT_LOCATION,
            ),
            endpoint_url: profiled_env_opt(profile, "ATHENA_ENDPOINT_URL"),
            max_poll_attempts: profiled_env_parse(
                profile,
                "ATHENA_MAX_POLL_ATTEMPTS",
                DEFAULT_MAX_POLL_ATTEMPTS,
            ),
            poll_interval_ms: profiled_env_parse(
                profile,
                "ATHENA_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            ),
            result_page_size: profiled_env_parse(
                profile,
                "ATHENA_RESULT_PAGE_SIZE",
                MAX_RESULT_PAGE_SIZE,
            )
            .clamp(1, MAX_RESULT_PAGE_SIZE),
            verify_on_startup: profiled_env_bool(profile, "ATHENA_VERIFY_ON_STARTUP", true),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from_millis(self.max_poll_attempts, self.poll_interval_ms)
    }

    /// Returns `true` when the output location is an `s3://bucket/...` URI.
    pub fn output_location_is_valid(&self) -> bool {
        match url::Url::parse(&self.output_location) {
            Ok(u) => u.scheme() == "s3" && u.host_str().is_some_and(|h| !h.is_empty()),
            Err(_) => false,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!(
            region = %self.region,
            database = %self.database,
            workgroup = %self.workgroup,
            output_location = %self.output_location,
            max_poll_attempts = self.max_poll_attempts,
            poll_interval_ms = self.poll_interval_ms,
            "Athena config loaded"
        );
    }
}

// ── Tests ────────────────────────────────────────────────────────
