//! Tests for AthenaConfig as consumed by the executor.

use std::env;
use std::sync::Mutex;
use std::time::Duration;

use analytics_athena::*;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for k in [
        "ANALYTICS_PROFILE",
        "ATHENA_DATABASE",
        "ATHENA_OUTPUT_LOCATION",
        "ATHENA_MAX_POLL_ATTEMPTS",
        "ATHENA_POLL_INTERVAL_MS",
        "PROD_ATHENA_DATABASE",
        "PROD_ATHENA_OUTPUT_LOCATION",
    ] {
        env::remove_var(k);
    }
}

#[test]
fn active_profile_selects_prefixed_values() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();

    env::set_var("ANALYTICS_PROFILE", "prod");
    env::set_var("ATHENA_DATABASE", "dev_db");
    env::set_var("PROD_ATHENA_DATABASE", "prod_db");
    env::set_var("PROD_ATHENA_OUTPUT_LOCATION", "s3://prod-results/athena/");

    let cfg = AthenaConfig::from_env();
    assert_eq!(cfg.database, "prod_db");
    assert_eq!(cfg.output_location, "s3://prod-results/athena/");
    assert!(cfg.output_location_is_valid());

    clear_env();
}

#[test]
fn executor_takes_defaults_from_config() {
    let _lock = ENV_LOCK.lock().unwrap();
    clear_env();

    env::set_var("ATHENA_MAX_POLL_ATTEMPTS", "7");
    env::set_var("ATHENA_POLL_INTERVAL_MS", "250");

    let cfg = AthenaConfig::from_env();
    let exec = QueryExecutor::uninitialized(&cfg);

    assert!(!exec.is_initialized());
    assert_eq!(exec.database(), "ecommerce_analytics_db");
    assert_eq!(exec.poll_policy().max_attempts(), 7);
    assert_eq!(exec.poll_policy().interval(), Duration::from_millis(250));

    let req = exec.request("SELECT 1");
    assert_eq!(req.result_location(), cfg.output_location);

    clear_env();
}
