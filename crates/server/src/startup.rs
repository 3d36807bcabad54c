//! Server startup: build the Athena backend and shared state.

use std::sync::Arc;

use analytics_athena::{AthenaBackend, AthenaConfig, QueryExecutor};
use tracing::{error, info, warn};

use crate::app_config::Config;
use crate::state::AppState;

/// Connect to Athena and, when enabled, probe credentials.
///
/// A failed probe leaves the executor uninitialized: the server still starts
/// and every query endpoint answers with a precondition error instead.
pub async fn build_executor(config: &AthenaConfig) -> QueryExecutor {
    let backend = AthenaBackend::connect(config).await;

    if !config.verify_on_startup {
        warn!("Skipping Athena credential check (ATHENA_VERIFY_ON_STARTUP=false)");
        return QueryExecutor::from_config(Arc::new(backend), config);
    }

    match backend.verify().await {
        Ok(()) => {
            info!("Athena client authenticated");
            QueryExecutor::from_config(Arc::new(backend), config)
        }
        Err(e) => {
            error!(error = %e, "Athena client failed to authenticate");
            error!(
                "Check AWS_SESSION_TOKEN validity and IAM permissions; \
                 query endpoints are disabled"
            );
            QueryExecutor::uninitialized(config)
        }
    }
}

pub async fn build_app_state(config: &Config) -> Arc<AppState> {
    let executor = build_executor(&config.athena).await;
    Arc::new(AppState::new(executor, config.server.custom_query_policy))
}
