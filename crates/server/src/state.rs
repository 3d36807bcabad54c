use analytics_athena::QueryExecutor;

use crate::sql_policy::CustomQueryPolicy;

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub executor: QueryExecutor,
    pub custom_query_policy: CustomQueryPolicy,
}

impl AppState {
    pub fn new(executor: QueryExecutor, custom_query_policy: CustomQueryPolicy) -> Self {
        Self {
            executor,
            custom_query_policy,
        }
    }
}
