//! Application state shared across all request handlers.

use std::sync::Arc;

use sqlx::PgPool;

use dt_core::framework::DatabaseProcessor;
use dt_core::services::{BetService, DrawService, LifecycleService, RoundQueryService};

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Bet placement engine.
    pub bet: Arc<BetService>,
    /// Draw & settlement engine.
    pub draw: Arc<DrawService>,
    /// Round lifecycle engine.
    pub lifecycle: Arc<LifecycleService>,
    /// KV-first round reader.
    pub round_query: Arc<RoundQueryService>,
}

impl AppState {
    /// A pool-scoped command runner for one-shot queries.
    pub fn processor(&self) -> DatabaseProcessor {
        DatabaseProcessor {
            pool: self.db.clone(),
        }
    }
}
