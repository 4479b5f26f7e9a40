use sqlx::PgPool;

use crate::services::dispatcher::Pipeline;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(db: PgPool, pipeline: Pipeline) -> Self {
        Self { db, pipeline }
    }
}
