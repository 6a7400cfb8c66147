use crate::config::Config;
use axum::extract::FromRef;
use sqlx::PgPool;

/// Shared state of every handler: the connection pool and the loaded config.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self { pool, config }
    }

    /// Largest accepted upload file, in bytes.
    pub fn upload_limit(&self) -> usize {
        self.config.max_upload_bytes
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
