use std::sync::Arc;

use crate::config::AppConfig;
use crate::credentials::Credentials;
use crate::metrics::Metrics;

/// The shared application state.
///
/// Created once in `main` and cloned into every handler through axum's
/// `State` extractor. Everything inside is either a pool handle or behind an
/// `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: sqlx::SqlitePool,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Password hashing and token signing, keyed by `auth.jwt_secret`.
    pub credentials: Arc<Credentials>,
    /// Process-wide event counters.
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let credentials = Credentials::new(&config.auth);
        Self {
            db,
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            metrics: Metrics::new(),
        }
    }
}
