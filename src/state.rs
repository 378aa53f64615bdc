//! Shared application state for all routes.

use crate::config::{inventory_config, load_from_path, resolve, ResolvedModel};
use crate::error::AppError;
use crate::migration::apply_migrations;
use crate::settings::Settings;
use crate::store::connect;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    /// Resolved once at startup; read-only afterwards.
    pub model: Arc<ResolvedModel>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pool: SqlitePool, model: ResolvedModel, settings: Settings) -> Self {
        AppState {
            pool,
            model: Arc::new(model),
            settings: Arc::new(settings),
        }
    }

    /// Connect, resolve the configuration (`CONFIG_PATH` or the embedded inventory schema) and apply the schema.
    pub async fn init(settings: Settings) -> Result<Self, AppError> {
        let config = match &settings.config_path {
            Some(path) => load_from_path(path).await?,
            None => inventory_config()?,
        };
        let model = resolve(&config)?;
        let pool = connect(&settings.database_url, settings.max_connections).await?;
        apply_migrations(&pool, &model).await?;
        tracing::info!(views = model.views.len(), "admin model ready");
        Ok(AppState::new(pool, model, settings))
    }
}
