use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Store::connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { store, config })
    }
}
