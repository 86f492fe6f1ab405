use crate::{
    config::AppConfig,
    services::{
        generation::GenerationBackend, image_service::ImageValidator,
        storage_service::AssetStore,
    },
};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: AssetStore,
    pub validator: ImageValidator,
    pub backend: Arc<dyn GenerationBackend>,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            store: AssetStore::new(config.storage_dir.clone()),
            validator: ImageValidator::new(config.max_file_size),
            config: Arc::new(config),
            backend,
        }
    }
}
