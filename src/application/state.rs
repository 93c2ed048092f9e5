use std::sync::Arc;

use crate::application::pipeline::ThumbnailPipeline;
use crate::domain::ports::{ImageFetcher, ThumbnailGenerator};
use crate::infrastructure::placeholders::Placeholders;

/// Collaborators that vary between production and tests.
pub struct AppStateConfig {
    pub fetcher: Arc<dyn ImageFetcher>,
    pub generator: Arc<dyn ThumbnailGenerator>,
    pub placeholders: Placeholders,
    pub max_dimension: u32,
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ThumbnailPipeline>,
    pub placeholders: Placeholders,
}

impl AppState {
    pub fn new(config: AppStateConfig) -> Self {
        Self {
            pipeline: Arc::new(ThumbnailPipeline::new(
                config.fetcher,
                config.generator,
                config.max_dimension,
            )),
            placeholders: config.placeholders,
        }
    }
}
