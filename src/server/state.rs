//! Shared state handed to every request handler.

use std::sync::Arc;

use crate::config::DaemonConfig;
use crate::pipeline::Pipeline;
use crate::resolve::Resolver;

/// State shared across all request handlers.
///
/// Cloning is cheap; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Source resolver with its descriptor cache.
    pub resolver: Resolver,
    /// Audio processing pipeline.
    pub pipeline: Pipeline,
    /// Daemon configuration.
    pub config: Arc<DaemonConfig>,
}

impl AppState {
    /// Creates state from explicit components.
    pub fn new(resolver: Resolver, pipeline: Pipeline, config: DaemonConfig) -> Self {
        Self {
            resolver,
            pipeline,
            config: Arc::new(config),
        }
    }

    /// Creates production state: yt-dlp resolution and the ffmpeg pipeline.
    pub fn from_config(config: DaemonConfig) -> Self {
        Self::new(
            Resolver::from_config(&config),
            Pipeline::from_config(&config),
            config,
        )
    }
}
