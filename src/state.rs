use std::sync::Arc;
use tracing::info;
use crate::cache::ThumbnailCache;
use crate::config::GalleryConfig;
use crate::error::Result;
use crate::files::FileManager;
use crate::gallery::Gallery;
use crate::thumbnail::{ModelThumbnailer, ThumbnailGenerator};
use crate::types::GalleryStats;

// アプリケーション状態（起動時に一度だけ組み立てて各処理に渡す）
pub struct AppState {
    pub config: GalleryConfig,
    pub files: FileManager,
    pub thumbnails: Arc<ThumbnailCache>,
    pub gallery: Gallery,
}

impl AppState {
    pub fn new(
        config: GalleryConfig,
        files: FileManager,
        generator: Arc<dyn ThumbnailGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let thumbnails = Arc::new(ThumbnailCache::new(generator, config.cache_capacity));
        let gallery = Gallery::new(
            Arc::clone(&thumbnails),
            config.batch_size,
            config.batch_pause(),
            config.thumbnail_size,
        )?;

        Ok(Self {
            config,
            files,
            thumbnails,
            gallery,
        })
    }

    /// models_dir を走査し、GLB描画によるサムネイル生成器で組み立てる
    pub fn from_config(config: GalleryConfig) -> Result<Self> {
        let files = FileManager::scan(&config.models_dir, config.recursive)?;
        info!(dir = %config.models_dir.display(), models = files.len(), "モデルを読み込み");
        let generator = Arc::new(ModelThumbnailer::new(config.thumbnail_size));
        Self::new(config, files, generator)
    }

    pub fn stats(&self) -> GalleryStats {
        GalleryStats {
            total_models: self.files.len(),
            loaded_thumbnails: self.thumbnails.len(),
            pending_thumbnails: self.thumbnails.pending_len(),
        }
    }
}
