mod model;

pub use model::{render_model_thumbnail, ModelThumbnailer};

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{ModelFile, ThumbnailImage};

/// サムネイル生成の境界（実際の描画はここに閉じ込める）
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, file: &ModelFile) -> Result<ThumbnailImage>;
}
