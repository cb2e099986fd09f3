use std::sync::Arc;
use base64::Engine;
use serde::Serialize;
use super::ModelFile;

/// 生成済みサムネイル（PNGバイト列は共有されるのでcloneは安価）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailImage {
    pub png: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

impl ThumbnailImage {
    pub fn new(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            png: png.into(),
            width,
            height,
        }
    }

    /// `<img src>` にそのまま渡せる data URL
    pub fn data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

// グリッドセルに表示するサムネイルの状態
#[derive(Debug, Clone)]
pub enum ThumbnailState {
    Ready(ThumbnailImage),
    Failed {
        reason: String,
        placeholder: ThumbnailImage,
    },
}

impl ThumbnailState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

// グリッドの1セル
#[derive(Debug, Clone)]
pub struct GalleryItem {
    pub file: ModelFile,
    pub size_label: String,
    pub date_label: String,
    pub thumbnail: ThumbnailState,
}

// ギャラリー統計
#[derive(Debug, Clone, Serialize)]
pub struct GalleryStats {
    pub total_models: usize,
    pub loaded_thumbnails: usize,
    pub pending_thumbnails: usize,
}
