use std::fs;
use std::path::PathBuf;
use serde::Serialize;
use tracing::debug;
use crate::error::Result;
use crate::types::{GalleryItem, ModelFile, ThumbnailImage, ThumbnailState};

// 書き出し状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailStatus {
    Cached,
    Generated,
}

/// 書き出し結果
#[derive(Debug, Clone, Serialize)]
pub struct StoredThumbnail {
    /// キャッシュキー（MD5ハッシュ）
    pub cache_key: String,
    /// キャッシュファイルの絶対パス
    pub cache_path: PathBuf,
    pub status: ThumbnailStatus,
}

// 生成できなかったモデル
#[derive(Debug, Clone, Serialize)]
pub struct FailedThumbnail {
    pub path: String,
    pub reason: String,
}

/// 書き出しのまとめ（成功分と失敗分）
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub stored: Vec<StoredThumbnail>,
    pub failed: Vec<FailedThumbnail>,
}

// サムネイルPNGの書き出し先ディレクトリ
pub struct DiskCache {
    pub cache_dir: PathBuf,
}

impl DiskCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glb-gallery")
            .join("thumbnails")
    }

    /// パス・更新日時・サイズが同じなら同じキー
    pub fn cache_key(file: &ModelFile, size: u32) -> String {
        let input = format!("{}:{}:{}:png", file.path, file.modified_time, size);
        format!("{:x}", md5::compute(input))
    }

    pub fn path_for(&self, file: &ModelFile, size: u32) -> PathBuf {
        self.cache_dir.join(format!("{}.png", Self::cache_key(file, size)))
    }

    /// 書き出し済みならそのパス
    pub fn lookup(&self, file: &ModelFile, size: u32) -> Option<StoredThumbnail> {
        let cache_path = self.path_for(file, size);
        cache_path.exists().then(|| StoredThumbnail {
            cache_key: Self::cache_key(file, size),
            cache_path,
            status: ThumbnailStatus::Cached,
        })
    }

    pub fn store(&self, file: &ModelFile, image: &ThumbnailImage) -> Result<StoredThumbnail> {
        let cache_path = self.path_for(file, image.width);
        fs::write(&cache_path, &image.png)?;
        debug!(path = %file.path, cache = %cache_path.display(), "サムネイルを書き出し");

        Ok(StoredThumbnail {
            cache_key: Self::cache_key(file, image.width),
            cache_path,
            status: ThumbnailStatus::Generated,
        })
    }

    /// 生成できたセルを書き出し、失敗したセルは理由と一緒に記録する
    pub fn store_items(&self, items: &[GalleryItem], report: &mut ExportReport) -> Result<()> {
        for item in items {
            match &item.thumbnail {
                ThumbnailState::Ready(image) => report.stored.push(self.store(&item.file, image)?),
                ThumbnailState::Failed { reason, .. } => report.failed.push(FailedThumbnail {
                    path: item.file.path.clone(),
                    reason: reason.clone(),
                }),
            }
        }
        Ok(())
    }
}
