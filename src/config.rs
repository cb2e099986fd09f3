use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::cache::DiskCache;
use crate::constants::{BATCH_PAUSE_MS, BATCH_SIZE, MAX_THUMBNAIL_SIZE, MIN_THUMBNAIL_SIZE, THUMBNAIL_SIZE};
use crate::error::{GalleryError, Result};

/// 設定（未指定の項目は既定値）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub models_dir: PathBuf,
    pub recursive: bool,
    pub thumbnail_size: u32,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    /// None ならメモリキャッシュは無制限
    pub cache_capacity: Option<usize>,
    pub disk_cache_dir: Option<PathBuf>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("."),
            recursive: false,
            thumbnail_size: THUMBNAIL_SIZE,
            batch_size: BATCH_SIZE,
            batch_pause_ms: BATCH_PAUSE_MS,
            cache_capacity: None,
            disk_cache_dir: None,
        }
    }
}

impl GalleryConfig {
    // 設定ファイルの場所
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("glb-gallery").join("config.json"))
    }

    /// 設定ファイルがなければ既定値
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| GalleryError::json(path.display().to_string(), e))?;
        config.validate()?;
        debug!(path = %path.display(), "設定を読み込み");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(GalleryError::Config("batch_size は1以上".to_string()));
        }
        if !(MIN_THUMBNAIL_SIZE..=MAX_THUMBNAIL_SIZE).contains(&self.thumbnail_size) {
            return Err(GalleryError::Config(format!(
                "thumbnail_size は {}..={} の範囲: {}",
                MIN_THUMBNAIL_SIZE, MAX_THUMBNAIL_SIZE, self.thumbnail_size
            )));
        }
        if self.cache_capacity == Some(0) {
            return Err(GalleryError::Config("cache_capacity は1以上".to_string()));
        }
        Ok(())
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn disk_cache_dir(&self) -> PathBuf {
        self.disk_cache_dir.clone().unwrap_or_else(DiskCache::default_dir)
    }
}
