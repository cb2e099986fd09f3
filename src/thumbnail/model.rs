use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tracing::debug;
use crate::constants::{BACKGROUND_COLOR, MODEL_COLOR};
use crate::error::{GalleryError, Result};
use crate::glb::inspect_glb;
use crate::render::{Aabb, Camera, RenderSession, RenderTracker};
use crate::types::{ModelFile, ThumbnailImage};
use super::ThumbnailGenerator;

/// GLBモデルをオフスクリーン描画してサムネイルを作る
#[derive(Debug, Clone)]
pub struct ModelThumbnailer {
    size: u32,
    tracker: RenderTracker,
}

impl ModelThumbnailer {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            tracker: RenderTracker::default(),
        }
    }

    /// 解放されていないレンダーターゲット数
    pub fn live_render_targets(&self) -> usize {
        self.tracker.live()
    }
}

#[async_trait]
impl ThumbnailGenerator for ModelThumbnailer {
    async fn generate(&self, file: &ModelFile) -> Result<ThumbnailImage> {
        let path = PathBuf::from(&file.path);
        let data = tokio::fs::read(&path).await?;
        let size = self.size;
        let tracker = self.tracker.clone();

        // ラスタライズはCPU処理なのでブロッキングスレッドで
        tokio::task::spawn_blocking(move || render_model_thumbnail(&path, &data, size, &tracker))
            .await?
    }
}

/// 描画ターゲットを確保してからモデルを読むので、読み込み失敗時も
/// ターゲットは Drop で解放される
pub fn render_model_thumbnail(
    path: &Path,
    data: &[u8],
    size: u32,
    tracker: &RenderTracker,
) -> Result<ThumbnailImage> {
    let mut session = RenderSession::new(size, size, tracker)?;
    session.clear(BACKGROUND_COLOR);

    let info = inspect_glb(path, data)?;
    let bounds = info.bounds.unwrap_or_else(Aabb::unit).fit_to_view();
    let camera = Camera::frame(&bounds);

    let faces = session.draw_box(&bounds, &camera, MODEL_COLOR);
    if faces == 0 {
        return Err(GalleryError::Render(format!(
            "モデルが視野に入りません: {}",
            path.display()
        )));
    }
    debug!(path = %path.display(), meshes = info.mesh_count, faces, "サムネイル描画完了");

    session.finish()
}
