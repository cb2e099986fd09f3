use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use crate::cache::ThumbnailCache;
use crate::constants::ERROR_COLOR;
use crate::error::Result;
use crate::files::{format_date, format_file_size};
use crate::render::placeholder_tile;
use crate::types::{GalleryItem, ModelFile, ThumbnailImage, ThumbnailState};

/// グリッドへの追加先
pub trait GridSink {
    fn push(&mut self, item: GalleryItem);
}

impl GridSink for Vec<GalleryItem> {
    fn push(&mut self, item: GalleryItem) {
        Vec::push(self, item);
    }
}

// 読み込み結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub batches: usize,
    pub ready: usize,
    pub failed: usize,
}

/// サムネイルをバッチ単位で読み込んでグリッドに並べる
pub struct Gallery {
    cache: Arc<ThumbnailCache>,
    batch_size: usize,
    batch_pause: Duration,
    error_tile: ThumbnailImage,
}

impl Gallery {
    pub fn new(
        cache: Arc<ThumbnailCache>,
        batch_size: usize,
        batch_pause: Duration,
        tile_size: u32,
    ) -> Result<Self> {
        Ok(Self {
            cache,
            batch_size: batch_size.max(1),
            batch_pause,
            error_tile: placeholder_tile(tile_size, ERROR_COLOR)?,
        })
    }

    pub fn cache(&self) -> &Arc<ThumbnailCache> {
        &self.cache
    }

    /// batch_size 件ずつ並行に生成し、元の順序でグリッドに追加する
    /// バッチ間で batch_pause だけ待つ（最後のバッチの後は待たない）
    /// 個別の失敗はエラー用プレースホルダーとして追加し、読み込みは止めない
    pub async fn load<S>(&self, files: &[ModelFile], sink: &mut S) -> LoadReport
    where
        S: GridSink + ?Sized,
    {
        let mut report = LoadReport::default();

        for (index, batch) in files.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch_pause).await;
            }

            let results = join_all(batch.iter().map(|file| self.cache.get_or_generate(file))).await;

            for (file, result) in batch.iter().zip(results) {
                let thumbnail = match result {
                    Ok(image) => {
                        report.ready += 1;
                        ThumbnailState::Ready(image)
                    }
                    Err(e) => {
                        warn!(file = %file.name, error = %e, "サムネイル読み込みエラー");
                        report.failed += 1;
                        ThumbnailState::Failed {
                            reason: e.to_string(),
                            placeholder: self.error_tile.clone(),
                        }
                    }
                };

                sink.push(GalleryItem {
                    size_label: format_file_size(file.size),
                    date_label: format_date(file.modified_time),
                    file: file.clone(),
                    thumbnail,
                });
            }

            report.batches += 1;
            info!(batch = report.batches, size = batch.len(), "バッチ読み込み完了");
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;
    use crate::error::GalleryError;
    use crate::thumbnail::ThumbnailGenerator;

    struct StubGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ThumbnailGenerator for StubGenerator {
        async fn generate(&self, file: &ModelFile) -> Result<ThumbnailImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if file.name.starts_with("broken") {
                return Err(GalleryError::invalid_glb(&file.path, "マジックナンバー不一致"));
            }
            Ok(ThumbnailImage::new(file.name.clone().into_bytes(), 256, 256))
        }
    }

    /// 追加された時刻も記録するグリッド
    #[derive(Default)]
    struct TimedGrid {
        items: Vec<(Instant, GalleryItem)>,
    }

    impl GridSink for TimedGrid {
        fn push(&mut self, item: GalleryItem) {
            self.items.push((Instant::now(), item));
        }
    }

    fn models(names: &[&str]) -> Vec<ModelFile> {
        names
            .iter()
            .map(|name| ModelFile {
                name: name.to_string(),
                display_name: name.to_string(),
                path: format!("./{}", name),
                size: 2 * 1024 * 1024,
                file_type: "glb".to_string(),
                modified_time: 1_736_078_400_000,
            })
            .collect()
    }

    fn gallery(generator: Arc<StubGenerator>) -> Gallery {
        let cache = Arc::new(ThumbnailCache::new(generator, None));
        Gallery::new(cache, 6, Duration::from_millis(100), 32).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn seven_files_load_in_two_batches_in_order() {
        let generator = Arc::new(StubGenerator { calls: AtomicUsize::new(0) });
        let gallery = gallery(generator.clone());
        let files = models(&["a", "b", "c", "d", "e", "f", "g"]);

        let start = Instant::now();
        let mut grid = TimedGrid::default();
        let report = gallery.load(&files, &mut grid).await;

        assert_eq!(report, LoadReport { batches: 2, ready: 7, failed: 0 });
        assert_eq!(generator.calls.load(Ordering::SeqCst), 7);

        let names: Vec<_> = grid.items.iter().map(|(_, item)| item.file.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e", "f", "g"]);

        // 最初の6件は待ち時間なし、7件目はバッチ間の待機後
        let pause = Duration::from_millis(100);
        for (at, _) in &grid.items[..6] {
            assert!(*at - start < pause);
        }
        assert!(grid.items[6].0 - start >= pause);
        // 最後のバッチの後は待たない
        assert!(start.elapsed() < pause * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn single_batch_does_not_pause() {
        let generator = Arc::new(StubGenerator { calls: AtomicUsize::new(0) });
        let gallery = gallery(generator);
        let files = models(&["a", "b", "c"]);

        let start = Instant::now();
        let mut grid: Vec<GalleryItem> = Vec::new();
        let report = gallery.load(&files, &mut grid).await;

        assert_eq!(report.batches, 1);
        assert_eq!(grid.len(), 3);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn failures_become_placeholders() {
        let generator = Arc::new(StubGenerator { calls: AtomicUsize::new(0) });
        let gallery = gallery(generator);
        let files = models(&["ok", "broken", "fine"]);

        let mut grid: Vec<GalleryItem> = Vec::new();
        let report = gallery.load(&files, &mut grid).await;

        assert_eq!(report, LoadReport { batches: 1, ready: 2, failed: 1 });
        assert!(grid[0].thumbnail.is_ready());
        match &grid[1].thumbnail {
            ThumbnailState::Failed { reason, placeholder } => {
                assert!(reason.contains("マジックナンバー"));
                assert_eq!(placeholder.width, 32);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(grid[2].thumbnail.is_ready());
        assert_eq!(grid[0].size_label, "2.0 MB");
        assert_eq!(grid[0].date_label, "Jan 5, 2025");
    }

    #[tokio::test]
    async fn reload_uses_cached_thumbnails() {
        let generator = Arc::new(StubGenerator { calls: AtomicUsize::new(0) });
        let gallery = gallery(generator.clone());
        let files = models(&["a", "b"]);

        gallery.load(&files, &mut Vec::<GalleryItem>::new()).await;
        gallery.load(&files, &mut Vec::<GalleryItem>::new()).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

        gallery.cache().clear();
        gallery.load(&files, &mut Vec::<GalleryItem>::new()).await;
        assert_eq!(generator.calls.load(Ordering::SeqCst), 4);
    }
}
