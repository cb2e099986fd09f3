use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use crate::error::{GalleryError, Result};
use crate::thumbnail::ThumbnailGenerator;
use crate::types::{ModelFile, ThumbnailImage};
use super::ThumbnailMemoryCache;

type Outcome = std::result::Result<ThumbnailImage, Arc<GalleryError>>;

// 生成中のパス（同じパスの呼び出し元はこの receiver で完了を待つ）
struct Pending {
    epoch: u64,
    done: watch::Receiver<Option<Outcome>>,
}

struct Inner {
    entries: ThumbnailMemoryCache,
    pending: HashMap<String, Pending>,
    // clear() のたびに進める。古い世代の生成結果は保存しない
    epoch: u64,
}

/// パスをキーにしたサムネイルキャッシュ（single-flight）
///
/// 同じパスへの同時要求は1回の生成を共有する。生成は呼び出し元とは独立した
/// タスクで走るので、呼び出し元が途中でいなくなっても最後まで完了する。
/// 生成失敗はキャッシュせず、次回の要求で再試行される。
pub struct ThumbnailCache {
    inner: Arc<Mutex<Inner>>,
    generator: Arc<dyn ThumbnailGenerator>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("パニック")
}

impl ThumbnailCache {
    pub fn new(generator: Arc<dyn ThumbnailGenerator>, capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: ThumbnailMemoryCache::new(capacity),
                pending: HashMap::new(),
                epoch: 0,
            })),
            generator,
        }
    }

    /// キャッシュ済みならそれを返し、未生成なら生成する。生成中なら完了を待つ。
    /// tokio ランタイム上で呼ぶこと
    pub async fn get_or_generate(&self, file: &ModelFile) -> Result<ThumbnailImage> {
        let mut done = {
            let mut inner = lock(&self.inner);
            if let Some(image) = inner.entries.get(&file.path) {
                debug!(path = %file.path, "サムネイルキャッシュヒット");
                return Ok(image);
            }
            let in_flight = inner.pending.get(&file.path).map(|p| p.done.clone());
            match in_flight {
                Some(done) => {
                    debug!(path = %file.path, "生成中のサムネイルを待機");
                    done
                }
                None => self.start(&mut inner, file),
            }
        };

        let outcome = match done.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };

        match outcome {
            Some(Ok(image)) => Ok(image),
            Some(Err(e)) => Err(GalleryError::Shared(e)),
            None => Err(GalleryError::GenerationAborted(file.path.clone())),
        }
    }

    // ロックを保持したまま呼ぶ
    fn start(&self, inner: &mut Inner, file: &ModelFile) -> watch::Receiver<Option<Outcome>> {
        let (tx, rx) = watch::channel(None);
        let epoch = inner.epoch;
        inner.pending.insert(
            file.path.clone(),
            Pending {
                epoch,
                done: rx.clone(),
            },
        );

        let shared = Arc::clone(&self.inner);
        let generator = Arc::clone(&self.generator);
        let file = file.clone();

        tokio::spawn(async move {
            debug!(path = %file.path, "サムネイル生成開始");
            // パニックしても生成中の印を必ず外せるよう、エラーとして扱う
            let result = match AssertUnwindSafe(generator.generate(&file)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(GalleryError::GenerationAborted(format!(
                    "{}: {}",
                    file.path,
                    panic_message(panic.as_ref())
                ))),
            }
            .map_err(Arc::new);

            {
                let mut inner = lock(&shared);
                if inner.epoch == epoch {
                    if let Ok(image) = &result {
                        inner.entries.insert(file.path.clone(), image.clone());
                    }
                }
                // clear() 後に同じパスで始まった生成の印は消さない
                if inner.pending.get(&file.path).is_some_and(|p| p.epoch == epoch) {
                    inner.pending.remove(&file.path);
                }
            }

            match &result {
                Ok(image) => info!(path = %file.path, bytes = image.png.len(), "サムネイル生成完了"),
                Err(e) => warn!(path = %file.path, error = %e, "サムネイル生成エラー"),
            }
            tx.send_replace(Some(result));
        });

        rx
    }

    pub fn contains(&self, path: &str) -> bool {
        lock(&self.inner).entries.contains(path)
    }

    pub fn is_pending(&self, path: &str) -> bool {
        lock(&self.inner).pending.contains_key(path)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.inner).pending.len()
    }

    /// 保存済みのサムネイルと生成中の印をすべて破棄する
    /// 実行中の生成は止めないが、その結果は保存されない
    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        let (entries, pending) = (inner.entries.len(), inner.pending.len());
        inner.entries.clear();
        inner.pending.clear();
        inner.epoch += 1;
        info!(entries, pending, "サムネイルキャッシュをクリア");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// 呼び出し回数を数える生成器。gate があれば notify されるまで完了しない
    struct FakeGenerator {
        calls: AtomicUsize,
        gate: Option<Notify>,
        fail: bool,
    }

    impl FakeGenerator {
        fn new() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), gate: None, fail: false })
        }

        fn gated() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), gate: Some(Notify::new()), fail: false })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), gate: None, fail: true })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }
    }

    #[async_trait]
    impl ThumbnailGenerator for FakeGenerator {
        async fn generate(&self, file: &ModelFile) -> Result<ThumbnailImage> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(GalleryError::invalid_glb(&file.path, "magic"));
            }
            Ok(ThumbnailImage::new(vec![call as u8], 256, 256))
        }
    }

    fn model(path: &str) -> ModelFile {
        ModelFile {
            name: path.to_string(),
            display_name: path.to_string(),
            path: path.to_string(),
            size: 0,
            file_type: "glb".to_string(),
            modified_time: 0,
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        while !condition() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn second_request_returns_stored_result() {
        let generator = FakeGenerator::new();
        let cache = ThumbnailCache::new(generator.clone(), None);
        let file = model("./a.glb");

        let first = cache.get_or_generate(&file).await.unwrap();
        let second = cache.get_or_generate(&file).await.unwrap();

        assert!(Arc::ptr_eq(&first.png, &second.png));
        assert_eq!(generator.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_generation() {
        let generator = FakeGenerator::gated();
        let cache = Arc::new(ThumbnailCache::new(generator.clone(), None));
        let file = model("./a.glb");

        let requests: Vec<_> = (0..2)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let file = file.clone();
                tokio::spawn(async move { cache.get_or_generate(&file).await })
            })
            .collect();

        wait_until(|| generator.calls() == 1).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(cache.is_pending(&file.path));
        generator.release();

        let mut images = Vec::new();
        for request in requests {
            images.push(request.await.unwrap().unwrap());
        }

        assert_eq!(generator.calls(), 1);
        assert!(Arc::ptr_eq(&images[0].png, &images[1].png));
    }

    #[tokio::test]
    async fn pending_only_while_generating() {
        let generator = FakeGenerator::gated();
        let cache = Arc::new(ThumbnailCache::new(generator.clone(), None));
        let file = model("./a.glb");
        assert!(!cache.is_pending(&file.path));

        let request = {
            let cache = Arc::clone(&cache);
            let file = file.clone();
            tokio::spawn(async move { cache.get_or_generate(&file).await })
        };

        wait_until(|| cache.is_pending(&file.path)).await;
        assert!(!cache.contains(&file.path));
        generator.release();

        request.await.unwrap().unwrap();
        assert!(!cache.is_pending(&file.path));
        assert!(cache.contains(&file.path));
    }

    #[tokio::test]
    async fn failure_is_not_cached_and_can_be_retried() {
        let generator = FakeGenerator::failing();
        let cache = ThumbnailCache::new(generator.clone(), None);
        let file = model("./broken.glb");

        let err = cache.get_or_generate(&file).await.unwrap_err();
        assert!(matches!(err, GalleryError::Shared(_)));
        assert!(!cache.is_pending(&file.path));
        assert!(!cache.contains(&file.path));

        assert!(cache.get_or_generate(&file).await.is_err());
        assert_eq!(generator.calls(), 2);
    }

    /// 1回目だけパニックする生成器
    struct PanicOnceGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ThumbnailGenerator for PanicOnceGenerator {
        async fn generate(&self, _file: &ModelFile) -> Result<ThumbnailImage> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("レンダラー初期化失敗");
            }
            Ok(ThumbnailImage::new(vec![1], 256, 256))
        }
    }

    #[tokio::test]
    async fn panicking_generation_does_not_lock_the_path() {
        let generator = Arc::new(PanicOnceGenerator { calls: AtomicUsize::new(0) });
        let cache = ThumbnailCache::new(generator.clone(), None);
        let file = model("./a.glb");

        let err = cache.get_or_generate(&file).await.unwrap_err();
        assert!(err.to_string().contains("レンダラー初期化失敗"));
        assert!(!cache.is_pending(&file.path));
        assert!(!cache.contains(&file.path));

        // 次の要求で再生成される
        cache.get_or_generate(&file).await.unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains(&file.path));
    }

    #[tokio::test]
    async fn clear_forces_regeneration() {
        let generator = FakeGenerator::new();
        let cache = ThumbnailCache::new(generator.clone(), None);
        let file = model("./a.glb");

        cache.get_or_generate(&file).await.unwrap();
        cache.clear();
        assert!(cache.is_empty());

        cache.get_or_generate(&file).await.unwrap();
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn generation_started_before_clear_is_not_stored() {
        let generator = FakeGenerator::gated();
        let cache = Arc::new(ThumbnailCache::new(generator.clone(), None));
        let file = model("./a.glb");

        let request = {
            let cache = Arc::clone(&cache);
            let file = file.clone();
            tokio::spawn(async move { cache.get_or_generate(&file).await })
        };
        wait_until(|| generator.calls() == 1).await;

        cache.clear();
        assert!(!cache.is_pending(&file.path));
        generator.release();

        // 待っていた呼び出し元には結果が届く
        assert!(request.await.unwrap().is_ok());
        assert!(!cache.contains(&file.path));
    }

    #[tokio::test]
    async fn bounded_cache_evicts_oldest() {
        let generator = FakeGenerator::new();
        let cache = ThumbnailCache::new(generator.clone(), Some(2));

        for path in ["./a.glb", "./b.glb", "./c.glb"] {
            cache.get_or_generate(&model(path)).await.unwrap();
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains("./a.glb"));

        cache.get_or_generate(&model("./a.glb")).await.unwrap();
        assert_eq!(generator.calls(), 4);
    }
}
