use std::collections::{HashMap, VecDeque};
use crate::types::ThumbnailImage;

/// パス -> サムネイルのメモリキャッシュ
/// max_size が None なら無制限（エビクションなし）
pub struct ThumbnailMemoryCache {
    cache: HashMap<String, ThumbnailImage>,
    order: VecDeque<String>, // LRU順序（先頭が最も古い）
    max_size: Option<usize>,
}

impl ThumbnailMemoryCache {
    pub fn new(max_size: Option<usize>) -> Self {
        Self {
            cache: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<ThumbnailImage> {
        let value = self.cache.get(key)?.clone();
        if self.max_size.is_some() {
            // アクセスされたキーを末尾に移動（LRU更新）
            self.order.retain(|k| k != key);
            self.order.push_back(key.to_string());
        }
        Some(value)
    }

    pub fn insert(&mut self, key: String, value: ThumbnailImage) {
        if let Some(max_size) = self.max_size {
            if self.cache.contains_key(&key) {
                self.order.retain(|k| k != &key);
            } else if self.cache.len() >= max_size {
                // 満杯なら最も古いものを削除
                if let Some(oldest) = self.order.pop_front() {
                    self.cache.remove(&oldest);
                }
            }
            self.order.push_back(key.clone());
        }
        self.cache.insert(key, value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: u8) -> ThumbnailImage {
        ThumbnailImage::new(vec![tag], 1, 1)
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = ThumbnailMemoryCache::new(Some(2));
        cache.insert("a".into(), image(1));
        cache.insert("b".into(), image(2));

        // "a" を参照すると "b" が最古になる
        assert_eq!(cache.get("a"), Some(image(1)));
        cache.insert("c".into(), image(3));

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn reinserting_does_not_evict() {
        let mut cache = ThumbnailMemoryCache::new(Some(2));
        cache.insert("a".into(), image(1));
        cache.insert("b".into(), image(2));
        cache.insert("a".into(), image(9));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(image(9)));
    }

    #[test]
    fn unbounded_keeps_everything_until_clear() {
        let mut cache = ThumbnailMemoryCache::new(None);
        for i in 0..100u8 {
            cache.insert(format!("model-{}", i), image(i));
        }
        assert_eq!(cache.len(), 100);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("model-0"), None);
    }
}
