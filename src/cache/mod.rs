use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub mod performance_monitor;
pub use performance_monitor::{CachePerformanceMonitor, CachePerformanceReport};

/// 进程内记忆化缓存，按分类统计命中情况。
///
/// 只缓存成功结果；条目在进程生命周期内一直保留。
/// 同一个键同时只有一次来源调用在进行，其余调用方等待它的结果。
pub struct MemoCache<K, V>
where
    K: Eq + Hash,
{
    category: &'static str,
    entries: DashMap<K, V>,
    in_flight: DashMap<K, Arc<OnceCell<V>>>,
    performance_monitor: CachePerformanceMonitor,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(category: &'static str, performance_monitor: CachePerformanceMonitor) -> Self {
        Self {
            category,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            performance_monitor,
        }
    }

    /// 获取缓存
    pub fn get(&self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) => {
                self.performance_monitor.record_cache_hit(self.category);
                Some(entry.value().clone())
            }
            None => {
                self.performance_monitor.record_cache_miss(self.category);
                None
            }
        }
    }

    /// 设置缓存
    pub fn set(&self, key: K, value: V) {
        self.entries.insert(key, value);
        self.performance_monitor.record_cache_write(self.category);
    }

    /// 命中时直接返回，未命中时调用 `init`；并发的相同键共享同一次调用。
    ///
    /// `init` 失败时不写缓存，也不保留进行中的记录，之后的调用会重新尝试。
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        K: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(cached) = self.get(&key) {
            return Ok(cached);
        }

        let cell = self.in_flight.entry(key.clone()).or_default().clone();
        // 拿到 cell 之前上一次调用可能刚好完成
        if let Some(entry) = self.entries.get(&key) {
            return Ok(entry.value().clone());
        }

        let mut initialized_here = false;
        let result = cell
            .get_or_try_init(|| {
                initialized_here = true;
                init()
            })
            .await
            .cloned();

        if initialized_here {
            if let Ok(value) = &result {
                self.set(key.clone(), value.clone());
            }
            self.in_flight
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell));
        }
        result
    }

    /// 记录一次未写入缓存的来源失败
    pub fn record_error(&self, error: &str) {
        self.performance_monitor
            .record_cache_error(self.category, error);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_cache_hit_and_miss() {
        let monitor = CachePerformanceMonitor::new();
        let cache: MemoCache<(String, u8), String> = MemoCache::new("test", monitor.clone());

        assert!(cache.get(&("hello".to_string(), 1)).is_none());
        cache.set(("hello".to_string(), 1), "hola".to_string());
        assert_eq!(
            cache.get(&("hello".to_string(), 1)),
            Some("hola".to_string())
        );
        assert!(cache.get(&("hello".to_string(), 2)).is_none());
        assert_eq!(cache.len(), 1);

        let report = monitor.generate_report();
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.cache_misses, 2);
        assert_eq!(report.cache_writes, 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_call() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::time::Duration;

        let cache: MemoCache<String, String> =
            MemoCache::new("test", CachePerformanceMonitor::new());
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let load = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, String>("value".to_string())
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_try_insert_with("key".to_string(), load),
            cache.get_or_try_insert_with("key".to_string(), load),
            cache.get_or_try_insert_with("key".to_string(), load),
        );
        assert_eq!(a.unwrap(), "value");
        assert_eq!(b.unwrap(), "value");
        assert_eq!(c.unwrap(), "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_failed_init_is_not_cached() {
        let cache: MemoCache<String, String> =
            MemoCache::new("test", CachePerformanceMonitor::new());

        let failed = cache
            .get_or_try_insert_with("key".to_string(), || async { Err::<String, _>("down") })
            .await;
        assert_eq!(failed, Err("down"));
        assert!(cache.is_empty());
        assert!(cache.in_flight.is_empty());

        let retried = cache
            .get_or_try_insert_with("key".to_string(), || async { Ok::<_, &str>("up".to_string()) })
            .await;
        assert_eq!(retried, Ok("up".to_string()));
    }
}
