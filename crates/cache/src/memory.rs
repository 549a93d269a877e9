//! # メモリティア
//!
//! エントリ数・総バイト数の両方で上限を持つLRUキャッシュ。
//! TTLはエントリごとに保持し、読み取り時に遅延評価する
//! （期限切れエントリはミスとして扱い、その場で追い出す）。

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::TierStats;

struct MemoryEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

struct MemoryInner {
    entries: LruCache<String, MemoryEntry>,
    total_bytes: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// プロセス内LRUキャッシュティア。
pub struct MemoryTier {
    inner: Mutex<MemoryInner>,
    max_bytes: u64,
}

impl MemoryTier {
    /// エントリ数上限とバイト数上限を指定して構築する。
    pub fn new(max_entries: usize, max_bytes: u64) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(MemoryInner {
                entries: LruCache::new(cap),
                total_bytes: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_bytes,
        }
    }

    /// キーに対応するバイト列を返す。期限切れはミスとして扱い追い出す。
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired = match inner.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                inner.hits += 1;
                return Some(entry.bytes.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some(old) = inner.entries.pop(key) {
                inner.total_bytes -= old.bytes.len() as u64;
                inner.evictions += 1;
            }
        }
        inner.misses += 1;
        None
    }

    /// キーへバイト列を書き込む。同一キーへの再書き込みは上書き。
    /// バイト数上限を超える間はLRU順に追い出す。
    pub fn set(&self, key: &str, bytes: Vec<u8>, ttl: Duration) {
        // 単独で上限を超えるエントリはキャッシュしない
        if bytes.len() as u64 > self.max_bytes {
            return;
        }

        let mut inner = self.inner.lock();
        let entry = MemoryEntry {
            bytes,
            expires_at: Instant::now() + ttl,
        };
        let added = entry.bytes.len() as u64;

        // pushは同一キーなら旧値を、容量到達ならLRUエントリを返す
        if let Some((evicted_key, evicted)) = inner.entries.push(key.to_string(), entry) {
            inner.total_bytes -= evicted.bytes.len() as u64;
            if evicted_key != key {
                inner.evictions += 1;
            }
        }
        inner.total_bytes += added;

        while inner.total_bytes > self.max_bytes {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.total_bytes -= evicted.bytes.len() as u64;
                    inner.evictions += 1;
                }
                None => break,
            }
        }
    }

    /// 指定キーを削除する。
    pub fn invalidate(&self, key: &str) {
        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.pop(key) {
            inner.total_bytes -= old.bytes.len() as u64;
        }
    }

    /// 全エントリを削除し、統計カウンタをリセットする。
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_bytes = 0;
        inner.hits = 0;
        inner.misses = 0;
        inner.evictions = 0;
    }

    pub fn stats(&self) -> TierStats {
        let inner = self.inner.lock();
        TierStats {
            entries: inner.entries.len() as u64,
            bytes: inner.total_bytes,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ヒット・ミスが統計に反映されることを確認
    #[test]
    fn test_hit_miss_counters() {
        let tier = MemoryTier::new(8, 1024);
        tier.set("k1", vec![1, 2, 3], Duration::from_secs(60));

        assert_eq!(tier.get("k1"), Some(vec![1, 2, 3]));
        assert_eq!(tier.get("nope"), None);

        let stats = tier.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    /// TTL切れのエントリがミスとなり追い出されることを確認
    #[test]
    fn test_lazy_ttl_expiry() {
        let tier = MemoryTier::new(8, 1024);
        tier.set("k1", vec![1], Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(tier.get("k1"), None);

        let stats = tier.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.misses, 1);
    }

    /// エントリ数上限到達でLRU順に追い出されることを確認
    #[test]
    fn test_entry_cap_lru_eviction() {
        let tier = MemoryTier::new(2, 1024);
        tier.set("a", vec![1], Duration::from_secs(60));
        tier.set("b", vec![2], Duration::from_secs(60));

        // aをタッチしてbを最古にする
        assert!(tier.get("a").is_some());
        tier.set("c", vec![3], Duration::from_secs(60));

        assert!(tier.get("b").is_none(), "最古のbが追い出されるべき");
        assert!(tier.get("a").is_some());
        assert!(tier.get("c").is_some());
        assert_eq!(tier.stats().evictions, 1);
    }

    /// バイト数上限を超えた場合の追い出しを確認
    #[test]
    fn test_byte_budget_eviction() {
        let tier = MemoryTier::new(16, 10);
        tier.set("a", vec![0; 6], Duration::from_secs(60));
        tier.set("b", vec![0; 6], Duration::from_secs(60));

        // 6 + 6 > 10 のためaが追い出される
        assert!(tier.get("a").is_none());
        assert!(tier.get("b").is_some());
        assert_eq!(tier.stats().bytes, 6);
    }

    /// 上限を単独で超えるエントリは書き込まれないことを確認
    #[test]
    fn test_oversized_entry_skipped() {
        let tier = MemoryTier::new(16, 10);
        tier.set("big", vec![0; 11], Duration::from_secs(60));
        assert_eq!(tier.stats().entries, 0);
    }

    /// 同一キーへの上書きでバイト集計が壊れないことを確認
    #[test]
    fn test_overwrite_same_key() {
        let tier = MemoryTier::new(4, 100);
        tier.set("k", vec![0; 10], Duration::from_secs(60));
        tier.set("k", vec![0; 4], Duration::from_secs(60));

        let stats = tier.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.bytes, 4);
        // 同一キーの上書きは追い出しではない
        assert_eq!(stats.evictions, 0);
    }

    /// clearで統計もリセットされることを確認
    #[test]
    fn test_clear_resets_stats() {
        let tier = MemoryTier::new(4, 100);
        tier.set("k", vec![1], Duration::from_secs(60));
        let _ = tier.get("k");
        tier.clear();

        let stats = tier.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.bytes, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
