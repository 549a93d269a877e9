//! # Photon 派生画像キャッシュ
//!
//! メモリティア（LRU）とディスクティアを単一のget/set/clearインターフェースの
//! 背後に束ねる2層キャッシュ。キーは`(photo_id, size, format, edit_version)`の
//! 複合であり、画像の編集は新しい`edit_version`すなわち新しいキーを生むため、
//! 無効化はキー構造によって行われる（パターン削除操作は存在しない）。
//!
//! ティアの状態はプロセスローカルである。複数インスタンスが同一キーに対して
//! 異なるバイト列をTTL満了まで保持しうるが、エントリは書き込み後不変なので
//! これは許容される鮮度の問題であり、正しさの問題ではない。

mod disk;
mod key;
mod memory;

use std::time::Duration;

pub use disk::DiskTier;
pub use key::CacheKey;
pub use memory::MemoryTier;

/// ティアごとの統計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    pub entries: u64,
    pub bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// 2層キャッシュのコーディネータ。
///
/// TTLはティアごとに独立で、通常はメモリ側を短くする（ティアのコスト
/// 非対称性を反映）。同一キーへの同時ミスは両方が永続ストレージを読み
/// 両方が書き込むことがあるが、同一バイト列の冪等な上書きであり安全。
pub struct CacheCoordinator {
    memory: MemoryTier,
    disk: DiskTier,
    memory_ttl: Duration,
    disk_ttl: Duration,
}

impl CacheCoordinator {
    pub fn new(
        memory: MemoryTier,
        disk: DiskTier,
        memory_ttl: Duration,
        disk_ttl: Duration,
    ) -> Self {
        Self {
            memory,
            disk,
            memory_ttl,
            disk_ttl,
        }
    }

    /// メモリ→ディスクの順に探す。ディスクヒット時はメモリへ昇格させ、
    /// 以後の読み取りがディスクに触れないようにする。
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let rendered = key.render();

        if let Some(bytes) = self.memory.get(&rendered) {
            tracing::debug!(key = %rendered, tier = "memory", "キャッシュヒット");
            return Some(bytes);
        }

        if let Some(bytes) = self.disk.get(&rendered).await {
            tracing::debug!(key = %rendered, tier = "disk", "キャッシュヒット（メモリへ昇格）");
            self.memory.set(&rendered, bytes.clone(), self.memory_ttl);
            return Some(bytes);
        }

        None
    }

    /// 両ティアへ書き込む。TTLはティアごとに独立。
    /// メモリ側は同期なので先に確定させ、ディスクI/Oの完了を
    /// 待っている間も高速ティアから読めるようにする。
    pub async fn set(&self, key: &CacheKey, bytes: Vec<u8>) {
        let rendered = key.render();
        self.memory.set(&rendered, bytes.clone(), self.memory_ttl);
        self.disk.set(&rendered, &bytes, self.disk_ttl).await;
    }

    /// 両ティアを空にし、統計カウンタをリセットする。
    pub async fn clear(&self) -> std::io::Result<()> {
        self.memory.clear();
        self.disk.clear().await
    }

    pub fn memory_stats(&self) -> TierStats {
        self.memory.stats()
    }

    pub async fn disk_stats(&self) -> TierStats {
        self.disk.stats().await
    }
}
