//! # ディスクティア
//!
//! キーごとにblobファイルとJSONサイドカー（`{"expiresAt": epoch_ms, "size": bytes}`）
//! の2ファイルを永続化する。有効期限を過ぎた読み取りは両ファイルを即時削除し、
//! ミスとして数える。I/O障害はリクエストを失敗させず、警告ログの上でミス扱いとする。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TierStats;

/// blobファイルに併置されるメタデータサイドカー。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    /// 有効期限（epochミリ秒）
    expires_at: i64,
    /// blobのバイト数
    size: u64,
}

/// ファイルシステム上のキャッシュティア。
pub struct DiskTier {
    root: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl DiskTier {
    /// ルートディレクトリを作成して開く。
    pub async fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.bin"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// キーに対応するblobを返す。期限切れは両ファイルを削除してミスとする。
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let meta_bytes = match tokio::fs::read(self.meta_path(key)).await {
            Ok(bytes) => bytes,
            Err(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let sidecar: Sidecar = match serde_json::from_slice(&meta_bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key, error = %e, "破損したサイドカーを破棄します");
                self.remove_pair(key).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if photon_types::now_unix_millis() >= sidecar.expires_at {
            self.remove_pair(key).await;
            self.evictions.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match tokio::fs::read(self.blob_path(key)).await {
            Ok(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(bytes)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "blobの読み取りに失敗しました");
                self.remove_pair(key).await;
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// blobとサイドカーを書き込む。既存エントリは上書きされる。
    pub async fn set(&self, key: &str, bytes: &[u8], ttl: Duration) {
        let sidecar = Sidecar {
            expires_at: photon_types::now_unix_millis() + ttl.as_millis() as i64,
            size: bytes.len() as u64,
        };
        let meta = match serde_json::to_vec(&sidecar) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "サイドカーのシリアライズに失敗しました");
                return;
            }
        };

        if let Err(e) = tokio::fs::write(self.blob_path(key), bytes).await {
            tracing::warn!(key, error = %e, "blobの書き込みに失敗しました");
            return;
        }
        if let Err(e) = tokio::fs::write(self.meta_path(key), meta).await {
            tracing::warn!(key, error = %e, "サイドカーの書き込みに失敗しました");
            // サイドカーのないblobは読み取り不能なので掃除する
            let _ = tokio::fs::remove_file(self.blob_path(key)).await;
        }
    }

    /// 指定キーのエントリを削除する。
    pub async fn invalidate(&self, key: &str) {
        self.remove_pair(key).await;
    }

    /// 全エントリを削除し、統計カウンタをリセットする。
    pub async fn clear(&self) -> std::io::Result<()> {
        tokio::fs::remove_dir_all(&self.root).await?;
        tokio::fs::create_dir_all(&self.root).await?;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// ディレクトリを走査してエントリ数・総バイト数を集計する。
    pub async fn stats(&self) -> TierStats {
        let mut entries = 0u64;
        let mut bytes = 0u64;

        if let Ok(mut dir) = tokio::fs::read_dir(&self.root).await {
            while let Ok(Some(item)) = dir.next_entry().await {
                let path = item.path();
                if path.extension().and_then(|e| e.to_str()) == Some("bin") {
                    entries += 1;
                    if let Ok(meta) = item.metadata().await {
                        bytes += meta.len();
                    }
                }
            }
        }

        TierStats {
            entries,
            bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn remove_pair(&self, key: &str) {
        let _ = tokio::fs::remove_file(self.blob_path(key)).await;
        let _ = tokio::fs::remove_file(self.meta_path(key)).await;
    }
}
