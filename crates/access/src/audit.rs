//! # 監査ログ
//!
//! 共有パスの認可判定ごとに1件のイベントを追記する。記録の失敗は
//! 捕捉して破棄し、認可判定の結果を決して変えない（監査の耐久性に
//! 認可の正しさを依存させない）。

use async_trait::async_trait;
use parking_lot::RwLock;

use photon_types::AccessEvent;

/// 追記専用の監査ログ。
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// イベントを追記する。失敗は実装内で捕捉・警告ログ化し、
    /// 呼び出し側へは伝播させない。
    async fn record(&self, event: AccessEvent);

    /// リソースIDに紐づくイベントを記録順で返す。
    async fn list_events(&self, resource_id: &str) -> Vec<AccessEvent>;
}

/// インメモリの監査ログ実装。
#[derive(Default)]
pub struct MemoryAuditLog {
    events: RwLock<Vec<AccessEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録済みの全イベント（テスト・点検用）。
    pub fn all_events(&self) -> Vec<AccessEvent> {
        self.events.read().clone()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, event: AccessEvent) {
        self.events.write().push(event);
    }

    async fn list_events(&self, resource_id: &str) -> Vec<AccessEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.resource_id.as_deref() == Some(resource_id))
            .cloned()
            .collect()
    }
}
