//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 共有状態はプロセス起動時に一度だけ構築し、リクエストハンドラへ
//! 注入する（アンビエントなシングルトンは持たない）。

use std::sync::Arc;
use std::time::Duration;

use photon_access::{AccessAuthorizer, AuditLog, PhotoStore};
use photon_cache::CacheCoordinator;

use crate::origin::{ImageProcessor, OriginStore};

/// Gatewayの共有状態。
pub struct GatewayState {
    /// HMAC鍵導出のマスターシークレット。プロセス全体で不変。
    /// ログへ出力してはならない。
    pub master_secret: Vec<u8>,
    /// 発行する署名鍵の有効期間（秒）
    pub signing_key_ttl_secs: i64,
    /// 派生画像の2層キャッシュ
    pub cache: CacheCoordinator,
    /// 写真ドキュメントストア（外部コラボレータ）
    pub photos: Arc<dyn PhotoStore>,
    /// 監査ログ（点検エンドポイントから参照）
    pub audit: Arc<dyn AuditLog>,
    /// アクセス認可器
    pub authorizer: AccessAuthorizer,
    /// オリジナル画像のblobストア（外部コラボレータ）
    pub origin: Box<dyn OriginStore>,
    /// 派生画像の生成パイプライン（外部コラボレータ）
    pub processor: Box<dyn ImageProcessor>,
    /// 永続ストレージI/Oのタイムアウト。超過は一時的失敗（500）となる。
    pub origin_timeout: Duration,
    /// ドキュメントストアI/Oのタイムアウト。超過は`StoreError::Timeout`
    /// として一時的失敗（500）となる。
    pub store_timeout: Duration,
}

/// 環境変数を読み、なければデフォルト値を返す。
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// 環境変数を数値として読む。
pub fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
