//! # Photon Gateway
//!
//! 署名付きURLによる派生画像・オリジナル画像の配信サービス。
//!
//! ## 役割
//! - 署名鍵の発行（保存せず、マスターシークレットから再導出）
//! - 署名付きURLのHMAC検証
//! - 所有権・共有リンクポリシーによるアクセス認可
//! - 派生画像の2層キャッシュ（メモリLRU + ディスク）
//! - 共有アクセスの監査記録
//!
//! ## API エンドポイント
//! - `GET /image?sig=…&hmac=…` — 署名付きURLによる画像配信
//! - `POST /signing-key` — 署名鍵発行
//! - `GET /audit/{resource_id}` — アクセス監査の点検

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;

use photon_access::{
    AccessAuthorizer, MemoryAuditLog, MemoryOwnershipStore, MemoryPhotoStore,
    MemoryShareLinkStore, SharePolicyEngine,
};
use photon_cache::{CacheCoordinator, DiskTier, MemoryTier};

mod config;
mod endpoints;
mod error;
mod origin;

use config::{env_or, env_parse, GatewayState};
use origin::{FsOriginStore, PassthroughProcessor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // HMAC鍵導出のマスターシークレット
    let master_secret = match std::env::var("PHOTON_MASTER_SECRET") {
        Ok(secret) => secret.into_bytes(),
        Err(_) => {
            // 開発環境用: ランダムシークレットを生成。
            // 再起動のたびに変わるため、発行済みの署名はすべて無効になる。
            tracing::warn!(
                "PHOTON_MASTER_SECRETが未設定です。ランダムシークレットを生成します（開発環境用）"
            );
            let mut secret = vec![0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut secret);
            secret
        }
    };

    // 2層キャッシュ
    let cache_dir = env_or("PHOTON_CACHE_DIR", "./photon-cache");
    let memory = MemoryTier::new(
        env_parse("PHOTON_MEMORY_MAX_ENTRIES", 1024),
        env_parse("PHOTON_MEMORY_MAX_BYTES", 256 * 1024 * 1024),
    );
    let disk = DiskTier::open(&cache_dir).await?;
    let cache = CacheCoordinator::new(
        memory,
        disk,
        Duration::from_secs(env_parse("PHOTON_MEMORY_TTL_SECS", 60)),
        Duration::from_secs(env_parse("PHOTON_DISK_TTL_SECS", 3600)),
    );

    // ドキュメントストア（開発用インメモリ実装。
    // 本番では外部ドキュメントストアの実装を注入する）
    let ownerships = Arc::new(MemoryOwnershipStore::new());
    let links = Arc::new(MemoryShareLinkStore::new());
    let photos = Arc::new(MemoryPhotoStore::new());
    let audit = Arc::new(MemoryAuditLog::new());

    let engine = SharePolicyEngine::new(links, audit.clone());
    let authorizer = AccessAuthorizer::new(ownerships, engine);

    // オリジナルblobストア（開発用ローカルFS実装）
    let origin_root = env_or("PHOTON_ORIGIN_ROOT", "./photon-origin");
    tokio::fs::create_dir_all(&origin_root).await?;

    let state = Arc::new(GatewayState {
        master_secret,
        signing_key_ttl_secs: env_parse("PHOTON_KEY_TTL_SECS", 3600),
        cache,
        photos,
        audit,
        authorizer,
        origin: Box::new(FsOriginStore::new(origin_root)),
        processor: Box::new(PassthroughProcessor),
        origin_timeout: Duration::from_secs(env_parse("PHOTON_ORIGIN_TIMEOUT_SECS", 10)),
        store_timeout: Duration::from_secs(env_parse("PHOTON_STORE_TIMEOUT_SECS", 5)),
    });

    let app = axum::Router::new()
        .route("/image", axum::routing::get(endpoints::handle_image))
        .route(
            "/signing-key",
            axum::routing::post(endpoints::handle_signing_key),
        )
        .route(
            "/audit/{resource_id}",
            axum::routing::get(endpoints::handle_audit),
        )
        .with_state(state);

    let addr = env_or("PHOTON_LISTEN_ADDR", "0.0.0.0:3000");
    tracing::info!(%addr, "Gatewayを起動します");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
