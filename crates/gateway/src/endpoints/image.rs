//! # GET /image
//!
//! 署名付きURLによる画像配信。
//!
//! ## 処理フロー
//! 1. `sig`をデコードし、`hmac`を定数時間比較で検証（失敗は401）
//! 2. 写真ドキュメントを解決（不在は404）
//! 3. 所有権または共有ポリシーで認可（拒否は403、ストア障害は500）
//! 4. キャッシュ（メモリ→ディスク）を参照し、ミス時のみ永続ストレージ
//!    から取得して派生画像を生成、両ティアへ書き込む
//!
//! 認可の結果がすべてのキャッシュ読み書きに先行する。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use photon_access::{AccessDecision, StoreError};
use photon_cache::CacheKey;
use photon_types::{now_unix_secs, AssetKind, ImageFormat, ImageSignature, ImageSize, PhotoRecord};

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::origin::origin_path;

/// GET /image のクエリパラメータ。
#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    /// Base64urlエンコードされた署名ペイロード
    pub sig: String,
    /// 正準文字列に対するBase64エンコードのMAC
    pub hmac: String,
    /// パスワード保護された共有リンク用
    pub password: Option<String>,
    /// trueの場合ダウンロードとして扱い、ダウンロードポリシーを検査する
    pub download: Option<bool>,
}

/// GET /image — 署名付きURLによる画像配信。
pub async fn handle_image(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, GatewayError> {
    // 1. 署名のデコードとMAC検証
    let signature = photon_crypto::decode_signature(&query.sig, now_unix_secs())
        .map_err(|e| GatewayError::Unauthorized(e.to_string()))?;

    if !photon_crypto::verify_mac(&state.master_secret, &signature, &query.hmac) {
        return Err(GatewayError::Unauthorized("MAC検証に失敗しました".to_string()));
    }

    // 2. 対象写真の解決（ドキュメントストアI/Oはタイムアウトで束縛する）
    let photo = tokio::time::timeout(
        state.store_timeout,
        state.photos.find_photo(&signature.photo_id),
    )
    .await
    .map_err(|_| StoreError::Timeout)??
    .ok_or(GatewayError::NotFound)?;

    // 3. 認可（署名のライブラリと写真の実体の食い違いも認可器が拒否する）
    let decision = if query.download.unwrap_or(false) {
        let asset_kind = if signature.size == ImageSize::Original {
            AssetKind::Original
        } else {
            AssetKind::Derivative
        };
        tokio::time::timeout(
            state.store_timeout,
            state.authorizer.authorize_download(
                &signature,
                &photo,
                query.password.as_deref(),
                asset_kind,
            ),
        )
        .await
        .map_err(|_| StoreError::Timeout)??
    } else {
        tokio::time::timeout(
            state.store_timeout,
            state
                .authorizer
                .authorize(&signature, &photo, query.password.as_deref()),
        )
        .await
        .map_err(|_| StoreError::Timeout)??
    };

    let watermark = match decision {
        AccessDecision::Granted { watermark_applied } => watermark_applied,
        AccessDecision::Denied { code, reason } => {
            return Err(GatewayError::Forbidden { code, reason });
        }
    };

    // 4. キャッシュ参照→永続ストレージへのフォールバック
    let bytes = serve_bytes(&state, &signature, &photo, watermark).await?;
    Ok(image_response(signature.format, bytes))
}

/// キャッシュを参照し、ミス時は永続ストレージから取得・生成して埋める。
/// ウォーターマーク付きのバイト列は受信者固有であり、共有キーの
/// キャッシュを汚染しないよう読み書きともスキップする。
async fn serve_bytes(
    state: &GatewayState,
    signature: &ImageSignature,
    photo: &PhotoRecord,
    watermark: bool,
) -> Result<Vec<u8>, GatewayError> {
    let key = CacheKey::new(
        &photo.id,
        signature.size,
        signature.format,
        photo.edit_version,
    );

    if !watermark {
        if let Some(bytes) = state.cache.get(&key).await {
            return Ok(bytes);
        }
    }

    // 永続ストレージI/Oはタイムアウトで束縛し、超過は一時的失敗とする
    let original = tokio::time::timeout(state.origin_timeout, state.origin.fetch(&origin_path(photo)))
        .await
        .map_err(|_| GatewayError::Storage("オリジナルの取得がタイムアウトしました".to_string()))??;

    let bytes = if signature.size == ImageSize::Original && !watermark {
        original
    } else {
        state
            .processor
            .render(&original, signature.size, signature.format, watermark)
            .await?
    };

    if !watermark {
        state.cache.set(&key, bytes.clone()).await;
    }

    Ok(bytes)
}

fn image_response(format: ImageFormat, bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, format.content_type())], bytes).into_response()
}
