//! # Gateway エラー型

use axum::http::StatusCode;

use photon_access::StoreError;
use photon_types::DenialCode;

/// Gatewayエラー型。
///
/// HTTPステータスへの対応:
/// - 欠落・不正な署名 → 401
/// - 検証済み署名だが認可拒否 → 403（拒否理由を含む）
/// - リソース不在 → 404
/// - ストア・ストレージ障害、タイムアウト → 500（リトライ可能）
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 署名の欠落・デコード失敗・MAC不一致
    #[error("署名が無効です: {0}")]
    Unauthorized(String),
    /// 認可拒否（機械可読コード付き）
    #[error("アクセスが拒否されました: {reason} ({code})")]
    Forbidden { code: DenialCode, reason: String },
    /// 対象リソースが存在しない
    #[error("リソースが見つかりません")]
    NotFound,
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// ドキュメントストア障害（一時的失敗）
    #[error("ストア操作に失敗: {0}")]
    Store(#[from] StoreError),
    /// blobストレージ障害（一時的失敗）
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Store(_) | GatewayError::Storage(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
