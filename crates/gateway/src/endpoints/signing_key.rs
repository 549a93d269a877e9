//! # POST /signing-key
//!
//! 認証済みユーザーまたは共有トークンに対する署名鍵の発行。
//! 鍵はマスターシークレットから決定論的に導出され、保存されない。

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{TimeZone, Utc};

use photon_types::{now_unix_secs, IssueKeyRequest, IssueKeyResponse, SignerIdentity};

use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /signing-key — 署名鍵発行。
pub async fn handle_signing_key(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<IssueKeyRequest>,
) -> Result<Json<IssueKeyResponse>, GatewayError> {
    let identity = match (body.user_id, body.share_token) {
        (Some(user_id), None) => SignerIdentity::User(user_id),
        (None, Some(token)) => SignerIdentity::Share(token),
        _ => {
            return Err(GatewayError::BadRequest(
                "userIdまたはshareTokenのちょうど一方を指定してください".to_string(),
            ));
        }
    };

    let key = photon_crypto::issue_signing_key(
        &state.master_secret,
        identity,
        state.signing_key_ttl_secs,
        now_unix_secs(),
    );

    let expires_at = Utc
        .timestamp_opt(key.expires_at, 0)
        .single()
        .ok_or_else(|| GatewayError::Internal("有効期限の変換に失敗しました".to_string()))?
        .to_rfc3339();

    let (user_id, share_token) = match key.identity {
        SignerIdentity::User(id) => (Some(id), None),
        SignerIdentity::Share(token) => (None, Some(token)),
    };

    Ok(Json(IssueKeyResponse {
        key: key.key,
        expires_at,
        user_id,
        share_token,
    }))
}
