//! # GET /audit/{resource_id}
//!
//! 共有パスのアクセス試行履歴の点検用エンドポイント。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use photon_types::AccessEvent;

use crate::config::GatewayState;

/// GET /audit/{resource_id} — リソースに対するアクセスイベント一覧。
pub async fn handle_audit(
    State(state): State<Arc<GatewayState>>,
    Path(resource_id): Path<String>,
) -> Json<Vec<AccessEvent>> {
    Json(state.audit.list_events(&resource_id).await)
}
