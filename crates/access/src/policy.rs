//! # 共有リンク・ポリシーエンジン
//!
//! 共有リンクのポリシー（失効・期限・使用回数・パスワード・封じ込め）を
//! アクセス試行に対して固定順序で評価する。最初に失敗した検査が勝ち、
//! すべての結果（許可・拒否とも）は監査ログに1件ずつ記録される。

use std::sync::Arc;

use sha2::{Digest, Sha256};

use photon_types::{
    now_unix_secs, AccessAttempt, AccessEvent, AccessOutcome, AssetKind, DenialCode, DownloadPolicy,
    PhotoRecord, ShareLink, ShareResourceType,
};

use crate::audit::AuditLog;
use crate::store::{ShareLinkStore, StoreError};

/// ポリシー評価のエラー型。
/// 拒否（403）とインフラ障害（500）を型で区別する。
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// ポリシー検査による拒否
    #[error("アクセスが拒否されました: {0}")]
    Denied(DenialCode),
    /// ストア障害（拒否ではなく一時的失敗として伝播する）
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// ダウンロード許可の結果。
#[derive(Debug, Clone)]
pub struct DownloadGrant {
    pub link: ShareLink,
    /// 派生画像かつウォーターマーク有効時のみtrue
    pub watermark_applied: bool,
}

/// 共有リンクの検証器。
pub struct SharePolicyEngine {
    links: Arc<dyn ShareLinkStore>,
    audit: Arc<dyn AuditLog>,
}

impl SharePolicyEngine {
    pub fn new(links: Arc<dyn ShareLinkStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { links, audit }
    }

    /// 共有リンクを検証する。検査は以下の固定順で行い、最初の失敗で打ち切る:
    /// 1. トークン解決 2. 失効 3. 期限 4. 使用回数 5. パスワード 6. 封じ込め
    ///
    /// 許可時は`use_count`をちょうど1回インクリメントし、更新後のリンクを返す。
    pub async fn validate(
        &self,
        token: &str,
        password: Option<&str>,
        photo: &PhotoRecord,
        attempt: AccessAttempt,
    ) -> Result<ShareLink, PolicyError> {
        let link = self.resolve(token, attempt).await?;

        if let Err(code) = evaluate_policy(&link, password, photo) {
            return Err(self.deny(token, Some(&link), attempt, code).await);
        }

        self.grant(link, attempt).await
    }

    /// ダウンロード要求向けの検証。封じ込めの後にダウンロードポリシーの
    /// 検査を追加する。ここで拒否された場合、`use_count`は増えない。
    pub async fn validate_download(
        &self,
        token: &str,
        password: Option<&str>,
        asset_kind: AssetKind,
        photo: &PhotoRecord,
    ) -> Result<DownloadGrant, PolicyError> {
        let attempt = AccessAttempt::Download;
        let link = self.resolve(token, attempt).await?;

        if let Err(code) = evaluate_policy(&link, password, photo) {
            return Err(self.deny(token, Some(&link), attempt, code).await);
        }

        let watermark_applied = match download_gate(&link, asset_kind) {
            Ok(watermark) => watermark,
            Err(code) => return Err(self.deny(token, Some(&link), attempt, code).await),
        };

        let link = self.grant(link, attempt).await?;
        Ok(DownloadGrant {
            link,
            watermark_applied,
        })
    }

    /// 署名が主張するライブラリに対象写真が属さない場合の拒否。
    /// リンク解決前の判定だが、共有パスの拒否として監査に記録する。
    pub async fn deny_not_contained(&self, token: &str, attempt: AccessAttempt) -> PolicyError {
        self.deny(token, None, attempt, DenialCode::NotContained).await
    }

    async fn resolve(&self, token: &str, attempt: AccessAttempt) -> Result<ShareLink, PolicyError> {
        match self.links.find_by_token(token).await? {
            Some(link) => Ok(link),
            None => Err(self.deny(token, None, attempt, DenialCode::NotFound).await),
        }
    }

    /// 許可を確定する: use_countのインクリメントと監査記録。
    async fn grant(&self, link: ShareLink, attempt: AccessAttempt) -> Result<ShareLink, PolicyError> {
        self.links.increment_use_count(&link.id).await?;

        self.audit
            .record(event(&link.token, Some(&link), attempt, AccessOutcome::Granted))
            .await;

        let mut granted = link;
        granted.use_count += 1;
        Ok(granted)
    }

    /// 拒否を記録し、PolicyErrorとして返す。
    async fn deny(
        &self,
        token: &str,
        link: Option<&ShareLink>,
        attempt: AccessAttempt,
        code: DenialCode,
    ) -> PolicyError {
        tracing::info!(token, code = %code, "共有リンクアクセスを拒否");
        self.audit
            .record(event(token, link, attempt, AccessOutcome::Denied(code)))
            .await;
        PolicyError::Denied(code)
    }
}

/// 検査2〜5（失効・期限・使用回数・パスワード）と検査6（封じ込め）。
fn evaluate_policy(
    link: &ShareLink,
    password: Option<&str>,
    photo: &PhotoRecord,
) -> Result<(), DenialCode> {
    // 失効は期限より先に検査する（両方成立時はdenied_revokedを報告）
    if link.revoked {
        return Err(DenialCode::Revoked);
    }

    if let Some(expires_at) = link.policy.expires_at {
        if expires_at <= now_unix_secs() {
            return Err(DenialCode::Expired);
        }
    }

    if let Some(max_uses) = link.policy.max_uses {
        if link.use_count >= max_uses {
            return Err(DenialCode::MaxUses);
        }
    }

    if let Some(stored_hash) = &link.policy.password_hash {
        let supplied = password.ok_or(DenialCode::InvalidPassword)?;
        if hash_password(supplied) != *stored_hash {
            return Err(DenialCode::InvalidPassword);
        }
    }

    if !contains(link, photo) {
        return Err(DenialCode::NotContained);
    }

    Ok(())
}

/// 対象写真が共有の`(resource_type, resource_id)`に封じ込められているか。
fn contains(link: &ShareLink, photo: &PhotoRecord) -> bool {
    match link.resource_type {
        ShareResourceType::Photo => link.resource_id == photo.id,
        ShareResourceType::Album => photo.album_ids.iter().any(|a| *a == link.resource_id),
        ShareResourceType::Library => link.resource_id == photo.library_id,
    }
}

/// ダウンロードポリシーの検査。許可時はウォーターマーク適用有無を返す。
fn download_gate(link: &ShareLink, asset_kind: AssetKind) -> Result<bool, DenialCode> {
    match (link.policy.download_policy, asset_kind) {
        (DownloadPolicy::None, _) => Err(DenialCode::DownloadForbidden),
        (DownloadPolicy::DerivativeOnly, AssetKind::Original) => {
            Err(DenialCode::DownloadForbidden)
        }
        (_, AssetKind::Derivative) => Ok(link.policy.watermark_enabled),
        (_, AssetKind::Original) => Ok(false),
    }
}

/// 共有パスワードの保存形式（SHA-256の16進ダイジェスト）。
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn event(
    token: &str,
    link: Option<&ShareLink>,
    attempt: AccessAttempt,
    outcome: AccessOutcome,
) -> AccessEvent {
    AccessEvent {
        id: uuid::Uuid::new_v4().to_string(),
        link_id: link.map(|l| l.id.clone()),
        token: token.to_string(),
        resource_type: link.map(|l| l.resource_type),
        resource_id: link.map(|l| l.resource_id.clone()),
        attempt,
        outcome,
        occurred_at: now_unix_secs(),
    }
}
