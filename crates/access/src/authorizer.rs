//! # アクセス認可
//!
//! 検証済み署名と対象写真から許可／拒否を決定するトップレベルの判定。
//! 直接所有パスは所有権ストアの参照、共有パスはポリシーエンジンへの
//! 委譲で解決する。整形済みの署名に対しては全域関数であり、Errは
//! ストア障害（一時的失敗）のみを表す。

use std::sync::Arc;

use photon_types::{
    AccessAttempt, AssetKind, DenialCode, ImageSignature, PhotoRecord, SignerIdentity,
};

use crate::policy::{PolicyError, SharePolicyEngine};
use crate::store::{OwnershipStore, StoreError};

/// 認可判定の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted {
        /// 共有ダウンロードパスでのみtrueになりうる
        watermark_applied: bool,
    },
    Denied {
        code: DenialCode,
        reason: String,
    },
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }

    fn denied(code: DenialCode, reason: impl Into<String>) -> Self {
        AccessDecision::Denied {
            code,
            reason: reason.into(),
        }
    }
}

/// トップレベルの認可器。
pub struct AccessAuthorizer {
    ownerships: Arc<dyn OwnershipStore>,
    policy: SharePolicyEngine,
}

impl AccessAuthorizer {
    pub fn new(ownerships: Arc<dyn OwnershipStore>, policy: SharePolicyEngine) -> Self {
        Self { ownerships, policy }
    }

    /// 閲覧アクセスを認可する。
    ///
    /// - `user_id`あり: 対象写真のライブラリの所有権を参照し、
    ///   所有者一致の場合のみ許可。
    /// - `share_token`あり: ポリシーエンジンに委譲。
    ///
    /// 署名が主張するライブラリと写真の実体が食い違う場合は、
    /// 経路によらず封じ込め違反として拒否する。
    pub async fn authorize(
        &self,
        signature: &ImageSignature,
        photo: &PhotoRecord,
        password: Option<&str>,
    ) -> Result<AccessDecision, StoreError> {
        if photo.library_id != signature.library_id {
            return Ok(self
                .deny_library_mismatch(signature, AccessAttempt::View)
                .await);
        }

        match &signature.identity {
            SignerIdentity::User(user_id) => self.authorize_owner(user_id, photo).await,
            SignerIdentity::Share(token) => {
                let result = self
                    .policy
                    .validate(token, password, photo, AccessAttempt::View)
                    .await;
                match result {
                    Ok(_link) => Ok(AccessDecision::Granted {
                        watermark_applied: false,
                    }),
                    Err(PolicyError::Denied(code)) => {
                        Ok(AccessDecision::denied(code, "アクセスが拒否されました"))
                    }
                    Err(PolicyError::Store(e)) => Err(e),
                }
            }
        }
    }

    /// ダウンロードアクセスを認可する。所有者は常にダウンロード可、
    /// 共有パスはダウンロードポリシーの検査を含む。
    pub async fn authorize_download(
        &self,
        signature: &ImageSignature,
        photo: &PhotoRecord,
        password: Option<&str>,
        asset_kind: AssetKind,
    ) -> Result<AccessDecision, StoreError> {
        if photo.library_id != signature.library_id {
            return Ok(self
                .deny_library_mismatch(signature, AccessAttempt::Download)
                .await);
        }

        match &signature.identity {
            SignerIdentity::User(user_id) => self.authorize_owner(user_id, photo).await,
            SignerIdentity::Share(token) => {
                let result = self
                    .policy
                    .validate_download(token, password, asset_kind, photo)
                    .await;
                match result {
                    Ok(grant) => Ok(AccessDecision::Granted {
                        watermark_applied: grant.watermark_applied,
                    }),
                    Err(PolicyError::Denied(code)) => {
                        Ok(AccessDecision::denied(code, "アクセスが拒否されました"))
                    }
                    Err(PolicyError::Store(e)) => Err(e),
                }
            }
        }
    }

    /// 署名のライブラリと写真の実体の食い違いを拒否する。
    /// 共有パスの場合は監査ログにも記録する。
    async fn deny_library_mismatch(
        &self,
        signature: &ImageSignature,
        attempt: AccessAttempt,
    ) -> AccessDecision {
        if let SignerIdentity::Share(token) = &signature.identity {
            let _ = self.policy.deny_not_contained(token, attempt).await;
        }
        AccessDecision::denied(DenialCode::NotContained, "アクセスが拒否されました")
    }

    /// 直接所有パス。所有者一致のみ許可する。
    /// 所有権による許可は監査対象外。
    async fn authorize_owner(
        &self,
        user_id: &str,
        photo: &PhotoRecord,
    ) -> Result<AccessDecision, StoreError> {
        let ownership = self.ownerships.find_ownership(&photo.library_id).await?;

        match ownership {
            Some(o) if o.owner_user_id == user_id => Ok(AccessDecision::Granted {
                watermark_applied: false,
            }),
            _ => Ok(AccessDecision::denied(
                DenialCode::NotOwner,
                "所有者ではありません",
            )),
        }
    }
}
