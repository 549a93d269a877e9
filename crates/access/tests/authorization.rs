//! 認可レイヤの結合テスト。
//! インメモリストアの上でポリシー評価順序・使用回数・監査記録を検証する。

use std::sync::Arc;

use photon_access::{
    hash_password, AccessAuthorizer, AccessDecision, AuditLog, MemoryAuditLog,
    MemoryOwnershipStore, MemoryPhotoStore, MemoryShareLinkStore, PhotoStore, PolicyError,
    ShareLinkStore, SharePolicyEngine,
};
use photon_types::{
    now_unix_secs, AccessAttempt, AccessOutcome, AssetKind, DenialCode, DownloadPolicy,
    ImageFormat, ImageSignature, ImageSize, LibraryOwnership, PhotoRecord, ShareLink,
    SharePermission, SharePolicy, ShareResourceType, SignerIdentity,
};

fn photo() -> PhotoRecord {
    PhotoRecord {
        id: "photo-1".to_string(),
        library_id: "lib-1".to_string(),
        album_ids: vec!["album-1".to_string()],
        edit_version: 0,
    }
}

fn policy() -> SharePolicy {
    SharePolicy {
        permission: SharePermission::View,
        expires_at: None,
        password_hash: None,
        max_uses: None,
        download_policy: DownloadPolicy::OriginalAndDerivative,
        watermark_enabled: false,
    }
}

fn link(token: &str) -> ShareLink {
    ShareLink {
        id: format!("link-{token}"),
        token: token.to_string(),
        resource_type: ShareResourceType::Photo,
        resource_id: "photo-1".to_string(),
        policy: policy(),
        use_count: 0,
        revoked: false,
    }
}

struct Fixture {
    links: Arc<MemoryShareLinkStore>,
    audit: Arc<MemoryAuditLog>,
    engine: SharePolicyEngine,
}

fn fixture() -> Fixture {
    let links = Arc::new(MemoryShareLinkStore::new());
    let audit = Arc::new(MemoryAuditLog::new());
    let engine = SharePolicyEngine::new(links.clone(), audit.clone());
    Fixture {
        links,
        audit,
        engine,
    }
}

fn assert_denied(result: Result<ShareLink, PolicyError>, expected: DenialCode) {
    match result {
        Err(PolicyError::Denied(code)) => assert_eq!(code, expected),
        other => panic!("{expected}が期待されるが: {other:?}"),
    }
}

/// 未知のトークンがdenied_not_foundとなり、監査に記録されることを確認
#[tokio::test]
async fn test_unknown_token_denied() {
    let f = fixture();

    let result = f
        .engine
        .validate("no-such-token", None, &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::NotFound);

    let events = f.audit.all_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].outcome, AccessOutcome::Denied(DenialCode::NotFound));
    assert_eq!(events[0].token, "no-such-token");
    assert_eq!(events[0].link_id, None);
}

/// 失効と期限切れが同時に成立する場合、失効が先に報告されることを確認
/// （検査順序: 失効 → 期限）
#[tokio::test]
async fn test_revoked_checked_before_expired() {
    let f = fixture();
    let mut l = link("t1");
    l.revoked = true;
    l.policy.expires_at = Some(now_unix_secs() - 100);
    f.links.insert(l);

    let result = f
        .engine
        .validate("t1", None, &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::Revoked);
}

/// 期限切れリンクがdenied_expiredとなることを確認
#[tokio::test]
async fn test_expired_link_denied() {
    let f = fixture();
    let mut l = link("t1");
    l.policy.expires_at = Some(now_unix_secs() - 1);
    f.links.insert(l);

    let result = f
        .engine
        .validate("t1", None, &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::Expired);
}

/// max_uses=1: 初回は許可されuse_countが1になり、2回目は拒否されることを確認
#[tokio::test]
async fn test_max_uses_exhaustion() {
    let f = fixture();
    let mut l = link("t1");
    l.policy.max_uses = Some(1);
    f.links.insert(l);

    let granted = f
        .engine
        .validate("t1", None, &photo(), AccessAttempt::View)
        .await
        .unwrap();
    assert_eq!(granted.use_count, 1);

    let result = f
        .engine
        .validate("t1", None, &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::MaxUses);
}

/// パスワード保護: 未提示・不一致は拒否、一致は許可されることを確認
#[tokio::test]
async fn test_password_protection() {
    let f = fixture();
    let mut l = link("t1");
    l.policy.password_hash = Some(hash_password("correct-horse"));
    f.links.insert(l);

    let result = f
        .engine
        .validate("t1", None, &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::InvalidPassword);

    let result = f
        .engine
        .validate("t1", Some("wrong"), &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::InvalidPassword);

    assert!(f
        .engine
        .validate("t1", Some("correct-horse"), &photo(), AccessAttempt::View)
        .await
        .is_ok());
}

/// 封じ込め: photo/album/library の各共有種別の判定を確認
#[tokio::test]
async fn test_containment_rules() {
    let f = fixture();

    // photo共有: 同一IDのみ
    let mut l = link("t-photo");
    l.resource_id = "other-photo".to_string();
    f.links.insert(l);
    let result = f
        .engine
        .validate("t-photo", None, &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::NotContained);

    // album共有: photo.album_idsに含まれること
    let mut l = link("t-album");
    l.resource_type = ShareResourceType::Album;
    l.resource_id = "album-1".to_string();
    f.links.insert(l);
    assert!(f
        .engine
        .validate("t-album", None, &photo(), AccessAttempt::View)
        .await
        .is_ok());

    // library共有: photo.library_idと一致すること
    let mut l = link("t-lib");
    l.resource_type = ShareResourceType::Library;
    l.resource_id = "lib-other".to_string();
    f.links.insert(l);
    let result = f
        .engine
        .validate("t-lib", None, &photo(), AccessAttempt::View)
        .await;
    assert_denied(result, DenialCode::NotContained);
}

/// downloadPolicy=derivative_only: オリジナルは拒否、派生は許可を確認
#[tokio::test]
async fn test_download_policy_derivative_only() {
    let f = fixture();
    let mut l = link("t1");
    l.policy.download_policy = DownloadPolicy::DerivativeOnly;
    l.policy.watermark_enabled = true;
    f.links.insert(l);

    let result = f
        .engine
        .validate_download("t1", None, AssetKind::Original, &photo())
        .await;
    match result {
        Err(PolicyError::Denied(code)) => assert_eq!(code, DenialCode::DownloadForbidden),
        other => panic!("拒否が期待されるが: {other:?}"),
    }

    let grant = f
        .engine
        .validate_download("t1", None, AssetKind::Derivative, &photo())
        .await
        .unwrap();
    assert!(grant.watermark_applied);
}

/// downloadPolicy=none が全ダウンロードを拒否し、use_countが増えないことを確認
#[tokio::test]
async fn test_download_policy_none_does_not_consume_use() {
    let f = fixture();
    let mut l = link("t1");
    l.policy.download_policy = DownloadPolicy::None;
    l.policy.max_uses = Some(5);
    f.links.insert(l);

    let result = f
        .engine
        .validate_download("t1", None, AssetKind::Derivative, &photo())
        .await;
    assert!(matches!(
        result,
        Err(PolicyError::Denied(DenialCode::DownloadForbidden))
    ));

    // 拒否された試行は使用回数を消費しない
    let link = f.links.find_by_token("t1").await.unwrap().unwrap();
    assert_eq!(link.use_count, 0);
}

/// 許可・拒否の両方が監査ログに1件ずつ記録されることを確認
#[tokio::test]
async fn test_audit_trail_per_decision() {
    let f = fixture();
    f.links.insert(link("t1"));

    let _ = f
        .engine
        .validate("t1", None, &photo(), AccessAttempt::View)
        .await;
    let _ = f
        .engine
        .validate("unknown", None, &photo(), AccessAttempt::View)
        .await;

    let events = f.audit.all_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].outcome, AccessOutcome::Granted);
    assert_eq!(events[0].resource_id.as_deref(), Some("photo-1"));
    assert!(matches!(events[1].outcome, AccessOutcome::Denied(_)));

    // resource_idによる引き当て
    let listed = f.audit.list_events("photo-1").await;
    assert_eq!(listed.len(), 1);
}

/// 所有者一致で許可、他ユーザーで"not owner"拒否となることを確認
#[tokio::test]
async fn test_authorize_ownership() {
    let ownerships = Arc::new(MemoryOwnershipStore::new());
    ownerships.insert(LibraryOwnership {
        library_id: "lib-1".to_string(),
        owner_user_id: "u1".to_string(),
    });

    let f = fixture();
    let authorizer = AccessAuthorizer::new(ownerships, f.engine);

    let mut signature = ImageSignature {
        library_id: "lib-1".to_string(),
        photo_id: "photo-1".to_string(),
        size: ImageSize::Small,
        format: ImageFormat::Jpeg,
        expires_at: now_unix_secs() + 60,
        identity: SignerIdentity::User("u1".to_string()),
    };

    let decision = authorizer.authorize(&signature, &photo(), None).await.unwrap();
    assert!(decision.is_granted());

    signature.identity = SignerIdentity::User("u2".to_string());
    let decision = authorizer.authorize(&signature, &photo(), None).await.unwrap();
    match decision {
        AccessDecision::Denied { code, .. } => assert_eq!(code, DenialCode::NotOwner),
        other => panic!("拒否が期待されるが: {other:?}"),
    }
}

/// 共有トークン署名がポリシーエンジンへ委譲されることを確認
#[tokio::test]
async fn test_authorize_share_delegation() {
    let f = fixture();
    f.links.insert(link("t1"));

    let authorizer = AccessAuthorizer::new(Arc::new(MemoryOwnershipStore::new()), f.engine);

    let signature = ImageSignature {
        library_id: "lib-1".to_string(),
        photo_id: "photo-1".to_string(),
        size: ImageSize::Small,
        format: ImageFormat::Jpeg,
        expires_at: now_unix_secs() + 60,
        identity: SignerIdentity::Share("t1".to_string()),
    };

    let decision = authorizer.authorize(&signature, &photo(), None).await.unwrap();
    assert!(decision.is_granted());

    // use_countが消費されている
    let link = f.links.find_by_token("t1").await.unwrap().unwrap();
    assert_eq!(link.use_count, 1);
}

/// 署名が主張するライブラリに写真が属さない共有アクセスが
/// 封じ込め違反として拒否され、監査に記録されることを確認
#[tokio::test]
async fn test_authorize_share_library_mismatch_audited() {
    let f = fixture();
    f.links.insert(link("t1"));
    let audit = f.audit.clone();
    let authorizer = AccessAuthorizer::new(Arc::new(MemoryOwnershipStore::new()), f.engine);

    let signature = ImageSignature {
        library_id: "lib-other".to_string(),
        photo_id: "photo-1".to_string(),
        size: ImageSize::Small,
        format: ImageFormat::Jpeg,
        expires_at: now_unix_secs() + 60,
        identity: SignerIdentity::Share("t1".to_string()),
    };

    let decision = authorizer.authorize(&signature, &photo(), None).await.unwrap();
    match decision {
        AccessDecision::Denied { code, .. } => assert_eq!(code, DenialCode::NotContained),
        other => panic!("拒否が期待されるが: {other:?}"),
    }

    let events = audit.all_events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].outcome,
        AccessOutcome::Denied(DenialCode::NotContained)
    );
    assert_eq!(events[0].token, "t1");
}

/// 写真ストアの基本動作（gatewayの404判定が依存する）
#[tokio::test]
async fn test_photo_store_lookup() {
    let photos = MemoryPhotoStore::new();
    photos.insert(photo());

    assert!(photos.find_photo("photo-1").await.unwrap().is_some());
    assert!(photos.find_photo("missing").await.unwrap().is_none());
}
