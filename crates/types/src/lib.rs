//! # Photon 共有型定義
//!
//! 署名付きURL・共有リンク・キャッシュ・監査ログの各コンポーネントが
//! 共有するデータ構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - 署名ペイロードのJSONフィールド名はcamelCase（クライアントSDKと共通）
//! - Base64url: 署名ペイロード（URLクエリに埋め込むため）
//! - Base64 (Standard): MAC、導出済み署名鍵

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// 現在時刻のUNIXタイムスタンプ（秒）。
pub fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// 現在時刻のUNIXタイムスタンプ（ミリ秒）。ディスクキャッシュのサイドカーで使用。
pub fn now_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// 画像識別子
// ---------------------------------------------------------------------------

/// 配信可能な画像サイズ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Original,
    Small,
    Medium,
    Large,
}

impl ImageSize {
    /// 正準署名文字列・キャッシュキーで使用する固定表現。
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Original => "original",
            ImageSize::Small => "small",
            ImageSize::Medium => "medium",
            ImageSize::Large => "large",
        }
    }
}

/// 配信可能な画像フォーマット。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Webp,
}

impl ImageFormat {
    /// 正準署名文字列・キャッシュキーで使用する固定表現。
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    /// HTTPレスポンスのContent-Typeヘッダ値。
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }
}

// ---------------------------------------------------------------------------
// 署名ペイロード
// ---------------------------------------------------------------------------

/// 署名付きURLの`sig`クエリパラメータに埋め込まれるJSONペイロード。
/// `user_id`と`share_token`はちょうど一方のみが存在しなければならない
/// （検証はデコード時に行う）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload {
    /// 対象ライブラリID
    pub library_id: String,
    /// 対象写真ID
    pub photo_id: String,
    /// 要求サイズ
    pub size: ImageSize,
    /// 要求フォーマット
    pub format: ImageFormat,
    /// 有効期限（UNIX秒）。検証時刻がこの値以上なら期限切れ。
    pub expires_at: i64,
    /// 直接所有パスの認証主体
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 共有リンクパスの認証主体
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}

/// 署名の認証主体。ユーザーIDまたは共有トークンのちょうど一方。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerIdentity {
    /// ライブラリ所有者として認証するユーザーID
    User(String),
    /// 共有リンクのトークン
    Share(String),
}

impl SignerIdentity {
    /// 鍵導出のメッセージとして使用する不透明な識別子文字列。
    pub fn as_str(&self) -> &str {
        match self {
            SignerIdentity::User(id) => id,
            SignerIdentity::Share(token) => token,
        }
    }
}

/// デコード・検証済みの署名。1リクエストの間のみ存在する。
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSignature {
    /// 対象ライブラリID
    pub library_id: String,
    /// 対象写真ID
    pub photo_id: String,
    /// 要求サイズ
    pub size: ImageSize,
    /// 要求フォーマット
    pub format: ImageFormat,
    /// 有効期限（UNIX秒）
    pub expires_at: i64,
    /// 認証主体
    pub identity: SignerIdentity,
}

/// 導出済み署名鍵。永続化されず、`(master_secret, identity)`から
/// 有効期間内であればいつでも再構築できる。
#[derive(Debug, Clone)]
pub struct SigningKey {
    /// Base64エンコードされた鍵バイト列
    pub key: String,
    /// 鍵の有効期限（UNIX秒）
    pub expires_at: i64,
    /// 鍵の導出元となった認証主体
    pub identity: SignerIdentity,
}

// ---------------------------------------------------------------------------
// 所有権・共有リンク
// ---------------------------------------------------------------------------

/// ライブラリの所有権レコード。作成後は不変。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryOwnership {
    pub library_id: String,
    pub owner_user_id: String,
}

/// 共有リンクが対象とするリソースの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareResourceType {
    Photo,
    Album,
    Library,
}

/// 共有リンクが付与する権限。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    View,
    Download,
    Collaborate,
}

/// 共有リンク経由のダウンロード可否ポリシー。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPolicy {
    /// ダウンロード不可
    None,
    /// 派生画像のみダウンロード可
    DerivativeOnly,
    /// オリジナル・派生画像ともにダウンロード可
    OriginalAndDerivative,
}

/// 共有リンクに紐づくアクセスポリシー。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharePolicy {
    pub permission: SharePermission,
    /// リンクの有効期限（UNIX秒）。Noneは無期限。
    pub expires_at: Option<i64>,
    /// パスワードのSHA-256ハッシュ（16進）。Noneはパスワード保護なし。
    pub password_hash: Option<String>,
    /// 最大使用回数。Noneは無制限。
    pub max_uses: Option<u32>,
    pub download_policy: DownloadPolicy,
    /// 派生画像配信時にウォーターマークを適用するか
    pub watermark_enabled: bool,
}

/// 共有リンク。`use_count`は単調増加、`revoked`はfalse→trueの一方向のみ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLink {
    pub id: String,
    pub token: String,
    pub resource_type: ShareResourceType,
    pub resource_id: String,
    pub policy: SharePolicy,
    pub use_count: u32,
    pub revoked: bool,
}

/// 写真ドキュメント。封じ込め判定とキャッシュキー構築に必要な属性のみ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub library_id: String,
    /// 所属アルバムのID一覧（アルバム共有の封じ込め判定に使用）
    pub album_ids: Vec<String>,
    /// 編集バージョン。編集のたびに単調増加し、キャッシュキーの一部となる。
    pub edit_version: u32,
}

// ---------------------------------------------------------------------------
// アクセス判定・監査
// ---------------------------------------------------------------------------

/// 配信対象アセットの種別（ダウンロードポリシー判定に使用）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Original,
    Derivative,
}

/// アクセス試行の種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAttempt {
    View,
    Download,
}

/// アクセス拒否の機械可読コード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialCode {
    #[serde(rename = "denied_not_found")]
    NotFound,
    #[serde(rename = "denied_revoked")]
    Revoked,
    #[serde(rename = "denied_expired")]
    Expired,
    #[serde(rename = "denied_max_uses")]
    MaxUses,
    #[serde(rename = "denied_invalid_password")]
    InvalidPassword,
    #[serde(rename = "denied_not_contained")]
    NotContained,
    #[serde(rename = "denied_not_owner")]
    NotOwner,
    #[serde(rename = "denied_download_forbidden")]
    DownloadForbidden,
}

impl DenialCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialCode::NotFound => "denied_not_found",
            DenialCode::Revoked => "denied_revoked",
            DenialCode::Expired => "denied_expired",
            DenialCode::MaxUses => "denied_max_uses",
            DenialCode::InvalidPassword => "denied_invalid_password",
            DenialCode::NotContained => "denied_not_contained",
            DenialCode::NotOwner => "denied_not_owner",
            DenialCode::DownloadForbidden => "denied_download_forbidden",
        }
    }
}

impl std::fmt::Display for DenialCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1回の認可判定の結果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "code")]
pub enum AccessOutcome {
    Granted,
    Denied(DenialCode),
}

/// 共有パスにおけるアクセス試行の監査レコード。追記専用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub id: String,
    /// 解決できた場合のみ共有リンクID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    /// 試行に使用されたトークン（リンクが解決できなくても記録する）
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<ShareResourceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub attempt: AccessAttempt,
    pub outcome: AccessOutcome,
    /// 記録時刻（UNIX秒）
    pub occurred_at: i64,
}

// ---------------------------------------------------------------------------
// Gateway API リクエスト/レスポンス
// ---------------------------------------------------------------------------

/// POST /signing-key リクエスト。`user_id`と`share_token`は一方のみ指定する。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueKeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}

/// POST /signing-key レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueKeyResponse {
    /// Base64エンコードされた署名鍵
    pub key: String,
    /// 鍵の有効期限（ISO-8601）
    pub expires_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}
