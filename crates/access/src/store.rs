//! # ドキュメントストア・コラボレータ
//!
//! 所有権・共有リンク・写真ドキュメントの永続化は外部コラボレータであり、
//! 本クレートはトレイトとしてのみ定義する。物理レイアウト（フラット／
//! ネスト）の差異はこの契約の背後に吸収され、コアは関知しない。

use async_trait::async_trait;

use photon_types::{LibraryOwnership, PhotoRecord, ShareLink};

/// ストア操作のエラー型。
/// いずれも一時的なインフラ障害として扱われ、認可の拒否には変換されない
/// （呼び出し側で500として表面化し、リトライ可能）。
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// バックエンドI/Oエラー
    #[error("ストア操作に失敗: {0}")]
    Backend(String),
    /// 呼び出し側が指定したタイムアウトを超過
    #[error("ストア操作がタイムアウトしました")]
    Timeout,
}

/// ライブラリ所有権の参照。
#[async_trait]
pub trait OwnershipStore: Send + Sync {
    /// ライブラリIDに対応する所有権レコードを返す。
    async fn find_ownership(&self, library_id: &str)
        -> Result<Option<LibraryOwnership>, StoreError>;
}

/// 共有リンクの参照と更新。
///
/// `increment_use_count`はread-modify-writeであり、同一リンクへの同時
/// リクエスト下では過少カウントしうる。バックエンドが原子的インクリメントを
/// 提供する場合はそちらで実装すること。
#[async_trait]
pub trait ShareLinkStore: Send + Sync {
    /// トークンに対応する共有リンクを返す。
    async fn find_by_token(&self, token: &str) -> Result<Option<ShareLink>, StoreError>;

    /// 使用回数を1増やす。
    async fn increment_use_count(&self, link_id: &str) -> Result<(), StoreError>;

    /// リンクを失効させる（false→trueの一方向のみ）。
    async fn revoke(&self, link_id: &str) -> Result<(), StoreError>;
}

/// 写真ドキュメントの参照。
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// 写真IDに対応するドキュメントを返す。
    async fn find_photo(&self, photo_id: &str) -> Result<Option<PhotoRecord>, StoreError>;
}
