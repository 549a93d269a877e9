//! # 永続ストレージ・画像処理コラボレータ
//!
//! オリジナル画像のblobストレージと派生画像の生成パイプラインは
//! 外部コラボレータであり、トレイトとしてのみ定義する。
//! Gateway運用者はファイルシステム・S3互換ストレージ等を実装として
//! 選択できる。

use std::path::PathBuf;

use photon_types::{ImageFormat, ImageSize, PhotoRecord};

use crate::error::GatewayError;

/// オリジナル画像のパスアドレス指定のバイトストア。
#[async_trait::async_trait]
pub trait OriginStore: Send + Sync {
    /// パスに対応するblobを読み出す。
    /// 写真ドキュメントが存在するのにblobがない状態はインフラ不整合で
    /// あり、NotFoundではなくStorageエラーとして表面化する。
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, GatewayError>;
}

/// 派生画像の生成パイプライン。本体は外部実装であり、Gatewayは
/// 不透明なバイト生成関数として消費する。
#[async_trait::async_trait]
pub trait ImageProcessor: Send + Sync {
    /// オリジナルのバイト列から指定サイズ・フォーマットの派生画像を生成する。
    async fn render(
        &self,
        original: &[u8],
        size: ImageSize,
        format: ImageFormat,
        watermark: bool,
    ) -> Result<Vec<u8>, GatewayError>;
}

/// 写真のオリジナルblobの正準パス。
pub fn origin_path(photo: &PhotoRecord) -> String {
    format!("{}/{}", photo.library_id, photo.id)
}

/// ローカルファイルシステムによるOriginStore実装（開発用）。
pub struct FsOriginStore {
    root: PathBuf,
}

impl FsOriginStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl OriginStore for FsOriginStore {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, GatewayError> {
        tokio::fs::read(self.root.join(path))
            .await
            .map_err(|e| GatewayError::Storage(format!("オリジナルの読み出しに失敗: {e}")))
    }
}

/// 変換を行わないImageProcessor実装（開発用）。
/// オリジナルのバイト列をそのまま返す。本番では画像リサイズ・
/// フィルタパイプラインの実装を注入する。
pub struct PassthroughProcessor;

#[async_trait::async_trait]
impl ImageProcessor for PassthroughProcessor {
    async fn render(
        &self,
        original: &[u8],
        _size: ImageSize,
        _format: ImageFormat,
        _watermark: bool,
    ) -> Result<Vec<u8>, GatewayError> {
        Ok(original.to_vec())
    }
}
