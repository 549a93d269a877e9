//! # キャッシュキー
//!
//! `(photo_id, size, format, edit_version)`の複合キーを単一文字列として
//! 描画する。`edit_version`が異なれば別エントリとなるため、編集済み画像の
//! 古い派生画像は削除操作なしで構造的に無効化される。

use photon_types::{ImageFormat, ImageSize};

/// 派生画像キャッシュの複合キー。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub photo_id: String,
    pub size: ImageSize,
    pub format: ImageFormat,
    pub edit_version: u32,
}

impl CacheKey {
    pub fn new(
        photo_id: impl Into<String>,
        size: ImageSize,
        format: ImageFormat,
        edit_version: u32,
    ) -> Self {
        Self {
            photo_id: photo_id.into(),
            size,
            format,
            edit_version,
        }
    }

    /// ディスクのファイル名としても安全な単一文字列表現。
    /// photo_idは不透明IDだが、パス区切りを含む可能性に備えて
    /// 英数字と`.`/`-`/`_`以外のバイトを`%xx`にエスケープする。
    /// `%`自身もエスケープ対象であり、異なるIDは必ず異なるキーに描画される。
    pub fn render(&self) -> String {
        let mut safe_id = String::with_capacity(self.photo_id.len());
        for b in self.photo_id.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_') {
                safe_id.push(b as char);
            } else {
                safe_id.push_str(&format!("%{b:02x}"));
            }
        }
        format!(
            "{}_{}_{}_v{}",
            safe_id,
            self.size.as_str(),
            self.format.as_str(),
            self.edit_version
        )
    }
}
