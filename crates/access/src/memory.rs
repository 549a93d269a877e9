//! # インメモリ・ストア実装
//!
//! 開発・テスト用のドキュメントストア実装。ロック下で更新するため、
//! `use_count`のインクリメントはこの実装に限り原子的となる。

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use photon_types::{LibraryOwnership, PhotoRecord, ShareLink};

use crate::store::{OwnershipStore, PhotoStore, ShareLinkStore, StoreError};

/// インメモリの所有権ストア。
#[derive(Default)]
pub struct MemoryOwnershipStore {
    records: RwLock<HashMap<String, LibraryOwnership>>,
}

impl MemoryOwnershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有権レコードを登録する。作成後は不変。
    pub fn insert(&self, ownership: LibraryOwnership) {
        self.records
            .write()
            .insert(ownership.library_id.clone(), ownership);
    }
}

#[async_trait]
impl OwnershipStore for MemoryOwnershipStore {
    async fn find_ownership(
        &self,
        library_id: &str,
    ) -> Result<Option<LibraryOwnership>, StoreError> {
        Ok(self.records.read().get(library_id).cloned())
    }
}

/// インメモリの共有リンクストア。token→リンクの索引を持つ。
#[derive(Default)]
pub struct MemoryShareLinkStore {
    links: RwLock<HashMap<String, ShareLink>>,
}

impl MemoryShareLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, link: ShareLink) {
        self.links.write().insert(link.id.clone(), link);
    }
}

#[async_trait]
impl ShareLinkStore for MemoryShareLinkStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<ShareLink>, StoreError> {
        Ok(self
            .links
            .read()
            .values()
            .find(|link| link.token == token)
            .cloned())
    }

    async fn increment_use_count(&self, link_id: &str) -> Result<(), StoreError> {
        let mut links = self.links.write();
        let link = links
            .get_mut(link_id)
            .ok_or_else(|| StoreError::Backend(format!("共有リンクが存在しません: {link_id}")))?;
        link.use_count += 1;
        Ok(())
    }

    async fn revoke(&self, link_id: &str) -> Result<(), StoreError> {
        let mut links = self.links.write();
        let link = links
            .get_mut(link_id)
            .ok_or_else(|| StoreError::Backend(format!("共有リンクが存在しません: {link_id}")))?;
        link.revoked = true;
        Ok(())
    }
}

/// インメモリの写真ストア。
#[derive(Default)]
pub struct MemoryPhotoStore {
    photos: RwLock<HashMap<String, PhotoRecord>>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, photo: PhotoRecord) {
        self.photos.write().insert(photo.id.clone(), photo);
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn find_photo(&self, photo_id: &str) -> Result<Option<PhotoRecord>, StoreError> {
        Ok(self.photos.read().get(photo_id).cloned())
    }
}
