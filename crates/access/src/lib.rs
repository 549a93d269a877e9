//! # Photon アクセス認可
//!
//! 検証済み署名に対する認可判定を提供する。直接所有（ライブラリ所有権）と
//! 共有リンク（ポリシー束縛の能力）の2つの独立した許可経路を評価し、
//! 共有パスのすべての判定を監査ログに記録する。
//!
//! ドキュメントストアは外部コラボレータであり、トレイト
//! （[`store::OwnershipStore`] / [`store::ShareLinkStore`] / [`store::PhotoStore`]）
//! としてのみ定義する。開発・テスト用のインメモリ実装を[`memory`]に置く。

pub mod audit;
pub mod authorizer;
pub mod memory;
pub mod policy;
pub mod store;

pub use audit::{AuditLog, MemoryAuditLog};
pub use authorizer::{AccessAuthorizer, AccessDecision};
pub use memory::{MemoryOwnershipStore, MemoryPhotoStore, MemoryShareLinkStore};
pub use policy::{hash_password, DownloadGrant, PolicyError, SharePolicyEngine};
pub use store::{OwnershipStore, PhotoStore, ShareLinkStore, StoreError};
