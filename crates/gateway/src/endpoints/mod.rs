//! # Gatewayエンドポイント

pub mod audit;
pub mod image;
pub mod signing_key;

pub use audit::handle_audit;
pub use image::handle_image;
pub use signing_key::handle_signing_key;
