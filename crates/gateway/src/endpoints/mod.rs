//! # Gatewayエンドポイント

pub mod download;
pub mod index;

pub use download::handle_download;
pub use index::handle_index;
