//! # GET /
//!
//! ダウンロードURL以外を踏んだクライアント向けのプレースホルダ。

/// GET / — 固定文言を返す。
pub async fn handle_index() -> &'static str {
    "not what you're looking for"
}
