//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型と、HTTPステータスへの明示的な
//! マッピング。上流エラーの生メッセージはクライアントに返さず、
//! ログにのみ残す。

use axum::http::StatusCode;

use crate::ledger::LedgerError;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 所有者でない（署名復元失敗と所有者不一致を区別しない）
    #[error("Not owner of NFT #{0}")]
    NotOwner(u64),
    /// token idが数値としてパースできない
    #[error("invalid token id: {0}")]
    InvalidTokenId(String),
    /// 台帳（EVM RPC）への問い合わせに失敗
    #[error("ledger query failed: {0}")]
    Ledger(#[from] LedgerError),
    /// 所有は確認できたがアセットファイルが存在しない
    #[error("No asset for NFT #{0}")]
    AssetNotFound(u64),
    /// 内部エラー
    #[error("internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::NotOwner(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidTokenId(_) => StatusCode::BAD_REQUEST,
            GatewayError::Ledger(_) => StatusCode::BAD_GATEWAY,
            GatewayError::AssetNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // 502/500は詳細をログに残し、固定文言だけを返す
        let body = match &self {
            GatewayError::Ledger(e) => {
                tracing::error!(error = %e, "ledger query failed");
                "ledger query failed".to_string()
            }
            GatewayError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}
