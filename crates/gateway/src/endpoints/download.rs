//! # GET /download-nft/{token_id}/{signature}
//!
//! 所有権ゲートを通過したリクエストにのみ高解像度ファイルを返す。
//!
//! ## ステータスコード
//! - 200: 認可成功、画像バイト列（`Content-Disposition: attachment`）
//! - 400: token idが数値でない
//! - 403: 署名復元失敗または所有者不一致（本文は同一フォーマット）
//! - 404: 所有は確認できたがファイルが存在しない
//! - 502: 台帳問い合わせ失敗

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::gate::{self, Decision};

/// GET /download-nft/{token_id}/{signature} — 認可付きダウンロード。
///
/// token idのパースを最初に行い、数値でなければ署名復元にも台帳にも
/// 触らず400で弾く。
pub async fn handle_download(
    State(state): State<Arc<GatewayState>>,
    Path((token_id, signature)): Path<(String, String)>,
) -> Result<Response, GatewayError> {
    let token_id: u64 = token_id
        .parse()
        .map_err(|_| GatewayError::InvalidTokenId(token_id))?;

    match gate::authorize(state.ledger.as_ref(), token_id, &signature).await? {
        Decision::Forbidden => Err(GatewayError::NotOwner(token_id)),
        Decision::Authorized { owner } => {
            tracing::info!(token_id, owner = %owner, "download authorized");
            let bytes = state.assets.fetch(token_id).await?;
            let headers = [
                (header::CONTENT_TYPE, "image/jpeg".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", state.assets.filename_for(token_id)),
                ),
            ];
            Ok((headers, bytes).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetStore;
    use crate::test_helpers::{sign_challenge, FailingLedger, MockLedger};
    use axum::http::StatusCode;
    use k256::ecdsa::SigningKey;
    use tokengate_crypto::address_of;

    /// ユニークな一時ディレクトリを持つ状態を組み立てる。
    async fn test_state(ledger: Box<dyn crate::ledger::NftLedger>) -> Arc<GatewayState> {
        let root = std::env::temp_dir().join(format!("tokengate-dl-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&root).await.unwrap();
        Arc::new(GatewayState {
            ledger,
            assets: AssetStore::new(root),
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// 所有者の署名で200と画像・ダウンロードヘッダが返ることを確認
    #[tokio::test]
    async fn test_owner_download_succeeds() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let owner = address_of(key.verifying_key());
        let state = test_state(Box::new(MockLedger::single(7, owner))).await;
        tokio::fs::write(state.assets.path_for(7), b"high resolution bytes")
            .await
            .unwrap();

        let response = handle_download(
            State(state),
            Path(("7".to_string(), sign_challenge(&key, 7))),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpeg"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"7.jpg\""
        );
        assert_eq!(body_string(response).await, "high resolution bytes");
    }

    /// 非所有者の署名で403と固定本文が返ることを確認
    #[tokio::test]
    async fn test_non_owner_forbidden() {
        let attacker = SigningKey::random(&mut rand::rngs::OsRng);
        let owner_key = SigningKey::random(&mut rand::rngs::OsRng);
        let state =
            test_state(Box::new(MockLedger::single(42, address_of(owner_key.verifying_key()))))
                .await;

        let result = handle_download(
            State(state),
            Path(("42".to_string(), sign_challenge(&attacker, 42))),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_string(response).await, "Not owner of NFT #42");
    }

    /// 壊れた署名が非所有者と同じ403レスポンスになることを確認（オラクル排除）
    #[tokio::test]
    async fn test_garbage_signature_same_forbidden_shape() {
        let owner_key = SigningKey::random(&mut rand::rngs::OsRng);
        let owner = address_of(owner_key.verifying_key());
        let attacker = SigningKey::random(&mut rand::rngs::OsRng);

        let state = test_state(Box::new(MockLedger::single(42, owner))).await;
        let wrong_signer = handle_download(
            State(state),
            Path(("42".to_string(), sign_challenge(&attacker, 42))),
        )
        .await
        .unwrap_err()
        .into_response();

        let state = test_state(Box::new(MockLedger::single(42, owner))).await;
        let garbage = handle_download(
            State(state),
            Path(("42".to_string(), "0xdeadbeef".to_string())),
        )
        .await
        .unwrap_err()
        .into_response();

        assert_eq!(wrong_signer.status(), garbage.status());
        assert_eq!(
            body_string(wrong_signer).await,
            body_string(garbage).await
        );
    }

    /// 数値でないtoken idが400で弾かれることを確認
    #[tokio::test]
    async fn test_invalid_token_id_rejected() {
        let state = test_state(Box::new(FailingLedger)).await;

        let result = handle_download(
            State(state),
            Path(("abc".to_string(), "0x00".to_string())),
        )
        .await;

        // FailingLedgerに到達する前に弾かれる
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// 台帳停止時に502が返り、403や200に化けないことを確認
    #[tokio::test]
    async fn test_ledger_outage_is_bad_gateway() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let state = test_state(Box::new(FailingLedger)).await;

        let result = handle_download(
            State(state),
            Path(("1".to_string(), sign_challenge(&key, 1))),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    /// 認可は通るがファイルがない場合に404が返ることを確認
    #[tokio::test]
    async fn test_authorized_but_missing_asset() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let owner = address_of(key.verifying_key());
        let state = test_state(Box::new(MockLedger::single(8, owner))).await;
        // ファイルは書き込まない

        let result = handle_download(
            State(state),
            Path(("8".to_string(), sign_challenge(&key, 8))),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "No asset for NFT #8");
    }
}
