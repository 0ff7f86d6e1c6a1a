//! # 所有権ゲート
//!
//! 本システムの中核。token idからチャレンジ文字列を組み立て、
//! 署名から署名者アドレスを復元し、台帳の所有者と突き合わせて
//! 認可判定を下す。
//!
//! ## 判定ポリシー
//! - 署名の不正（デコード失敗・復元失敗）と所有者不一致は同じ
//!   `Forbidden`に畳む。どちらで落ちたかを応答から区別できると、
//!   署名の正しさだけを先に探るオラクルになるため。
//! - 台帳問い合わせの失敗は認可判定ではなくサーバーエラーとして
//!   `LedgerError`のまま呼び出し元に伝播させる。
//! - リトライはしない。1リクエストにつき台帳呼び出しは1回。

use tokengate_crypto::{decode_signature_hex, recover_address, EthAddress};

use crate::ledger::{LedgerError, NftLedger};

/// チャレンジ文字列のプレフィックス。クライアントが署名する文言と
/// 一字一句一致している必要がある。
pub const CHALLENGE_PREFIX: &str = "Download high resolution file of #";

/// token idに対するチャレンジ文字列を組み立てる。
pub fn challenge(token_id: u64) -> String {
    format!("{CHALLENGE_PREFIX}{token_id}")
}

/// 認可判定の結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// 署名者が台帳上の所有者と一致した
    Authorized {
        /// 台帳が報告した所有者アドレス
        owner: EthAddress,
    },
    /// 署名が復元できない、または署名者が所有者でない
    Forbidden,
}

/// token idと署名から認可判定を行う。
///
/// 台帳呼び出し以外は純粋なローカル計算。共有状態の変更は一切ない。
pub async fn authorize(
    ledger: &dyn NftLedger,
    token_id: u64,
    signature_hex: &str,
) -> Result<Decision, LedgerError> {
    let message = challenge(token_id);

    // Step 1: 署名者アドレスの復元。失敗はForbiddenに畳む（I/Oなし）
    let recovered = match decode_signature_hex(signature_hex)
        .and_then(|sig| recover_address(message.as_bytes(), &sig))
    {
        Ok(addr) => addr,
        Err(e) => {
            tracing::debug!(token_id, error = %e, "signature recovery failed");
            return Ok(Decision::Forbidden);
        }
    };

    // Step 2: 台帳から現在の所有者を取得。失敗はそのまま伝播
    let owner = ledger.owner_of(token_id).await?;

    // Step 3: アドレス比較（EthAddressはバイト同値なので正規化済み）
    if recovered == owner {
        Ok(Decision::Authorized { owner })
    } else {
        tracing::debug!(
            token_id,
            recovered = %recovered,
            owner = %owner,
            "recovered signer is not the owner"
        );
        Ok(Decision::Forbidden)
    }
}
