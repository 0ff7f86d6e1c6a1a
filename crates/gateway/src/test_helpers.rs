//! # テスト用共通ヘルパー
//!
//! gate・endpointsテストで共有するフェイク台帳と署名ヘルパー。

use std::collections::HashMap;

use k256::ecdsa::SigningKey;
use tokengate_crypto::{hash_personal_message, EthAddress};

use crate::gate::challenge;
use crate::ledger::{LedgerError, NftLedger};

/// 固定の所有者表を返すフェイク台帳。
pub struct MockLedger {
    owners: HashMap<u64, EthAddress>,
}

impl MockLedger {
    pub fn new(entries: Vec<(u64, EthAddress)>) -> Self {
        Self {
            owners: entries.into_iter().collect(),
        }
    }

    pub fn single(token_id: u64, owner: EthAddress) -> Self {
        Self::new(vec![(token_id, owner)])
    }
}

#[async_trait::async_trait]
impl NftLedger for MockLedger {
    async fn owner_of(&self, token_id: u64) -> Result<EthAddress, LedgerError> {
        // 実コントラクトの挙動に合わせ、未登録のtoken idはrevert相当
        self.owners.get(&token_id).copied().ok_or_else(|| {
            LedgerError::Call(format!("execution reverted: invalid token ID {token_id}"))
        })
    }
}

/// 常にトランスポートエラーを返すフェイク台帳（provider停止の模擬）。
pub struct FailingLedger;

#[async_trait::async_trait]
impl NftLedger for FailingLedger {
    async fn owner_of(&self, _token_id: u64) -> Result<EthAddress, LedgerError> {
        Err(LedgerError::Transport("simulated provider timeout".to_string()))
    }
}

/// token idのチャレンジに`personal_sign`相当の署名を行い、hex文字列で返す。
pub fn sign_challenge(key: &SigningKey, token_id: u64) -> String {
    let prehash = hash_personal_message(challenge(token_id).as_bytes());
    let (sig, recovery_id) = key
        .sign_prehash_recoverable(&prehash)
        .expect("signing cannot fail for a valid key");
    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&sig.to_bytes());
    bytes[64] = recovery_id.to_byte();
    format!("0x{}", hex::encode(bytes))
}
