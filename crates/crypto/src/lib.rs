//! # Tokengate 暗号処理
//!
//! Ethereumの`personal_sign`署名から署名者アドレスを復元するための
//! 純粋な暗号プリミティブ。ネットワークI/Oを持たない。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | メッセージハッシュ | Keccak-256 (EIP-191 prefix付き) |
//! | 署名復元 | secp256k1 ECDSA public key recovery |
//! | アドレス導出 | Keccak-256(公開鍵)下位20バイト |
//! | アドレス表記 | EIP-55 checksum hex |

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// 暗号処理のエラー型
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// 署名の16進デコードに失敗
    #[error("signature is not valid hex: {0}")]
    SignatureHex(#[from] hex::FromHexError),
    /// 署名長が65バイトでない
    #[error("signature must be 65 bytes, got {0}")]
    SignatureLength(usize),
    /// recovery id (vバイト)が不正
    #[error("invalid recovery id: {0}")]
    RecoveryId(u8),
    /// 公開鍵復元に失敗（r/s不正等）
    #[error("public key recovery failed")]
    Recovery,
    /// アドレスの16進表記が不正
    #[error("invalid address literal: {0}")]
    InvalidAddress(String),
}

/// Ethereumアカウントアドレス（20バイト）。
///
/// 比較はバイト列の同値で行う。大文字小文字の揺れはパース時点で
/// 消えるため、正規化済みの比較になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EthAddress(pub [u8; 20]);

impl EthAddress {
    /// 生バイト列への参照。
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 checksum形式の16進文字列（`0x`プレフィックス付き）。
    ///
    /// 小文字hex表記のKeccak-256ハッシュの各ニブルが8以上の位置だけ
    /// 英字を大文字化する。
    pub fn to_checksum_hex(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, ch) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                digest[i / 2] >> 4
            } else {
                digest[i / 2] & 0x0f
            };
            if ch.is_ascii_alphabetic() && nibble >= 8 {
                out.push(ch.to_ascii_uppercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

impl std::fmt::Display for EthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_checksum_hex())
    }
}

impl std::str::FromStr for EthAddress {
    type Err = CryptoError;

    /// `0x`プレフィックスの有無・大文字小文字を問わず40桁hexを受理する。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        if stripped.len() != 40 {
            return Err(CryptoError::InvalidAddress(s.to_string()));
        }
        let bytes =
            hex::decode(stripped).map_err(|_| CryptoError::InvalidAddress(s.to_string()))?;
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes);
        Ok(EthAddress(addr))
    }
}

/// Keccak-256ハッシュ計算。
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Keccak256::digest(data));
    hash
}

/// EIP-191 (`personal_sign`) 形式のメッセージハッシュ。
///
/// `"\x19Ethereum Signed Message:\n" + len(message) + message` を
/// Keccak-256でハッシュする。ウォレットの`personal_sign`が署名するのは
/// この値であり、平文メッセージそのものではない。
pub fn hash_personal_message(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n");
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// 16進文字列（`0x`プレフィックス任意）を65バイトの署名にデコードする。
pub fn decode_signature_hex(signature_hex: &str) -> Result<[u8; 65], CryptoError> {
    let stripped = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = hex::decode(stripped)?;
    let arr: [u8; 65] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| CryptoError::SignatureLength(v.len()))?;
    Ok(arr)
}

/// `personal_sign`署名から署名者アドレスを復元する。
///
/// 署名は`r(32) || s(32) || v(1)`のレイアウト。vは生のrecovery id
/// (0/1)とレガシーの27/28の両方を受理する。EIP-155形式のvは
/// `personal_sign`では現れないため拒否する。
pub fn recover_address(message: &[u8], signature: &[u8; 65]) -> Result<EthAddress, CryptoError> {
    let v = signature[64];
    let recovery_byte = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(CryptoError::RecoveryId(other)),
    };
    let recovery_id =
        RecoveryId::try_from(recovery_byte).map_err(|_| CryptoError::RecoveryId(v))?;

    let sig = Signature::from_slice(&signature[..64]).map_err(|_| CryptoError::Recovery)?;

    let prehash = hash_personal_message(message);
    let verifying_key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|_| CryptoError::Recovery)?;

    Ok(address_of(&verifying_key))
}

/// secp256k1公開鍵からEthereumアドレスを導出する。
///
/// 非圧縮エンコード（0x04先頭バイトを除く64バイト）のKeccak-256の
/// 下位20バイト。
pub fn address_of(verifying_key: &VerifyingKey) -> EthAddress {
    let point = verifying_key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..]);
    EthAddress(addr)
}
