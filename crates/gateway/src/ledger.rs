//! # 台帳クライアント
//!
//! ERC-721コントラクトの`ownerOf(uint256)`を読み出すためのクライアント。
//! テストでフェイクに差し替えられるよう、トレイトで抽象化して
//! `GatewayState`にBoxで保持する。
//!
//! 本番実装`EvmLedger`はJSON-RPC 2.0の`eth_call`を使う。コントラクトの
//! インターフェースは`ownerOf`一メソッドだけなので、ABI定義ファイルは
//! 読み込まず、セレクタを定数として埋め込む。

use std::time::Duration;

use tokengate_crypto::EthAddress;

/// `ownerOf(uint256)`の4バイト関数セレクタ。
/// `keccak256("ownerOf(uint256)")[..4]`
const OWNER_OF_SELECTOR: [u8; 4] = [0x63, 0x52, 0x21, 0x1e];

/// 台帳問い合わせのエラー型。
///
/// いずれも認可判定（Forbidden）とは別系統であり、HTTP境界では
/// 502にマッピングされる。
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// RPCエンドポイントへの到達失敗・タイムアウト
    #[error("rpc transport failure: {0}")]
    Transport(String),
    /// RPCがerrorメンバーを返した（存在しないtoken idのrevert等）
    #[error("contract call failed: {0}")]
    Call(String),
    /// resultの形式が不正
    #[error("malformed rpc response: {0}")]
    BadResponse(String),
}

/// NFT所有台帳の抽象インターフェース。
///
/// 実装は並行リクエストから共有されるため`Send + Sync`。
/// 問い合わせは読み取り専用で、1リクエストにつき1回だけ呼ばれる。
#[async_trait::async_trait]
pub trait NftLedger: Send + Sync {
    /// `token_id`の現在の所有者アドレスを返す。
    async fn owner_of(&self, token_id: u64) -> Result<EthAddress, LedgerError>;
}

/// EVM JSON-RPCによる`NftLedger`実装。
///
/// `reqwest::Client`は接続プールを持つため、起動時に一度だけ構築して
/// 全リクエストで共有する。
pub struct EvmLedger {
    http_client: reqwest::Client,
    rpc_url: String,
    contract: EthAddress,
}

impl EvmLedger {
    /// RPC URL・コントラクトアドレス・リクエストタイムアウトから構築する。
    pub fn new(
        rpc_url: String,
        contract: EthAddress,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            rpc_url,
            contract,
        })
    }
}

/// `ownerOf(token_id)`のcalldataを`0x`付きhexで組み立てる。
/// セレクタ4バイト + 32バイトbig-endianのtoken id。
fn owner_of_calldata(token_id: u64) -> String {
    let mut data = [0u8; 36];
    data[..4].copy_from_slice(&OWNER_OF_SELECTOR);
    data[28..].copy_from_slice(&token_id.to_be_bytes());
    format!("0x{}", hex::encode(data))
}

/// `eth_call`の返り値（32バイトのABIワード）から所有者アドレスを取り出す。
/// addressは右詰めなので下位20バイトが本体。
fn decode_owner_word(result_hex: &str) -> Result<EthAddress, LedgerError> {
    let stripped = result_hex.strip_prefix("0x").unwrap_or(result_hex);
    let bytes = hex::decode(stripped)
        .map_err(|e| LedgerError::BadResponse(format!("result is not hex: {e}")))?;
    if bytes.len() != 32 {
        return Err(LedgerError::BadResponse(format!(
            "expected 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes[12..]);
    Ok(EthAddress(addr))
}

#[async_trait::async_trait]
impl NftLedger for EvmLedger {
    async fn owner_of(&self, token_id: u64) -> Result<EthAddress, LedgerError> {
        let rpc_request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": self.contract.to_checksum_hex(),
                    "data": owner_of_calldata(token_id),
                },
                "latest"
            ]
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&rpc_request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let rpc_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LedgerError::BadResponse(e.to_string()))?;

        if let Some(error) = rpc_body.get("error") {
            return Err(LedgerError::Call(error.to_string()));
        }

        let result = rpc_body
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LedgerError::BadResponse("missing result member".to_string()))?;

        decode_owner_word(result)
    }
}
