//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 認識する変数はここで全て列挙し、起動時に検証して不正なら即座に
//! 失敗させる。リクエスト処理中に環境変数を読むことはない。

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use tokengate_crypto::EthAddress;

use crate::assets::AssetStore;
use crate::ledger::NftLedger;

/// 起動時に検証済みのGateway設定。
#[derive(Debug, Clone)]
pub struct Config {
    /// EVM JSON-RPCエンドポイント（`RPC_URL`, 必須）
    pub rpc_url: String,
    /// ERC-721コントラクトアドレス（`CONTRACT_ADDRESS`, 必須）
    pub contract_address: EthAddress,
    /// チェーンID（`CHAIN_ID`, 任意）。ログ・運用照合用
    pub chain_id: Option<u64>,
    /// アセットのルートディレクトリ（`ASSET_ROOT`, 既定: `metadata`）
    pub asset_root: PathBuf,
    /// リッスンアドレス（`BIND_ADDR`, 既定: `0.0.0.0:3000`）
    pub bind_addr: SocketAddr,
    /// CORS許可オリジン（`CORS_ORIGINS`, 空白区切り + `PUBLIC_PORT`由来の自己オリジン）
    pub cors_origins: Vec<String>,
    /// 台帳呼び出しのタイムアウト（`LEDGER_TIMEOUT_SECS`, 既定: 10）
    pub ledger_timeout: Duration,
}

impl Config {
    /// プロセスの環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::build(|key| std::env::var(key).ok())
    }

    /// 変数の供給元を差し替え可能にした本体。テストはここを直接叩く。
    fn build(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let rpc_url = var("RPC_URL").context("RPC_URL must be set")?;

        let contract_address = var("CONTRACT_ADDRESS")
            .context("CONTRACT_ADDRESS must be set")?;
        let contract_address = EthAddress::from_str(&contract_address)
            .with_context(|| format!("CONTRACT_ADDRESS is not a valid address: {contract_address}"))?;

        let chain_id = var("CHAIN_ID")
            .map(|s| s.parse::<u64>().with_context(|| format!("CHAIN_ID is not a number: {s}")))
            .transpose()?;

        let asset_root = PathBuf::from(var("ASSET_ROOT").unwrap_or_else(|| "metadata".to_string()));

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("BIND_ADDR is not a valid socket address: {bind_addr}"))?;

        let mut cors_origins: Vec<String> = var("CORS_ORIGINS")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        // 公開ポートが指定されていれば自己オリジンを許可リストに足す
        if let Some(port) = var("PUBLIC_PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PUBLIC_PORT is not a valid port: {port}"))?;
            cors_origins.push(format!("https://localhost:{port}"));
            cors_origins.push(format!("https://127.0.0.1:{port}"));
        }

        let ledger_timeout = match var("LEDGER_TIMEOUT_SECS") {
            Some(s) => Duration::from_secs(
                s.parse::<u64>()
                    .with_context(|| format!("LEDGER_TIMEOUT_SECS is not a number: {s}"))?,
            ),
            None => Duration::from_secs(10),
        };

        Ok(Self {
            rpc_url,
            contract_address,
            chain_id,
            asset_root,
            bind_addr,
            cors_origins,
            ledger_timeout,
        })
    }
}

/// Gatewayの共有状態。起動時に一度だけ構築し、全リクエストで共有する。
pub struct GatewayState {
    /// NFT所有台帳（トレイトで抽象化、テストではフェイクに差し替え）
    pub ledger: Box<dyn NftLedger>,
    /// アセットストア
    pub assets: AssetStore,
}
