//! # Tokengate Gateway
//!
//! NFT所有者だけに高解像度ファイルを返すダウンロードサーバー。
//!
//! ## 処理の流れ
//! 1. `GET /download-nft/{token_id}/{signature}` を受信
//! 2. token idからチャレンジ文字列を組み立て、署名から署名者を復元
//! 3. ERC-721コントラクトの`ownerOf`を読み出して所有者と突き合わせ
//! 4. 一致すれば`<ASSET_ROOT>/<token_id>.jpg`をダウンロードとして返却
//!
//! TLS終端とHTTPSリダイレクトは前段のプロキシに任せる。

mod assets;
mod config;
mod endpoints;
mod error;
mod gate;
mod ledger;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::assets::AssetStore;
use crate::config::{Config, GatewayState};
use crate::ledger::EvmLedger;

/// 設定のCORSオリジンからレイヤーを組み立てる。
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin: {origin}"))
        })
        .collect::<anyhow::Result<_>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    tracing::info!(
        rpc_url = %config.rpc_url,
        contract = %config.contract_address,
        chain_id = ?config.chain_id,
        asset_root = %config.asset_root.display(),
        "loaded configuration"
    );

    let ledger = EvmLedger::new(
        config.rpc_url.clone(),
        config.contract_address,
        config.ledger_timeout,
    )?;

    let state = Arc::new(GatewayState {
        ledger: Box::new(ledger),
        assets: AssetStore::new(config.asset_root.clone()),
    });

    let app = axum::Router::new()
        .route(
            "/download-nft/{token_id}/{signature}",
            axum::routing::get(endpoints::handle_download),
        )
        .route("/", axum::routing::get(endpoints::handle_index))
        .layer(cors_layer(&config.cors_origins)?)
        .layer(CompressionLayer::new())
        .with_state(state);

    tracing::info!(addr = %config.bind_addr, "starting gateway");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
