use flight_oracle_server::{
    api,
    bootstrap::Bootstrap,
    dispatcher::{
        RandomSampler,
        ResponseDispatcher,
    },
    ledger::RpcLedgerClient,
    registry::OracleRegistry,
    subscriber::EventSubscriber,
    OracleServerConfig,
    OracleServerError,
};

use alloy_network::Ethereum;
use alloy_provider::RootProvider;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use anyhow::Result;

use std::{
    net::SocketAddr,
    sync::Arc,
};

const REQUEST_CHANNEL_SIZE: usize = 1_000;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args
    let config = OracleServerConfig::parse();
    let api_addr: SocketAddr = config.api_listen_addr.parse()?;

    let provider = RootProvider::<Ethereum>::connect(&config.ws_url).await?;

    let ledger = Arc::new(RpcLedgerClient::new(
        provider,
        config.app_address,
        config.data_address,
    ));

    serve(ledger, config.oracle_count, api_addr).await?;
    Ok(())
}

/// Bootstrap the fleet, then run the subscriber/dispatcher pipeline until a
/// stream fails. The process has no global deadline; it runs until
/// terminated externally.
async fn serve(
    ledger: Arc<RpcLedgerClient>,
    oracle_count: usize,
    api_addr: SocketAddr,
) -> Result<(), OracleServerError> {
    let registry = Arc::new(OracleRegistry::default());

    Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), oracle_count)
        .run()
        .await?;

    tokio::spawn(async move {
        if let Err(err) = api::serve(api_addr).await {
            error!(?err, "informational api exited");
        }
    });

    let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_SIZE);
    let dispatcher = ResponseDispatcher::new(Arc::clone(&ledger), registry, Arc::new(RandomSampler));
    tokio::spawn(dispatcher.run(request_rx));

    EventSubscriber::new(ledger).run(request_tx).await?;
    Ok(())
}
