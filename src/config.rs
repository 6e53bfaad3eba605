use crate::primitives::Address;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct OracleServerConfig {
    /// Websocket endpoint of the ledger node.
    #[arg(long, default_value = "ws://127.0.0.1:8545")]
    pub ws_url: String,
    /// Deployed app contract address (oracle registration, requests,
    /// responses).
    #[arg(long)]
    pub app_address: Address,
    /// Deployed data contract address (persistent storage; receives the
    /// caller authorization).
    #[arg(long)]
    pub data_address: Address,
    /// How many oracle identities to register from the pre-funded account
    /// pool. The first account is reserved as the owner and not counted.
    #[arg(long, default_value = "30")]
    pub oracle_count: usize,
    /// Listen address for the informational HTTP endpoint.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub api_listen_addr: String,
}
