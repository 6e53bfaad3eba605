use alloy_network::TransactionBuilder;
use alloy_provider::{
    Provider,
    RootProvider,
};
use alloy_rpc_types::{
    BlockNumberOrTag,
    Filter,
    TransactionRequest,
};
use alloy_sol_types::{
    sol,
    SolCall,
    SolEvent,
};

use alloy::primitives::LogData;

use tokio::sync::{
    broadcast::error::RecvError,
    mpsc,
};
use tracing::{
    error,
    warn,
};

use crate::{
    ledger::{
        LedgerClient,
        LedgerReadError,
        LedgerWriteError,
        SubscriptionError,
        EVENT_CHANNEL_SIZE,
    },
    primitives::{
        Address,
        OracleIndexes,
        StatusInfo,
        StatusRequest,
        StatusResponse,
        B256,
        U256,
    },
};

use async_trait::async_trait;

sol! {
    #[derive(Debug)]
    event OracleRequest(uint8 index, address airline, string flight, uint256 timestamp);

    #[derive(Debug)]
    event FlightStatusInfo(address airline, string flight, uint256 timestamp, uint8 status);

    function isOperational() external view returns (bool);

    function REGISTRATION_FEE() external view returns (uint256);

    function getMyIndexes() external view returns (uint8[3] memory);

    function registerOracle() external payable;

    function submitOracleResponse(uint8 index, address airline, string flight, uint256 timestamp, uint8 statusCode) external;

    function authorizeCaller(address contractAddress) external;
}

/// Gas limits lifted from the reference deployment.
const REGISTRATION_GAS: u64 = 4_000_000;
const SUBMISSION_GAS: u64 = 1_000_000;

type PubSubProvider = RootProvider;

/// [`LedgerClient`] backed by a websocket RPC provider.
///
/// Reads go through `eth_call`; writes are `eth_sendTransaction` from
/// unlocked dev-chain accounts, so no local signing is involved. Event
/// subscriptions deliver the full history from block 0 (via `eth_getLogs`)
/// followed by the live tail, which means an event near the subscription
/// start may be delivered twice; consumers must treat delivery as
/// at-least-once.
///
/// # Example
/// ``` no_run
/// use flight_oracle_server::{ledger::RpcLedgerClient, primitives::Address};
///
/// use alloy_network::Ethereum;
/// use alloy_provider::RootProvider;
///
/// #[tokio::main]
/// async fn main() {
///     let provider = RootProvider::<Ethereum>::connect("ws://127.0.0.1:8545")
///         .await
///         .unwrap();
///
///     let app = Address::new([1; 20]);
///     let data = Address::new([2; 20]);
///     let ledger = RpcLedgerClient::new(provider, app, data);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RpcLedgerClient {
    provider: PubSubProvider,
    app_address: Address,
    data_address: Address,
}

impl RpcLedgerClient {
    pub fn new(provider: PubSubProvider, app_address: Address, data_address: Address) -> Self {
        Self {
            provider,
            app_address,
            data_address,
        }
    }

    /// Filter for one event signature on the app contract, covering the full
    /// chain history.
    fn event_filter(&self, signature: B256) -> Filter {
        Filter::new()
            .address(self.app_address)
            .event_signature(signature)
            .from_block(BlockNumberOrTag::Earliest)
    }

    async fn read<C: SolCall>(
        &self,
        to: Address,
        from: Option<Address>,
        call: C,
    ) -> Result<C::Return, LedgerReadError> {
        let mut tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        if let Some(from) = from {
            tx = tx.with_from(from);
        }

        let data = self.provider.call(&tx).await?;
        Ok(C::abi_decode_returns(&data, true)?)
    }

    async fn write<C: SolCall>(
        &self,
        to: Address,
        from: Address,
        value: Option<U256>,
        gas_limit: Option<u64>,
        call: C,
    ) -> Result<B256, LedgerWriteError> {
        let mut tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(call.abi_encode());
        if let Some(value) = value {
            tx = tx.with_value(value);
        }
        if let Some(gas_limit) = gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }

        let pending = self.provider.send_transaction(tx).await?;
        let receipt = pending.get_receipt().await?;
        if !receipt.status() {
            return Err(LedgerWriteError::Reverted(receipt.transaction_hash));
        }

        Ok(receipt.transaction_hash)
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerReadError> {
        Ok(self.provider.get_accounts().await?)
    }

    async fn is_operational(&self) -> Result<bool, LedgerReadError> {
        let ret = self
            .read(self.app_address, None, isOperationalCall {})
            .await?;
        Ok(ret._0)
    }

    async fn registration_fee(&self) -> Result<U256, LedgerReadError> {
        let ret = self
            .read(self.app_address, None, REGISTRATION_FEECall {})
            .await?;
        Ok(ret._0)
    }

    async fn oracle_indexes(&self, from: Address) -> Result<OracleIndexes, LedgerReadError> {
        let ret = self
            .read(self.app_address, Some(from), getMyIndexesCall {})
            .await?;
        Ok(ret._0)
    }

    async fn authorize_app(&self, from: Address) -> Result<(), LedgerWriteError> {
        self.write(
            self.data_address,
            from,
            None,
            None,
            authorizeCallerCall {
                contractAddress: self.app_address,
            },
        )
        .await?;
        Ok(())
    }

    async fn register_oracle(&self, from: Address, fee: U256) -> Result<(), LedgerWriteError> {
        self.write(
            self.app_address,
            from,
            Some(fee),
            Some(REGISTRATION_GAS),
            registerOracleCall {},
        )
        .await?;
        Ok(())
    }

    async fn submit_response(&self, response: &StatusResponse) -> Result<(), LedgerWriteError> {
        self.write(
            self.app_address,
            response.oracle,
            None,
            Some(SUBMISSION_GAS),
            submitOracleResponseCall {
                index: response.index,
                airline: response.airline,
                flight: response.flight.clone(),
                timestamp: response.timestamp,
                statusCode: response.status.wire(),
            },
        )
        .await?;
        Ok(())
    }

    async fn subscribe_requests(
        &self,
    ) -> Result<mpsc::Receiver<StatusRequest>, SubscriptionError> {
        let filter = self.event_filter(OracleRequest::SIGNATURE_HASH);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        // Live tail first so nothing between the history fetch and the
        // subscription start is lost; the overlap only produces duplicates.
        let mut subscription = self.provider.subscribe_logs(&filter).await?;
        let provider = self.provider.clone();

        tokio::spawn(async move {
            match provider.get_logs(&filter).await {
                Ok(logs) => {
                    for log in logs {
                        match decode_request(log.data()) {
                            Ok(request) => {
                                if tx.send(request).await.is_err() {
                                    return;
                                }
                            }
                            Err(err) => error!(?err, "failed to decode historical OracleRequest"),
                        }
                    }
                }
                Err(err) => error!(?err, "failed to fetch OracleRequest history"),
            }

            loop {
                match subscription.recv().await {
                    Ok(log) => match decode_request(log.data()) {
                        Ok(request) => {
                            if tx.send(request).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => error!(?err, "failed to decode OracleRequest"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "OracleRequest subscription lagged")
                    }
                    Err(RecvError::Closed) => {
                        error!("OracleRequest subscription closed");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn subscribe_status_info(
        &self,
    ) -> Result<mpsc::Receiver<StatusInfo>, SubscriptionError> {
        let filter = self.event_filter(FlightStatusInfo::SIGNATURE_HASH);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        let mut subscription = self.provider.subscribe_logs(&filter).await?;
        let provider = self.provider.clone();

        tokio::spawn(async move {
            match provider.get_logs(&filter).await {
                Ok(logs) => {
                    for log in logs {
                        match decode_status_info(log.data()) {
                            Ok(info) => {
                                if tx.send(info).await.is_err() {
                                    return;
                                }
                            }
                            Err(err) => {
                                error!(?err, "failed to decode historical FlightStatusInfo")
                            }
                        }
                    }
                }
                Err(err) => error!(?err, "failed to fetch FlightStatusInfo history"),
            }

            loop {
                match subscription.recv().await {
                    Ok(log) => match decode_status_info(log.data()) {
                        Ok(info) => {
                            if tx.send(info).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => error!(?err, "failed to decode FlightStatusInfo"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "FlightStatusInfo subscription lagged")
                    }
                    Err(RecvError::Closed) => {
                        error!("FlightStatusInfo subscription closed");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

fn decode_request(log: &LogData) -> Result<StatusRequest, alloy_sol_types::Error> {
    let topics = OracleRequest::decode_topics(log.topics())?;
    let data = OracleRequest::abi_decode_data(&log.data, true)?;
    let event = OracleRequest::new(topics, data);

    Ok(StatusRequest {
        index: event.index,
        airline: event.airline,
        flight: event.flight,
        timestamp: event.timestamp,
    })
}

fn decode_status_info(log: &LogData) -> Result<StatusInfo, alloy_sol_types::Error> {
    let topics = FlightStatusInfo::decode_topics(log.topics())?;
    let data = FlightStatusInfo::abi_decode_data(&log.data, true)?;
    let event = FlightStatusInfo::new(topics, data);

    Ok(StatusInfo {
        airline: event.airline,
        flight: event.flight,
        timestamp: event.timestamp,
        status: event.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_oracle_request_log() {
        let airline = Address::new([3u8; 20]);
        let event = OracleRequest {
            index: 7,
            airline,
            flight: "ND1309".to_string(),
            timestamp: U256::from(1_600_000_000u64),
        };

        let request = decode_request(&event.encode_log_data()).unwrap();

        assert_eq!(
            request,
            StatusRequest {
                index: 7,
                airline,
                flight: "ND1309".to_string(),
                timestamp: U256::from(1_600_000_000u64),
            }
        );
    }

    #[test]
    fn decodes_flight_status_info_log() {
        let airline = Address::new([4u8; 20]);
        let event = FlightStatusInfo {
            airline,
            flight: "ND1309".to_string(),
            timestamp: U256::from(1_600_000_000u64),
            status: 20,
        };

        let info = decode_status_info(&event.encode_log_data()).unwrap();

        assert_eq!(info.airline, airline);
        assert_eq!(info.status, 20);
    }

    #[test]
    fn rejects_log_with_wrong_signature() {
        let event = FlightStatusInfo {
            airline: Address::new([4u8; 20]),
            flight: "ND1309".to_string(),
            timestamp: U256::ZERO,
            status: 0,
        };

        assert!(decode_request(&event.encode_log_data()).is_err());
    }
}
