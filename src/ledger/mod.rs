pub mod clients;
pub use clients::{
    MockLedgerClient,
    RpcLedgerClient,
};

use crate::primitives::{
    Address,
    OracleIndexes,
    StatusInfo,
    StatusRequest,
    StatusResponse,
    B256,
    U256,
};

use alloy_provider::PendingTransactionError;
use alloy_transport::TransportError;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Buffer size for the typed event channels handed out by `subscribe_*`.
pub(crate) const EVENT_CHANNEL_SIZE: usize = 1_000;

/// A read-only contract call failed. Surfaced to the caller and never
/// retried by this layer.
#[derive(Debug, thiserror::Error)]
pub enum LedgerReadError {
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("failed to decode return data")]
    Decode(#[from] alloy_sol_types::Error),
}

/// A mutating submission failed. Isolated to the one oracle/event pair that
/// issued it; retry policy, if any, lives in callers.
#[derive(Debug, thiserror::Error)]
pub enum LedgerWriteError {
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("transaction not confirmed")]
    Confirmation(#[from] PendingTransactionError),
    #[error("transaction reverted: {0}")]
    Reverted(B256),
}

/// Transport-level failure of an event stream. Its own fault domain: logged
/// and surfaced, never a process crash.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("transport error")]
    Transport(#[from] TransportError),
    #[error("event stream ended")]
    StreamEnded,
    #[error("event consumer dropped its channel")]
    ChannelClosed,
    #[error("subscription already handed out")]
    AlreadySubscribed,
}

/// Read, write, and subscription access to the flight-insurance contracts.
///
/// Each method maps onto one contract method or event stream. Writes settle
/// asynchronously and are independent of each other; subscriptions deliver
/// the full history from block 0 followed by the live tail, and duplicate
/// delivery on reconnect must be tolerated by consumers.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
    /// The pre-funded account pool. The first entry is the owner/operator.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerReadError>;

    /// `isOperational` on the app contract.
    async fn is_operational(&self) -> Result<bool, LedgerReadError>;

    /// `REGISTRATION_FEE` on the app contract.
    async fn registration_fee(&self) -> Result<U256, LedgerReadError>;

    /// `getMyIndexes`, called as `from` (the contract keys the lookup on the
    /// caller).
    async fn oracle_indexes(&self, from: Address) -> Result<OracleIndexes, LedgerReadError>;

    /// `authorizeCaller(app)` on the data contract. Idempotent privilege
    /// grant; safe to repeat.
    async fn authorize_app(&self, from: Address) -> Result<(), LedgerWriteError>;

    /// `registerOracle`, paying exactly `fee` from the oracle's account.
    async fn register_oracle(&self, from: Address, fee: U256) -> Result<(), LedgerWriteError>;

    /// `submitOracleResponse`, sent from the responding oracle's account.
    async fn submit_response(&self, response: &StatusResponse) -> Result<(), LedgerWriteError>;

    /// Typed `OracleRequest` stream, history plus live tail.
    async fn subscribe_requests(
        &self,
    ) -> Result<mpsc::Receiver<StatusRequest>, SubscriptionError>;

    /// Typed `FlightStatusInfo` stream. Informational only.
    async fn subscribe_status_info(
        &self,
    ) -> Result<mpsc::Receiver<StatusInfo>, SubscriptionError>;
}
