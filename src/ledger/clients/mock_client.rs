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

use alloy_transport::TransportErrorKind;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use async_trait::async_trait;

use std::collections::{
    HashMap,
    HashSet,
};

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<Address>,
    operational: bool,
    registration_fee: U256,
    fee_read_fails: bool,
    index_assignments: HashMap<Address, OracleIndexes>,
    failing_registrations: HashSet<Address>,
    failing_submissions: HashSet<Address>,
    authorizations: Vec<Address>,
    registered: Vec<Address>,
    submissions: Vec<StatusResponse>,
}

/// An in-memory ledger.
///
/// Accounts, the registration fee, and index assignments are scripted up
/// front; registrations and submissions are recorded instead of sent, and
/// individual addresses can be made to fail. Events are fed by hand through
/// [`push_request`](MockLedgerClient::push_request) and
/// [`push_status_info`](MockLedgerClient::push_status_info).
///
/// ``` rust
/// use flight_oracle_server::{
///     ledger::{LedgerClient, MockLedgerClient},
///     primitives::{Address, U256},
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let ledger = MockLedgerClient::default();
///     ledger.set_accounts(vec![Address::new([0; 20]), Address::new([1; 20])]);
///     ledger.set_registration_fee(U256::from(1));
///     ledger.assign_indexes(Address::new([1; 20]), [1, 2, 3]);
///
///     let fee = ledger.registration_fee().await.unwrap();
///     ledger.register_oracle(Address::new([1; 20]), fee).await.unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct MockLedgerClient {
    state: Mutex<MockState>,
    request_tx: mpsc::Sender<StatusRequest>,
    request_rx: Mutex<Option<mpsc::Receiver<StatusRequest>>>,
    info_tx: mpsc::Sender<StatusInfo>,
    info_rx: Mutex<Option<mpsc::Receiver<StatusInfo>>>,
}

impl Default for MockLedgerClient {
    fn default() -> Self {
        let (request_tx, request_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (info_tx, info_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);

        Self {
            state: Mutex::new(MockState {
                operational: true,
                ..MockState::default()
            }),
            request_tx,
            request_rx: Mutex::new(Some(request_rx)),
            info_tx,
            info_rx: Mutex::new(Some(info_rx)),
        }
    }
}

impl MockLedgerClient {
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().accounts = accounts;
    }

    pub fn set_operational(&self, operational: bool) {
        self.state.lock().operational = operational;
    }

    pub fn set_registration_fee(&self, fee: U256) {
        self.state.lock().registration_fee = fee;
    }

    /// Makes every `REGISTRATION_FEE` read fail with a transport error.
    pub fn fail_fee_reads(&self) {
        self.state.lock().fee_read_fails = true;
    }

    /// Scripts the index set the contract will hand to `address`.
    pub fn assign_indexes(&self, address: Address, indexes: OracleIndexes) {
        self.state.lock().index_assignments.insert(address, indexes);
    }

    /// Makes `registerOracle` from `address` fail with a transport error.
    pub fn fail_registration(&self, address: Address) {
        self.state.lock().failing_registrations.insert(address);
    }

    /// Makes `submitOracleResponse` from `address` fail with a transport
    /// error.
    pub fn fail_submission(&self, address: Address) {
        self.state.lock().failing_submissions.insert(address);
    }

    /// Feeds an `OracleRequest` event into the request stream.
    pub async fn push_request(&self, request: StatusRequest) {
        let _ = self.request_tx.send(request).await;
    }

    /// Feeds a `FlightStatusInfo` event into the informational stream.
    pub async fn push_status_info(&self, info: StatusInfo) {
        let _ = self.info_tx.send(info).await;
    }

    /// Addresses that issued `authorizeCaller`.
    pub fn authorizations(&self) -> Vec<Address> {
        self.state.lock().authorizations.clone()
    }

    /// Addresses whose `registerOracle` transaction was accepted.
    pub fn registered(&self) -> Vec<Address> {
        self.state.lock().registered.clone()
    }

    /// Every accepted submission, in arrival order.
    pub fn submissions(&self) -> Vec<StatusResponse> {
        self.state.lock().submissions.clone()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerReadError> {
        Ok(self.state.lock().accounts.clone())
    }

    async fn is_operational(&self) -> Result<bool, LedgerReadError> {
        Ok(self.state.lock().operational)
    }

    async fn registration_fee(&self) -> Result<U256, LedgerReadError> {
        let state = self.state.lock();
        if state.fee_read_fails {
            return Err(TransportErrorKind::custom_str("fee read unavailable").into());
        }
        Ok(state.registration_fee)
    }

    async fn oracle_indexes(&self, from: Address) -> Result<OracleIndexes, LedgerReadError> {
        self.state
            .lock()
            .index_assignments
            .get(&from)
            .copied()
            .ok_or_else(|| TransportErrorKind::custom_str("no indexes assigned").into())
    }

    async fn authorize_app(&self, from: Address) -> Result<(), LedgerWriteError> {
        self.state.lock().authorizations.push(from);
        Ok(())
    }

    async fn register_oracle(&self, from: Address, fee: U256) -> Result<(), LedgerWriteError> {
        let mut state = self.state.lock();
        if state.failing_registrations.contains(&from) {
            return Err(TransportErrorKind::custom_str("insufficient funds for gas").into());
        }
        if fee != state.registration_fee {
            return Err(LedgerWriteError::Reverted(B256::ZERO));
        }
        state.registered.push(from);
        Ok(())
    }

    async fn submit_response(&self, response: &StatusResponse) -> Result<(), LedgerWriteError> {
        let mut state = self.state.lock();
        if state.failing_submissions.contains(&response.oracle) {
            return Err(TransportErrorKind::custom_str("submission rejected").into());
        }
        state.submissions.push(response.clone());
        Ok(())
    }

    async fn subscribe_requests(
        &self,
    ) -> Result<mpsc::Receiver<StatusRequest>, SubscriptionError> {
        // The feed can only be handed out once.
        self.request_rx
            .lock()
            .take()
            .ok_or(SubscriptionError::AlreadySubscribed)
    }

    async fn subscribe_status_info(
        &self,
    ) -> Result<mpsc::Receiver<StatusInfo>, SubscriptionError> {
        self.info_rx
            .lock()
            .take()
            .ok_or(SubscriptionError::AlreadySubscribed)
    }
}
