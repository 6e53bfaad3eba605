use crate::{
    ledger::{
        LedgerClient,
        LedgerReadError,
        LedgerWriteError,
    },
    primitives::{
        Address,
        OracleIndexes,
        U256,
    },
    registry::OracleRegistry,
};

use tracing::{
    error,
    info,
    warn,
};

use std::sync::Arc;

/// A failure that aborts the whole startup sequence. Per-oracle failures are
/// not in here; they are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("ledger read failed")]
    Read(#[from] LedgerReadError),
    #[error("no pre-funded accounts available")]
    NoAccounts,
}

/// One oracle failed to register. That oracle is excluded from the registry
/// for the process lifetime; the rest of the pool is unaffected.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("registration transaction failed")]
    Registration(#[from] LedgerWriteError),
    #[error("index lookup failed")]
    IndexLookup(#[from] LedgerReadError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Pool identities for which registration was attempted.
    pub attempted: usize,
    /// How many of those ended up in the registry.
    pub registered: usize,
}

/// One-time startup sequence: authorize the app contract, fetch the
/// registration fee, register every oracle in the pool, and populate the
/// registry. Not re-entrant.
///
/// The first pre-funded account is reserved as the owner/operator and only
/// used for the authorization grant; the rest become the oracle pool, capped
/// at `oracle_count`. Completion requires every pool identity to have been
/// attempted exactly once, not for every attempt to succeed.
pub struct Bootstrap<L> {
    ledger: Arc<L>,
    registry: Arc<OracleRegistry>,
    oracle_count: usize,
}

impl<L: LedgerClient> Bootstrap<L> {
    pub fn new(ledger: Arc<L>, registry: Arc<OracleRegistry>, oracle_count: usize) -> Self {
        Self {
            ledger,
            registry,
            oracle_count,
        }
    }

    pub async fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        let accounts = self.ledger.accounts().await?;
        let (owner, pool) = accounts.split_first().ok_or(BootstrapError::NoAccounts)?;

        match self.ledger.is_operational().await {
            Ok(true) => {}
            Ok(false) => warn!("contract reports not operational, registrations may revert"),
            Err(err) => warn!(%err, "operational check failed"),
        }

        // Idempotent privilege grant; a failure here is not fatal since the
        // grant may already be in place from an earlier run.
        match self.ledger.authorize_app(*owner).await {
            Ok(()) => info!(owner = %owner, "app contract authorized against data contract"),
            Err(err) => error!(%err, "failed to authorize app contract"),
        }

        let fee = self.ledger.registration_fee().await?;
        info!(%fee, "registration fee fetched");

        let pool = &pool[..pool.len().min(self.oracle_count)];
        let mut registered = 0;
        for &oracle in pool {
            match self.register_one(oracle, fee).await {
                Ok(indexes) => {
                    self.registry.register(oracle, indexes);
                    registered += 1;
                    info!(oracle = %oracle, ?indexes, "oracle registered");
                }
                Err(err) => error!(oracle = %oracle, %err, "oracle registration failed"),
            }
        }

        info!(
            attempted = pool.len(),
            registered, "oracle registration complete"
        );

        Ok(BootstrapReport {
            attempted: pool.len(),
            registered,
        })
    }

    async fn register_one(
        &self,
        oracle: Address,
        fee: U256,
    ) -> Result<OracleIndexes, RegistrationError> {
        self.ledger.register_oracle(oracle, fee).await?;
        Ok(self.ledger.oracle_indexes(oracle).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::MockLedgerClient,
        test_utils::{
            oracle_address,
            SCENARIO_INDEXES,
        },
    };

    const FEE: u64 = 1_000_000_000;

    fn setup() -> (Arc<MockLedgerClient>, Arc<OracleRegistry>) {
        let ledger = Arc::new(MockLedgerClient::default());

        let mut accounts = vec![oracle_address(0)];
        for (i, indexes) in SCENARIO_INDEXES.iter().enumerate() {
            let oracle = oracle_address(i as u8 + 1);
            accounts.push(oracle);
            ledger.assign_indexes(oracle, *indexes);
        }
        ledger.set_accounts(accounts);
        ledger.set_registration_fee(U256::from(FEE));

        (ledger, Arc::new(OracleRegistry::default()))
    }

    #[tokio::test]
    async fn registers_the_whole_pool() {
        let (ledger, registry) = setup();

        let report = Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), 5)
            .run()
            .await
            .unwrap();

        assert_eq!(
            report,
            BootstrapReport {
                attempted: 5,
                registered: 5
            }
        );
        assert_eq!(registry.len(), 5);
        assert_eq!(ledger.authorizations(), vec![oracle_address(0)]);
        assert_eq!(registry.matching_oracles(2).len(), 2);
    }

    #[tokio::test]
    async fn one_failed_registration_is_skipped() {
        let (ledger, registry) = setup();
        ledger.fail_registration(oracle_address(2));

        let report = Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), 5)
            .run()
            .await
            .unwrap();

        assert_eq!(
            report,
            BootstrapReport {
                attempted: 5,
                registered: 4
            }
        );
        assert_eq!(registry.len(), 4);
        assert!(registry
            .oracles()
            .iter()
            .all(|identity| identity.address != oracle_address(2)));
        // The failed oracle can never match a request.
        assert!(!registry.matching_oracles(4).contains(&oracle_address(2)));
    }

    #[tokio::test]
    async fn fee_read_failure_aborts_bootstrap() {
        let (ledger, registry) = setup();
        ledger.fail_fee_reads();

        let result = Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), 5)
            .run()
            .await;

        assert!(matches!(result, Err(BootstrapError::Read(_))));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn empty_account_pool_is_an_error() {
        let (ledger, registry) = setup();
        ledger.set_accounts(vec![]);

        let result = Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), 5)
            .run()
            .await;

        assert!(matches!(result, Err(BootstrapError::NoAccounts)));
    }

    #[tokio::test]
    async fn pool_is_capped_at_oracle_count() {
        let (ledger, registry) = setup();

        let report = Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), 3)
            .run()
            .await
            .unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn not_operational_contract_still_registers() {
        let (ledger, registry) = setup();
        ledger.set_operational(false);

        let report = Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), 5)
            .run()
            .await
            .unwrap();

        assert_eq!(report.registered, 5);
    }
}
