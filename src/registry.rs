use crate::primitives::{
    Address,
    OracleIdentity,
    OracleIndexes,
};

use parking_lot::RwLock;

use std::collections::HashMap;

/// In-memory mapping from oracle address to its assigned index set.
///
/// Populated by the bootstrap registration loop and read concurrently by the
/// dispatcher once subscriptions are running. Writes take the lock
/// exclusively, so a reader can never observe a partially written index set
/// for a single identity.
#[derive(Debug, Default)]
pub struct OracleRegistry {
    oracles: RwLock<HashMap<Address, OracleIndexes>>,
}

impl OracleRegistry {
    /// Adds or overwrites the index set for `address`, returning the previous
    /// set if one existed. Last write wins for repeated registrations.
    pub fn register(&self, address: Address, indexes: OracleIndexes) -> Option<OracleIndexes> {
        self.oracles.write().insert(address, indexes)
    }

    /// Every registered oracle whose index set contains `index`, in no
    /// particular order. Empty when nothing matches; never an error.
    pub fn matching_oracles(&self, index: u8) -> Vec<Address> {
        self.oracles
            .read()
            .iter()
            .filter(|(_, indexes)| indexes.contains(&index))
            .map(|(address, _)| *address)
            .collect()
    }

    /// Snapshot of the registered fleet.
    pub fn oracles(&self) -> Vec<OracleIdentity> {
        self.oracles
            .read()
            .iter()
            .map(|(&address, &indexes)| OracleIdentity { address, indexes })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.oracles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.read().is_empty()
    }
}
