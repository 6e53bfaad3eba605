#![cfg(any(test, feature = "test"))]

use crate::{
    dispatcher::StatusSampler,
    primitives::{
        Address,
        FlightStatus,
        OracleIndexes,
        StatusRequest,
        U256,
    },
    registry::OracleRegistry,
};

/// Index sets for the five-oracle reference scenario. Oracles 1, 2 and 5
/// hold index 3; nobody holds index 99.
pub const SCENARIO_INDEXES: [OracleIndexes; 5] =
    [[1, 2, 3], [2, 3, 4], [5, 6, 7], [1, 5, 9], [3, 8, 9]];

/// Deterministic oracle address: every byte set to `n`.
pub fn oracle_address(n: u8) -> Address {
    Address::new([n; 20])
}

/// A registry pre-populated with the reference scenario, oracle `i + 1`
/// holding `SCENARIO_INDEXES[i]`.
pub fn scenario_registry() -> OracleRegistry {
    let registry = OracleRegistry::default();
    for (i, indexes) in SCENARIO_INDEXES.iter().enumerate() {
        registry.register(oracle_address(i as u8 + 1), *indexes);
    }
    registry
}

/// A request event for `index` with a fixed flight key.
pub fn status_request(index: u8) -> StatusRequest {
    StatusRequest {
        index,
        airline: Address::new([0xaa; 20]),
        flight: "ND1309".to_string(),
        timestamp: U256::from(1_600_000_000u64),
    }
}

/// Sampler that always draws the same status, so dispatch structure can be
/// asserted without randomness.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub FlightStatus);

impl StatusSampler for FixedSampler {
    fn draw(&self) -> FlightStatus {
        self.0
    }
}
