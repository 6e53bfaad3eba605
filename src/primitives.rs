pub use alloy_primitives::{
    Address,
    B256,
    U256,
};

/// The three index buckets assigned to an oracle at registration.
pub type OracleIndexes = [u8; 3];

/// Flight status opinions an oracle may submit.
///
/// The discriminants are the wire-level codes the contract expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FlightStatus {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl FlightStatus {
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    /// Wire-level code submitted to the contract.
    pub fn wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.wire() == code)
    }
}

/// A registered oracle account and the index set the contract assigned to it.
/// Immutable after registration; collisions across oracles are expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleIdentity {
    pub address: Address,
    pub indexes: OracleIndexes,
}

/// A decoded `OracleRequest` event.
///
/// `(airline, flight, timestamp)` is the key the contract uses to correlate
/// responses; `index` selects which oracle group must answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRequest {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: U256,
}

/// One oracle's answer to a [`StatusRequest`], submitted as a transaction
/// from the oracle's own account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub oracle: Address,
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: U256,
    pub status: FlightStatus,
}

/// A decoded `FlightStatusInfo` event, published once the contract reaches
/// consensus. Observability only; nothing dispatches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub airline: Address,
    pub flight: String,
    pub timestamp: U256,
    pub status: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_match_contract_enumeration() {
        let codes: Vec<u8> = FlightStatus::ALL.iter().map(|s| s.wire()).collect();
        assert_eq!(codes, vec![0, 10, 20, 30, 40, 50]);
    }

    #[test]
    fn from_wire_round_trips_known_codes() {
        for status in FlightStatus::ALL {
            assert_eq!(FlightStatus::from_wire(status.wire()), Some(status));
        }
        assert_eq!(FlightStatus::from_wire(1), None);
        assert_eq!(FlightStatus::from_wire(60), None);
    }
}
