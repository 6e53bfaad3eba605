mod error;
pub use error::OracleServerError;

mod config;
pub use config::OracleServerConfig;

pub mod primitives;

pub mod ledger;

pub mod registry;

pub mod subscriber;

pub mod dispatcher;

pub mod bootstrap;

pub mod api;

#[cfg(any(test, feature = "test"))]
pub mod test_utils;
