use crate::{
    bootstrap::BootstrapError,
    ledger::SubscriptionError,
};

use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleServerError {
    #[error("oracle bootstrap failed")]
    Bootstrap(#[from] BootstrapError),
    #[error("event subscription failed")]
    Subscription(#[from] SubscriptionError),
}
