use crate::{
    ledger::LedgerClient,
    primitives::{
        FlightStatus,
        StatusRequest,
        StatusResponse,
    },
    registry::OracleRegistry,
};

use rand::Rng;
use tokio::{
    sync::mpsc,
    task::JoinSet,
};
use tracing::{
    debug,
    info,
    warn,
};

use std::sync::Arc;

/// Source of the status opinion an oracle submits.
///
/// Injectable so tests can pin the draw and assert on dispatch structure
/// without depending on randomness.
pub trait StatusSampler: Send + Sync + 'static {
    fn draw(&self) -> FlightStatus;
}

/// Uniform draw over the full status enumeration.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSampler;

impl StatusSampler for RandomSampler {
    fn draw(&self) -> FlightStatus {
        FlightStatus::ALL[rand::thread_rng().gen_range(0..FlightStatus::ALL.len())]
    }
}

/// Consumes [`StatusRequest`]s and fans out one independent submission per
/// matching oracle.
///
/// Each submission draws its own status, uncoordinated with its siblings;
/// the contract's consensus step must observe organic (dis)agreement. A
/// failed submission is logged with the oracle address and request key and
/// never blocks or cancels the others.
pub struct ResponseDispatcher<L, S = RandomSampler> {
    ledger: Arc<L>,
    registry: Arc<OracleRegistry>,
    sampler: Arc<S>,
}

impl<L, S> Clone for ResponseDispatcher<L, S> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            registry: Arc::clone(&self.registry),
            sampler: Arc::clone(&self.sampler),
        }
    }
}

impl<L: LedgerClient, S: StatusSampler> ResponseDispatcher<L, S> {
    pub fn new(ledger: Arc<L>, registry: Arc<OracleRegistry>, sampler: Arc<S>) -> Self {
        Self {
            ledger,
            registry,
            sampler,
        }
    }

    /// Drains the request channel, spawning one dispatch task per event so a
    /// slow submission never queues unrelated requests behind it.
    pub async fn run(self, mut request_rx: mpsc::Receiver<StatusRequest>) {
        while let Some(request) = request_rx.recv().await {
            let dispatcher = self.clone();
            tokio::spawn(async move { dispatcher.dispatch(request).await });
        }
        warn!("request channel closed, dispatcher exiting");
    }

    /// Handles a single request event. Submission tasks are joined only so
    /// callers can await completion; control flow never depends on their
    /// outcome.
    pub async fn dispatch(&self, request: StatusRequest) {
        let matches = self.registry.matching_oracles(request.index);
        if matches.is_empty() {
            debug!(index = request.index, flight = %request.flight, "no matching oracles");
            return;
        }

        let mut submissions = JoinSet::new();
        for oracle in matches {
            let ledger = Arc::clone(&self.ledger);
            let response = StatusResponse {
                oracle,
                index: request.index,
                airline: request.airline,
                flight: request.flight.clone(),
                timestamp: request.timestamp,
                status: self.sampler.draw(),
            };

            submissions.spawn(async move {
                match ledger.submit_response(&response).await {
                    Ok(()) => info!(
                        oracle = %response.oracle,
                        flight = %response.flight,
                        index = response.index,
                        status = response.status.wire(),
                        "oracle response submitted"
                    ),
                    Err(err) => warn!(
                        oracle = %response.oracle,
                        flight = %response.flight,
                        index = response.index,
                        %err,
                        "oracle response failed"
                    ),
                }
            });
        }

        while submissions.join_next().await.is_some() {}
    }
}
