use crate::{
    ledger::{
        LedgerClient,
        SubscriptionError,
    },
    primitives::{
        FlightStatus,
        StatusRequest,
    },
};

use tokio::sync::mpsc;
use tracing::{
    debug,
    info,
    warn,
};

use std::sync::Arc;

/// Typed wrapper over the ledger's two long-lived event streams.
///
/// `OracleRequest` events are forwarded into the dispatcher channel;
/// `FlightStatusInfo` events are logged and nothing else depends on them. A
/// failure while handling one event never terminates the stream.
pub struct EventSubscriber<L> {
    ledger: Arc<L>,
}

impl<L: LedgerClient> EventSubscriber<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Runs until the request stream ends or the dispatcher drops its
    /// channel. The informational stream is its own fault domain: a failure
    /// there is logged and request delivery carries on without it.
    pub async fn run(
        self,
        request_tx: mpsc::Sender<StatusRequest>,
    ) -> Result<(), SubscriptionError> {
        // The informational stream lives in its own task; it must never be
        // able to stall or abort request delivery.
        match self.ledger.subscribe_status_info().await {
            Ok(mut status_info) => {
                tokio::spawn(async move {
                    while let Some(info) = status_info.recv().await {
                        match FlightStatus::from_wire(info.status) {
                            Some(status) => info!(
                                flight = %info.flight,
                                airline = %info.airline,
                                ?status,
                                "flight status finalized"
                            ),
                            None => warn!(
                                flight = %info.flight,
                                code = info.status,
                                "flight status finalized with unknown code"
                            ),
                        }
                    }
                    warn!("FlightStatusInfo stream ended");
                });
            }
            Err(err) => {
                warn!(%err, "FlightStatusInfo subscription unavailable, continuing without it")
            }
        }

        let mut requests = self.ledger.subscribe_requests().await?;
        while let Some(request) = requests.recv().await {
            debug!(index = request.index, flight = %request.flight, "oracle request received");
            if request_tx.send(request).await.is_err() {
                return Err(SubscriptionError::ChannelClosed);
            }
        }

        Err(SubscriptionError::StreamEnded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bootstrap::Bootstrap,
        dispatcher::ResponseDispatcher,
        ledger::{
            LedgerClient,
            MockLedgerClient,
        },
        primitives::{
            Address,
            FlightStatus,
            StatusInfo,
            U256,
        },
        registry::OracleRegistry,
        test_utils::{
            oracle_address,
            scenario_registry,
            status_request,
            FixedSampler,
            SCENARIO_INDEXES,
        },
    };

    use tokio::time::{
        sleep,
        timeout,
        Duration,
    };

    #[tokio::test]
    async fn forwards_requests_in_delivery_order() {
        let ledger = Arc::new(MockLedgerClient::default());
        let (request_tx, mut request_rx) = mpsc::channel(16);

        ledger.push_request(status_request(3)).await;
        ledger.push_request(status_request(7)).await;

        tokio::spawn(EventSubscriber::new(Arc::clone(&ledger)).run(request_tx));

        let first = timeout(Duration::from_secs(1), request_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let second = timeout(Duration::from_secs(1), request_rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.index, 3);
        assert_eq!(second.index, 7);
    }

    #[tokio::test]
    async fn status_info_events_do_not_reach_the_dispatcher() {
        let ledger = Arc::new(MockLedgerClient::default());
        let (request_tx, mut request_rx) = mpsc::channel(16);

        ledger
            .push_status_info(StatusInfo {
                airline: Address::new([9u8; 20]),
                flight: "ND1309".to_string(),
                timestamp: U256::from(1u64),
                status: 20,
            })
            .await;
        ledger.push_request(status_request(5)).await;

        tokio::spawn(EventSubscriber::new(Arc::clone(&ledger)).run(request_tx));

        let forwarded = timeout(Duration::from_secs(1), request_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(forwarded.index, 5);
        assert!(request_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn status_info_failure_does_not_stop_request_delivery() {
        let ledger = Arc::new(MockLedgerClient::default());
        let (request_tx, mut request_rx) = mpsc::channel(16);

        // Claim the informational feed up front so the subscriber's own
        // attempt fails; requests must still flow.
        let _info_feed = ledger.subscribe_status_info().await.unwrap();
        ledger.push_request(status_request(4)).await;

        tokio::spawn(EventSubscriber::new(Arc::clone(&ledger)).run(request_tx));

        let forwarded = timeout(Duration::from_secs(1), request_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(forwarded.index, 4);
    }

    #[tokio::test]
    async fn stream_continues_after_a_fully_failing_event() {
        let ledger = Arc::new(MockLedgerClient::default());
        let registry = Arc::new(scenario_registry());

        // Every oracle matching index 3 fails; index 6 matches only oracle 3.
        for n in [1, 2, 5] {
            ledger.fail_submission(oracle_address(n));
        }

        let (request_tx, request_rx) = mpsc::channel(16);
        let dispatcher = ResponseDispatcher::new(
            Arc::clone(&ledger),
            Arc::clone(&registry),
            Arc::new(FixedSampler(FlightStatus::OnTime)),
        );
        tokio::spawn(dispatcher.run(request_rx));
        tokio::spawn(EventSubscriber::new(Arc::clone(&ledger)).run(request_tx));

        ledger.push_request(status_request(3)).await;
        ledger.push_request(status_request(6)).await;

        let mut submissions = ledger.submissions();
        for _ in 0..100 {
            if !submissions.is_empty() {
                break;
            }
            sleep(Duration::from_millis(10)).await;
            submissions = ledger.submissions();
        }

        let submitters: Vec<Address> =
            submissions.iter().map(|response| response.oracle).collect();
        assert_eq!(submitters, vec![oracle_address(3)]);
    }

    // Full pipeline over the mock ledger: bootstrap registers the fleet,
    // the subscriber feeds the dispatcher, and matching oracles submit.
    #[tokio::test]
    async fn request_event_flows_through_to_submissions() {
        let ledger = Arc::new(MockLedgerClient::default());
        let registry = Arc::new(OracleRegistry::default());

        let mut accounts = vec![oracle_address(0)];
        for (i, indexes) in SCENARIO_INDEXES.iter().enumerate() {
            let oracle = oracle_address(i as u8 + 1);
            accounts.push(oracle);
            ledger.assign_indexes(oracle, *indexes);
        }
        ledger.set_accounts(accounts);
        ledger.set_registration_fee(U256::from(1_000_000_000u64));

        Bootstrap::new(Arc::clone(&ledger), Arc::clone(&registry), 5)
            .run()
            .await
            .unwrap();
        assert_eq!(registry.len(), 5);

        let (request_tx, request_rx) = mpsc::channel(16);
        let dispatcher = ResponseDispatcher::new(
            Arc::clone(&ledger),
            Arc::clone(&registry),
            Arc::new(FixedSampler(FlightStatus::LateAirline)),
        );
        tokio::spawn(dispatcher.run(request_rx));
        tokio::spawn(EventSubscriber::new(Arc::clone(&ledger)).run(request_tx));

        ledger.push_request(status_request(3)).await;

        let mut submissions = ledger.submissions();
        for _ in 0..100 {
            if submissions.len() >= 3 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
            submissions = ledger.submissions();
        }

        let mut submitters: Vec<Address> =
            submissions.iter().map(|response| response.oracle).collect();
        submitters.sort();

        let mut expected = vec![oracle_address(1), oracle_address(2), oracle_address(5)];
        expected.sort();

        assert_eq!(submitters, expected);
        assert!(submissions
            .iter()
            .all(|response| response.status == FlightStatus::LateAirline));
    }
}
