//! Engine-level integration: admission, idempotent replay, the queued
//! ingress path, lifecycle and event wiring.

use matchcore_rs::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn engine_with(config: EngineConfig) -> Arc<MatchingEngine> {
    let engine = Arc::new(MatchingEngine::new(config).unwrap());
    engine.add_symbol("BTC/USD").unwrap();
    engine
}

fn default_engine() -> Arc<MatchingEngine> {
    engine_with(EngineConfig::default())
}

fn limit(side: Side, price: u64, quantity: u64) -> OrderIntent {
    OrderIntent::limit("BTC/USD", side, price, quantity, TimeInForce::Gtc)
}

#[test]
fn test_inline_submit_matches_and_publishes() {
    let engine = default_engine();
    let trades = engine.bus().subscribe(EventKind::Trade, 16);
    let deltas = engine.bus().subscribe(EventKind::BookDelta, 16);

    engine.submit_intent(limit(Side::Sell, 100, 5)).unwrap();
    let outcome = engine.submit_intent(limit(Side::Buy, 100, 5)).unwrap();

    assert_eq!(outcome.state, IntentState::Filled);
    assert_eq!(trades.drain().len(), 1);
    // Seed add + trade.
    assert_eq!(deltas.drain().len(), 2);

    // Fills flowed into the risk position book.
    assert_eq!(engine.gate().positions().net_position("BTC/USD"), 5);
}

#[test]
fn test_unknown_symbol() {
    let engine = default_engine();
    let intent = OrderIntent::limit("ETH/USD", Side::Buy, 100, 1, TimeInForce::Gtc);
    assert!(matches!(
        engine.submit_intent(intent),
        Err(EngineError::UnknownSymbol(symbol)) if symbol == "ETH/USD"
    ));
}

#[test]
fn test_idempotent_replay_of_rejection() {
    let engine = engine_with(EngineConfig {
        limits: RiskLimits {
            max_order_size: 10,
            ..Default::default()
        },
        ..Default::default()
    });

    let intent = limit(Side::Buy, 100, 50).with_client("c1", "ord-1");
    let first = engine.submit_intent(intent.clone());
    let replay = engine.submit_intent(intent);

    // Identical rejection both times.
    let expected = RiskRejection::OrderSize {
        observed: 50,
        limit: 10,
    };
    assert!(matches!(&first, Err(EngineError::Risk(r)) if *r == expected));
    assert!(matches!(&replay, Err(EngineError::Risk(r)) if *r == expected));
}

#[test]
fn test_accepted_replay_is_duplicate() {
    let engine = default_engine();
    let intent = limit(Side::Buy, 100, 1).with_client("c1", "ord-2");
    engine.submit_intent(intent.clone()).unwrap();
    assert!(matches!(
        engine.submit_intent(intent),
        Err(EngineError::DuplicateIntent(id)) if id == "ord-2"
    ));
}

#[test]
fn test_backpressure_hands_back() {
    let engine = engine_with(EngineConfig {
        ring_capacity: 2,
        ..Default::default()
    });
    // Without workers running, the ingress ring fills up.
    engine.enqueue_intent(limit(Side::Buy, 99, 1)).unwrap();
    engine.enqueue_intent(limit(Side::Buy, 98, 1)).unwrap();
    assert!(matches!(
        engine.enqueue_intent(limit(Side::Buy, 97, 1)),
        Err(EngineError::BackPressure)
    ));
}

#[test]
fn test_backpressure_releases_idempotency_for_retry() {
    let engine = engine_with(EngineConfig {
        ring_capacity: 1,
        ..Default::default()
    });
    engine.enqueue_intent(limit(Side::Buy, 99, 1)).unwrap();

    let retried = limit(Side::Buy, 98, 1).with_client("c1", "retry-1");
    assert!(matches!(
        engine.enqueue_intent(retried.clone()),
        Err(EngineError::BackPressure)
    ));
    // The shed intent's client order id was not burned: a retry is neither
    // a duplicate nor a replayed rejection.
    assert!(engine.submit_intent(retried).is_ok());
}

#[test]
fn test_queued_path_end_to_end() {
    let engine = engine_with(EngineConfig {
        worker_count: 2,
        ..Default::default()
    });
    engine.add_symbol("ETH/USD").unwrap();
    let trades = engine.bus().subscribe(EventKind::Trade, 64);

    MatchingEngine::start(&engine);
    assert_eq!(engine.state(), EngineState::Running);

    for (symbol, price) in [("BTC/USD", 100), ("ETH/USD", 50)] {
        engine
            .enqueue_intent(OrderIntent::limit(symbol, Side::Sell, price, 5, TimeInForce::Gtc))
            .unwrap();
        engine
            .enqueue_intent(OrderIntent::limit(symbol, Side::Buy, price, 5, TimeInForce::Gtc))
            .unwrap();
    }

    // Both symbols trade; wait for the workers to drain the queues.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = 0;
    while seen < 2 && Instant::now() < deadline {
        seen += trades.drain().len();
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(seen, 2);

    engine.shutdown();
    assert_eq!(engine.state(), EngineState::Stopped);

    // Post-drain ingress is refused.
    assert!(matches!(
        engine.enqueue_intent(limit(Side::Buy, 99, 1)),
        Err(EngineError::ShuttingDown)
    ));
    assert!(matches!(
        engine.submit_intent(limit(Side::Buy, 99, 1)),
        Err(EngineError::ShuttingDown)
    ));
}

#[test]
fn test_shutdown_drains_pending_intents() {
    let engine = engine_with(EngineConfig {
        worker_count: 1,
        ..Default::default()
    });
    MatchingEngine::start(&engine);

    for i in 0..50 {
        engine
            .enqueue_intent(limit(Side::Buy, 90 + (i % 5), 1))
            .unwrap();
    }
    engine.shutdown();

    // Every enqueued intent was matched before the workers stopped.
    let book = engine.book("BTC/USD").unwrap();
    assert_eq!(book.order_count(), 50);
}

#[test]
fn test_update_limits_emits_event_and_applies() {
    let engine = default_engine();
    let updates = engine.bus().subscribe(EventKind::LimitUpdate, 4);

    engine.update_limits(RiskLimits {
        max_order_size: 1,
        ..Default::default()
    });

    assert_eq!(updates.drain().len(), 1);
    assert!(matches!(
        engine.submit_intent(limit(Side::Buy, 100, 2)),
        Err(EngineError::Risk(RiskRejection::OrderSize { .. }))
    ));
}

#[test]
fn test_emergency_stop_round_trip() {
    let engine = default_engine();
    let stops = engine.bus().subscribe(EventKind::EmergencyStop, 4);

    engine.set_emergency_stop(true);
    assert!(matches!(
        engine.submit_intent(limit(Side::Buy, 100, 1)),
        Err(EngineError::Risk(RiskRejection::EmergencyStop))
    ));

    engine.set_emergency_stop(false);
    assert!(engine.submit_intent(limit(Side::Buy, 100, 1)).is_ok());
    assert_eq!(stops.drain().len(), 2);
}

#[test]
fn test_drawdown_auto_stop_publishes_event() {
    let engine = engine_with(EngineConfig {
        limits: RiskLimits {
            max_daily_loss: 100.0,
            ..Default::default()
        },
        ..Default::default()
    });
    let stops = engine.bus().subscribe(EventKind::EmergencyStop, 4);
    let violations = engine.bus().subscribe(EventKind::Violation, 4);

    engine.on_pnl_update(-250.0);

    assert!(engine.gate().is_emergency_stopped());
    assert_eq!(stops.drain().len(), 1);
    let recorded = violations.drain();
    assert_eq!(recorded.len(), 1);
    assert!(matches!(
        recorded[0].as_ref(),
        EngineEvent::Violation(v) if v.kind == ViolationKind::Drawdown
    ));
}

#[test]
fn test_cancel_and_modify_through_engine() {
    let engine = default_engine();
    let resting = engine
        .submit_intent(limit(Side::Buy, 99, 10))
        .unwrap()
        .order_id
        .unwrap();

    let outcome = engine
        .modify_order("BTC/USD", resting, Some(4), None)
        .unwrap();
    assert!(matches!(outcome, ModifyOutcome::Reduced { remaining: 4, .. }));

    assert_eq!(engine.cancel_order("BTC/USD", resting).unwrap(), 4);
    assert!(matches!(
        engine.cancel_order("BTC/USD", resting),
        Err(EngineError::Book(OrderBookError::OrderNotFound(_)))
    ));
}

#[test]
fn test_snapshot_through_engine() {
    let engine = default_engine();
    engine.submit_intent(limit(Side::Buy, 99, 10)).unwrap();
    engine.submit_intent(limit(Side::Sell, 101, 5)).unwrap();

    let snapshot = engine.snapshot("BTC/USD", 5).unwrap();
    assert_eq!(snapshot.best_bid(), Some((99, 10)));
    assert_eq!(snapshot.best_ask(), Some((101, 5)));
    assert!(engine.snapshot("DOGE/USD", 5).is_err());

    let package = SnapshotPackage::new(snapshot).unwrap();
    let json = package.to_json().unwrap();
    assert!(SnapshotPackage::from_json(&json).unwrap().validate().is_ok());
}

#[test]
fn test_frozen_book_refusals_are_not_fatal_events() {
    let engine = default_engine();
    let fatals = engine.bus().subscribe(EventKind::Fatal, 4);

    // Freeze the book through the matcher's invariant path.
    let book = engine.book("BTC/USD").unwrap();
    let mut bad = OrderIntent::limit("BTC/USD", Side::Buy, 100, 1, TimeInForce::Gtc);
    bad.quantity = 0;
    assert!(matches!(
        book.submit(&bad),
        Err(OrderBookError::InvariantViolation { .. })
    ));
    assert!(book.is_frozen());

    // Ingress sees the frozen-book refusal, never the violation itself.
    assert!(matches!(
        engine.submit_intent(limit(Side::Buy, 100, 1)),
        Err(EngineError::Book(OrderBookError::Frozen { .. }))
    ));
    assert!(matches!(
        engine.cancel_order("BTC/USD", OrderId(1)),
        Err(EngineError::Book(OrderBookError::Frozen { .. }))
    ));
    // Refusals on an already-frozen book do not masquerade as new fatal
    // events.
    assert!(fatals.is_empty());
}

#[test]
fn test_risk_metrics_event() {
    let engine = default_engine();
    let metrics = engine.bus().subscribe(EventKind::RiskMetricsUpdate, 4);
    engine.gate().set_mark_price("BTC/USD", 100);
    engine.submit_intent(limit(Side::Sell, 100, 5)).unwrap();
    engine.submit_intent(limit(Side::Buy, 100, 5)).unwrap();
    engine.publish_risk_metrics();

    let events = metrics.drain();
    assert_eq!(events.len(), 1);
    match events[0].as_ref() {
        EngineEvent::RiskMetricsUpdate { gross_exposure, .. } => {
            assert!(*gross_exposure > 0.0);
        }
        other => panic!("expected metrics, got {other:?}"),
    }
}
